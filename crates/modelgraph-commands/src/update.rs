use crate::{Command, CommandContext, CommandError};
use modelgraph_core::{ElementId, ElementKind, ModelError, Reference};
use modelgraph_document::{Document, Element, PropertyKey, PropertyValue, TagValue};

/// Set one or more properties of an element.
///
/// Attaching stereotypes to a class, or retyping an attribute or parameter, also copies the
/// stereotype's or type's tags onto the element, except for tag names it already has. The copy
/// is part of the same command.
#[derive(Debug)]
pub struct UpdateProperties {
    target: ElementId,
    changes: Vec<(PropertyKey, PropertyValue)>,
    /// Values overwritten by the last execute, in the order they were replaced.
    previous: Vec<(PropertyKey, PropertyValue)>,
    applied: bool,
}

impl UpdateProperties {
    pub fn new(target: ElementId) -> Self {
        Self {
            target,
            changes: Vec::new(),
            previous: Vec::new(),
            applied: false,
        }
    }

    pub fn set(mut self, key: PropertyKey, value: PropertyValue) -> Self {
        self.changes.push((key, value));
        self
    }

    pub fn single(target: ElementId, key: PropertyKey, value: PropertyValue) -> Self {
        Self::new(target).set(key, value)
    }

    pub fn target(&self) -> ElementId {
        self.target
    }
}

impl Command for UpdateProperties {
    fn execute(&mut self, ctx: &mut CommandContext<'_>) -> Result<(), CommandError> {
        let Some(element) = ctx.document.find_by_id(self.target) else {
            return ctx.missing_target(&self.description(), self.target);
        };

        let mut plan = Vec::with_capacity(self.changes.len() + 1);
        for (key, value) in &self.changes {
            if element.property(*key).is_none() {
                return Err(ModelError::InvalidProperty {
                    kind: element.kind(),
                    key: key.as_str().to_string(),
                }
                .into());
            }
            plan.push((*key, resolve_references(ctx.document, value.clone())?));
        }
        if let Some(tags) = propagated_tags(ctx.document, element, &plan) {
            plan.push((PropertyKey::Tags, PropertyValue::Tags(tags)));
        }

        let mut previous = Vec::with_capacity(plan.len());
        for (key, value) in plan {
            let old = ctx.document.property(self.target, key);
            let applied = match old {
                Some(old) => ctx
                    .document
                    .set_property(self.target, key, value)
                    .map(|()| previous.push((key, old))),
                None => Err(ModelError::MissingTarget(self.target)),
            };
            if let Err(error) = applied {
                restore(ctx.document, self.target, &previous)?;
                return Err(error.into());
            }
        }

        self.previous = previous;
        self.applied = true;
        ctx.announce_updated(self.target);
        Ok(())
    }

    fn undo(&mut self, ctx: &mut CommandContext<'_>) -> Result<(), CommandError> {
        if !self.applied {
            return Ok(());
        }
        if !ctx.document.contains(self.target) {
            return ctx.missing_target(&self.description(), self.target);
        }
        restore(ctx.document, self.target, &self.previous)?;
        self.previous.clear();
        self.applied = false;
        ctx.announce_updated(self.target);
        Ok(())
    }

    fn description(&self) -> String {
        let keys: Vec<&str> = self.changes.iter().map(|(key, _)| key.as_str()).collect();
        format!("Update {}", keys.join(", "))
    }
}

/// Put back `previous` values, last replaced first.
fn restore(
    document: &mut Document,
    target: ElementId,
    previous: &[(PropertyKey, PropertyValue)],
) -> Result<(), ModelError> {
    for (key, old) in previous.iter().rev() {
        document.set_property(target, *key, old.clone())?;
    }
    Ok(())
}

/// Every reference in `value` must name a live element; they are stored resolved.
fn resolve_references(
    document: &Document,
    value: PropertyValue,
) -> Result<PropertyValue, ModelError> {
    let mut missing = None;
    let value = value.map_references(|reference| {
        let target = reference.target();
        if document.contains(target) {
            Reference::Resolved(target)
        } else {
            missing.get_or_insert(target);
            reference
        }
    });
    match missing {
        Some(target) => Err(ModelError::UnresolvedReference(target)),
        None => Ok(value),
    }
}

/// Tag list the element should end up with once tags from newly attached stereotypes or a new
/// type are merged in; `None` when nothing changes.
fn propagated_tags(
    document: &Document,
    element: &Element,
    plan: &[(PropertyKey, PropertyValue)],
) -> Option<Vec<TagValue>> {
    let current = plan
        .iter()
        .rev()
        .find_map(|(key, value)| match (key, value) {
            (PropertyKey::Tags, PropertyValue::Tags(tags)) => Some(tags.clone()),
            _ => None,
        })
        .or_else(|| element.tags().map(<[TagValue]>::to_vec))?;

    let mut sources = Vec::new();
    for (key, value) in plan {
        match (element.kind(), key) {
            (ElementKind::Class, PropertyKey::Stereotypes) => {
                sources.extend(
                    value
                        .references()
                        .iter()
                        .map(Reference::target)
                        .filter(|id| !element.stereotypes().iter().any(|s| s.target() == *id)),
                );
            }
            (ElementKind::Attribute | ElementKind::Parameter, PropertyKey::Type) => {
                sources.extend(value.references().iter().map(Reference::target));
            }
            _ => {}
        }
    }
    if sources.is_empty() {
        return None;
    }

    let mut merged = current.clone();
    for tags in sources
        .into_iter()
        .filter_map(|id| document.find_by_id(id).and_then(Element::tags))
    {
        for tag in tags {
            if !merged.iter().any(|existing| existing.name == tag.name) {
                merged.push(tag.clone());
            }
        }
    }
    (merged != current).then_some(merged)
}
