use crate::naming::unique_child_name;
use crate::{Command, CommandContext, CommandError};
use modelgraph_core::{ElementId, ElementKind, ElementRecord};
use modelgraph_document::{DereferenceSet, Document, factory};
use serde_json::Value;

/// Create an element (with any subtree described by its snapshot) under a parent.
#[derive(Debug)]
pub struct AddElement {
    parent: ElementId,
    snapshot: ElementRecord,
    before: Option<ElementId>,
    /// Kind whose unique name is still to be chosen among the parent's children.
    unnamed: Option<ElementKind>,
    added: bool,
}

impl AddElement {
    /// New `kind` element under `parent`. Without a name, one unique among the parent's
    /// children is synthesized on first execute and kept for redo.
    pub fn new(
        parent: ElementId,
        kind: ElementKind,
        name: Option<&str>,
    ) -> Result<Self, CommandError> {
        let record = factory::new_record(kind, name.unwrap_or_default())?;
        let mut add = Self::from_record(parent, record);
        if name.is_none() {
            add.unnamed = Some(kind);
        }
        Ok(add)
    }

    /// Add the element described by `snapshot`, keeping its ids.
    pub fn from_record(parent: ElementId, snapshot: ElementRecord) -> Self {
        Self {
            parent,
            snapshot,
            before: None,
            unnamed: None,
            added: false,
        }
    }

    /// Insert before `sibling` instead of appending.
    pub fn before(mut self, sibling: ElementId) -> Self {
        self.before = Some(sibling);
        self
    }

    /// Set a kind-specific field in its persisted form, e.g. `("isAbstract", true)`.
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.snapshot.fields.insert(key.into(), value);
        self
    }

    pub fn element_id(&self) -> ElementId {
        self.snapshot.id
    }

    pub fn parent(&self) -> ElementId {
        self.parent
    }

    fn attach(&self, document: &mut Document) -> Result<(), CommandError> {
        let id = document.instantiate(&self.snapshot)?;
        let attached = match self.before {
            Some(sibling) => document.insert_before(self.parent, id, sibling),
            None => document.add_child(self.parent, id),
        };
        if let Err(error) = attached {
            document.discard(id)?;
            return Err(error.into());
        }
        Ok(())
    }
}

impl Command for AddElement {
    fn execute(&mut self, ctx: &mut CommandContext<'_>) -> Result<(), CommandError> {
        if !ctx.document.contains(self.parent) {
            return ctx.missing_target(&self.description(), self.parent);
        }
        if let Some(kind) = self.unnamed {
            self.snapshot.name = unique_child_name(ctx.document, self.parent, kind);
        }
        if let Err(error) = self.attach(ctx.document) {
            if self.unnamed.is_some() {
                self.snapshot.name.clear();
            }
            return Err(error);
        }
        self.unnamed = None;
        self.added = true;
        let id = self.snapshot.id;
        ctx.announce_created(id);
        Ok(())
    }

    fn undo(&mut self, ctx: &mut CommandContext<'_>) -> Result<(), CommandError> {
        if !self.added {
            return Ok(());
        }
        let id = self.snapshot.id;
        if !ctx.document.contains(id) {
            self.added = false;
            return ctx.missing_target(&self.description(), id);
        }
        self.snapshot = ctx
            .document
            .serialize_element(id, &DereferenceSet::none())?;
        ctx.document.remove(id)?;
        self.added = false;
        ctx.announce_removed(id);
        Ok(())
    }

    fn description(&self) -> String {
        if self.snapshot.name.is_empty() {
            format!("Add {}", self.snapshot.kind)
        } else {
            format!("Add {} {}", self.snapshot.kind, self.snapshot.name)
        }
    }
}
