use crate::DocumentError;
use crate::document::Document;
use crate::factory;
use modelgraph_core::reference::REF_KEY;
use modelgraph_core::{ElementId, ElementKind, ElementRecord, ModelError};
use serde_json::Value;
use std::collections::HashSet;

/// Extra key written next to a reference to a Class, carrying the class name.
pub const CLASS_NAME_HINT: &str = "className";

/// Fields whose JSON is passed through untouched.
const OPAQUE_FIELDS: &[&str] = &["layout"];

/// Kinds whose referenced records are inlined in place of `{ "ref": id }` when serializing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DereferenceSet {
    kinds: HashSet<ElementKind>,
}

impl DereferenceSet {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn of(kinds: impl IntoIterator<Item = ElementKind>) -> Self {
        Self {
            kinds: kinds.into_iter().collect(),
        }
    }

    pub fn contains(&self, kind: ElementKind) -> bool {
        self.kinds.contains(&kind)
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

impl Document {
    /// Persisted form of the whole document.
    pub fn serialize(&self) -> Result<ElementRecord, DocumentError> {
        self.serialize_element(self.root_id(), &DereferenceSet::none())
    }

    /// Persisted form of `id` and its owned subtree.
    pub fn serialize_element(
        &self,
        id: ElementId,
        dereference: &DereferenceSet,
    ) -> Result<ElementRecord, DocumentError> {
        let mut serializer = Serializer {
            document: self,
            dereference,
            stack: Vec::new(),
        };
        Ok(serializer.record(id)?)
    }

    pub fn to_value(&self) -> Result<Value, DocumentError> {
        Ok(serde_json::to_value(self.serialize()?)?)
    }

    pub fn to_json(&self) -> Result<String, DocumentError> {
        Ok(serde_json::to_string_pretty(&self.serialize()?)?)
    }
}

struct Serializer<'a> {
    document: &'a Document,
    dereference: &'a DereferenceSet,
    /// Records being written, outermost first; an inlined reference never re-enters one.
    stack: Vec<ElementId>,
}

impl<'a> Serializer<'a> {
    fn record(&mut self, id: ElementId) -> Result<ElementRecord, ModelError> {
        let document = self.document;
        let element = document.require(id)?;
        self.stack.push(id);

        let mut record = factory::element_record(element)?;
        for (key, value) in record.fields.iter_mut() {
            if OPAQUE_FIELDS.contains(&key.as_str()) {
                continue;
            }
            self.decorate(value)?;
        }
        record.owned_elements = element
            .children()
            .iter()
            .map(|child| self.record(*child))
            .collect::<Result<_, _>>()?;

        self.stack.pop();
        Ok(record)
    }

    fn decorate(&mut self, value: &mut Value) -> Result<(), ModelError> {
        if let Some(target) = reference_target(value) {
            return self.decorate_reference(value, target);
        }
        match value {
            Value::Object(map) => {
                for nested in map.values_mut() {
                    self.decorate(nested)?;
                }
            }
            Value::Array(items) => {
                for nested in items {
                    self.decorate(nested)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn decorate_reference(&mut self, value: &mut Value, target: ElementId) -> Result<(), ModelError> {
        let document = self.document;
        let Some(element) = document.find_by_id(target) else {
            return Ok(());
        };
        if self.dereference.contains(element.kind()) && !self.stack.contains(&target) {
            let inlined = self.record(target)?;
            *value = serde_json::to_value(inlined).map_err(|error| ModelError::InvalidFields {
                kind: element.kind(),
                reason: error.to_string(),
            })?;
            return Ok(());
        }
        if element.kind() == ElementKind::Class
            && let Value::Object(map) = value
        {
            map.insert(CLASS_NAME_HINT.to_string(), Value::String(element.name.clone()));
        }
        Ok(())
    }
}

fn reference_target(value: &Value) -> Option<ElementId> {
    value.as_object()?.get(REF_KEY)?.as_str()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{Element, ElementData, LinkEnd};
    use modelgraph_core::Reference;
    use serde_json::json;

    fn doc_with_association() -> (Document, ElementId, ElementId, ElementId) {
        let mut doc = Document::new("Shop");
        let model = doc.model().unwrap().id();
        let user = doc.cache.register(Element::new(ElementKind::Class, "User")).unwrap();
        let order = doc.cache.register(Element::new(ElementKind::Class, "Order")).unwrap();
        let mut places = Element::new(ElementKind::Association, "places");
        if let ElementData::Link(data) = &mut places.data {
            data.end1 = LinkEnd::to(Reference::Resolved(user));
            data.end2 = LinkEnd::to(Reference::Resolved(order));
        }
        let places = doc.cache.register(places).unwrap();
        for id in [user, order, places] {
            doc.add_child(model, id).unwrap();
        }
        (doc, user, order, places)
    }

    #[test]
    fn test_class_references_carry_name_hint() {
        let (doc, user, _, places) = doc_with_association();
        let record = doc.serialize_element(places, &DereferenceSet::none()).unwrap();
        assert_eq!(
            record.fields["end1"]["reference"],
            json!({ "ref": user.to_string(), "className": "User" })
        );
    }

    #[test]
    fn test_dereference_is_selective_per_kind() {
        let (doc, user, _, places) = doc_with_association();
        let record = doc
            .serialize_element(places, &DereferenceSet::of([ElementKind::Class]))
            .unwrap();
        let inlined = &record.fields["end1"]["reference"];
        assert_eq!(inlined["id"], json!(user.to_string()));
        assert_eq!(inlined["kind"], json!("UMLClass"));
        assert_eq!(inlined["name"], json!("User"));

        let plain = doc
            .serialize_element(places, &DereferenceSet::of([ElementKind::DataType]))
            .unwrap();
        assert_eq!(plain.fields["end1"]["reference"]["ref"], json!(user.to_string()));
    }

    #[test]
    fn test_children_nest_with_parent_links() {
        let (doc, user, order, places) = doc_with_association();
        let record = doc.serialize().unwrap();
        assert_eq!(record.kind, "Project");
        assert!(record.parent.is_none());

        let model = &record.owned_elements[0];
        assert_eq!(model.kind, "UMLModel");
        let ids: Vec<ElementId> = model.owned_elements.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![user, order, places]);
        assert_eq!(
            model.owned_elements[0].parent,
            Some(Reference::Resolved(model.id))
        );
    }

    #[test]
    fn test_dangling_reference_written_plain() {
        let mut doc = Document::new("Shop");
        let model = doc.model().unwrap().id();
        let ghost = ElementId::new();
        let mut class = Element::new(ElementKind::Class, "User");
        if let ElementData::Class(data) = &mut class.data {
            data.stereotypes.push(Reference::Unresolved(ghost));
        }
        let class = doc.cache.register(class).unwrap();
        doc.add_child(model, class).unwrap();

        let record = doc
            .serialize_element(class, &DereferenceSet::of(ElementKind::ALL))
            .unwrap();
        assert_eq!(record.fields["stereotypes"], json!([{ "ref": ghost.to_string() }]));
    }
}
