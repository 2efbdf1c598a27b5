use crate::{ElementId, Reference};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Persisted (JSON-shaped) form of one element and its owned subtree.
///
/// Owned children nest under `ownedElements`; everything kind-specific lives in `fields` and is
/// interpreted by the document's meta-factory. `kind` stays a raw string here so that an unknown
/// tag only fails the subtree that carries it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementRecord {
    pub id: ElementId,
    pub kind: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub documentation: String,
    #[serde(rename = "_parent", default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<Reference>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub owned_elements: Vec<ElementRecord>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl ElementRecord {
    pub fn new(id: ElementId, kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id,
            kind: kind.into(),
            name: name.into(),
            documentation: String::new(),
            parent: None,
            owned_elements: Vec::new(),
            fields: Map::new(),
        }
    }

    /// Number of records in this subtree, including `self`.
    pub fn subtree_len(&self) -> usize {
        1 + self
            .owned_elements
            .iter()
            .map(ElementRecord::subtree_len)
            .sum::<usize>()
    }

    /// Pre-order search for a record by id.
    pub fn find(&self, id: ElementId) -> Option<&ElementRecord> {
        if self.id == id {
            return Some(self);
        }
        self.owned_elements.iter().find_map(|child| child.find(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_keeps_kind_specific_fields() {
        let json = r#"{
            "id": "9d0b0e51-1d43-4bb4-8f40-2f8d1c1b2a11",
            "kind": "UMLAttribute",
            "name": "username",
            "multiplicity": "1",
            "type": { "ref": "5a0b0e51-1d43-4bb4-8f40-2f8d1c1b2a22" }
        }"#;
        let record: ElementRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.kind, "UMLAttribute");
        assert_eq!(record.name, "username");
        assert!(record.owned_elements.is_empty());
        assert_eq!(record.fields.get("multiplicity"), Some(&Value::from("1")));
        assert!(record.fields.contains_key("type"));
        assert!(!record.fields.contains_key("id"));
    }

    #[test]
    fn test_record_nests_owned_elements() {
        let mut root = ElementRecord::new(ElementId::new(), "UMLClass", "User");
        let child = ElementRecord::new(ElementId::new(), "UMLAttribute", "username");
        let child_id = child.id;
        root.owned_elements.push(child);

        let json = serde_json::to_value(&root).unwrap();
        assert_eq!(json["ownedElements"][0]["name"], "username");
        assert!(json.get("documentation").is_none());

        let back: ElementRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, root);
        assert_eq!(back.subtree_len(), 2);
        assert_eq!(back.find(child_id).map(|r| r.name.as_str()), Some("username"));
    }
}
