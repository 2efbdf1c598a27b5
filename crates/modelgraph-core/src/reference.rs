use crate::ElementId;
use serde::de::Error as _;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Key under which a reference is written in the persisted form.
pub const REF_KEY: &str = "ref";

/// A non-owning, id-based pointer to another element.
///
/// Freshly deserialized references are [`Reference::Unresolved`]; the document's fix-up pass
/// turns every reference whose target is registered into [`Reference::Resolved`]. Inside a
/// document the variant follows the target: removing it marks references to it unresolved, and
/// registering it again resolves them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reference {
    Unresolved(ElementId),
    Resolved(ElementId),
}

impl Reference {
    pub fn target(&self) -> ElementId {
        match self {
            Reference::Unresolved(id) | Reference::Resolved(id) => *id,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Reference::Resolved(_))
    }

    pub fn into_unresolved(self) -> Self {
        Reference::Unresolved(self.target())
    }
}

impl Serialize for Reference {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(REF_KEY, &self.target())?;
        map.end()
    }
}

// Accepts `{ "ref": id }`, `{ "$ref": id }` and an inlined element record (only its `id` is read).
#[derive(Deserialize)]
struct ReferenceWire {
    #[serde(rename = "ref", alias = "$ref")]
    reference: Option<ElementId>,
    id: Option<ElementId>,
}

impl<'de> Deserialize<'de> for Reference {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = ReferenceWire::deserialize(deserializer)?;
        wire.reference
            .or(wire.id)
            .map(Reference::Unresolved)
            .ok_or_else(|| D::Error::custom("reference without `ref` or `id`"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "0b6f0f1e-63b7-4f5c-9a65-3f0c2a7a1a01";

    #[test]
    fn test_reference_serializes_as_ref_sentinel() {
        let id: ElementId = ID.parse().unwrap();
        let json = serde_json::to_string(&Reference::Resolved(id)).unwrap();
        assert_eq!(json, format!(r#"{{"ref":"{ID}"}}"#));
    }

    #[test]
    fn test_reference_deserializes_unresolved() {
        let id: ElementId = ID.parse().unwrap();
        let plain: Reference = serde_json::from_str(&format!(r#"{{"ref":"{ID}"}}"#)).unwrap();
        let dollar: Reference = serde_json::from_str(&format!(r#"{{"$ref":"{ID}"}}"#)).unwrap();
        let hinted: Reference =
            serde_json::from_str(&format!(r#"{{"ref":"{ID}","className":"User"}}"#)).unwrap();
        assert_eq!(plain, Reference::Unresolved(id));
        assert_eq!(dollar, Reference::Unresolved(id));
        assert_eq!(hinted, Reference::Unresolved(id));
    }

    #[test]
    fn test_inlined_record_reads_only_its_id() {
        let id: ElementId = ID.parse().unwrap();
        let json = format!(r#"{{"id":"{ID}","kind":"UMLDataType","name":"String"}}"#);
        let reference: Reference = serde_json::from_str(&json).unwrap();
        assert_eq!(reference, Reference::Unresolved(id));
    }

    #[test]
    fn test_reference_without_target_fails() {
        assert!(serde_json::from_str::<Reference>(r#"{"name":"x"}"#).is_err());
    }
}
