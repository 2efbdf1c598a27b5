//! Meta-factory: turns a generic `(kind tag, fields)` description into a typed element and back.

use crate::element::{Element, ElementData};
use modelgraph_core::{ElementId, ElementKind, ElementRecord, ModelError, Reference};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Construct a fresh element (new id, empty name) from a kind tag and its kind-specific fields.
pub fn construct(kind_tag: &str, fields: Map<String, Value>) -> Result<Element, ModelError> {
    let kind = ElementKind::from_tag(kind_tag)?;
    let mut element = Element::new(kind, "");
    element.data = data_from_fields(kind, fields)?;
    Ok(element)
}

/// Construct the element described by `record`, keeping its id. Owned elements are not
/// visited; every reference comes back unresolved.
pub fn construct_record(record: &ElementRecord) -> Result<Element, ModelError> {
    let kind = ElementKind::from_tag(&record.kind)?;
    let mut element = Element::with_id(record.id, kind, record.name.clone());
    element.documentation = record.documentation.clone();
    element.data = data_from_fields(kind, record.fields.clone())?;
    element.for_each_reference_mut(|_, reference| *reference = reference.into_unresolved());
    Ok(element)
}

pub fn data_from_fields(
    kind: ElementKind,
    fields: Map<String, Value>,
) -> Result<ElementData, ModelError> {
    let data = match kind {
        ElementKind::Project
        | ElementKind::ProfileRoot
        | ElementKind::Profile
        | ElementKind::Package
        | ElementKind::Model => ElementData::Container,
        ElementKind::Class => ElementData::Class(parse(kind, fields)?),
        ElementKind::Attribute => ElementData::Attribute(parse(kind, fields)?),
        ElementKind::Operation => ElementData::Operation(parse(kind, fields)?),
        ElementKind::Parameter => ElementData::Parameter(parse(kind, fields)?),
        ElementKind::Association | ElementKind::Dependency | ElementKind::Generalization => {
            ElementData::Link(parse(kind, fields)?)
        }
        ElementKind::Stereotype => ElementData::Stereotype(parse(kind, fields)?),
        ElementKind::DataType => ElementData::DataType(parse(kind, fields)?),
        ElementKind::Tag => ElementData::Tag(parse(kind, fields)?),
        ElementKind::Actor => ElementData::Actor(parse(kind, fields)?),
        ElementKind::Diagram => ElementData::Diagram(parse(kind, fields)?),
    };
    Ok(data)
}

pub fn data_to_fields(
    kind: ElementKind,
    data: &ElementData,
) -> Result<Map<String, Value>, ModelError> {
    match data {
        ElementData::Container => Ok(Map::new()),
        ElementData::Class(d) => fields_of(kind, d),
        ElementData::Attribute(d) => fields_of(kind, d),
        ElementData::Operation(d) => fields_of(kind, d),
        ElementData::Parameter(d) => fields_of(kind, d),
        ElementData::Link(d) => fields_of(kind, d),
        ElementData::Stereotype(d) | ElementData::DataType(d) => fields_of(kind, d),
        ElementData::Tag(d) => fields_of(kind, d),
        ElementData::Actor(d) => fields_of(kind, d),
        ElementData::Diagram(d) => fields_of(kind, d),
    }
}

/// Shallow record of `element`: no owned elements, references as plain `{ "ref": id }`.
pub fn element_record(element: &Element) -> Result<ElementRecord, ModelError> {
    let mut record = ElementRecord::new(element.id(), element.kind().tag(), element.name.clone());
    record.documentation = element.documentation.clone();
    record.parent = element.parent().map(Reference::Resolved);
    record.fields = data_to_fields(element.kind(), &element.data)?;
    Ok(record)
}

/// Fresh record for a new element of `kind`, ready to be used as an add-element snapshot.
pub fn new_record(kind: ElementKind, name: impl Into<String>) -> Result<ElementRecord, ModelError> {
    element_record(&Element::with_id(ElementId::new(), kind, name))
}

fn parse<T: DeserializeOwned>(kind: ElementKind, fields: Map<String, Value>) -> Result<T, ModelError> {
    serde_json::from_value(Value::Object(fields)).map_err(|error| ModelError::InvalidFields {
        kind,
        reason: error.to_string(),
    })
}

fn fields_of<T: Serialize>(kind: ElementKind, data: &T) -> Result<Map<String, Value>, ModelError> {
    match serde_json::to_value(data) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(ModelError::InvalidFields {
            kind,
            reason: format!("expected an object, got {other}"),
        }),
        Err(error) => Err(ModelError::InvalidFields {
            kind,
            reason: error.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{AttributeData, TagValue};
    use serde_json::json;

    #[test]
    fn test_construct_known_kind() {
        let fields = json!({ "isAbstract": true, "tags": [{ "name": "table", "value": "users" }] });
        let Value::Object(fields) = fields else { unreachable!() };
        let class = construct("UMLClass", fields).unwrap();
        assert_eq!(class.kind(), ElementKind::Class);
        match &class.data {
            ElementData::Class(data) => {
                assert!(data.is_abstract);
                assert_eq!(data.tags, vec![TagValue::new("table", "users")]);
            }
            other => panic!("unexpected data {other:?}"),
        }
    }

    #[test]
    fn test_construct_unknown_kind_fails() {
        assert_eq!(
            construct("UMLWidget", Map::new()).unwrap_err(),
            ModelError::UnknownKind("UMLWidget".to_string())
        );
    }

    #[test]
    fn test_invalid_fields_are_reported() {
        let Value::Object(fields) = json!({ "isReadOnly": "definitely" }) else {
            unreachable!()
        };
        let error = construct("UMLAttribute", fields).unwrap_err();
        assert!(matches!(
            error,
            ModelError::InvalidFields {
                kind: ElementKind::Attribute,
                ..
            }
        ));
    }

    #[test]
    fn test_fields_round_trip_through_record() {
        let type_id = ElementId::new();
        let mut attribute = Element::new(ElementKind::Attribute, "username");
        attribute.data = ElementData::Attribute(AttributeData {
            type_ref: Some(Reference::Resolved(type_id)),
            is_unique: true,
            ..AttributeData::default()
        });

        let record = element_record(&attribute).unwrap();
        assert_eq!(record.fields["type"], json!({ "ref": type_id.to_string() }));

        let rebuilt = construct_record(&record).unwrap();
        assert_eq!(rebuilt.id(), attribute.id());
        assert_eq!(
            rebuilt.references(),
            vec![("type", Reference::Unresolved(type_id))]
        );
    }

    #[test]
    fn test_diagram_layout_passes_through() {
        let layout = json!({ "views": [{ "ref": "not-an-element", "x": 10 }] });
        let Value::Object(fields) = json!({ "layout": layout.clone() }) else {
            unreachable!()
        };
        let diagram = construct("UMLDiagram", fields).unwrap();
        let out = data_to_fields(ElementKind::Diagram, &diagram.data).unwrap();
        assert_eq!(out["layout"], layout);
    }
}
