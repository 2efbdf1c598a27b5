use crate::element::{
    Element, ElementData, LinkEnd, ParameterDirection, TagValue, Visibility,
};
use modelgraph_core::{ModelError, Reference};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Closed set of editable element properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PropertyKey {
    Name,
    Documentation,
    Visibility,
    IsAbstract,
    IsStatic,
    Type,
    ReturnType,
    Multiplicity,
    IsReadOnly,
    IsUnique,
    DefaultValue,
    Direction,
    Stereotypes,
    Tags,
    Value,
    Layout,
    End1,
    End2,
}

impl PropertyKey {
    pub fn as_str(self) -> &'static str {
        match self {
            PropertyKey::Name => "name",
            PropertyKey::Documentation => "documentation",
            PropertyKey::Visibility => "visibility",
            PropertyKey::IsAbstract => "isAbstract",
            PropertyKey::IsStatic => "isStatic",
            PropertyKey::Type => "type",
            PropertyKey::ReturnType => "returnType",
            PropertyKey::Multiplicity => "multiplicity",
            PropertyKey::IsReadOnly => "isReadOnly",
            PropertyKey::IsUnique => "isUnique",
            PropertyKey::DefaultValue => "defaultValue",
            PropertyKey::Direction => "direction",
            PropertyKey::Stereotypes => "stereotypes",
            PropertyKey::Tags => "tags",
            PropertyKey::Value => "value",
            PropertyKey::Layout => "layout",
            PropertyKey::End1 => "end1",
            PropertyKey::End2 => "end2",
        }
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Text(String),
    Flag(bool),
    Visibility(Visibility),
    Direction(ParameterDirection),
    Reference(Option<Reference>),
    References(Vec<Reference>),
    Tags(Vec<TagValue>),
    LinkEnd(LinkEnd),
    Json(Value),
}

impl PropertyValue {
    pub fn text(value: impl Into<String>) -> Self {
        PropertyValue::Text(value.into())
    }

    /// References carried by this value, in order.
    pub fn references(&self) -> Vec<Reference> {
        match self {
            PropertyValue::Reference(reference) => reference.iter().copied().collect(),
            PropertyValue::References(references) => references.clone(),
            PropertyValue::LinkEnd(end) => end.reference.iter().copied().collect(),
            _ => Vec::new(),
        }
    }

    pub fn map_references(self, mut f: impl FnMut(Reference) -> Reference) -> Self {
        match self {
            PropertyValue::Reference(reference) => PropertyValue::Reference(reference.map(f)),
            PropertyValue::References(references) => {
                PropertyValue::References(references.into_iter().map(f).collect())
            }
            PropertyValue::LinkEnd(mut end) => {
                end.reference = end.reference.map(&mut f);
                PropertyValue::LinkEnd(end)
            }
            other => other,
        }
    }
}

fn invalid(element: &Element, key: PropertyKey) -> ModelError {
    ModelError::InvalidProperty {
        kind: element.kind(),
        key: key.as_str().to_string(),
    }
}

impl Element {
    /// Current value of `key`, or `None` when this kind does not carry the property.
    pub fn property(&self, key: PropertyKey) -> Option<PropertyValue> {
        use PropertyValue as V;
        let value = match (key, &self.data) {
            (PropertyKey::Name, _) => V::Text(self.name.clone()),
            (PropertyKey::Documentation, _) => V::Text(self.documentation.clone()),
            (PropertyKey::Stereotypes, _) if self.holds_stereotypes() => {
                V::References(self.stereotypes().to_vec())
            }
            (PropertyKey::Tags, _) => V::Tags(self.tags()?.to_vec()),

            (PropertyKey::Visibility, ElementData::Class(d)) => V::Visibility(d.visibility),
            (PropertyKey::IsAbstract, ElementData::Class(d)) => V::Flag(d.is_abstract),

            (PropertyKey::Visibility, ElementData::Attribute(d)) => V::Visibility(d.visibility),
            (PropertyKey::IsStatic, ElementData::Attribute(d)) => V::Flag(d.is_static),
            (PropertyKey::Type, ElementData::Attribute(d)) => V::Reference(d.type_ref),
            (PropertyKey::Multiplicity, ElementData::Attribute(d)) => V::Text(d.multiplicity.clone()),
            (PropertyKey::IsReadOnly, ElementData::Attribute(d)) => V::Flag(d.is_read_only),
            (PropertyKey::IsUnique, ElementData::Attribute(d)) => V::Flag(d.is_unique),
            (PropertyKey::DefaultValue, ElementData::Attribute(d)) => {
                V::Text(d.default_value.clone())
            }

            (PropertyKey::Direction, ElementData::Parameter(d)) => V::Direction(d.direction),
            (PropertyKey::Type, ElementData::Parameter(d)) => V::Reference(d.type_ref),
            (PropertyKey::Multiplicity, ElementData::Parameter(d)) => V::Text(d.multiplicity.clone()),
            (PropertyKey::IsReadOnly, ElementData::Parameter(d)) => V::Flag(d.is_read_only),
            (PropertyKey::IsUnique, ElementData::Parameter(d)) => V::Flag(d.is_unique),
            (PropertyKey::DefaultValue, ElementData::Parameter(d)) => {
                V::Text(d.default_value.clone())
            }

            (PropertyKey::Visibility, ElementData::Operation(d)) => V::Visibility(d.visibility),
            (PropertyKey::IsStatic, ElementData::Operation(d)) => V::Flag(d.is_static),
            (PropertyKey::IsAbstract, ElementData::Operation(d)) => V::Flag(d.is_abstract),
            (PropertyKey::ReturnType, ElementData::Operation(d)) => V::Reference(d.return_type),

            (PropertyKey::End1, ElementData::Link(d)) => V::LinkEnd(d.end1.clone()),
            (PropertyKey::End2, ElementData::Link(d)) => V::LinkEnd(d.end2.clone()),
            (PropertyKey::Value, ElementData::Tag(d)) => V::Text(d.value.clone()),
            (PropertyKey::Layout, ElementData::Diagram(d)) => V::Json(d.layout.clone()),
            _ => return None,
        };
        Some(value)
    }

    /// Overwrite `key` with `value`. References are stored exactly as given.
    pub fn set_property(&mut self, key: PropertyKey, value: PropertyValue) -> Result<(), ModelError> {
        use PropertyValue as V;
        let error = invalid(self, key);
        let value = match (key, value) {
            (PropertyKey::Name, V::Text(text)) => {
                self.name = text;
                return Ok(());
            }
            (PropertyKey::Documentation, V::Text(text)) => {
                self.documentation = text;
                return Ok(());
            }
            (PropertyKey::Tags, V::Tags(tags)) => {
                let slot = self.tags_mut().ok_or(error)?;
                *slot = tags;
                return Ok(());
            }
            (_, value) => value,
        };

        match (key, value, &mut self.data) {
            (PropertyKey::Stereotypes, V::References(refs), ElementData::Class(d)) => {
                d.stereotypes = refs
            }
            (PropertyKey::Stereotypes, V::References(refs), ElementData::Attribute(d)) => {
                d.stereotypes = refs
            }
            (PropertyKey::Stereotypes, V::References(refs), ElementData::Operation(d)) => {
                d.stereotypes = refs
            }
            (PropertyKey::Stereotypes, V::References(refs), ElementData::Parameter(d)) => {
                d.stereotypes = refs
            }
            (PropertyKey::Stereotypes, V::References(refs), ElementData::Actor(d)) => {
                d.stereotypes = refs
            }

            (PropertyKey::Visibility, V::Visibility(v), ElementData::Class(d)) => d.visibility = v,
            (PropertyKey::IsAbstract, V::Flag(f), ElementData::Class(d)) => d.is_abstract = f,

            (PropertyKey::Visibility, V::Visibility(v), ElementData::Attribute(d)) => {
                d.visibility = v
            }
            (PropertyKey::IsStatic, V::Flag(f), ElementData::Attribute(d)) => d.is_static = f,
            (PropertyKey::Type, V::Reference(r), ElementData::Attribute(d)) => d.type_ref = r,
            (PropertyKey::Multiplicity, V::Text(t), ElementData::Attribute(d)) => {
                d.multiplicity = t
            }
            (PropertyKey::IsReadOnly, V::Flag(f), ElementData::Attribute(d)) => d.is_read_only = f,
            (PropertyKey::IsUnique, V::Flag(f), ElementData::Attribute(d)) => d.is_unique = f,
            (PropertyKey::DefaultValue, V::Text(t), ElementData::Attribute(d)) => {
                d.default_value = t
            }

            (PropertyKey::Direction, V::Direction(v), ElementData::Parameter(d)) => {
                d.direction = v
            }
            (PropertyKey::Type, V::Reference(r), ElementData::Parameter(d)) => d.type_ref = r,
            (PropertyKey::Multiplicity, V::Text(t), ElementData::Parameter(d)) => {
                d.multiplicity = t
            }
            (PropertyKey::IsReadOnly, V::Flag(f), ElementData::Parameter(d)) => d.is_read_only = f,
            (PropertyKey::IsUnique, V::Flag(f), ElementData::Parameter(d)) => d.is_unique = f,
            (PropertyKey::DefaultValue, V::Text(t), ElementData::Parameter(d)) => {
                d.default_value = t
            }

            (PropertyKey::Visibility, V::Visibility(v), ElementData::Operation(d)) => {
                d.visibility = v
            }
            (PropertyKey::IsStatic, V::Flag(f), ElementData::Operation(d)) => d.is_static = f,
            (PropertyKey::IsAbstract, V::Flag(f), ElementData::Operation(d)) => d.is_abstract = f,
            (PropertyKey::ReturnType, V::Reference(r), ElementData::Operation(d)) => {
                d.return_type = r
            }

            (PropertyKey::End1, V::LinkEnd(end), ElementData::Link(d)) => d.end1 = end,
            (PropertyKey::End2, V::LinkEnd(end), ElementData::Link(d)) => d.end2 = end,
            (PropertyKey::Value, V::Text(t), ElementData::Tag(d)) => d.value = t,
            (PropertyKey::Layout, V::Json(layout), ElementData::Diagram(d)) => d.layout = layout,
            _ => return Err(error),
        }
        Ok(())
    }

    // Stereotypes and data types carry tag definitions but cannot themselves be stereotyped.
    fn holds_stereotypes(&self) -> bool {
        matches!(
            self.data,
            ElementData::Class(_)
                | ElementData::Attribute(_)
                | ElementData::Operation(_)
                | ElementData::Parameter(_)
                | ElementData::Actor(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modelgraph_core::{ElementId, ElementKind};

    #[test]
    fn test_get_and_set_attribute_properties() {
        let mut attribute = Element::new(ElementKind::Attribute, "username");
        let string_type = Reference::Resolved(ElementId::new());

        attribute
            .set_property(PropertyKey::Type, PropertyValue::Reference(Some(string_type)))
            .unwrap();
        attribute
            .set_property(PropertyKey::Multiplicity, PropertyValue::text("0..1"))
            .unwrap();
        attribute
            .set_property(PropertyKey::IsReadOnly, PropertyValue::Flag(true))
            .unwrap();

        assert_eq!(
            attribute.property(PropertyKey::Type),
            Some(PropertyValue::Reference(Some(string_type)))
        );
        assert_eq!(
            attribute.property(PropertyKey::Multiplicity),
            Some(PropertyValue::text("0..1"))
        );
        assert_eq!(
            attribute.property(PropertyKey::IsReadOnly),
            Some(PropertyValue::Flag(true))
        );
    }

    #[test]
    fn test_property_not_carried_by_kind() {
        let mut package = Element::new(ElementKind::Package, "domain");
        assert!(package.property(PropertyKey::Type).is_none());
        assert!(package.property(PropertyKey::Tags).is_none());
        assert_eq!(
            package.set_property(PropertyKey::IsAbstract, PropertyValue::Flag(true)),
            Err(ModelError::InvalidProperty {
                kind: ElementKind::Package,
                key: "isAbstract".to_string(),
            })
        );
    }

    #[test]
    fn test_value_type_must_match_key() {
        let mut class = Element::new(ElementKind::Class, "User");
        assert!(
            class
                .set_property(PropertyKey::IsAbstract, PropertyValue::text("yes"))
                .is_err()
        );
    }

    #[test]
    fn test_stereotypes_not_on_tag_holders() {
        let stereotype = Element::new(ElementKind::Stereotype, "entity");
        assert!(stereotype.property(PropertyKey::Stereotypes).is_none());
        assert!(stereotype.property(PropertyKey::Tags).is_some());

        let class = Element::new(ElementKind::Class, "User");
        assert_eq!(
            class.property(PropertyKey::Stereotypes),
            Some(PropertyValue::References(Vec::new()))
        );
    }

    #[test]
    fn test_map_references_rewrites_link_end() {
        let id = ElementId::new();
        let value = PropertyValue::LinkEnd(LinkEnd::to(Reference::Unresolved(id)));
        let mapped = value.map_references(|r| Reference::Resolved(r.target()));
        assert_eq!(mapped.references(), vec![Reference::Resolved(id)]);
    }
}
