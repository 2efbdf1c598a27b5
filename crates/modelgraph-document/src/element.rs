use modelgraph_core::{ElementId, ElementKind, Reference};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Protected,
    Private,
    Package,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterDirection {
    #[default]
    In,
    Out,
    InOut,
    Return,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationKind {
    #[default]
    None,
    Shared,
    Composite,
}

/// One `name = value` entry of an element's inline tag list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TagValue {
    pub name: String,
    #[serde(default)]
    pub value: String,
}

impl TagValue {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClassData {
    pub is_abstract: bool,
    pub visibility: Visibility,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stereotypes: Vec<Reference>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<TagValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AttributeData {
    pub visibility: Visibility,
    pub is_static: bool,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_ref: Option<Reference>,
    pub multiplicity: String,
    pub is_read_only: bool,
    pub is_unique: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub default_value: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stereotypes: Vec<Reference>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<TagValue>,
}

impl Default for AttributeData {
    fn default() -> Self {
        Self {
            visibility: Visibility::Public,
            is_static: false,
            type_ref: None,
            multiplicity: "1".to_string(),
            is_read_only: false,
            is_unique: false,
            default_value: String::new(),
            stereotypes: Vec::new(),
            tags: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParameterData {
    pub direction: ParameterDirection,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_ref: Option<Reference>,
    pub multiplicity: String,
    pub is_read_only: bool,
    pub is_unique: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub default_value: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stereotypes: Vec<Reference>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<TagValue>,
}

impl Default for ParameterData {
    fn default() -> Self {
        Self {
            direction: ParameterDirection::In,
            type_ref: None,
            multiplicity: "1".to_string(),
            is_read_only: false,
            is_unique: false,
            default_value: String::new(),
            stereotypes: Vec::new(),
            tags: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OperationData {
    pub visibility: Visibility,
    pub is_static: bool,
    pub is_abstract: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_type: Option<Reference>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stereotypes: Vec<Reference>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<TagValue>,
}

/// One end of an association, dependency or generalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LinkEnd {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<Reference>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    pub multiplicity: String,
    pub navigable: bool,
    pub aggregation: AggregationKind,
}

impl Default for LinkEnd {
    fn default() -> Self {
        Self {
            reference: None,
            name: String::new(),
            multiplicity: String::new(),
            navigable: true,
            aggregation: AggregationKind::None,
        }
    }
}

impl LinkEnd {
    pub fn to(target: Reference) -> Self {
        Self {
            reference: Some(target),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LinkData {
    pub end1: LinkEnd,
    pub end2: LinkEnd,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaggedData {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<TagValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TagData {
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ActorData {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stereotypes: Vec<Reference>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<TagValue>,
}

/// Opaque visual-layout payload; passed through load and save untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DiagramData {
    #[serde(skip_serializing_if = "Value::is_null")]
    pub layout: Value,
}

/// Kind-specific fields of an element.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementData {
    /// Project, profile root, package, profile and model carry no extra fields.
    Container,
    Class(ClassData),
    Attribute(AttributeData),
    Operation(OperationData),
    Parameter(ParameterData),
    Link(LinkData),
    Stereotype(TaggedData),
    DataType(TaggedData),
    Tag(TagData),
    Actor(ActorData),
    Diagram(DiagramData),
}

impl ElementData {
    pub fn default_for(kind: ElementKind) -> Self {
        match kind {
            ElementKind::Project
            | ElementKind::ProfileRoot
            | ElementKind::Profile
            | ElementKind::Package
            | ElementKind::Model => ElementData::Container,
            ElementKind::Class => ElementData::Class(ClassData::default()),
            ElementKind::Attribute => ElementData::Attribute(AttributeData::default()),
            ElementKind::Operation => ElementData::Operation(OperationData::default()),
            ElementKind::Parameter => ElementData::Parameter(ParameterData::default()),
            ElementKind::Association | ElementKind::Dependency | ElementKind::Generalization => {
                ElementData::Link(LinkData::default())
            }
            ElementKind::Stereotype => ElementData::Stereotype(TaggedData::default()),
            ElementKind::DataType => ElementData::DataType(TaggedData::default()),
            ElementKind::Tag => ElementData::Tag(TagData::default()),
            ElementKind::Actor => ElementData::Actor(ActorData::default()),
            ElementKind::Diagram => ElementData::Diagram(DiagramData::default()),
        }
    }
}

/// A node of the document graph.
///
/// `parent` and `children` are ownership edges; every other id an element holds is a
/// [`Reference`] and must be resolved through the document.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    id: ElementId,
    kind: ElementKind,
    pub name: String,
    pub documentation: String,
    pub(crate) parent: Option<ElementId>,
    pub(crate) children: Vec<ElementId>,
    pub data: ElementData,
}

impl Element {
    pub fn new(kind: ElementKind, name: impl Into<String>) -> Self {
        Self::with_id(ElementId::new(), kind, name)
    }

    pub fn with_id(id: ElementId, kind: ElementKind, name: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            name: name.into(),
            documentation: String::new(),
            parent: None,
            children: Vec::new(),
            data: ElementData::default_for(kind),
        }
    }

    pub fn id(&self) -> ElementId {
        self.id
    }

    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    pub fn parent(&self) -> Option<ElementId> {
        self.parent
    }

    pub fn children(&self) -> &[ElementId] {
        &self.children
    }

    pub fn allowed_child_kinds(&self) -> &'static [ElementKind] {
        self.kind.allowed_child_kinds()
    }

    pub fn tags(&self) -> Option<&[TagValue]> {
        match &self.data {
            ElementData::Class(data) => Some(&data.tags),
            ElementData::Attribute(data) => Some(&data.tags),
            ElementData::Operation(data) => Some(&data.tags),
            ElementData::Parameter(data) => Some(&data.tags),
            ElementData::Stereotype(data) | ElementData::DataType(data) => Some(&data.tags),
            ElementData::Actor(data) => Some(&data.tags),
            _ => None,
        }
    }

    pub fn tags_mut(&mut self) -> Option<&mut Vec<TagValue>> {
        match &mut self.data {
            ElementData::Class(data) => Some(&mut data.tags),
            ElementData::Attribute(data) => Some(&mut data.tags),
            ElementData::Operation(data) => Some(&mut data.tags),
            ElementData::Parameter(data) => Some(&mut data.tags),
            ElementData::Stereotype(data) | ElementData::DataType(data) => Some(&mut data.tags),
            ElementData::Actor(data) => Some(&mut data.tags),
            _ => None,
        }
    }

    pub fn stereotypes(&self) -> &[Reference] {
        match &self.data {
            ElementData::Class(data) => &data.stereotypes,
            ElementData::Attribute(data) => &data.stereotypes,
            ElementData::Operation(data) => &data.stereotypes,
            ElementData::Parameter(data) => &data.stereotypes,
            ElementData::Actor(data) => &data.stereotypes,
            _ => &[],
        }
    }

    /// Every reference this element holds, with the name of the field it sits in.
    pub fn references(&self) -> Vec<(&'static str, Reference)> {
        let mut out = Vec::new();
        let mut push_all = |field: &'static str, refs: &[Reference]| {
            out.extend(refs.iter().map(|reference| (field, *reference)));
        };
        match &self.data {
            ElementData::Class(data) => push_all("stereotypes", &data.stereotypes),
            ElementData::Attribute(data) => {
                push_all("stereotypes", &data.stereotypes);
                push_all("type", data.type_ref.as_slice());
            }
            ElementData::Operation(data) => {
                push_all("stereotypes", &data.stereotypes);
                push_all("returnType", data.return_type.as_slice());
            }
            ElementData::Parameter(data) => {
                push_all("stereotypes", &data.stereotypes);
                push_all("type", data.type_ref.as_slice());
            }
            ElementData::Link(data) => {
                push_all("end1", data.end1.reference.as_slice());
                push_all("end2", data.end2.reference.as_slice());
            }
            ElementData::Actor(data) => push_all("stereotypes", &data.stereotypes),
            ElementData::Container
            | ElementData::Stereotype(_)
            | ElementData::DataType(_)
            | ElementData::Tag(_)
            | ElementData::Diagram(_) => {}
        }
        out
    }

    /// Visit every reference mutably; used by the fix-up pass.
    pub fn for_each_reference_mut(&mut self, mut visit: impl FnMut(&'static str, &mut Reference)) {
        match &mut self.data {
            ElementData::Class(data) => {
                data.stereotypes.iter_mut().for_each(|r| visit("stereotypes", r));
            }
            ElementData::Attribute(data) => {
                data.stereotypes.iter_mut().for_each(|r| visit("stereotypes", r));
                data.type_ref.iter_mut().for_each(|r| visit("type", r));
            }
            ElementData::Operation(data) => {
                data.stereotypes.iter_mut().for_each(|r| visit("stereotypes", r));
                data.return_type.iter_mut().for_each(|r| visit("returnType", r));
            }
            ElementData::Parameter(data) => {
                data.stereotypes.iter_mut().for_each(|r| visit("stereotypes", r));
                data.type_ref.iter_mut().for_each(|r| visit("type", r));
            }
            ElementData::Link(data) => {
                data.end1.reference.iter_mut().for_each(|r| visit("end1", r));
                data.end2.reference.iter_mut().for_each(|r| visit("end2", r));
            }
            ElementData::Actor(data) => {
                data.stereotypes.iter_mut().for_each(|r| visit("stereotypes", r));
            }
            ElementData::Container
            | ElementData::Stereotype(_)
            | ElementData::DataType(_)
            | ElementData::Tag(_)
            | ElementData::Diagram(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_element_has_kind_defaults() {
        let attribute = Element::new(ElementKind::Attribute, "username");
        assert_eq!(attribute.kind(), ElementKind::Attribute);
        assert!(attribute.parent().is_none());
        assert!(attribute.children().is_empty());
        match &attribute.data {
            ElementData::Attribute(data) => {
                assert_eq!(data.multiplicity, "1");
                assert!(data.type_ref.is_none());
            }
            other => panic!("unexpected data {other:?}"),
        }

        let generalization = Element::new(ElementKind::Generalization, "");
        assert!(matches!(generalization.data, ElementData::Link(_)));
    }

    #[test]
    fn test_references_lists_every_reference_field() {
        let stereotype = ElementId::new();
        let string_type = ElementId::new();
        let mut attribute = Element::new(ElementKind::Attribute, "username");
        if let ElementData::Attribute(data) = &mut attribute.data {
            data.stereotypes.push(Reference::Unresolved(stereotype));
            data.type_ref = Some(Reference::Unresolved(string_type));
        }

        let refs = attribute.references();
        assert_eq!(
            refs,
            vec![
                ("stereotypes", Reference::Unresolved(stereotype)),
                ("type", Reference::Unresolved(string_type)),
            ]
        );

        attribute.for_each_reference_mut(|_, r| *r = Reference::Resolved(r.target()));
        assert!(attribute.references().iter().all(|(_, r)| r.is_resolved()));
    }

    #[test]
    fn test_tags_only_on_tagged_kinds() {
        assert!(Element::new(ElementKind::Class, "A").tags().is_some());
        assert!(Element::new(ElementKind::Stereotype, "S").tags().is_some());
        assert!(Element::new(ElementKind::Package, "P").tags().is_none());
        assert!(Element::new(ElementKind::Tag, "t").tags().is_none());
    }
}
