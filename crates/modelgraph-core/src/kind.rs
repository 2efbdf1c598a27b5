use crate::ModelError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Prefix carried by every model-element kind tag in the persisted form.
pub const TYPE_PREFIX: &str = "UML";

/// Closed set of element variants.
///
/// The persisted tag of each variant is stable (`"Project"`, `"UMLClass"`, ...); an unknown tag is
/// rejected with [`ModelError::UnknownKind`] instead of falling back to a default variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum ElementKind {
    Project,
    ProfileRoot,
    Profile,
    Package,
    Model,
    Class,
    Attribute,
    Operation,
    Parameter,
    Association,
    Dependency,
    Generalization,
    Stereotype,
    Tag,
    DataType,
    Actor,
    Diagram,
}

const PACKAGE_CHILDREN: &[ElementKind] = &[
    ElementKind::Class,
    ElementKind::Package,
    ElementKind::Actor,
    ElementKind::Stereotype,
    ElementKind::DataType,
    ElementKind::Tag,
    ElementKind::Association,
    ElementKind::Dependency,
    ElementKind::Generalization,
    ElementKind::Diagram,
];

impl ElementKind {
    pub const ALL: [ElementKind; 17] = [
        ElementKind::Project,
        ElementKind::ProfileRoot,
        ElementKind::Profile,
        ElementKind::Package,
        ElementKind::Model,
        ElementKind::Class,
        ElementKind::Attribute,
        ElementKind::Operation,
        ElementKind::Parameter,
        ElementKind::Association,
        ElementKind::Dependency,
        ElementKind::Generalization,
        ElementKind::Stereotype,
        ElementKind::Tag,
        ElementKind::DataType,
        ElementKind::Actor,
        ElementKind::Diagram,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            ElementKind::Project => "Project",
            ElementKind::ProfileRoot => "UMLProfileRoot",
            ElementKind::Profile => "UMLProfile",
            ElementKind::Package => "UMLPackage",
            ElementKind::Model => "UMLModel",
            ElementKind::Class => "UMLClass",
            ElementKind::Attribute => "UMLAttribute",
            ElementKind::Operation => "UMLOperation",
            ElementKind::Parameter => "UMLParameter",
            ElementKind::Association => "UMLAssociation",
            ElementKind::Dependency => "UMLDependency",
            ElementKind::Generalization => "UMLGeneralization",
            ElementKind::Stereotype => "UMLStereotype",
            ElementKind::Tag => "UMLTag",
            ElementKind::DataType => "UMLDataType",
            ElementKind::Actor => "UMLActor",
            ElementKind::Diagram => "UMLDiagram",
        }
    }

    pub fn from_tag(tag: &str) -> Result<Self, ModelError> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.tag() == tag)
            .ok_or_else(|| ModelError::UnknownKind(tag.to_string()))
    }

    /// Containment grammar: the kinds this kind may own.
    pub fn allowed_child_kinds(self) -> &'static [ElementKind] {
        match self {
            ElementKind::Project => &[ElementKind::Model, ElementKind::ProfileRoot],
            ElementKind::ProfileRoot => &[ElementKind::Profile],
            ElementKind::Package | ElementKind::Profile | ElementKind::Model => PACKAGE_CHILDREN,
            ElementKind::Class => &[ElementKind::Attribute, ElementKind::Operation],
            ElementKind::Operation => &[ElementKind::Parameter],
            ElementKind::Attribute
            | ElementKind::Parameter
            | ElementKind::Association
            | ElementKind::Dependency
            | ElementKind::Generalization
            | ElementKind::Stereotype
            | ElementKind::Tag
            | ElementKind::DataType
            | ElementKind::Actor
            | ElementKind::Diagram => &[],
        }
    }

    pub fn allows_child(self, child: ElementKind) -> bool {
        self.allowed_child_kinds().contains(&child)
    }

    /// Upper bound on how many children of `child` kind this kind may own, if any.
    pub fn child_limit(self, child: ElementKind) -> Option<usize> {
        match (self, child) {
            (ElementKind::Project, ElementKind::Model | ElementKind::ProfileRoot) => Some(1),
            _ => None,
        }
    }

    /// Sort rank of a child within an owner of this kind. Only classes reorder their children.
    pub fn child_rank(self, child: ElementKind) -> u8 {
        match (self, child) {
            (ElementKind::Class, ElementKind::Attribute) => 0,
            (ElementKind::Class, ElementKind::Operation) => 1,
            _ => 0,
        }
    }

    pub fn reorders_children(self) -> bool {
        matches!(self, ElementKind::Class)
    }

    pub fn is_link(self) -> bool {
        matches!(
            self,
            ElementKind::Association | ElementKind::Dependency | ElementKind::Generalization
        )
    }

    /// Name stem used when synthesizing a name: the tag without [`TYPE_PREFIX`], lower camel case.
    ///
    /// `UMLClass` → `class`, `UMLDataType` → `dataType`.
    pub fn base_name(self) -> String {
        let tag = self.tag();
        let stem = tag.strip_prefix(TYPE_PREFIX).unwrap_or(tag);
        let mut chars = stem.chars();
        match chars.next() {
            Some(first) => first.to_lowercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for ElementKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_tag(s)
    }
}

impl TryFrom<String> for ElementKind {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_tag(&value)
    }
}

impl From<ElementKind> for &'static str {
    fn from(kind: ElementKind) -> Self {
        kind.tag()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_round_trip_through_from_tag() {
        for kind in ElementKind::ALL {
            assert_eq!(ElementKind::from_tag(kind.tag()), Ok(kind));
        }
    }

    #[test]
    fn test_unknown_tag_is_rejected() {
        assert_eq!(
            ElementKind::from_tag("UMLWidget"),
            Err(ModelError::UnknownKind("UMLWidget".to_string()))
        );
        assert!(serde_json::from_str::<ElementKind>(r#""UMLWidget""#).is_err());
    }

    #[test]
    fn test_package_does_not_allow_attributes() {
        assert!(!ElementKind::Package.allows_child(ElementKind::Attribute));
        assert!(ElementKind::Package.allows_child(ElementKind::Class));
        assert!(ElementKind::Class.allows_child(ElementKind::Attribute));
        assert!(ElementKind::Operation.allows_child(ElementKind::Parameter));
        assert!(ElementKind::Association.allowed_child_kinds().is_empty());
    }

    #[test]
    fn test_project_grammar() {
        assert_eq!(
            ElementKind::Project.allowed_child_kinds(),
            &[ElementKind::Model, ElementKind::ProfileRoot]
        );
        assert_eq!(
            ElementKind::Project.child_limit(ElementKind::Model),
            Some(1)
        );
        assert_eq!(ElementKind::Package.child_limit(ElementKind::Class), None);
    }

    #[test]
    fn test_base_names() {
        assert_eq!(ElementKind::Class.base_name(), "class");
        assert_eq!(ElementKind::DataType.base_name(), "dataType");
        assert_eq!(ElementKind::ProfileRoot.base_name(), "profileRoot");
        assert_eq!(ElementKind::Project.base_name(), "project");
    }

    #[test]
    fn test_class_rank_puts_attributes_first() {
        assert!(
            ElementKind::Class.child_rank(ElementKind::Attribute)
                < ElementKind::Class.child_rank(ElementKind::Operation)
        );
        assert!(ElementKind::Class.reorders_children());
        assert!(!ElementKind::Package.reorders_children());
    }
}
