use crate::{ElementId, ElementKind};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Unknown element kind: {0}")]
    UnknownKind(String),
    #[error("Invalid fields for {kind}: {reason}")]
    InvalidFields { kind: ElementKind, reason: String },
    #[error("{kind} has no property `{key}`")]
    InvalidProperty { kind: ElementKind, key: String },
    #[error("{parent_kind} {parent} cannot contain {child_kind}")]
    ContainmentViolation {
        parent: ElementId,
        parent_kind: ElementKind,
        child_kind: ElementKind,
    },
    #[error("Unresolved reference to {0}")]
    UnresolvedReference(ElementId),
    #[error("Element not found: {0}")]
    MissingTarget(ElementId),
    #[error("Element id already registered: {0}")]
    DuplicateId(ElementId),
    #[error("Moving {element} under {target} would create a cycle")]
    CycleDetected {
        element: ElementId,
        target: ElementId,
    },
    #[error("{element} is already owned by {owner}")]
    AlreadyOwned { element: ElementId, owner: ElementId },
    #[error("The project root cannot be detached")]
    RootImmovable,
}
