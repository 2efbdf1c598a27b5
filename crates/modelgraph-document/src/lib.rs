//! In-memory model document: typed elements owned in a tree, cross-referenced by id.

use modelgraph_core::ModelError;
use thiserror::Error;

pub mod cache;
pub mod document;
pub mod element;
pub mod factory;
pub mod hierarchy;
pub mod load;
pub mod property;
pub mod serialize;

pub use cache::ReferenceCache;
pub use document::{DanglingReference, Document, Violation};
pub use element::{
    AggregationKind, Element, ElementData, LinkEnd, ParameterDirection, TagValue, Visibility,
};
pub use hierarchy::Placement;
pub use load::{LoadIssue, LoadOptions, LoadReport, Loaded};
pub use property::{PropertyKey, PropertyValue};
pub use serialize::{CLASS_NAME_HINT, DereferenceSet};

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Document root must be a Project, found {0}")]
    RootNotProject(String),
    #[error("Failed to load subtree at {path}: {source}")]
    Subtree {
        path: String,
        #[source]
        source: ModelError,
    },
}
