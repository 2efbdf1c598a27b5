//! Undoable edits over a model document.
//!
//! Every edit is a [`Command`] run through a [`CommandHistory`]. Commands address elements by id
//! only and look them up again on every execute and undo, so a redo rebuilds elements with the
//! same ids rather than reviving old instances.

use modelgraph_core::{ElementId, ElementKind, ModelError};
use modelgraph_document::{DereferenceSet, Document, DocumentError};
use modelgraph_events::{
    ChangeBus, ChangeEvent, ElementChanged, ElementRemoved, EventOptions, telemetry,
};
use std::fmt::Debug;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;
use tracing::warn;

pub mod add;
pub mod batch;
pub mod config;
pub mod history;
pub mod naming;
pub mod remove;
pub mod reparent;
pub mod update;

pub use add::AddElement;
pub use batch::Batch;
pub use config::{EngineConfig, MissingTargetPolicy};
pub use history::CommandHistory;
pub use remove::RemoveElement;
pub use reparent::ChangeParent;
pub use update::UpdateProperties;

#[derive(Error, Debug)]
pub enum CommandError {
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error("Element not found: {0}")]
    MissingTarget(ElementId),
    #[error("{kind} cannot be placed under {target} or any of its owners")]
    NoValidOwner { kind: ElementKind, target: ElementId },
    #[error("Nothing to undo")]
    NothingToUndo,
    #[error("Nothing to redo")]
    NothingToRedo,
    #[error("Confirmation rejected: {0}")]
    ConfirmationRejected(String),
}

/// A reversible edit.
pub trait Command: Debug + Send {
    fn execute(&mut self, ctx: &mut CommandContext<'_>) -> Result<(), CommandError>;

    fn undo(&mut self, ctx: &mut CommandContext<'_>) -> Result<(), CommandError>;

    /// Human-readable description
    fn description(&self) -> String;
}

/// Shared counters describing how commands behaved.
#[derive(Debug, Clone, Default)]
pub struct HistoryDiagnostics {
    missing_targets: Arc<AtomicUsize>,
}

impl HistoryDiagnostics {
    /// How many times a command found its target gone.
    pub fn missing_targets(&self) -> usize {
        self.missing_targets.load(Ordering::Relaxed)
    }

    fn record_missing_target(&self) {
        self.missing_targets.fetch_add(1, Ordering::Relaxed);
    }
}

/// What a command runs against: the document, the bus it announces changes on, and the
/// missing-target policy.
pub struct CommandContext<'a> {
    pub document: &'a mut Document,
    pub bus: ChangeBus,
    pub policy: MissingTargetPolicy,
    pub diagnostics: HistoryDiagnostics,
}

impl<'a> CommandContext<'a> {
    pub fn new(document: &'a mut Document, bus: ChangeBus) -> Self {
        Self {
            document,
            bus,
            policy: MissingTargetPolicy::default(),
            diagnostics: HistoryDiagnostics::default(),
        }
    }

    pub fn with_policy(mut self, policy: MissingTargetPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Report that `command` could not find `id`. `Ok` means the caller should skip its effect.
    pub fn missing_target(&self, command: &str, id: ElementId) -> Result<(), CommandError> {
        self.diagnostics.record_missing_target();
        telemetry::missing_target(command, id);
        match self.policy {
            MissingTargetPolicy::Ignore => Ok(()),
            MissingTargetPolicy::Fail => Err(CommandError::MissingTarget(id)),
        }
    }

    pub fn announce_created(&self, id: ElementId) {
        if let Some(node) = self.snapshot(id) {
            self.bus.publish(ChangeEvent::Created(ElementChanged {
                document_id: self.document.id(),
                node,
                options: EventOptions::new(),
            }));
        }
    }

    pub fn announce_updated(&self, id: ElementId) {
        if let Some(node) = self.snapshot(id) {
            self.bus.publish(ChangeEvent::Updated(ElementChanged {
                document_id: self.document.id(),
                node,
                options: EventOptions::new(),
            }));
        }
    }

    pub fn announce_removed(&self, id: ElementId) {
        self.bus.publish(ChangeEvent::Removed(ElementRemoved {
            document_id: self.document.id(),
            node_id: id,
            options: EventOptions::new(),
        }));
    }

    fn snapshot(&self, id: ElementId) -> Option<modelgraph_core::ElementRecord> {
        match self.document.serialize_element(id, &DereferenceSet::none()) {
            Ok(record) => Some(record),
            Err(error) => {
                warn!(element = %id, %error, "Cannot snapshot element for change event");
                None
            }
        }
    }
}
