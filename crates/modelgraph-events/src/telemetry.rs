//! Structured `tracing` records for command runs. A run carries one correlation id from its start
//! record to its outcome, so an execute and the undo that later reverses it can be told apart.

use modelgraph_core::ElementId;
use serde::Serialize;
use std::fmt;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

const TELEMETRY_TARGET: &str = "modelgraph::commands";

/// History operation a run belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunPhase {
    Execute,
    /// Forward effect applied, outcome waits on the rendering surface.
    Confirm,
    Undo,
    Redo,
}

impl RunPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            RunPhase::Execute => "execute",
            RunPhase::Confirm => "confirm",
            RunPhase::Undo => "undo",
            RunPhase::Redo => "redo",
        }
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An in-flight command run. Consumed by [`CommandRun::succeeded`] or [`CommandRun::failed`].
#[derive(Debug)]
pub struct CommandRun {
    correlation_id: Uuid,
    phase: RunPhase,
    command: String,
    started: Instant,
}

impl CommandRun {
    pub fn begin(phase: RunPhase, command: impl Into<String>) -> Self {
        let run = Self {
            correlation_id: Uuid::new_v4(),
            phase,
            command: command.into(),
            started: Instant::now(),
        };
        info!(
            target: TELEMETRY_TARGET,
            command = %run.command,
            phase = %run.phase,
            correlation_id = %run.correlation_id,
            "Command started"
        );
        run
    }

    pub fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    /// Intermediate step of the run, e.g. waiting for a confirmation.
    pub fn note(&self, context: &str) {
        debug!(
            target: TELEMETRY_TARGET,
            command = %self.command,
            phase = %self.phase,
            correlation_id = %self.correlation_id,
            context,
            "Command progress"
        );
    }

    pub fn succeeded(self) {
        info!(
            target: TELEMETRY_TARGET,
            command = %self.command,
            phase = %self.phase,
            correlation_id = %self.correlation_id,
            elapsed_ms = self.started.elapsed().as_millis() as u64,
            "Command succeeded"
        );
    }

    pub fn failed(self, reason: &dyn fmt::Display) {
        error!(
            target: TELEMETRY_TARGET,
            command = %self.command,
            phase = %self.phase,
            correlation_id = %self.correlation_id,
            elapsed_ms = self.started.elapsed().as_millis() as u64,
            error = %reason,
            "Command failed"
        );
    }
}

/// `command` could not find `element`; whether it became a no-op is up to the caller's policy.
pub fn missing_target(command: &str, element: ElementId) {
    warn!(
        target: TELEMETRY_TARGET,
        command,
        %element,
        "Command target missing"
    );
}
