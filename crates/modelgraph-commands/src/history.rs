use crate::config::{EngineConfig, MissingTargetPolicy};
use crate::{Command, CommandContext, CommandError, HistoryDiagnostics};
use modelgraph_document::Document;
use modelgraph_events::telemetry::{CommandRun, RunPhase};
use modelgraph_events::{ChangeBus, ChangeEvent, HistoryDirection, UndoRedoChanged};
use std::fmt::Display;
use tracing::debug;

/// Manages command history for undo/redo
pub struct CommandHistory {
    undo_stack: Vec<Box<dyn Command>>,
    redo_stack: Vec<Box<dyn Command>>,
    max_depth: usize,
    policy: MissingTargetPolicy,
    bus: ChangeBus,
    diagnostics: HistoryDiagnostics,
}

impl CommandHistory {
    pub fn new(config: &EngineConfig, bus: ChangeBus) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_depth: config.max_undo_depth,
            policy: config.missing_target,
            bus,
            diagnostics: HistoryDiagnostics::default(),
        }
    }

    /// Context for running commands of this history against `document`.
    pub fn context<'a>(&self, document: &'a mut Document) -> CommandContext<'a> {
        CommandContext {
            document,
            bus: self.bus.clone(),
            policy: self.policy,
            diagnostics: self.diagnostics.clone(),
        }
    }

    pub fn bus(&self) -> &ChangeBus {
        &self.bus
    }

    pub fn diagnostics(&self) -> &HistoryDiagnostics {
        &self.diagnostics
    }

    /// Execute a command and add it to the history. A failed command is not recorded.
    pub fn execute(
        &mut self,
        mut cmd: Box<dyn Command>,
        ctx: &mut CommandContext<'_>,
    ) -> Result<(), CommandError> {
        let run = CommandRun::begin(RunPhase::Execute, cmd.description());
        match cmd.execute(ctx) {
            Ok(()) => {
                run.succeeded();
                self.record(cmd);
                Ok(())
            }
            Err(error) => {
                run.failed(&error);
                Err(error)
            }
        }
    }

    /// Execute `cmd`, then wait for `confirmation` before recording it. A rejected confirmation
    /// undoes the command and nothing is recorded.
    pub async fn execute_confirmed<F, T, E>(
        &mut self,
        mut cmd: Box<dyn Command>,
        ctx: &mut CommandContext<'_>,
        confirmation: F,
    ) -> Result<T, CommandError>
    where
        F: Future<Output = Result<T, E>>,
        E: Display,
    {
        let run = CommandRun::begin(RunPhase::Confirm, cmd.description());
        if let Err(error) = cmd.execute(ctx) {
            run.failed(&error);
            return Err(error);
        }
        run.note("awaiting confirmation");

        match confirmation.await {
            Ok(value) => {
                run.succeeded();
                self.record(cmd);
                Ok(value)
            }
            Err(rejection) => {
                let reason = rejection.to_string();
                run.failed(&reason);
                cmd.undo(ctx)?;
                Err(CommandError::ConfirmationRejected(reason))
            }
        }
    }

    /// Undo the last command
    pub fn undo(&mut self, ctx: &mut CommandContext<'_>) -> Result<(), CommandError> {
        let Some(mut cmd) = self.undo_stack.pop() else {
            return Err(CommandError::NothingToUndo);
        };
        let run = CommandRun::begin(RunPhase::Undo, cmd.description());
        if let Err(error) = cmd.undo(ctx) {
            run.failed(&error);
            self.undo_stack.push(cmd);
            return Err(error);
        }
        run.succeeded();
        let description = cmd.description();
        self.redo_stack.push(cmd);
        self.notify_change(ctx, HistoryDirection::Undo, description);
        Ok(())
    }

    /// Redo the last undone command
    pub fn redo(&mut self, ctx: &mut CommandContext<'_>) -> Result<(), CommandError> {
        let Some(mut cmd) = self.redo_stack.pop() else {
            return Err(CommandError::NothingToRedo);
        };
        let run = CommandRun::begin(RunPhase::Redo, cmd.description());
        if let Err(error) = cmd.execute(ctx) {
            run.failed(&error);
            self.redo_stack.push(cmd);
            return Err(error);
        }
        run.succeeded();
        let description = cmd.description();
        self.undo_stack.push(cmd);
        self.notify_change(ctx, HistoryDirection::Redo, description);
        Ok(())
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_description(&self) -> Option<String> {
        self.undo_stack.last().map(|c| c.description())
    }

    pub fn redo_description(&self) -> Option<String> {
        self.redo_stack.last().map(|c| c.description())
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    fn record(&mut self, cmd: Box<dyn Command>) {
        // Clear redo stack on new command
        self.redo_stack.clear();
        self.undo_stack.push(cmd);

        // Enforce max depth
        while self.undo_stack.len() > self.max_depth {
            let dropped = self.undo_stack.remove(0);
            debug!(command = %dropped.description(), "Dropped oldest undo entry");
        }
    }

    fn notify_change(
        &self,
        ctx: &CommandContext<'_>,
        direction: HistoryDirection,
        description: String,
    ) {
        self.bus.publish(ChangeEvent::UndoRedo(UndoRedoChanged {
            document_id: ctx.document.id(),
            direction,
            description,
            can_undo: self.can_undo(),
            can_redo: self.can_redo(),
            undo_description: self.undo_description(),
            redo_description: self.redo_description(),
        }));
    }
}
