use crate::{Command, CommandContext, CommandError};
use tracing::error;

/// Several commands applied as one: in order on execute, in reverse on undo. A failing member
/// rolls back the members that already ran before the error is returned.
#[derive(Debug)]
pub struct Batch {
    description: String,
    commands: Vec<Box<dyn Command>>,
}

impl Batch {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            commands: Vec::new(),
        }
    }

    pub fn push(mut self, command: impl Command + 'static) -> Self {
        self.commands.push(Box::new(command));
        self
    }

    pub fn push_boxed(&mut self, command: Box<dyn Command>) {
        self.commands.push(command);
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl Command for Batch {
    fn execute(&mut self, ctx: &mut CommandContext<'_>) -> Result<(), CommandError> {
        for index in 0..self.commands.len() {
            if let Err(failure) = self.commands[index].execute(ctx) {
                for done in self.commands[..index].iter_mut().rev() {
                    if let Err(rollback) = done.undo(ctx) {
                        error!(command = %done.description(), error = %rollback, "Batch rollback failed");
                    }
                }
                return Err(failure);
            }
        }
        Ok(())
    }

    fn undo(&mut self, ctx: &mut CommandContext<'_>) -> Result<(), CommandError> {
        let count = self.commands.len();
        for index in (0..count).rev() {
            if let Err(failure) = self.commands[index].undo(ctx) {
                for undone in self.commands[index + 1..].iter_mut() {
                    if let Err(rollback) = undone.execute(ctx) {
                        error!(command = %undone.description(), error = %rollback, "Batch rollback failed");
                    }
                }
                return Err(failure);
            }
        }
        Ok(())
    }

    fn description(&self) -> String {
        self.description.clone()
    }
}
