use crate::{Command, CommandContext, CommandError};
use modelgraph_core::{ElementId, ElementRecord};
use modelgraph_document::{DereferenceSet, Placement};

/// Remove an element and everything it owns.
#[derive(Debug)]
pub struct RemoveElement {
    target: ElementId,
    removed: Option<(ElementRecord, Placement)>,
    label: Option<String>,
}

impl RemoveElement {
    pub fn new(target: ElementId) -> Self {
        Self {
            target,
            removed: None,
            label: None,
        }
    }

    pub fn target(&self) -> ElementId {
        self.target
    }
}

impl Command for RemoveElement {
    fn execute(&mut self, ctx: &mut CommandContext<'_>) -> Result<(), CommandError> {
        if !ctx.document.contains(self.target) {
            return ctx.missing_target(&self.description(), self.target);
        }
        let snapshot = ctx
            .document
            .serialize_element(self.target, &DereferenceSet::none())?;
        let placement = ctx.document.remove(self.target)?;
        self.label = Some(format!("{} {}", snapshot.kind, snapshot.name));
        self.removed = Some((snapshot, placement));
        ctx.announce_removed(self.target);
        Ok(())
    }

    fn undo(&mut self, ctx: &mut CommandContext<'_>) -> Result<(), CommandError> {
        let Some((snapshot, placement)) = self.removed.take() else {
            return Ok(());
        };
        let parent = snapshot
            .parent
            .map_or(placement.parent, |reference| reference.target());
        if !ctx.document.contains(parent) {
            self.removed = Some((snapshot, placement));
            return ctx.missing_target(&self.description(), parent);
        }

        let id = match ctx.document.instantiate(&snapshot) {
            Ok(id) => id,
            Err(error) => {
                self.removed = Some((snapshot, placement));
                return Err(error.into());
            }
        };
        if let Err(error) = ctx.document.insert_at(parent, id, placement.index) {
            ctx.document.discard(id)?;
            self.removed = Some((snapshot, placement));
            return Err(error.into());
        }
        ctx.announce_created(id);
        Ok(())
    }

    fn description(&self) -> String {
        match &self.label {
            Some(label) => format!("Remove {label}"),
            None => format!("Remove {}", self.target),
        }
    }
}
