use crate::{Command, CommandContext, CommandError};
use modelgraph_core::{ElementId, ModelError};
use modelgraph_document::{Document, Element, Placement};

/// Move an element to a new owner.
#[derive(Debug)]
pub struct ChangeParent {
    target: ElementId,
    new_parent: ElementId,
    before: Option<ElementId>,
    previous: Option<Placement>,
}

impl ChangeParent {
    pub fn new(target: ElementId, new_parent: ElementId) -> Self {
        Self {
            target,
            new_parent,
            before: None,
            previous: None,
        }
    }

    pub fn before(mut self, sibling: ElementId) -> Self {
        self.before = Some(sibling);
        self
    }

    /// Move `node` as if dropped onto `drop_target`. When `drop_target` cannot own `node`, the
    /// first owner up its chain that can is used instead, and `node` lands just before the chain
    /// member it was dropped through.
    pub fn drop_onto(
        document: &Document,
        node: ElementId,
        drop_target: ElementId,
    ) -> Result<Self, CommandError> {
        let kind = document
            .find_by_id(node)
            .ok_or(CommandError::MissingTarget(node))?
            .kind();
        let target = document
            .find_by_id(drop_target)
            .ok_or(CommandError::MissingTarget(drop_target))?;
        if document.is_ancestor_or_self(node, drop_target) {
            return Err(ModelError::CycleDetected {
                element: node,
                target: drop_target,
            }
            .into());
        }
        if target.kind().allows_child(kind) {
            return Ok(Self::new(node, drop_target));
        }

        let mut member = drop_target;
        while let Some(owner) = document.find_by_id(member).and_then(Element::parent) {
            let allows = document
                .find_by_id(owner)
                .is_some_and(|owner| owner.kind().allows_child(kind));
            if allows {
                return Ok(Self::new(node, owner).before(member));
            }
            member = owner;
        }
        Err(CommandError::NoValidOwner {
            kind,
            target: drop_target,
        })
    }

    pub fn new_parent(&self) -> ElementId {
        self.new_parent
    }

    pub fn before_sibling(&self) -> Option<ElementId> {
        self.before
    }
}

impl Command for ChangeParent {
    fn execute(&mut self, ctx: &mut CommandContext<'_>) -> Result<(), CommandError> {
        for id in [self.target, self.new_parent] {
            if !ctx.document.contains(id) {
                return ctx.missing_target(&self.description(), id);
            }
        }
        let previous = ctx
            .document
            .move_element(self.target, self.new_parent, self.before)?;
        self.previous = Some(previous);
        ctx.announce_updated(self.target);
        Ok(())
    }

    fn undo(&mut self, ctx: &mut CommandContext<'_>) -> Result<(), CommandError> {
        let Some(previous) = self.previous.take() else {
            return Ok(());
        };
        for id in [self.target, previous.parent] {
            if !ctx.document.contains(id) {
                self.previous = Some(previous);
                return ctx.missing_target(&self.description(), id);
            }
        }
        if let Err(error) = ctx
            .document
            .move_to(self.target, previous.parent, previous.index)
        {
            self.previous = Some(previous);
            return Err(error.into());
        }
        ctx.announce_updated(self.target);
        Ok(())
    }

    fn description(&self) -> String {
        format!("Move {} to {}", self.target, self.new_parent)
    }
}
