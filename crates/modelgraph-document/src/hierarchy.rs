//! Ownership edits: attach, detach, remove and move elements within a document.

use crate::document::Document;
use modelgraph_core::{ElementId, ElementKind, ModelError};
use tracing::debug;

/// Where an element sits in its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub parent: ElementId,
    pub index: usize,
}

#[derive(Debug, Clone, Copy)]
enum Position {
    First,
    Last,
    Before(ElementId),
    Index(usize),
}

impl Document {
    /// Append `child` to `parent`.
    pub fn add_child(&mut self, parent: ElementId, child: ElementId) -> Result<(), ModelError> {
        self.attach(parent, child, Position::Last)
    }

    pub fn insert_first(&mut self, parent: ElementId, child: ElementId) -> Result<(), ModelError> {
        self.attach(parent, child, Position::First)
    }

    /// Insert `child` immediately before `existing`, which must already be owned by `parent`.
    pub fn insert_before(
        &mut self,
        parent: ElementId,
        child: ElementId,
        existing: ElementId,
    ) -> Result<(), ModelError> {
        self.attach(parent, child, Position::Before(existing))
    }

    /// Insert `child` at `index` (clamped to the end).
    pub fn insert_at(
        &mut self,
        parent: ElementId,
        child: ElementId,
        index: usize,
    ) -> Result<(), ModelError> {
        self.attach(parent, child, Position::Index(index))
    }

    /// Detach `child` from `parent` and drop its whole subtree from the document.
    pub fn remove_child(
        &mut self,
        parent: ElementId,
        child: ElementId,
    ) -> Result<Placement, ModelError> {
        if self.require(child)?.parent() != Some(parent) {
            return Err(ModelError::MissingTarget(child));
        }
        self.remove(child)
    }

    /// Detach `id` from its owner and drop its whole subtree from the document.
    pub fn remove(&mut self, id: ElementId) -> Result<Placement, ModelError> {
        let placement = self.detach(id)?;
        let evicted = self.evict_subtree(id);
        debug!(element = %id, parent = %placement.parent, evicted, "Removed subtree");
        Ok(placement)
    }

    /// Drop an element that was instantiated but never attached, with its subtree.
    pub fn discard(&mut self, id: ElementId) -> Result<usize, ModelError> {
        if let Some(owner) = self.require(id)?.parent() {
            return Err(ModelError::AlreadyOwned { element: id, owner });
        }
        if id == self.root_id() {
            return Err(ModelError::RootImmovable);
        }
        Ok(self.evict_subtree(id))
    }

    /// Move `id` under `new_parent`, before `before` when given, otherwise last. Returns where
    /// the element used to be.
    pub fn move_element(
        &mut self,
        id: ElementId,
        new_parent: ElementId,
        before: Option<ElementId>,
    ) -> Result<Placement, ModelError> {
        if let Some(sibling) = before
            && (sibling == id || self.require(sibling)?.parent() != Some(new_parent))
        {
            return Err(ModelError::MissingTarget(sibling));
        }
        let position = before.map_or(Position::Last, Position::Before);
        self.relocate(id, new_parent, position)
    }

    /// Move `id` under `new_parent` at `index` (clamped). Returns where the element used to be.
    pub fn move_to(
        &mut self,
        id: ElementId,
        new_parent: ElementId,
        index: usize,
    ) -> Result<Placement, ModelError> {
        self.relocate(id, new_parent, Position::Index(index))
    }

    /// Fails unless `parent` may own one more element of `child_kind`. `moving` is an element
    /// already counted among the parent's children that is about to be re-inserted.
    pub fn check_containment(
        &self,
        parent: ElementId,
        child_kind: ElementKind,
        moving: Option<ElementId>,
    ) -> Result<(), ModelError> {
        let owner = self.require(parent)?;
        let violation = ModelError::ContainmentViolation {
            parent,
            parent_kind: owner.kind(),
            child_kind,
        };
        if !owner.kind().allows_child(child_kind) {
            return Err(violation);
        }
        if let Some(limit) = owner.kind().child_limit(child_kind) {
            let present = owner
                .children()
                .iter()
                .filter(|id| Some(**id) != moving)
                .filter_map(|id| self.cache.get(*id))
                .filter(|child| child.kind() == child_kind)
                .count();
            if present >= limit {
                return Err(violation);
            }
        }
        Ok(())
    }

    fn relocate(
        &mut self,
        id: ElementId,
        new_parent: ElementId,
        position: Position,
    ) -> Result<Placement, ModelError> {
        if id == self.root_id() {
            return Err(ModelError::RootImmovable);
        }
        let kind = self.require(id)?.kind();
        if self.is_ancestor_or_self(id, new_parent) {
            return Err(ModelError::CycleDetected {
                element: id,
                target: new_parent,
            });
        }
        self.check_containment(new_parent, kind, Some(id))?;

        let old = self.detach(id)?;
        if let Err(error) = self.attach(new_parent, id, position) {
            self.attach(old.parent, id, Position::Index(old.index))?;
            return Err(error);
        }
        debug!(element = %id, from = %old.parent, to = %new_parent, "Moved element");
        Ok(old)
    }

    fn attach(
        &mut self,
        parent: ElementId,
        child: ElementId,
        position: Position,
    ) -> Result<(), ModelError> {
        let child_element = self.require(child)?;
        if let Some(owner) = child_element.parent() {
            return Err(ModelError::AlreadyOwned {
                element: child,
                owner,
            });
        }
        let kind = child_element.kind();
        self.check_containment(parent, kind, None)?;
        if self.is_ancestor_or_self(child, parent) {
            return Err(ModelError::CycleDetected {
                element: child,
                target: parent,
            });
        }

        let owner = self
            .element_mut(parent)
            .ok_or(ModelError::MissingTarget(parent))?;
        let index = match position {
            Position::First => 0,
            Position::Last => owner.children.len(),
            Position::Index(index) => index.min(owner.children.len()),
            Position::Before(existing) => owner
                .children
                .iter()
                .position(|id| *id == existing)
                .ok_or(ModelError::MissingTarget(existing))?,
        };
        owner.children.insert(index, child);

        if let Some(element) = self.element_mut(child) {
            element.parent = Some(parent);
        }
        self.apply_ordering(parent);
        Ok(())
    }

    /// Unlink `id` from its owner, keeping it registered.
    pub(crate) fn detach(&mut self, id: ElementId) -> Result<Placement, ModelError> {
        if id == self.root_id() {
            return Err(ModelError::RootImmovable);
        }
        let element = self.element_mut(id).ok_or(ModelError::MissingTarget(id))?;
        let parent = element.parent.take().ok_or(ModelError::MissingTarget(id))?;
        let owner = self
            .element_mut(parent)
            .ok_or(ModelError::MissingTarget(parent))?;
        let index = owner
            .children
            .iter()
            .position(|child| *child == id)
            .ok_or(ModelError::MissingTarget(id))?;
        owner.children.remove(index);
        Ok(Placement { parent, index })
    }

    /// Drop `id` and everything it owns from the cache. Returns how many elements went.
    pub(crate) fn evict_subtree(&mut self, id: ElementId) -> usize {
        let ids = self.descendants(id);
        for id in &ids {
            self.cache.evict(*id);
        }
        self.relink(&ids, false);
        ids.len()
    }

    /// Classes keep attributes ahead of operations; order within each group is preserved.
    pub(crate) fn apply_ordering(&mut self, parent: ElementId) {
        let Some(owner) = self.cache.get(parent) else {
            return;
        };
        let owner_kind = owner.kind();
        if !owner_kind.reorders_children() {
            return;
        }
        let mut ranked: Vec<(u8, ElementId)> = owner
            .children()
            .iter()
            .map(|id| {
                let rank = self
                    .cache
                    .get(*id)
                    .map_or(u8::MAX, |child| owner_kind.child_rank(child.kind()));
                (rank, *id)
            })
            .collect();
        ranked.sort_by_key(|(rank, _)| *rank);
        if let Some(owner) = self.element_mut(parent) {
            owner.children = ranked.into_iter().map(|(_, id)| id).collect();
        }
    }
}
