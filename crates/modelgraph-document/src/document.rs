use crate::cache::ReferenceCache;
use crate::element::Element;
use crate::property::{PropertyKey, PropertyValue};
use modelgraph_core::{DocumentId, ElementId, ElementKind, ModelError, Reference};
use thiserror::Error;

pub const DEFAULT_MODEL_NAME: &str = "Model";
pub const DEFAULT_PROFILE_ROOT_NAME: &str = "Profiles";

/// A model document: a Project root, the elements it transitively owns, and the id cache that
/// indexes them.
#[derive(Debug, Clone)]
pub struct Document {
    id: DocumentId,
    root: ElementId,
    pub(crate) cache: ReferenceCache,
}

/// Structural equality: same elements, ids, ordering and reference targets. The per-session
/// document id is not part of it.
impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.root == other.root && self.cache == other.cache
    }
}

/// A live reference whose target is not in the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DanglingReference {
    pub owner: ElementId,
    pub field: &'static str,
    pub target: ElementId,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Violation {
    #[error("{path}: {parent_kind} cannot contain {child_kind}")]
    Containment {
        path: String,
        parent_kind: ElementKind,
        child_kind: ElementKind,
    },
    #[error("{path}: expected exactly one {kind}, found {found}")]
    Cardinality {
        path: String,
        kind: ElementKind,
        found: usize,
    },
    #[error("{path}: parent link is {recorded:?}, owner is {owner}")]
    ParentLink {
        path: String,
        recorded: Option<ElementId>,
        owner: ElementId,
    },
    #[error("{path}: owned element {child} is not in the document")]
    MissingChild { path: String, child: ElementId },
    #[error("{element} is not reachable from the root")]
    Orphan { element: ElementId },
}

impl Document {
    /// Fresh document: a Project owning an empty Model and an empty profile root.
    pub fn new(name: impl Into<String>) -> Self {
        let mut project = Element::new(ElementKind::Project, name);
        let mut model = Element::new(ElementKind::Model, DEFAULT_MODEL_NAME);
        let mut profiles = Element::new(ElementKind::ProfileRoot, DEFAULT_PROFILE_ROOT_NAME);
        model.parent = Some(project.id());
        profiles.parent = Some(project.id());
        project.children = vec![model.id(), profiles.id()];

        let root = project.id();
        Self::from_parts(root, ReferenceCache::from_elements([project, model, profiles]))
    }

    pub(crate) fn from_parts(root: ElementId, cache: ReferenceCache) -> Self {
        Self {
            id: DocumentId::new(),
            root,
            cache,
        }
    }

    pub fn id(&self) -> DocumentId {
        self.id
    }

    pub fn root_id(&self) -> ElementId {
        self.root
    }

    pub fn root(&self) -> Option<&Element> {
        self.cache.get(self.root)
    }

    /// The Project's Model, when present.
    pub fn model(&self) -> Option<&Element> {
        self.root_child_of_kind(ElementKind::Model)
    }

    pub fn profile_root(&self) -> Option<&Element> {
        self.root_child_of_kind(ElementKind::ProfileRoot)
    }

    fn root_child_of_kind(&self, kind: ElementKind) -> Option<&Element> {
        self.root()?
            .children()
            .iter()
            .filter_map(|id| self.cache.get(*id))
            .find(|element| element.kind() == kind)
    }

    pub fn cache(&self) -> &ReferenceCache {
        &self.cache
    }

    pub fn find_by_id(&self, id: ElementId) -> Option<&Element> {
        self.cache.get(id)
    }

    pub(crate) fn element_mut(&mut self, id: ElementId) -> Option<&mut Element> {
        self.cache.get_mut(id)
    }

    pub(crate) fn require(&self, id: ElementId) -> Result<&Element, ModelError> {
        self.cache.get(id).ok_or(ModelError::MissingTarget(id))
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.cache.contains(id)
    }

    pub fn resolve(&self, reference: &Reference) -> Option<&Element> {
        self.cache.resolve(reference)
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Every live element, in no particular order.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.cache.iter()
    }

    /// `id` and everything it transitively owns, in pre-order.
    pub fn descendants(&self, id: ElementId) -> Vec<ElementId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(element) = self.cache.get(current) else {
                continue;
            };
            out.push(current);
            stack.extend(element.children().iter().rev());
        }
        out
    }

    /// Owners of `id`, nearest first.
    pub fn ancestors(&self, id: ElementId) -> Vec<ElementId> {
        let mut out = Vec::new();
        let mut current = self.cache.get(id).and_then(Element::parent);
        while let Some(owner) = current {
            if out.contains(&owner) {
                break;
            }
            out.push(owner);
            current = self.cache.get(owner).and_then(Element::parent);
        }
        out
    }

    /// True when `ancestor` is `id` or owns it transitively.
    pub fn is_ancestor_or_self(&self, ancestor: ElementId, id: ElementId) -> bool {
        ancestor == id || self.ancestors(id).contains(&ancestor)
    }

    /// Owner chain from the root down to `id`, e.g. `Project/Model/User/username`.
    pub fn path_of(&self, id: ElementId) -> Option<String> {
        let element = self.cache.get(id)?;
        let mut segments = vec![segment(element)];
        for owner in self.ancestors(id) {
            if let Some(owner) = self.cache.get(owner) {
                segments.push(segment(owner));
            }
        }
        segments.reverse();
        Some(segments.join("/"))
    }

    /// First element in pre-order with this kind and name.
    pub fn find_by_name(&self, kind: ElementKind, name: &str) -> Option<&Element> {
        self.descendants(self.root)
            .into_iter()
            .filter_map(|id| self.cache.get(id))
            .find(|element| element.kind() == kind && element.name == name)
    }

    pub fn property(&self, id: ElementId, key: PropertyKey) -> Option<PropertyValue> {
        self.cache.get(id)?.property(key)
    }

    /// Overwrite one property of `id`. Reference values are stored as given; resolving them is
    /// the caller's business.
    pub fn set_property(
        &mut self,
        id: ElementId,
        key: PropertyKey,
        value: PropertyValue,
    ) -> Result<(), ModelError> {
        self.element_mut(id)
            .ok_or(ModelError::MissingTarget(id))?
            .set_property(key, value)
    }

    pub fn dangling_references(&self) -> Vec<DanglingReference> {
        let mut out: Vec<DanglingReference> = self
            .descendants(self.root)
            .into_iter()
            .filter_map(|id| self.cache.get(id))
            .flat_map(|element| {
                element
                    .references()
                    .into_iter()
                    .filter(|(_, reference)| !self.cache.contains(reference.target()))
                    .map(|(field, reference)| DanglingReference {
                        owner: element.id(),
                        field,
                        target: reference.target(),
                    })
            })
            .collect();
        out.dedup();
        out
    }

    /// Check containment grammar, Project cardinality, and parent/child link consistency.
    pub fn validate(&self) -> Vec<Violation> {
        let mut violations = Vec::new();
        let reachable = self.descendants(self.root);
        let path = |id: ElementId| self.path_of(id).unwrap_or_else(|| id.to_string());

        for &id in &reachable {
            let Some(element) = self.cache.get(id) else {
                continue;
            };
            for &child_id in element.children() {
                let Some(child) = self.cache.get(child_id) else {
                    violations.push(Violation::MissingChild {
                        path: path(id),
                        child: child_id,
                    });
                    continue;
                };
                if child.parent() != Some(id) {
                    violations.push(Violation::ParentLink {
                        path: path(child_id),
                        recorded: child.parent(),
                        owner: id,
                    });
                }
                if !element.kind().allows_child(child.kind()) {
                    violations.push(Violation::Containment {
                        path: path(child_id),
                        parent_kind: element.kind(),
                        child_kind: child.kind(),
                    });
                }
            }
        }

        if let Some(root) = self.root() {
            for kind in [ElementKind::Model, ElementKind::ProfileRoot] {
                let found = root
                    .children()
                    .iter()
                    .filter_map(|id| self.cache.get(*id))
                    .filter(|child| child.kind() == kind)
                    .count();
                if found != 1 {
                    violations.push(Violation::Cardinality {
                        path: segment(root),
                        kind,
                        found,
                    });
                }
            }
        }

        if reachable.len() != self.cache.len() {
            let mut orphans: Vec<ElementId> = self
                .cache
                .iter()
                .map(Element::id)
                .filter(|id| !reachable.contains(id))
                .collect();
            orphans.sort();
            violations.extend(orphans.into_iter().map(|element| Violation::Orphan { element }));
        }

        violations
    }
}

fn segment(element: &Element) -> String {
    if element.name.is_empty() {
        element.kind().tag().to_string()
    } else {
        element.name.clone()
    }
}
