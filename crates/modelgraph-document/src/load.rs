//! Two-phase load: construct and register every element, then resolve references against the
//! complete cache.

use crate::DocumentError;
use crate::cache::ReferenceCache;
use crate::document::Document;
use crate::factory;
use modelgraph_core::{ElementId, ElementKind, ElementRecord, ModelError, Reference};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadOptions {
    /// Fail the whole load on the first subtree that cannot be built.
    pub strict: bool,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoadIssue {
    #[error("{path}: unknown element kind `{kind}`")]
    UnknownKind { path: String, kind: String },
    #[error("{path}: invalid fields: {reason}")]
    InvalidFields { path: String, reason: String },
    #[error("{path}: {parent_kind} cannot contain {child_kind}")]
    ContainmentViolation {
        path: String,
        parent_kind: ElementKind,
        child_kind: ElementKind,
    },
    #[error("{path}: duplicate element id {id}")]
    DuplicateId { path: String, id: ElementId },
    #[error("{path}: unresolved `{field}` reference to {target}")]
    UnresolvedReference {
        owner: ElementId,
        path: String,
        field: &'static str,
        target: ElementId,
    },
}

impl LoadIssue {
    fn skipped(path: String, error: ModelError) -> Self {
        match error {
            ModelError::UnknownKind(kind) => LoadIssue::UnknownKind { path, kind },
            ModelError::InvalidFields { reason, .. } => LoadIssue::InvalidFields { path, reason },
            ModelError::ContainmentViolation {
                parent_kind,
                child_kind,
                ..
            } => LoadIssue::ContainmentViolation {
                path,
                parent_kind,
                child_kind,
            },
            ModelError::DuplicateId(id) => LoadIssue::DuplicateId { path, id },
            other => LoadIssue::InvalidFields {
                path,
                reason: other.to_string(),
            },
        }
    }

    pub fn path(&self) -> &str {
        match self {
            LoadIssue::UnknownKind { path, .. }
            | LoadIssue::InvalidFields { path, .. }
            | LoadIssue::ContainmentViolation { path, .. }
            | LoadIssue::DuplicateId { path, .. }
            | LoadIssue::UnresolvedReference { path, .. } => path,
        }
    }

    /// True when a whole subtree was left out of the document.
    pub fn is_skipped_subtree(&self) -> bool {
        !matches!(self, LoadIssue::UnresolvedReference { .. })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub issues: Vec<LoadIssue>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn skipped_subtrees(&self) -> usize {
        self.issues.iter().filter(|i| i.is_skipped_subtree()).count()
    }

    pub fn unresolved_references(&self) -> usize {
        self.issues.len() - self.skipped_subtrees()
    }
}

#[derive(Debug)]
pub struct Loaded {
    pub document: Document,
    pub report: LoadReport,
}

struct SubtreeFailure {
    path: String,
    error: ModelError,
}

impl From<SubtreeFailure> for DocumentError {
    fn from(failure: SubtreeFailure) -> Self {
        DocumentError::Subtree {
            path: failure.path,
            source: failure.error,
        }
    }
}

/// Phase one: constructs and registers elements, linking each under its owner.
struct Builder<'a> {
    document: &'a mut Document,
    strict: bool,
    issues: Vec<LoadIssue>,
    created: Vec<ElementId>,
}

impl<'a> Builder<'a> {
    fn new(document: &'a mut Document, strict: bool) -> Self {
        Self {
            document,
            strict,
            issues: Vec::new(),
            created: Vec::new(),
        }
    }

    fn build(&mut self, record: &ElementRecord, path: String) -> Result<ElementId, SubtreeFailure> {
        let element = match factory::construct_record(record) {
            Ok(element) => element,
            Err(error) => return Err(SubtreeFailure { path, error }),
        };
        let id = match self.document.cache.register(element) {
            Ok(id) => id,
            Err(error) => return Err(SubtreeFailure { path, error }),
        };
        self.created.push(id);

        for child in &record.owned_elements {
            let child_path = format!("{path}/{}", label(child));
            match self.build_child(id, child, child_path) {
                Ok(child_id) => self.link(id, child_id),
                Err(failure) if self.strict => return Err(failure),
                Err(failure) => {
                    warn!(path = %failure.path, error = %failure.error, "Skipping element subtree");
                    self.issues.push(LoadIssue::skipped(failure.path, failure.error));
                }
            }
        }
        self.document.apply_ordering(id);
        Ok(id)
    }

    fn build_child(
        &mut self,
        parent: ElementId,
        record: &ElementRecord,
        path: String,
    ) -> Result<ElementId, SubtreeFailure> {
        let kind = match ElementKind::from_tag(&record.kind) {
            Ok(kind) => kind,
            Err(error) => return Err(SubtreeFailure { path, error }),
        };
        if let Err(error) = self.document.check_containment(parent, kind, None) {
            return Err(SubtreeFailure { path, error });
        }
        self.build(record, path)
    }

    fn link(&mut self, parent: ElementId, child: ElementId) {
        if let Some(element) = self.document.element_mut(child) {
            element.parent = Some(parent);
        }
        if let Some(owner) = self.document.element_mut(parent) {
            owner.children.push(child);
        }
    }
}

fn label(record: &ElementRecord) -> String {
    if record.name.is_empty() {
        record.kind.clone()
    } else {
        record.name.clone()
    }
}

impl Document {
    /// Build a document from its persisted form. Subtrees that cannot be built are skipped and
    /// reported unless `options.strict` is set; a bad root always fails.
    pub fn load(record: &ElementRecord, options: LoadOptions) -> Result<Loaded, DocumentError> {
        let kind = ElementKind::from_tag(&record.kind)?;
        if kind != ElementKind::Project {
            return Err(DocumentError::RootNotProject(record.kind.clone()));
        }

        let mut document = Document::from_parts(record.id, ReferenceCache::new());
        let mut builder = Builder::new(&mut document, options.strict);
        builder.build(record, label(record))?;
        let Builder {
            mut issues,
            created,
            ..
        } = builder;

        issues.extend(document.fix_up(&created));
        debug!(
            elements = document.len(),
            issues = issues.len(),
            "Loaded document"
        );
        Ok(Loaded {
            document,
            report: LoadReport { issues },
        })
    }

    pub fn from_json(json: &str, options: LoadOptions) -> Result<Loaded, DocumentError> {
        let record: ElementRecord = serde_json::from_str(json)?;
        Self::load(&record, options)
    }

    pub fn from_value(value: serde_json::Value, options: LoadOptions) -> Result<Loaded, DocumentError> {
        let record: ElementRecord = serde_json::from_value(value)?;
        Self::load(&record, options)
    }

    /// Build the subtree described by `record` (ids preserved) without attaching it, and resolve
    /// its references against the document. References elsewhere that were waiting on one of the
    /// new ids are resolved too. On failure nothing is left registered.
    pub fn instantiate(&mut self, record: &ElementRecord) -> Result<ElementId, DocumentError> {
        let mut builder = Builder::new(self, true);
        let built = builder.build(record, label(record));
        let created = std::mem::take(&mut builder.created);
        match built {
            Ok(id) => {
                let unresolved = self.fix_up(&created);
                let relinked = self.relink(&created, true);
                debug!(
                    element = %id,
                    created = created.len(),
                    unresolved = unresolved.len(),
                    relinked,
                    "Instantiated subtree"
                );
                Ok(id)
            }
            Err(failure) => {
                for id in created {
                    self.cache.evict(id);
                }
                Err(failure.into())
            }
        }
    }

    /// Phase two: mark every unresolved reference of `ids` resolved when its target is cached.
    pub(crate) fn fix_up(&mut self, ids: &[ElementId]) -> Vec<LoadIssue> {
        let mut issues = Vec::new();
        for &id in ids {
            let Some(element) = self.cache.get(id) else {
                continue;
            };
            let pending: Vec<(&'static str, ElementId)> = element
                .references()
                .into_iter()
                .filter(|(_, reference)| !reference.is_resolved())
                .map(|(field, reference)| (field, reference.target()))
                .collect();
            if pending.is_empty() {
                continue;
            }

            let mut known = HashSet::new();
            for (field, target) in pending {
                if self.cache.contains(target) {
                    known.insert(target);
                    continue;
                }
                let path = self.path_of(id).unwrap_or_else(|| id.to_string());
                warn!(%path, field, %target, "Unresolved reference");
                issues.push(LoadIssue::UnresolvedReference {
                    owner: id,
                    path,
                    field,
                    target,
                });
            }

            if let Some(element) = self.element_mut(id) {
                element.for_each_reference_mut(|_, reference| {
                    if let Reference::Unresolved(target) = *reference
                        && known.contains(&target)
                    {
                        *reference = Reference::Resolved(target);
                    }
                });
            }
        }
        issues
    }

    /// Keep live references to `targets` in step with the cache: resolved when the targets have
    /// just been registered (`present`), unresolved when they have just been evicted. Returns how
    /// many elements changed.
    pub(crate) fn relink(&mut self, targets: &[ElementId], present: bool) -> usize {
        let targets: HashSet<ElementId> = targets.iter().copied().collect();
        let stale = |reference: &Reference| {
            reference.is_resolved() != present && targets.contains(&reference.target())
        };
        let waiting: Vec<ElementId> = self
            .cache
            .iter()
            .filter(|element| element.references().iter().any(|(_, r)| stale(r)))
            .map(|element| element.id())
            .collect();

        for &id in &waiting {
            if let Some(element) = self.element_mut(id) {
                element.for_each_reference_mut(|_, reference| {
                    let current = *reference;
                    if stale(&current) {
                        let target = current.target();
                        *reference = if present {
                            Reference::Resolved(target)
                        } else {
                            Reference::Unresolved(target)
                        };
                    }
                });
            }
        }
        waiting.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::ElementData;
    use serde_json::json;

    fn project_json(model_children: serde_json::Value) -> serde_json::Value {
        json!({
            "id": ElementId::new().to_string(),
            "kind": "Project",
            "name": "Shop",
            "ownedElements": [
                {
                    "id": ElementId::new().to_string(),
                    "kind": "UMLModel",
                    "name": "Model",
                    "ownedElements": model_children
                },
                {
                    "id": ElementId::new().to_string(),
                    "kind": "UMLProfileRoot",
                    "name": "Profiles"
                }
            ]
        })
    }

    #[test]
    fn test_forward_reference_resolves() {
        let string_id = ElementId::new();
        let value = project_json(json!([
            {
                "id": ElementId::new().to_string(),
                "kind": "UMLClass",
                "name": "User",
                "ownedElements": [{
                    "id": ElementId::new().to_string(),
                    "kind": "UMLAttribute",
                    "name": "username",
                    "type": { "ref": string_id.to_string() }
                }]
            },
            { "id": string_id.to_string(), "kind": "UMLDataType", "name": "String" }
        ]));

        let Loaded { document, report } = Document::from_value(value, LoadOptions::default()).unwrap();
        assert!(report.is_clean());
        let username = document
            .find_by_name(ElementKind::Attribute, "username")
            .unwrap();
        let ElementData::Attribute(data) = &username.data else {
            panic!("expected attribute data");
        };
        let target = data.type_ref.as_ref().and_then(|r| document.resolve(r));
        assert_eq!(target.map(|t| t.name.as_str()), Some("String"));
    }

    #[test]
    fn test_unknown_kind_skips_only_its_subtree() {
        let value = project_json(json!([
            { "id": ElementId::new().to_string(), "kind": "UMLWidget", "name": "Gadget" },
            { "id": ElementId::new().to_string(), "kind": "UMLClass", "name": "User" }
        ]));

        let Loaded { document, report } = Document::from_value(value, LoadOptions::default()).unwrap();
        assert_eq!(
            report.issues,
            vec![LoadIssue::UnknownKind {
                path: "Shop/Model/Gadget".to_string(),
                kind: "UMLWidget".to_string(),
            }]
        );
        assert_eq!(report.skipped_subtrees(), 1);
        assert!(document.find_by_name(ElementKind::Class, "User").is_some());
        assert_eq!(document.len(), 4);
    }

    #[test]
    fn test_strict_load_fails_on_bad_subtree() {
        let value = project_json(json!([
            { "id": ElementId::new().to_string(), "kind": "UMLAttribute", "name": "loose" }
        ]));
        let error = Document::from_value(value, LoadOptions { strict: true }).unwrap_err();
        match error {
            DocumentError::Subtree { path, source } => {
                assert_eq!(path, "Shop/Model/loose");
                assert!(matches!(source, ModelError::ContainmentViolation { .. }));
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn test_missing_reference_target_is_reported() {
        let ghost = ElementId::new();
        let value = project_json(json!([{
            "id": ElementId::new().to_string(),
            "kind": "UMLClass",
            "name": "User",
            "stereotypes": [{ "$ref": ghost.to_string() }]
        }]));

        let Loaded { document, report } = Document::from_value(value, LoadOptions::default()).unwrap();
        assert_eq!(report.unresolved_references(), 1);
        let user = document.find_by_name(ElementKind::Class, "User").unwrap();
        assert_eq!(user.stereotypes(), &[Reference::Unresolved(ghost)]);
        assert!(document.resolve(&user.stereotypes()[0]).is_none());
    }

    #[test]
    fn test_inlined_reference_reads_only_the_id() {
        let string_id = ElementId::new();
        let value = project_json(json!([
            { "id": string_id.to_string(), "kind": "UMLDataType", "name": "String" },
            {
                "id": ElementId::new().to_string(),
                "kind": "UMLClass",
                "name": "User",
                "ownedElements": [{
                    "id": ElementId::new().to_string(),
                    "kind": "UMLAttribute",
                    "name": "username",
                    "type": { "id": string_id.to_string(), "kind": "UMLDataType", "name": "String" }
                }]
            }
        ]));

        let Loaded { document, report } = Document::from_value(value, LoadOptions::default()).unwrap();
        assert!(report.is_clean());
        assert_eq!(document.len(), 6);
    }

    #[test]
    fn test_duplicate_id_skips_second_subtree() {
        let id = ElementId::new();
        let value = project_json(json!([
            { "id": id.to_string(), "kind": "UMLClass", "name": "A" },
            { "id": id.to_string(), "kind": "UMLClass", "name": "B" }
        ]));
        let Loaded { document, report } = Document::from_value(value, LoadOptions::default()).unwrap();
        assert!(matches!(report.issues[..], [LoadIssue::DuplicateId { .. }]));
        assert_eq!(document.find_by_id(id).map(|e| e.name.as_str()), Some("A"));
    }

    #[test]
    fn test_root_must_be_project() {
        let value = json!({ "id": ElementId::new().to_string(), "kind": "UMLModel", "name": "M" });
        assert!(matches!(
            Document::from_value(value, LoadOptions::default()),
            Err(DocumentError::RootNotProject(_))
        ));
    }

    #[test]
    fn test_instantiate_failure_leaves_document_unchanged() {
        let mut document = Document::new("Shop");
        let before = document.clone();
        let mut class = ElementRecord::new(ElementId::new(), "UMLClass", "User");
        class
            .owned_elements
            .push(ElementRecord::new(ElementId::new(), "UMLPackage", "bad"));

        assert!(document.instantiate(&class).is_err());
        assert_eq!(document, before);
    }

    #[test]
    fn test_instantiate_resolves_against_document() {
        let mut document = Document::new("Shop");
        let stereotype = ElementRecord::new(ElementId::new(), "UMLStereotype", "entity");
        let stereotype_id = document.instantiate(&stereotype).unwrap();

        let mut class = ElementRecord::new(ElementId::new(), "UMLClass", "User");
        class
            .fields
            .insert("stereotypes".into(), json!([{ "ref": stereotype_id.to_string() }]));
        let class_id = document.instantiate(&class).unwrap();

        let class = document.find_by_id(class_id).unwrap();
        assert!(class.parent().is_none());
        assert_eq!(class.stereotypes(), &[Reference::Resolved(stereotype_id)]);
    }

    #[test]
    fn test_reference_waiting_on_later_instantiate_resolves() {
        let mut document = Document::new("Shop");
        let string_id = ElementId::new();
        let mut attribute = ElementRecord::new(ElementId::new(), "UMLAttribute", "username");
        attribute
            .fields
            .insert("type".into(), json!({ "ref": string_id.to_string() }));
        let mut class = ElementRecord::new(ElementId::new(), "UMLClass", "User");
        class.owned_elements.push(attribute.clone());
        document.instantiate(&class).unwrap();

        let waiting = document.find_by_id(attribute.id).unwrap();
        assert_eq!(waiting.references(), vec![("type", Reference::Unresolved(string_id))]);
        assert!(document.resolve(&Reference::Unresolved(string_id)).is_none());

        let string = ElementRecord::new(string_id, "UMLDataType", "String");
        document.instantiate(&string).unwrap();

        let relinked = document.find_by_id(attribute.id).unwrap();
        let (_, reference) = relinked.references()[0];
        assert_eq!(reference, Reference::Resolved(string_id));
        assert_eq!(document.resolve(&reference).map(|e| e.name.as_str()), Some("String"));
    }
}
