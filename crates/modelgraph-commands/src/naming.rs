use modelgraph_core::{ElementId, ElementKind};
use modelgraph_document::Document;
use std::collections::HashSet;

/// Name for a new `kind` child of `parent`: the kind's base name suffixed with the smallest
/// positive integer no sibling already uses with that base (`class1`, `class2`, ...).
pub fn unique_child_name(document: &Document, parent: ElementId, kind: ElementKind) -> String {
    let base = kind.base_name();
    let used: HashSet<u64> = document
        .find_by_id(parent)
        .map(|owner| owner.children())
        .unwrap_or_default()
        .iter()
        .filter_map(|id| document.find_by_id(*id))
        .filter_map(|sibling| numeric_suffix(&sibling.name, &base))
        .collect();

    let mut n = 1;
    while used.contains(&n) {
        n += 1;
    }
    format!("{base}{n}")
}

fn numeric_suffix(name: &str, base: &str) -> Option<u64> {
    let digits = name.strip_prefix(base)?;
    if digits.is_empty() || digits.starts_with('0') || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}
