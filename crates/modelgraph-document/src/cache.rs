use crate::element::Element;
use modelgraph_core::{ElementId, ModelError, Reference};
use std::collections::HashMap;

/// Per-document `id -> element` index.
///
/// Every element is registered the moment it is constructed, before its owner links it in, so a
/// reference to it can be resolved as soon as the construction pass is over. The cache is the
/// element arena itself: owners and references hold ids into it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceCache {
    elements: HashMap<ElementId, Element>,
}

impl ReferenceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_elements(elements: impl IntoIterator<Item = Element>) -> Self {
        Self {
            elements: elements
                .into_iter()
                .map(|element| (element.id(), element))
                .collect(),
        }
    }

    pub fn register(&mut self, element: Element) -> Result<ElementId, ModelError> {
        let id = element.id();
        if self.elements.contains_key(&id) {
            return Err(ModelError::DuplicateId(id));
        }
        self.elements.insert(id, element);
        Ok(id)
    }

    pub fn get(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: ElementId) -> Option<&mut Element> {
        self.elements.get_mut(&id)
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.elements.contains_key(&id)
    }

    pub(crate) fn evict(&mut self, id: ElementId) -> Option<Element> {
        self.elements.remove(&id)
    }

    /// Follow a reference; `None` when it is unresolved or its target is gone.
    pub fn resolve(&self, reference: &Reference) -> Option<&Element> {
        match reference {
            Reference::Resolved(id) => self.elements.get(id),
            Reference::Unresolved(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Element> {
        self.elements.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modelgraph_core::ElementKind;

    #[test]
    fn test_register_and_resolve() {
        let mut cache = ReferenceCache::new();
        let string_type = Element::new(ElementKind::DataType, "String");
        let id = cache.register(string_type).unwrap();

        assert!(cache.contains(id));
        assert_eq!(
            cache.resolve(&Reference::Resolved(id)).map(|e| e.name.as_str()),
            Some("String")
        );
        assert!(cache.resolve(&Reference::Unresolved(id)).is_none());
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let mut cache = ReferenceCache::new();
        let id = ElementId::new();
        cache
            .register(Element::with_id(id, ElementKind::Class, "A"))
            .unwrap();
        assert_eq!(
            cache.register(Element::with_id(id, ElementKind::Class, "B")),
            Err(ModelError::DuplicateId(id))
        );
    }

    #[test]
    fn test_evicted_target_dangles() {
        let mut cache = ReferenceCache::new();
        let id = cache.register(Element::new(ElementKind::Class, "A")).unwrap();
        cache.evict(id);
        assert!(cache.resolve(&Reference::Resolved(id)).is_none());
        assert!(cache.is_empty());
    }
}
