use modelgraph_core::{ElementKind, Reference};
use modelgraph_document::factory::new_record;
use modelgraph_document::{Document, PropertyKey, PropertyValue, TagValue};

/// Synthetic project: `class_count` classes spread over packages of ten, each with a few
/// attributes typed to shared data types and one operation.
pub fn generate_synthetic_document(class_count: usize) -> anyhow::Result<Document> {
    let mut doc = Document::new("Synthetic");
    let model = doc
        .model()
        .map(|m| m.id())
        .ok_or_else(|| anyhow::anyhow!("new document has no model"))?;

    let mut data_types = Vec::new();
    for name in ["String", "Integer", "Boolean"] {
        let id = doc.instantiate(&new_record(ElementKind::DataType, name)?)?;
        doc.add_child(model, id)?;
        doc.set_property(
            id,
            PropertyKey::Tags,
            PropertyValue::Tags(vec![TagValue::new("sql", name.to_lowercase())]),
        )?;
        data_types.push(id);
    }

    let mut package = model;
    for i in 0..class_count {
        if i % 10 == 0 {
            package = doc.instantiate(&new_record(ElementKind::Package, format!("pkg{}", i / 10))?)?;
            doc.add_child(model, package)?;
        }
        let class = doc.instantiate(&new_record(ElementKind::Class, format!("Class{i}"))?)?;
        doc.add_child(package, class)?;
        for (n, data_type) in data_types.iter().enumerate() {
            let attribute = doc.instantiate(&new_record(ElementKind::Attribute, format!("field{n}"))?)?;
            doc.add_child(class, attribute)?;
            doc.set_property(
                attribute,
                PropertyKey::Type,
                PropertyValue::Reference(Some(Reference::Resolved(*data_type))),
            )?;
        }
        let operation = doc.instantiate(&new_record(ElementKind::Operation, "run")?)?;
        doc.add_child(class, operation)?;
    }
    Ok(doc)
}
