use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use modelgraph_bench::generate_synthetic_document;
use modelgraph_commands::{AddElement, CommandHistory, EngineConfig, UpdateProperties};
use modelgraph_core::ElementKind;
use modelgraph_document::{Document, LoadOptions, PropertyKey, PropertyValue};
use modelgraph_events::ChangeBus;
use std::hint::black_box;

const SIZES: &[usize] = &[100, 1_000];

fn bench_serialize(c: &mut Criterion) {
    let mut group = c.benchmark_group("serialize");
    for &size in SIZES {
        let doc = generate_synthetic_document(size).expect("synthetic document");
        group.bench_with_input(BenchmarkId::from_parameter(size), &doc, |b, doc| {
            b.iter(|| black_box(doc.to_json().expect("serialize")));
        });
    }
    group.finish();
}

fn bench_load(c: &mut Criterion) {
    let mut group = c.benchmark_group("load");
    for &size in SIZES {
        let json = generate_synthetic_document(size)
            .and_then(|doc| Ok(doc.to_json()?))
            .expect("synthetic json");
        group.bench_with_input(BenchmarkId::from_parameter(size), &json, |b, json| {
            b.iter(|| {
                let loaded = Document::from_json(json, LoadOptions::default()).expect("load");
                black_box(loaded.document.len())
            });
        });
    }
    group.finish();
}

fn bench_undo_redo(c: &mut Criterion) {
    c.bench_function("add_rename_undo_redo", |b| {
        let mut doc = generate_synthetic_document(100).expect("synthetic document");
        let model = doc.model().map(|m| m.id()).expect("model");
        let mut history = CommandHistory::new(&EngineConfig::default(), ChangeBus::new());
        let mut ctx = history.context(&mut doc);
        let add = AddElement::new(model, ElementKind::Class, None).expect("add");
        let id = add.element_id();
        history.execute(Box::new(add), &mut ctx).expect("execute add");
        let rename = UpdateProperties::single(id, PropertyKey::Name, PropertyValue::text("Bench"));
        history.execute(Box::new(rename), &mut ctx).expect("execute rename");

        b.iter(|| {
            history.undo(&mut ctx).expect("undo rename");
            history.undo(&mut ctx).expect("undo add");
            history.redo(&mut ctx).expect("redo add");
            history.redo(&mut ctx).expect("redo rename");
        });
    });
}

criterion_group!(benches, bench_serialize, bench_load, bench_undo_redo);
criterion_main!(benches);
