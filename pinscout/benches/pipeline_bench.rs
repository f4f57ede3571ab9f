use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pinscout::prelude::*;
use pinscout::{PackageSpec, Pin, PinLayoutEngine};
use std::path::PathBuf;

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn bench_detect(c: &mut Criterion) {
    let document = Document::load(&fixture_path("documents/ne555.json")).unwrap();

    c.bench_function("detect_pages", |b| {
        b.iter(|| PinScoutCore::detect(black_box(&document)));
    });
}

fn bench_stitch(c: &mut Criterion) {
    let document = Document::load(&fixture_path("documents/split_table.json")).unwrap();
    let options = PipelineOptions::default();
    let candidates = PinScoutCore::detect(&document);

    c.bench_function("stitch_bundle", |b| {
        b.iter(|| PinScoutCore::stitch(black_box(&candidates), black_box(&document), &options));
    });
}

fn bench_layout(c: &mut Criterion) {
    let engine = PinLayoutEngine::new();
    let pins: Vec<Pin> = (1..=100).map(|n| Pin::new(n, format!("P{}", n))).collect();
    let package = PackageSpec::new(PackageFamily::Tqfp, 100);

    c.bench_function("layout_tqfp100", |b| {
        b.iter(|| engine.layout(black_box(&pins), black_box(&package)));
    });
}

criterion_group!(benches, bench_detect, bench_stitch, bench_layout);
criterion_main!(benches);
