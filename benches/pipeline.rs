//! Pipeline benchmark: CSV text → feature table → padded sequences → AUROC.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use cme_predict::config::SequenceConfig;
use cme_predict::evaluation::RocCurve;
use cme_predict::features::{FeatureTable, PaddedSequenceBuilder, SequenceBuilder};
use cme_predict::model::TimeWindow;

fn make_csv(rows: usize) -> String {
    (0..rows)
        .map(|i| {
            let label = if i % 5 == 0 { "P" } else { "N" };
            let features: Vec<String> = (0..18)
                .map(|f| format!("{:.3}", 0.05 + ((i + f) % 13) as f32 * 0.07))
                .collect();
            format!(
                "{label},2011-02-{:02}T{:02}:00:00Z,{},{},{}",
                1 + (i / 24) % 28,
                i % 24,
                11158 + i / 30,
                377 + i / 30,
                features.join(",")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn bench_table_parse(c: &mut Criterion) {
    let text = make_csv(2_000);
    c.bench_function("table_parse_2000_rows", |b| {
        b.iter(|| FeatureTable::from_reader(black_box(text.as_bytes()), 4))
    });
}

fn bench_sequence_build(c: &mut Criterion) {
    let table = match FeatureTable::from_reader(make_csv(2_000).as_bytes(), 4) {
        Ok(t) => t,
        Err(e) => panic!("fixture: {e}"),
    };
    let builder = PaddedSequenceBuilder::new(&SequenceConfig::default());

    let mut g = c.benchmark_group("sequence_build_2000_rows");
    for n_features in [5, 12, 18] {
        g.bench_function(format!("features_{}", n_features).as_str(), |b| {
            b.iter(|| builder.build(black_box(&table), n_features, TimeWindow::H24))
        });
    }
    g.finish();
}

fn bench_auroc(c: &mut Criterion) {
    let n = 10_000;
    let truth: Vec<u8> = (0..n).map(|i| u8::from(i % 7 == 0)).collect();
    let scores: Vec<f32> = (0..n).map(|i| ((i * 7919) % 1000) as f32 / 1000.0).collect();

    c.bench_function("auroc_10000", |b| {
        b.iter(|| RocCurve::from_scores(black_box(&truth), black_box(&scores)).map(|c| c.auc()))
    });
}

criterion_group!(benches, bench_table_parse, bench_sequence_build, bench_auroc);
criterion_main!(benches);
