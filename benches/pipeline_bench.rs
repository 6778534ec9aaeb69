//! Performance benchmarks

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use allelic_bias::genomics::{InMemorySource, ReadObservation, Site, SiteRegistry};
use allelic_bias::{AlleleImbalanceAnalysis, AnalysisConfig};

const SITES: u64 = 500;

fn synthetic_sites() -> SiteRegistry {
    (0..SITES)
        .map(|idx| Site::new("chr1", 1_000 + idx * 50, format!("rs{idx}"), b'C', b'T'))
        .collect()
}

fn synthetic_source() -> InMemorySource {
    let mut source = InMemorySource::new("synthetic");
    for idx in 0..SITES {
        let position = 1_000 + idx * 50;
        for read in 0..30u64 {
            let mut sequence = vec![b'A'; 36];
            sequence[10] = if (read + idx) % 3 == 0 { b'T' } else { b'C' };
            source.push(
                "chr1",
                ReadObservation::new(position - 10, sequence, vec![35; 36], Some((read % 4) as u32)),
            );
        }
    }
    source
}

fn benchmark_pipeline(c: &mut Criterion) {
    let source = synthetic_source();
    let analysis =
        AlleleImbalanceAnalysis::new(AnalysisConfig::default()).expect("valid configuration");

    c.bench_function("analyse_500_sites", |b| {
        b.iter(|| {
            let outcome = analysis
                .run(synthetic_sites(), std::slice::from_ref(&source))
                .expect("analysis succeeds");
            black_box(outcome.report.rows.len());
        });
    });
}

criterion_group!(benches, benchmark_pipeline);
criterion_main!(benches);
