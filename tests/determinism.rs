#[path = "common/mod.rs"]
mod common;

use std::collections::HashSet;

use allelic_bias::genomics::{InMemorySource, Site, SiteRegistry};
use allelic_bias::{AlleleImbalanceAnalysis, AnalysisConfig, SortOrder};
use common::add_reads;

fn sites() -> SiteRegistry {
    (0..40u64)
        .map(|idx| {
            let chrom = format!("chr{}", idx % 4 + 1);
            Site::new(chrom, 1_000 + idx * 10, format!("rs{idx}"), b'C', b'T')
        })
        .collect()
}

fn sources() -> Vec<InMemorySource> {
    (0..3usize)
        .map(|replicate| {
            let mut source = InMemorySource::new(format!("rep{replicate}"));
            for idx in 0..40u64 {
                let chrom = format!("chr{}", idx % 4 + 1);
                let position = 1_000 + idx * 10;
                let idx = idx as usize;
                add_reads(&mut source, &chrom, position, b'C', 2 + (idx + replicate) % 5);
                add_reads(&mut source, &chrom, position, b'T', (idx * 3 + replicate) % 4);
                add_reads(&mut source, &chrom, position, b'G', idx % 7 / 5);
            }
            source
        })
        .collect()
}

#[test]
fn report_is_identical_across_runs_and_thread_counts() {
    let mut fingerprints = HashSet::new();
    for threads in [1, 2, 4, 0] {
        for order in [SortOrder::Significance, SortOrder::Position] {
            let config = AnalysisConfig::default()
                .with_threads(threads)
                .with_sort_order(order);
            let analysis = AlleleImbalanceAnalysis::new(config).expect("valid configuration");
            let outcome = analysis.run(sites(), &sources()).expect("analysis succeeds");
            fingerprints.insert((order, outcome.report.fingerprint()));
        }
    }

    assert_eq!(fingerprints.len(), 2, "outputs diverged across runs");
}

#[test]
fn source_order_does_not_change_counts() {
    let analysis = AlleleImbalanceAnalysis::new(AnalysisConfig::default().with_min_reads(5))
        .expect("valid configuration");
    let forward = analysis.run(sites(), &sources()).expect("analysis succeeds");
    let mut reversed_sources = sources();
    reversed_sources.reverse();
    let reversed = analysis
        .run(sites(), &reversed_sources)
        .expect("analysis succeeds");

    assert_eq!(forward.report.render(), reversed.report.render());
}
