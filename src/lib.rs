//! # Allele-specific accessibility testing
//!
//! This library tests, per heterozygous single-nucleotide variant, whether
//! DNase-seq/ATAC-seq reads covering the site favour one allele.
//!
//! ## Pipeline
//!
//! 1. **Site registry**: one record per variant, keyed by id
//! 2. **Read filter**: mismatch budget and base-quality floor per read
//! 3. **Allele counter**: coverage gate, then per-base tallies
//! 4. **Significance tester**: anchor resolution and exact binomial tests
//! 5. **FDR corrector**: Benjamini-Hochberg over clean alternate-allele tests
//! 6. **Report assembler**: sorted, tab-separated output
//!
//! Stages 2-4 run in parallel across alignment sources and sites; FDR
//! correction waits for every site to finish.
//!
//! ## Usage Example
//!
//! ```ignore
//! use allelic_bias::{AlleleImbalanceAnalysis, AnalysisConfig};
//! use allelic_bias::genomics::{read_sites, BamSource, SiteFileConfig};
//!
//! let sites = read_sites("snps.bed", &SiteFileConfig::default())?;
//! let analysis = AlleleImbalanceAnalysis::new(AnalysisConfig::default())?;
//! let outcome = analysis.run(sites, &[BamSource::new("sample.bam")])?;
//! outcome.report.write(&mut std::io::stdout())?;
//! ```

#![warn(missing_docs, missing_debug_implementations)]
#![allow(clippy::new_without_default)]

pub mod genomics;

pub use genomics::{
    AlignmentSource, BamSource, FdrPool, ReadFilter, Report, Site, SiteRegistry, SortOrder,
};

use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, info};

use genomics::{pileup_source, test_site, AlignmentError, AlleleCounter, SiteFileError};

/// Thresholds and output options for a run.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    /// Reads with more mismatches (`NM`) than this are dropped.
    pub max_mismatches_per_read: u32,

    /// Minimum base quality at the site position for a read to count.
    pub min_quality_at_site: u8,

    /// Minimum pooled reads for a site to be tested.
    pub min_reads_per_site: usize,

    /// Report row order.
    pub sort_by: SortOrder,

    /// Worker threads; 0 uses the global rayon pool.
    pub threads: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_mismatches_per_read: 2,
            min_quality_at_site: 0,
            min_reads_per_site: 10,
            sort_by: SortOrder::Significance,
            threads: 0,
        }
    }
}

impl AnalysisConfig {
    /// Set the per-read mismatch budget.
    pub fn with_max_mismatches(mut self, max_mismatches: u32) -> Self {
        self.max_mismatches_per_read = max_mismatches;
        self
    }

    /// Set the base-quality floor at the site.
    pub fn with_min_quality(mut self, min_quality: u8) -> Self {
        self.min_quality_at_site = min_quality;
        self
    }

    /// Set the per-site coverage floor.
    pub fn with_min_reads(mut self, min_reads: usize) -> Self {
        self.min_reads_per_site = min_reads;
        self
    }

    /// Set the report order.
    pub fn with_sort_order(mut self, sort_by: SortOrder) -> Self {
        self.sort_by = sort_by;
        self
    }

    /// Set the worker thread count.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Reject configurations that cannot produce a meaningful test.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_reads_per_site == 0 {
            return Err(ConfigError::ZeroMinReads);
        }
        Ok(())
    }

    fn read_filter(&self) -> ReadFilter {
        ReadFilter::new(self.max_mismatches_per_read, self.min_quality_at_site)
    }
}

/// Invalid configuration values.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// A site without reads can never be tested.
    #[error("minimum reads per site must be at least 1")]
    ZeroMinReads,
}

/// Errors that can abort a run.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// Site file could not be read.
    #[error(transparent)]
    Sites(#[from] SiteFileError),

    /// Alignment source could not be read.
    #[error(transparent)]
    Alignments(#[from] AlignmentError),

    /// Worker pool could not be started.
    #[error("failed to start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Everything a run produced.
#[derive(Debug)]
pub struct AnalysisOutcome {
    /// Tested sites, reads released.
    pub sites: SiteRegistry,
    /// FDR-corrected alternate-allele tests.
    pub fdr: FdrPool,
    /// Sorted report.
    pub report: Report,
}

/// Main pipeline orchestrator.
#[derive(Debug)]
pub struct AlleleImbalanceAnalysis {
    config: AnalysisConfig,
}

impl AlleleImbalanceAnalysis {
    /// Create a pipeline after validating its configuration.
    pub fn new(config: AnalysisConfig) -> Result<Self, AnalysisError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Configuration in use.
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Run every stage over `sites` with reads from `sources`.
    ///
    /// Output is identical for any thread count and any source order.
    pub fn run<S: AlignmentSource>(
        &self,
        sites: SiteRegistry,
        sources: &[S],
    ) -> Result<AnalysisOutcome, AnalysisError> {
        if self.config.threads == 0 {
            return self.run_stages(sites, sources);
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.threads)
            .build()?;
        pool.install(|| self.run_stages(sites, sources))
    }

    fn run_stages<S: AlignmentSource>(
        &self,
        mut sites: SiteRegistry,
        sources: &[S],
    ) -> Result<AnalysisOutcome, AnalysisError> {
        info!(sites = sites.len(), sources = sources.len(), "collecting reads");
        let filter = self.config.read_filter();
        let pileups = sources
            .par_iter()
            .map(|source| pileup_source(source, &sites, &filter))
            .collect::<Result<Vec<_>, _>>()?;
        for pileup in pileups {
            pileup.pool_into(&mut sites);
        }

        let counter = AlleleCounter::new(self.config.min_reads_per_site);
        sites.par_iter_mut().for_each(|site| {
            counter.count(site);
            test_site(site);
            site.reads = Vec::new();
        });

        let fdr = FdrPool::correct(&sites);
        let report = Report::assemble(&sites, &fdr, self.config.sort_by);

        let summary = report.summary;
        info!(
            total = summary.total,
            queried = summary.queried,
            not_queried = summary.not_queried,
            indels = summary.indels,
            corrected = summary.corrected,
            "analysis complete"
        );
        debug!(fingerprint = %report.fingerprint(), "report fingerprint");

        Ok(AnalysisOutcome { sites, fdr, report })
    }
}
