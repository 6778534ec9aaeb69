//! Genomics data structures and per-stage algorithms of the allelic
//! imbalance pipeline.
//!
//! Stages run leaf-first: sites are loaded into a [`SiteRegistry`], reads are
//! filtered and pooled per site, alleles are counted, each site is tested
//! against its anchor base, eligible tests are FDR-corrected and the
//! [`Report`] is assembled.

mod types;
mod sites;
mod site_file;
mod read_filter;
mod pileup;
mod statistics;
mod significance;
mod fdr;
mod report;
mod io;

pub use types::ReadObservation;
pub use sites::{AlleleCount, QualityFlag, Site, SiteRegistry};
pub use site_file::{parse_sites, read_sites, SiteFileConfig, SiteFileError, SiteFormat};
pub use read_filter::ReadFilter;
pub use pileup::{AlleleCounter, SourcePileup};
pub use statistics::{benjamini_hochberg, binomial_test};
pub use significance::{format_pvalue, test_site, Anchor, MISSING_ALLELE, MISSING_REFERENCE};
pub use fdr::{eligible_pvalue, FdrPool, ValidTest};
pub use report::{ChromosomeKey, Report, ReportRow, RunSummary, SortOrder};
pub use io::{
    pileup_source, AlignmentError, AlignmentSource, BamSource, InMemorySource, ReadFetcher,
};
