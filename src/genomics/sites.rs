use std::collections::BTreeMap;
use std::fmt;

use indexmap::IndexMap;
use rayon::prelude::*;

use crate::genomics::types::base_char;
use crate::genomics::ReadObservation;

/// Observed count of one base at a site, with its imbalance test result.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct AlleleCount {
    /// Number of filtered reads showing this base.
    pub count: u32,
    /// Two-sided binomial p-value against the anchor base, once tested.
    pub pvalue: Option<f64>,
}

/// Reason a site could not be cleanly tested.
///
/// Flags are kept in the order they were raised and rendered to the
/// report's comment column only at output time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum QualityFlag {
    /// Fewer pooled reads than the configured minimum.
    InsufficientTotalReads,
    /// Reference base unobserved; tests were run against `substitute`.
    NoRefReads {
        /// Base used as the test anchor instead of the reference.
        substitute: u8,
    },
    /// Only the alternate base was observed.
    OnlyAltReads,
    /// Neither reference nor alternate (nor any substitute) was observed.
    NoRefNorAltReads,
    /// A single distinct base was observed.
    InsufficientAlleles,
    /// Alternate base unobserved.
    NoAltReads,
}

impl QualityFlag {
    /// Whether this flag means the site's alternate allele was never tested.
    pub fn marks_not_queried(&self) -> bool {
        !matches!(self, QualityFlag::NoRefReads { .. })
    }
}

impl fmt::Display for QualityFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QualityFlag::InsufficientTotalReads => f.write_str("Insufficient_Total_Reads;"),
            QualityFlag::NoRefReads { substitute } => {
                write!(f, "No_Ref_Reads;Calc_rel_to_{};", base_char(*substitute))
            }
            QualityFlag::OnlyAltReads => f.write_str("Only_Alt_Reads;"),
            QualityFlag::NoRefNorAltReads => f.write_str("No_Ref_nor_Alt_Reads;"),
            QualityFlag::InsufficientAlleles => f.write_str("Insufficient_Alleles;"),
            QualityFlag::NoAltReads => f.write_str("No_Alt_Reads;"),
        }
    }
}

/// Single-nucleotide variant site under test.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Site {
    /// Chromosome label as it appears in the alignments.
    pub chrom: String,
    /// 0-based position of the variant.
    pub position: u64,
    /// Site identifier, unique within a registry.
    pub id: String,
    /// Reference base.
    pub reference: u8,
    /// Alternate base.
    pub alternate: u8,
    /// Filtered reads pooled from every alignment source; released after testing.
    #[cfg_attr(feature = "serde", serde(skip))]
    pub reads: Vec<ReadObservation>,
    /// Whether the pooled read count reached the configured minimum.
    pub has_sufficient_coverage: bool,
    /// Per-base counts, keyed and iterated in ascending base order.
    pub allele_counts: BTreeMap<u8, AlleleCount>,
    /// Quality flags raised while testing.
    pub flags: Vec<QualityFlag>,
    /// Reference summary, `<ref>:<count>` or a placeholder.
    pub report_reference: String,
    /// Alternate summary, `<alt>:<count>:<pvalue>` or a placeholder.
    pub report_alternate: String,
    /// Summaries of every other observed base.
    pub report_other: String,
}

impl Site {
    /// Create an untested site.
    pub fn new(
        chrom: impl Into<String>,
        position: u64,
        id: impl Into<String>,
        reference: u8,
        alternate: u8,
    ) -> Self {
        Self {
            chrom: chrom.into(),
            position,
            id: id.into(),
            reference,
            alternate,
            reads: Vec::new(),
            has_sufficient_coverage: false,
            allele_counts: BTreeMap::new(),
            flags: Vec::new(),
            report_reference: String::new(),
            report_alternate: String::new(),
            report_other: String::new(),
        }
    }

    /// Observed count for a base (0 when never seen).
    pub fn count_of(&self, base: u8) -> u32 {
        self.allele_counts.get(&base).map_or(0, |allele| allele.count)
    }

    /// Alternate base entry, if the alternate was observed.
    pub fn alternate_allele(&self) -> Option<&AlleleCount> {
        self.allele_counts.get(&self.alternate)
    }

    /// Comment column text; empty when the site was cleanly tested.
    pub fn quality_comment(&self) -> String {
        self.flags.iter().map(ToString::to_string).collect()
    }

    /// Whether no quality flag was raised.
    pub fn is_clean(&self) -> bool {
        self.flags.is_empty()
    }

    /// Whether the site's alternate allele went untested.
    pub fn is_not_queried(&self) -> bool {
        self.flags.iter().any(QualityFlag::marks_not_queried)
    }

    pub(crate) fn flag(&mut self, flag: QualityFlag) {
        self.flags.push(flag);
    }
}

/// Ordered collection of sites keyed by identifier.
///
/// Insertion order is the input order; a repeated id replaces the earlier
/// record but keeps its slot.
#[derive(Debug, Default, Clone)]
pub struct SiteRegistry {
    sites: IndexMap<String, Site>,
    indels: usize,
}

impl SiteRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a site, returning the record it replaced, if any.
    pub fn insert(&mut self, site: Site) -> Option<Site> {
        self.sites.insert(site.id.clone(), site)
    }

    /// Count a site that was skipped for not being a single-nucleotide variant.
    pub fn record_indel(&mut self) {
        self.indels += 1;
    }

    /// Number of skipped multi-nucleotide sites.
    pub fn indels(&self) -> usize {
        self.indels
    }

    /// Number of registered sites.
    pub fn len(&self) -> usize {
        self.sites.len()
    }

    /// Whether no site was registered.
    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    /// Look up a site by id.
    pub fn get(&self, id: &str) -> Option<&Site> {
        self.sites.get(id)
    }

    /// Sites in input order.
    pub fn iter(&self) -> impl Iterator<Item = &Site> {
        self.sites.values()
    }

    /// Mutable sites in input order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Site> {
        self.sites.values_mut()
    }

    /// Parallel mutable access; sites are independent until FDR correction.
    pub fn par_iter_mut(&mut self) -> impl ParallelIterator<Item = &mut Site> {
        self.sites.par_values_mut()
    }
}

impl FromIterator<Site> for SiteRegistry {
    fn from_iter<I: IntoIterator<Item = Site>>(iter: I) -> Self {
        let mut registry = SiteRegistry::new();
        for site in iter {
            registry.insert(site);
        }
        registry
    }
}
