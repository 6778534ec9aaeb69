use crate::genomics::{ReadObservation, Site};

/// Per-read acceptance test applied before reads are pooled at a site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadFilter {
    /// Reads with more mismatches than this are rejected.
    pub max_mismatches: u32,
    /// Reads whose base quality at the site is below this are rejected.
    pub min_quality_at_site: u8,
}

impl ReadFilter {
    /// Construct a filter from its two thresholds.
    pub fn new(max_mismatches: u32, min_quality_at_site: u8) -> Self {
        Self {
            max_mismatches,
            min_quality_at_site,
        }
    }

    /// Whether `read` may contribute to `site`.
    ///
    /// Reads without a recorded mismatch count, or that do not reach the
    /// site position, are rejected.
    pub fn accepts(&self, read: &ReadObservation, site: &Site) -> bool {
        match read.mismatches {
            Some(mismatches) if mismatches <= self.max_mismatches => {}
            _ => return false,
        }

        read.offset_of(site.position)
            .and_then(|offset| read.quality_at(offset))
            .is_some_and(|quality| quality >= self.min_quality_at_site)
    }
}
