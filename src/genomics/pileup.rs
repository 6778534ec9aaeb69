use tracing::debug;

use crate::genomics::{AlleleCount, ReadFilter, ReadObservation, Site, SiteRegistry};

/// Filtered reads contributed by one alignment source, one slot per site.
///
/// Slots follow registry order, so pileups from different sources can be
/// built independently and merged afterwards.
#[derive(Debug, Clone, Default)]
pub struct SourcePileup {
    /// Reads accepted per site, in registry order.
    pub reads: Vec<Vec<ReadObservation>>,
    /// Reads fetched before filtering.
    pub fetched: usize,
}

impl SourcePileup {
    /// Empty pileup sized for `sites` sites.
    pub fn with_sites(sites: usize) -> Self {
        Self {
            reads: vec![Vec::new(); sites],
            fetched: 0,
        }
    }

    /// Filter the reads fetched for `site` into slot `slot`.
    pub fn observe<I>(&mut self, slot: usize, site: &Site, reads: I, filter: &ReadFilter)
    where
        I: IntoIterator<Item = ReadObservation>,
    {
        for read in reads {
            self.fetched += 1;
            if filter.accepts(&read, site) {
                self.reads[slot].push(read);
            }
        }
    }

    /// Reads that survived filtering.
    pub fn accepted(&self) -> usize {
        self.reads.iter().map(Vec::len).sum()
    }

    /// Append this source's reads to each site's pool.
    pub fn pool_into(self, registry: &mut SiteRegistry) {
        debug_assert_eq!(self.reads.len(), registry.len());
        for (site, reads) in registry.iter_mut().zip(self.reads) {
            site.reads.extend(reads);
        }
    }
}

/// Gates sites on pooled coverage and tallies the base seen at each site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlleleCounter {
    /// Minimum pooled reads required to test a site.
    pub min_reads: usize,
}

impl AlleleCounter {
    /// Construct a counter with the given coverage floor.
    pub fn new(min_reads: usize) -> Self {
        Self { min_reads }
    }

    /// Count alleles for `site`, returning whether coverage was sufficient.
    ///
    /// Sites below the floor drop their reads uncounted.
    pub fn count(&self, site: &mut Site) -> bool {
        if site.reads.len() < self.min_reads {
            debug!(site = %site.id, reads = site.reads.len(), "insufficient coverage");
            site.has_sufficient_coverage = false;
            site.reads.clear();
            return false;
        }

        site.has_sufficient_coverage = true;
        let position = site.position;
        for read in &site.reads {
            let base = read
                .offset_of(position)
                .and_then(|offset| read.base_at(offset));
            if let Some(base) = base {
                site.allele_counts
                    .entry(base)
                    .or_insert_with(AlleleCount::default)
                    .count += 1;
            }
        }
        true
    }
}
