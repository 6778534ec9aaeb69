use std::collections::HashMap;
use std::path::{Path, PathBuf};

use rust_htslib::bam::{self, record::Aux, Read};
use thiserror::Error;
use tracing::{debug, warn};

use crate::genomics::{ReadFilter, ReadObservation, SiteRegistry, SourcePileup};

/// Errors raised while reading alignments.
#[derive(Debug, Error)]
pub enum AlignmentError {
    /// The alignment file or its index could not be opened.
    #[error("failed to open alignments {path}: {source}")]
    Open {
        /// Alignment file path.
        path: PathBuf,
        /// Underlying htslib error.
        source: rust_htslib::errors::Error,
    },
    /// Seeking to a site window failed.
    #[error("failed to fetch {chrom}:{start}-{end} from {source_name}: {source}")]
    Fetch {
        /// Source description.
        source_name: String,
        /// Chromosome label.
        chrom: String,
        /// 0-based window start.
        start: u64,
        /// 0-based exclusive window end.
        end: u64,
        /// Underlying htslib error.
        source: rust_htslib::errors::Error,
    },
    /// A record could not be decoded.
    #[error("failed to read alignment record from {source_name}: {source}")]
    Record {
        /// Source description.
        source_name: String,
        /// Underlying htslib error.
        source: rust_htslib::errors::Error,
    },
}

/// Open handle returning reads overlapping a reference window.
pub trait ReadFetcher {
    /// Reads overlapping the 0-based half-open window `[start, end)` on `chrom`.
    fn fetch(
        &mut self,
        chrom: &str,
        start: u64,
        end: u64,
    ) -> Result<Vec<ReadObservation>, AlignmentError>;
}

/// Alignment input shared across worker threads.
///
/// Each worker opens its own fetcher, so sources can be read concurrently.
pub trait AlignmentSource: Sync {
    /// Human-readable name used in logs and errors.
    fn name(&self) -> String;

    /// Open a fetcher over this source.
    fn open(&self) -> Result<Box<dyn ReadFetcher + '_>, AlignmentError>;
}

/// Fetch and filter every site's reads from one source.
pub fn pileup_source(
    source: &dyn AlignmentSource,
    registry: &SiteRegistry,
    filter: &ReadFilter,
) -> Result<SourcePileup, AlignmentError> {
    let mut fetcher = source.open()?;
    let mut pileup = SourcePileup::with_sites(registry.len());

    for (slot, site) in registry.iter().enumerate() {
        let reads = fetcher.fetch(&site.chrom, site.position, site.position + 1)?;
        pileup.observe(slot, site, reads, filter);
    }

    debug!(
        source = %source.name(),
        fetched = pileup.fetched,
        accepted = pileup.accepted(),
        "collected reads"
    );
    Ok(pileup)
}

/// Indexed BAM file.
#[derive(Debug, Clone)]
pub struct BamSource {
    path: PathBuf,
}

impl BamSource {
    /// Source reading from `path`; the `.bai` index must sit next to it.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Path of the BAM file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AlignmentSource for BamSource {
    fn name(&self) -> String {
        self.path.display().to_string()
    }

    fn open(&self) -> Result<Box<dyn ReadFetcher + '_>, AlignmentError> {
        let reader =
            bam::IndexedReader::from_path(&self.path).map_err(|source| AlignmentError::Open {
                path: self.path.clone(),
                source,
            })?;
        Ok(Box::new(BamFetcher {
            name: self.name(),
            reader,
        }))
    }
}

struct BamFetcher {
    name: String,
    reader: bam::IndexedReader,
}

impl ReadFetcher for BamFetcher {
    fn fetch(
        &mut self,
        chrom: &str,
        start: u64,
        end: u64,
    ) -> Result<Vec<ReadObservation>, AlignmentError> {
        let Some(tid) = self.reader.header().tid(chrom.as_bytes()) else {
            warn!(source = %self.name, chrom, "chromosome missing from alignment header");
            return Ok(Vec::new());
        };

        self.reader
            .fetch((tid, start as i64, end as i64))
            .map_err(|source| AlignmentError::Fetch {
                source_name: self.name.clone(),
                chrom: chrom.to_string(),
                start,
                end,
                source,
            })?;

        let mut reads = Vec::new();
        for record in self.reader.records() {
            let record = record.map_err(|source| AlignmentError::Record {
                source_name: self.name.clone(),
                source,
            })?;
            if record.is_unmapped() || record.pos() < 0 {
                continue;
            }
            let cigar = record.cigar();
            let qualities = aligned_qualities(
                record.qual(),
                cigar.leading_softclips(),
                cigar.trailing_softclips(),
            );
            reads.push(ReadObservation::new(
                record.pos() as u64,
                record.seq().as_bytes(),
                qualities,
                edit_distance(&record),
            ));
        }
        Ok(reads)
    }
}

/// Qualities of the aligned part of a read, soft clips removed.
fn aligned_qualities(qualities: &[u8], leading_clip: i64, trailing_clip: i64) -> Vec<u8> {
    let start = usize::try_from(leading_clip).unwrap_or(0).min(qualities.len());
    let end = qualities
        .len()
        .saturating_sub(usize::try_from(trailing_clip).unwrap_or(0))
        .max(start);
    qualities[start..end].to_vec()
}

/// Value of the `NM` tag, if present and numeric.
fn edit_distance(record: &bam::Record) -> Option<u32> {
    match record.aux(b"NM").ok()? {
        Aux::I8(value) => u32::try_from(value).ok(),
        Aux::U8(value) => Some(u32::from(value)),
        Aux::I16(value) => u32::try_from(value).ok(),
        Aux::U16(value) => Some(u32::from(value)),
        Aux::I32(value) => u32::try_from(value).ok(),
        Aux::U32(value) => Some(value),
        _ => None,
    }
}

/// Reads held in memory, grouped by chromosome.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    name: String,
    reads: HashMap<String, Vec<ReadObservation>>,
}

impl InMemorySource {
    /// Empty source with a display name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reads: HashMap::new(),
        }
    }

    /// Add a read aligned to `chrom`.
    pub fn push(&mut self, chrom: impl Into<String>, read: ReadObservation) {
        self.reads.entry(chrom.into()).or_default().push(read);
    }

    /// Builder form of [`InMemorySource::push`].
    pub fn with_read(mut self, chrom: impl Into<String>, read: ReadObservation) -> Self {
        self.push(chrom, read);
        self
    }
}

impl AlignmentSource for InMemorySource {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn open(&self) -> Result<Box<dyn ReadFetcher + '_>, AlignmentError> {
        Ok(Box::new(InMemoryFetcher { source: self }))
    }
}

struct InMemoryFetcher<'a> {
    source: &'a InMemorySource,
}

impl ReadFetcher for InMemoryFetcher<'_> {
    fn fetch(
        &mut self,
        chrom: &str,
        start: u64,
        end: u64,
    ) -> Result<Vec<ReadObservation>, AlignmentError> {
        let overlapping: Vec<ReadObservation> = self
            .source
            .reads
            .get(chrom)
            .map(|reads| {
                reads
                    .iter()
                    .filter(|read| read.start < end && read.start + read.len() as u64 > start)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(overlapping)
    }
}
