use std::sync::Arc;

/// Raw read observation handed over by an alignment source.
///
/// Sequence and qualities are shared so that pooling the same read into
/// several site windows does not copy the underlying buffers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadObservation {
    /// 0-based leftmost reference coordinate of the alignment.
    pub start: u64,
    /// Full read sequence as uppercase ASCII.
    pub sequence: Arc<[u8]>,
    /// Phred qualities of the aligned part of the read (soft clips excluded).
    pub qualities: Arc<[u8]>,
    /// Edit distance to the reference (`NM` tag), if the aligner recorded one.
    pub mismatches: Option<u32>,
}

impl ReadObservation {
    /// Construct a new read observation.
    pub fn new(
        start: u64,
        sequence: impl Into<Arc<[u8]>>,
        qualities: impl Into<Arc<[u8]>>,
        mismatches: Option<u32>,
    ) -> Self {
        Self {
            start,
            sequence: sequence.into(),
            qualities: qualities.into(),
            mismatches,
        }
    }

    /// Read length inferred from the sequence.
    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    /// Whether the read carries no bases.
    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// Offset into the read of a 0-based reference position, if the read reaches it.
    pub fn offset_of(&self, position: u64) -> Option<usize> {
        let offset = usize::try_from(position.checked_sub(self.start)?).ok()?;
        (offset < self.len()).then_some(offset)
    }

    /// Base at the provided read offset.
    pub fn base_at(&self, offset: usize) -> Option<u8> {
        self.sequence.get(offset).copied()
    }

    /// Quality score at the provided read offset.
    pub fn quality_at(&self, offset: usize) -> Option<u8> {
        self.qualities.get(offset).copied()
    }
}

/// Single-base allele as written in site files and reports.
pub(crate) fn base_char(base: u8) -> char {
    base as char
}

/// Parse a one-character allele; anything else is not a single-nucleotide allele.
pub(crate) fn single_base(allele: &str) -> Option<u8> {
    match allele.as_bytes() {
        [base] => Some(base.to_ascii_uppercase()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_of_respects_read_bounds() {
        let read = ReadObservation::new(100, b"ACGT".to_vec(), vec![30; 4], Some(0));
        assert_eq!(read.offset_of(100), Some(0));
        assert_eq!(read.offset_of(103), Some(3));
        assert_eq!(read.offset_of(104), None);
        assert_eq!(read.offset_of(99), None);
    }

    #[test]
    fn single_base_rejects_multi_nucleotide_alleles() {
        assert_eq!(single_base("a"), Some(b'A'));
        assert_eq!(single_base("AT"), None);
        assert_eq!(single_base(""), None);
    }
}
