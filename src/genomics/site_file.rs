use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str::FromStr;

use thiserror::Error;
use tracing::{debug, info};

use crate::genomics::types::single_base;
use crate::genomics::{Site, SiteRegistry};

/// Dialect of the variant site file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SiteFormat {
    /// `chrom start end id ref alt ...` with 0-based starts.
    #[default]
    Bed,
    /// VCF body lines; chromosomes are prefixed with `chr`.
    Vcf,
}

impl SiteFormat {
    fn default_columns(self) -> (usize, usize) {
        match self {
            SiteFormat::Bed => (5, 6),
            SiteFormat::Vcf => (4, 5),
        }
    }
}

impl FromStr for SiteFormat {
    type Err = SiteFileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bed" => Ok(SiteFormat::Bed),
            "vcf" => Ok(SiteFormat::Vcf),
            other => Err(SiteFileError::UnknownFormat(other.to_string())),
        }
    }
}

/// Layout of the site file.
#[derive(Debug, Clone, Default)]
pub struct SiteFileConfig {
    /// Input dialect.
    pub format: SiteFormat,
    /// 1-based column holding the reference allele (dialect default if unset).
    pub ref_column: Option<usize>,
    /// 1-based column holding the alternate allele (dialect default if unset).
    pub alt_column: Option<usize>,
}

impl SiteFileConfig {
    /// Configuration for a dialect with its default allele columns.
    pub fn new(format: SiteFormat) -> Self {
        Self {
            format,
            ref_column: None,
            alt_column: None,
        }
    }

    /// Override the reference allele column.
    pub fn with_ref_column(mut self, column: usize) -> Self {
        self.ref_column = Some(column);
        self
    }

    /// Override the alternate allele column.
    pub fn with_alt_column(mut self, column: usize) -> Self {
        self.alt_column = Some(column);
        self
    }

    fn column_indices(&self) -> Result<(usize, usize), SiteFileError> {
        let (default_ref, default_alt) = self.format.default_columns();
        let ref_column = self.ref_column.unwrap_or(default_ref);
        let alt_column = self.alt_column.unwrap_or(default_alt);
        if ref_column == 0 || alt_column == 0 {
            return Err(SiteFileError::ZeroColumn);
        }
        Ok((ref_column - 1, alt_column - 1))
    }
}

/// Errors raised while reading a site file.
#[derive(Debug, Error)]
pub enum SiteFileError {
    /// Underlying I/O failure.
    #[error("failed to read site file: {0}")]
    Io(#[from] std::io::Error),
    /// Unrecognised dialect name.
    #[error("unknown site file format '{0}' (expected bed or vcf)")]
    UnknownFormat(String),
    /// Allele columns are 1-based.
    #[error("allele columns are 1-based; column 0 is invalid")]
    ZeroColumn,
    /// A line has fewer columns than the layout requires.
    #[error("line {line}: expected at least {expected} columns, found {found}")]
    MissingColumn {
        /// 1-based line number.
        line: usize,
        /// Columns the layout needs.
        expected: usize,
        /// Columns present.
        found: usize,
    },
    /// The position column is not an integer.
    #[error("line {line}: invalid position '{value}'")]
    InvalidPosition {
        /// 1-based line number.
        line: usize,
        /// Offending text.
        value: String,
    },
}

/// Read a site file from disk into a registry.
pub fn read_sites<P: AsRef<Path>>(
    path: P,
    config: &SiteFileConfig,
) -> Result<SiteRegistry, SiteFileError> {
    let file = File::open(path.as_ref())?;
    let registry = parse_sites(BufReader::new(file), config)?;
    info!(
        path = %path.as_ref().display(),
        sites = registry.len(),
        indels = registry.indels(),
        "loaded variant sites"
    );
    Ok(registry)
}

/// Parse site records from any buffered reader.
///
/// Comment and header lines (`#`) and blank lines are skipped. Sites whose
/// reference or alternate allele is not exactly one base are counted as
/// indels and left out of the registry.
pub fn parse_sites<R: BufRead>(
    reader: R,
    config: &SiteFileConfig,
) -> Result<SiteRegistry, SiteFileError> {
    let (ref_idx, alt_idx) = config.column_indices()?;
    let min_columns = ref_idx.max(alt_idx).max(3) + 1;
    let mut registry = SiteRegistry::new();

    for (line_idx, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = line_idx + 1;
        if line.starts_with('#') || line.trim().is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < min_columns {
            return Err(SiteFileError::MissingColumn {
                line: line_no,
                expected: min_columns,
                found: fields.len(),
            });
        }

        let (reference, alternate) =
            match (single_base(fields[ref_idx]), single_base(fields[alt_idx])) {
                (Some(reference), Some(alternate)) => (reference, alternate),
                _ => {
                    debug!(line = line_no, "skipping multi-nucleotide site");
                    registry.record_indel();
                    continue;
                }
            };

        let raw_position: u64 =
            fields[1]
                .parse()
                .map_err(|_| SiteFileError::InvalidPosition {
                    line: line_no,
                    value: fields[1].to_string(),
                })?;

        let site = match config.format {
            SiteFormat::Bed => Site::new(fields[0], raw_position, fields[3], reference, alternate),
            SiteFormat::Vcf => {
                let position =
                    raw_position
                        .checked_sub(1)
                        .ok_or_else(|| SiteFileError::InvalidPosition {
                            line: line_no,
                            value: fields[1].to_string(),
                        })?;
                Site::new(
                    format!("chr{}", fields[0]),
                    position,
                    fields[2],
                    reference,
                    alternate,
                )
            }
        };

        if registry.insert(site).is_some() {
            debug!(line = line_no, "site id seen before; keeping the later record");
        }
    }

    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn parses_bed_and_counts_indels() {
        let input = "# header\nchr1\t99\t100\trs1\tA\tG\nchr1\t199\t200\trs2\tAT\tA\nchr2\t5\t6\trs3\tC\tT\n";
        let registry = parse_sites(Cursor::new(input), &SiteFileConfig::new(SiteFormat::Bed))
            .expect("bed parses");

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.indels(), 1);
        let site = registry.get("rs1").expect("rs1 present");
        assert_eq!(site.chrom, "chr1");
        assert_eq!(site.position, 99);
        assert_eq!((site.reference, site.alternate), (b'A', b'G'));
    }

    #[test]
    fn parses_vcf_with_one_based_positions() {
        let input = "##fileformat=VCFv4.2\n#CHROM\tPOS\tID\tREF\tALT\n7\t100\trs7\tG\tC\n";
        let registry = parse_sites(Cursor::new(input), &SiteFileConfig::new(SiteFormat::Vcf))
            .expect("vcf parses");

        let site = registry.get("rs7").expect("rs7 present");
        assert_eq!(site.chrom, "chr7");
        assert_eq!(site.position, 99);
        assert_eq!((site.reference, site.alternate), (b'G', b'C'));
    }

    #[test]
    fn custom_allele_columns() {
        let input = "chr1\t10\t11\trs1\tx\tT\tC\n";
        let config = SiteFileConfig::new(SiteFormat::Bed)
            .with_ref_column(6)
            .with_alt_column(7);
        let registry = parse_sites(Cursor::new(input), &config).expect("parses");
        let site = registry.get("rs1").expect("rs1 present");
        assert_eq!((site.reference, site.alternate), (b'T', b'C'));
    }

    #[test]
    fn format_names_parse_case_insensitively() {
        assert_eq!("VCF".parse::<SiteFormat>().ok(), Some(SiteFormat::Vcf));
        assert!(matches!(
            "gff".parse::<SiteFormat>(),
            Err(SiteFileError::UnknownFormat(_))
        ));
    }

    #[test]
    fn short_lines_are_rejected() {
        let err = parse_sites(
            Cursor::new("chr1\t10\t11\trs1\n"),
            &SiteFileConfig::new(SiteFormat::Bed),
        )
        .unwrap_err();
        assert!(matches!(err, SiteFileError::MissingColumn { line: 1, .. }));
    }

    #[test]
    fn non_numeric_position_is_rejected() {
        let err = parse_sites(
            Cursor::new("chr1\tten\t11\trs1\tA\tG\n"),
            &SiteFileConfig::new(SiteFormat::Bed),
        )
        .unwrap_err();
        assert!(matches!(err, SiteFileError::InvalidPosition { line: 1, .. }));
    }
}
