use std::cmp::Ordering;
use std::fmt;
use std::io::{self, Write};
use std::str::FromStr;

use crate::genomics::significance::format_pvalue;
use crate::genomics::types::base_char;
use crate::genomics::{FdrPool, Site, SiteRegistry};

/// Row ordering of the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortOrder {
    /// Ascending alternate-allele p-value; sites outside the FDR pool last.
    #[default]
    Significance,
    /// Ascending (chromosome, position).
    Position,
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pvalue" | "significance" => Ok(SortOrder::Significance),
            "position" => Ok(SortOrder::Position),
            other => Err(format!(
                "unknown sort order '{other}' (expected pvalue or position)"
            )),
        }
    }
}

/// Sort key for a chromosome label.
///
/// A leading `chr` is stripped; X, Y and M map to 23, 24 and 25. Labels
/// that are not numbers sort after all numbered chromosomes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum ChromosomeKey {
    /// Numbered chromosome.
    Numeric(u64),
    /// Anything else, by label text.
    Named(String),
}

impl ChromosomeKey {
    /// Derive the key for a chromosome label.
    pub fn from_label(label: &str) -> Self {
        let stripped = match label.get(..3) {
            Some(prefix) if prefix.eq_ignore_ascii_case("chr") => &label[3..],
            _ => label,
        };
        match stripped {
            "X" | "x" => ChromosomeKey::Numeric(23),
            "Y" | "y" => ChromosomeKey::Numeric(24),
            "M" | "m" => ChromosomeKey::Numeric(25),
            other => other
                .parse()
                .map(ChromosomeKey::Numeric)
                .unwrap_or_else(|_| ChromosomeKey::Named(other.to_string())),
        }
    }
}

/// Counts printed ahead of the report rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct RunSummary {
    /// Sites in the registry.
    pub total: usize,
    /// Sites whose alternate allele was tested.
    pub queried: usize,
    /// Sites left untested.
    pub not_queried: usize,
    /// Multi-nucleotide sites skipped while loading.
    pub indels: usize,
    /// Sites that entered FDR correction.
    pub corrected: usize,
}

impl RunSummary {
    /// Tally a fully tested registry.
    pub fn from_registry(registry: &SiteRegistry, pool: &FdrPool) -> Self {
        let total = registry.len();
        let not_queried = registry.iter().filter(|site| site.is_not_queried()).count();
        Self {
            total,
            queried: total - not_queried,
            not_queried,
            indels: registry.indels(),
            corrected: pool.len(),
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "# Total SNPs: {}  Queried: {}  Not Queried: {}",
            self.total, self.queried, self.not_queried
        )
    }
}

/// One rendered site.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ReportRow {
    /// Chromosome label.
    pub chrom: String,
    /// 0-based start.
    pub start: u64,
    /// Site identifier.
    pub id: String,
    /// Reference base.
    pub reference: u8,
    /// Alternate base.
    pub alternate: u8,
    /// Alternate p-value, for sites in the FDR pool.
    pub pvalue: Option<f64>,
    /// Benjamini-Hochberg q-value, for sites in the FDR pool.
    pub qvalue: Option<f64>,
    /// `ref_field:alt_field[:other_field]`.
    pub counts: String,
    /// Quality comment; empty when clean.
    pub comment: String,
}

impl ReportRow {
    fn from_site(site: &Site, pool: &FdrPool) -> Self {
        let test = pool.get(&site.id);
        let mut counts = format!("{}:{}", site.report_reference, site.report_alternate);
        if !site.report_other.is_empty() {
            counts.push(':');
            counts.push_str(&site.report_other);
        }
        Self {
            chrom: site.chrom.clone(),
            start: site.position,
            id: site.id.clone(),
            reference: site.reference,
            alternate: site.alternate,
            pvalue: test.map(|test| test.pvalue),
            qvalue: test.map(|test| test.qvalue),
            counts,
            comment: site.quality_comment(),
        }
    }

    /// Significance sort key; untested sites count as p = 1.
    fn significance(&self) -> f64 {
        self.pvalue.unwrap_or(1.0)
    }
}

impl fmt::Display for ReportRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let comment = if self.comment.is_empty() {
            "."
        } else {
            self.comment.as_str()
        };
        write!(
            f,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            self.chrom,
            self.start,
            self.start + 1,
            self.id,
            base_char(self.reference),
            base_char(self.alternate),
            format_pvalue(self.pvalue),
            format_pvalue(self.qvalue),
            self.counts,
            comment
        )
    }
}

/// Sorted, rendered result of a run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Report {
    /// Run counts.
    pub summary: RunSummary,
    /// Rows in output order.
    pub rows: Vec<ReportRow>,
}

impl Report {
    /// Build the report from tested sites and their FDR correction.
    ///
    /// Both orders are stable: ties keep input order.
    pub fn assemble(registry: &SiteRegistry, pool: &FdrPool, order: SortOrder) -> Self {
        let mut rows: Vec<ReportRow> = registry
            .iter()
            .map(|site| ReportRow::from_site(site, pool))
            .collect();

        match order {
            SortOrder::Significance => {
                rows.sort_by(|a, b| a.significance().total_cmp(&b.significance()))
            }
            SortOrder::Position => rows.sort_by(compare_position),
        }

        Self {
            summary: RunSummary::from_registry(registry, pool),
            rows,
        }
    }

    /// Write the summary line followed by one tab-separated line per site.
    pub fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writeln!(writer, "{}", self.summary)?;
        for row in &self.rows {
            writeln!(writer, "{row}")?;
        }
        writer.flush()
    }

    /// Render the report into a string (useful for tests and snapshots).
    pub fn render(&self) -> String {
        let mut rendered = format!("{}\n", self.summary);
        for row in &self.rows {
            rendered.push_str(&row.to_string());
            rendered.push('\n');
        }
        rendered
    }

    /// Digest of the rendered report; identical runs share a fingerprint.
    pub fn fingerprint(&self) -> blake3::Hash {
        blake3::hash(self.render().as_bytes())
    }
}

fn compare_position(a: &ReportRow, b: &ReportRow) -> Ordering {
    ChromosomeKey::from_label(&a.chrom)
        .cmp(&ChromosomeKey::from_label(&b.chrom))
        .then(a.start.cmp(&b.start))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("chr1", ChromosomeKey::Numeric(1))]
    #[test_case("Chr12", ChromosomeKey::Numeric(12))]
    #[test_case("CHR3", ChromosomeKey::Numeric(3))]
    #[test_case("7", ChromosomeKey::Numeric(7))]
    #[test_case("chrX", ChromosomeKey::Numeric(23))]
    #[test_case("chrY", ChromosomeKey::Numeric(24))]
    #[test_case("chrM", ChromosomeKey::Numeric(25))]
    #[test_case("chrUn_gl000220", ChromosomeKey::Named("Un_gl000220".to_string()))]
    fn chromosome_keys(label: &str, expected: ChromosomeKey) {
        assert_eq!(ChromosomeKey::from_label(label), expected);
    }

    #[test]
    fn named_chromosomes_sort_last() {
        assert!(ChromosomeKey::from_label("chr25") < ChromosomeKey::from_label("chrMT"));
        assert!(ChromosomeKey::from_label("chr2") < ChromosomeKey::from_label("chr10"));
    }

    #[test]
    fn sort_order_parses_cli_names() {
        assert_eq!("pvalue".parse::<SortOrder>(), Ok(SortOrder::Significance));
        assert_eq!("Position".parse::<SortOrder>(), Ok(SortOrder::Position));
        assert!("depth".parse::<SortOrder>().is_err());
    }

    #[test]
    fn row_renders_placeholders() {
        let mut site = Site::new("chr1", 99, "rs1", b'A', b'G');
        site.report_reference = ".:.".to_string();
        site.report_alternate = ".:.:.".to_string();
        site.report_other = ".:.:.".to_string();
        let row = ReportRow::from_site(&site, &FdrPool::default());
        assert_eq!(
            row.to_string(),
            "chr1\t99\t100\trs1\tA\tG\t.\t.\t.:.:.:.:.:.:.:.\t."
        );
    }
}
