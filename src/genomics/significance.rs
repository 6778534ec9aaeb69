//! Per-site allelic imbalance testing.
//!
//! Every test is run against an anchor base: the reference when it was
//! observed, otherwise the most frequent non-alternate base. Sites without a
//! usable anchor, or with a single observed base, are flagged and left
//! untested.

use tracing::trace;

use crate::genomics::statistics::binomial_test;
use crate::genomics::types::base_char;
use crate::genomics::{QualityFlag, Site};

/// Placeholder for an unavailable `<base>:<count>` summary.
pub const MISSING_REFERENCE: &str = ".:.";
/// Placeholder for an unavailable `<base>:<count>:<pvalue>` summary.
pub const MISSING_ALLELE: &str = ".:.:.";

/// Base all tests at a site are run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Anchor {
    /// Anchor base.
    pub base: u8,
    /// Reads showing the anchor base.
    pub count: u32,
}

/// Render a p-value the way it appears in reports.
pub fn format_pvalue(pvalue: Option<f64>) -> String {
    match pvalue {
        Some(value) => format!("{value:?}"),
        None => ".".to_string(),
    }
}

/// Test a site whose alleles have been counted and fill its report fields.
pub fn test_site(site: &mut Site) {
    if !site.has_sufficient_coverage {
        site.report_reference = MISSING_REFERENCE.to_string();
        site.report_alternate = MISSING_ALLELE.to_string();
        site.report_other = MISSING_ALLELE.to_string();
        site.flag(QualityFlag::InsufficientTotalReads);
        return;
    }

    let anchor = resolve_anchor(site);

    if anchor.base == site.reference && anchor.count == 0 {
        report_without_anchor(site);
        return;
    }

    if site.allele_counts.len() <= 1 {
        site.report_reference = MISSING_REFERENCE.to_string();
        site.report_alternate = MISSING_ALLELE.to_string();
        site.flags.clear();
        site.flag(QualityFlag::InsufficientAlleles);
    } else {
        test_alleles(site, anchor);
    }

    finalize_reports(site, anchor);
}

/// Pick the anchor base and write the reference summary.
///
/// Substitutes are chosen by highest count, ties going to the lowest base.
fn resolve_anchor(site: &mut Site) -> Anchor {
    let reference_count = site.count_of(site.reference);
    if reference_count > 0 {
        site.report_reference = format!("{}:{}", base_char(site.reference), reference_count);
        return Anchor {
            base: site.reference,
            count: reference_count,
        };
    }

    let substitute = site
        .allele_counts
        .iter()
        .filter(|&(&base, allele)| base != site.alternate && allele.count > 0)
        .fold(None, |best: Option<(u8, u32)>, (&base, allele)| match best {
            Some((_, best_count)) if best_count >= allele.count => best,
            _ => Some((base, allele.count)),
        });

    match substitute {
        Some((base, count)) => {
            site.report_reference = format!(
                "{}:0;{}:{}",
                base_char(site.reference),
                base_char(base),
                count
            );
            site.flag(QualityFlag::NoRefReads { substitute: base });
            Anchor { base, count }
        }
        None => {
            site.report_reference = format!("{}:0", base_char(site.reference));
            Anchor {
                base: site.reference,
                count: 0,
            }
        }
    }
}

fn report_without_anchor(site: &mut Site) {
    let alternate_count = site.count_of(site.alternate);
    if alternate_count > 0 {
        site.report_alternate = format!("{}:{}:.", base_char(site.alternate), alternate_count);
        site.flag(QualityFlag::OnlyAltReads);
    } else {
        site.report_alternate = MISSING_ALLELE.to_string();
        site.flag(QualityFlag::NoRefNorAltReads);
    }
    site.report_other = MISSING_ALLELE.to_string();
}

fn test_alleles(site: &mut Site, anchor: Anchor) {
    for (&base, allele) in site.allele_counts.iter_mut() {
        if base == anchor.base {
            continue;
        }
        let trials = u64::from(allele.count) + u64::from(anchor.count);
        let pvalue = binomial_test(u64::from(allele.count), trials);
        trace!(site = %site.id, base = %base_char(base), count = allele.count, pvalue, "tested base");
        allele.pvalue = Some(pvalue);
    }
}

fn finalize_reports(site: &mut Site, anchor: Anchor) {
    match site.alternate_allele().copied() {
        Some(allele) => {
            site.report_alternate = format!(
                "{}:{}:{}",
                base_char(site.alternate),
                allele.count,
                format_pvalue(allele.pvalue)
            );
        }
        None => {
            site.report_alternate = format!("{}:0:.", base_char(site.alternate));
            site.flag(QualityFlag::NoAltReads);
        }
    }

    site.report_other = site
        .allele_counts
        .iter()
        .filter(|&(&base, _)| base != anchor.base && base != site.alternate)
        .map(|(&base, allele)| {
            format!(
                "{}:{}:{};",
                base_char(base),
                allele.count,
                format_pvalue(allele.pvalue)
            )
        })
        .collect();
}
