use std::collections::HashMap;

use tracing::debug;

use crate::genomics::statistics::benjamini_hochberg;
use crate::genomics::{Site, SiteRegistry};

/// Alternate-allele test that entered multiple-testing correction.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ValidTest {
    /// Identifier of the tested site.
    pub site_id: String,
    /// Alternate-allele p-value.
    pub pvalue: f64,
    /// Benjamini-Hochberg adjusted p-value.
    pub qvalue: f64,
}

/// Alternate-allele p-value of a site that may enter the correction pool.
///
/// Requires sufficient coverage, a clean quality comment and an observed,
/// tested alternate allele with a finite p-value.
pub fn eligible_pvalue(site: &Site) -> Option<f64> {
    if !site.has_sufficient_coverage || !site.is_clean() {
        return None;
    }
    let allele = site.alternate_allele()?;
    if allele.count == 0 {
        return None;
    }
    allele.pvalue.filter(|pvalue| pvalue.is_finite())
}

/// Corrected alternate-allele tests, keyed by site id.
#[derive(Debug, Clone, Default)]
pub struct FdrPool {
    tests: Vec<ValidTest>,
    index: HashMap<String, usize>,
}

impl FdrPool {
    /// Collect every eligible site and apply Benjamini-Hochberg across them.
    ///
    /// Must run after every site has been tested.
    pub fn correct(registry: &SiteRegistry) -> Self {
        let candidates: Vec<(&str, f64)> = registry
            .iter()
            .filter_map(|site| eligible_pvalue(site).map(|pvalue| (site.id.as_str(), pvalue)))
            .collect();

        let pvalues: Vec<f64> = candidates.iter().map(|&(_, pvalue)| pvalue).collect();
        let qvalues = benjamini_hochberg(&pvalues);

        let tests: Vec<ValidTest> = candidates
            .into_iter()
            .zip(qvalues)
            .map(|((site_id, pvalue), qvalue)| ValidTest {
                site_id: site_id.to_string(),
                pvalue,
                qvalue,
            })
            .collect();
        let index = tests
            .iter()
            .enumerate()
            .map(|(idx, test)| (test.site_id.clone(), idx))
            .collect();

        debug!(pool = tests.len(), sites = registry.len(), "applied FDR correction");
        Self { tests, index }
    }

    /// Corrected test for a site, if it was in the pool.
    pub fn get(&self, site_id: &str) -> Option<&ValidTest> {
        self.index.get(site_id).map(|&idx| &self.tests[idx])
    }

    /// Pool entries in registry order.
    pub fn tests(&self) -> &[ValidTest] {
        &self.tests
    }

    /// Number of sites in the pool.
    pub fn len(&self) -> usize {
        self.tests.len()
    }

    /// Whether no site was eligible.
    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genomics::{AlleleCount, QualityFlag};

    fn tested_site(id: &str, alt_count: u32, pvalue: Option<f64>) -> Site {
        let mut site = Site::new("chr1", 10, id, b'C', b'T');
        site.has_sufficient_coverage = true;
        site.allele_counts.insert(b'C', AlleleCount { count: 10, pvalue: None });
        site.allele_counts.insert(b'T', AlleleCount { count: alt_count, pvalue });
        site
    }

    #[test]
    fn eligibility_requires_clean_tested_alternate() {
        assert_eq!(eligible_pvalue(&tested_site("a", 2, Some(0.04))), Some(0.04));
        assert_eq!(eligible_pvalue(&tested_site("b", 0, Some(0.04))), None);
        assert_eq!(eligible_pvalue(&tested_site("c", 2, None)), None);
        assert_eq!(eligible_pvalue(&tested_site("d", 2, Some(f64::NAN))), None);

        let mut flagged = tested_site("e", 2, Some(0.04));
        flagged.flag(QualityFlag::NoRefReads { substitute: b'G' });
        assert_eq!(eligible_pvalue(&flagged), None);

        let mut uncovered = tested_site("f", 2, Some(0.04));
        uncovered.has_sufficient_coverage = false;
        assert_eq!(eligible_pvalue(&uncovered), None);
    }

    #[test]
    fn pool_excludes_ineligible_sites() {
        let registry: SiteRegistry = [
            tested_site("rs1", 2, Some(0.01)),
            tested_site("rs2", 0, Some(0.5)),
            tested_site("rs3", 3, Some(0.04)),
        ]
        .into_iter()
        .collect();

        let pool = FdrPool::correct(&registry);
        assert_eq!(pool.len(), 2);
        assert!(pool.get("rs2").is_none());
        let rs1 = pool.get("rs1").expect("rs1 pooled");
        assert!((rs1.qvalue - 0.02).abs() < 1e-12);
        let rs3 = pool.get("rs3").expect("rs3 pooled");
        assert!((rs3.qvalue - 0.04).abs() < 1e-12);
    }
}
