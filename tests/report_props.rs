use proptest::prelude::*;

use allelic_bias::genomics::{benjamini_hochberg, ChromosomeKey, FdrPool, Report, Site, SiteRegistry};
use allelic_bias::SortOrder;

proptest! {
    #[test]
    fn bh_qvalues_bound_and_preserve_order(
        pvalues in proptest::collection::vec(0.0f64..=1.0, 1..64),
    ) {
        let qvalues = benjamini_hochberg(&pvalues);
        prop_assert_eq!(qvalues.len(), pvalues.len());

        for (p, q) in pvalues.iter().zip(&qvalues) {
            prop_assert!(q >= p, "q-value {} below p-value {}", q, p);
            prop_assert!(*q <= 1.0);
        }
        for i in 0..pvalues.len() {
            for j in 0..pvalues.len() {
                if pvalues[i] <= pvalues[j] {
                    prop_assert!(qvalues[i] <= qvalues[j], "BH must preserve p-value order");
                }
            }
        }
    }

    #[test]
    fn position_sort_is_ordered_and_stable(
        loci in proptest::collection::vec(
            (prop_oneof![
                Just("chr1"), Just("chr2"), Just("chr10"), Just("chrX"),
                Just("chrY"), Just("chrM"), Just("Chr3"), Just("chrUn")
            ], 0u64..20),
            1..48,
        ),
    ) {
        let registry: SiteRegistry = loci
            .iter()
            .enumerate()
            .map(|(idx, (chrom, position))| Site::new(*chrom, *position, format!("{idx}"), b'A', b'G'))
            .collect();
        let report = Report::assemble(&registry, &FdrPool::correct(&registry), SortOrder::Position);

        for pair in report.rows.windows(2) {
            let left = (ChromosomeKey::from_label(&pair[0].chrom), pair[0].start);
            let right = (ChromosomeKey::from_label(&pair[1].chrom), pair[1].start);
            prop_assert!(left <= right, "rows out of order: {:?} > {:?}", left, right);
            if left == right {
                let left_idx: usize = pair[0].id.parse().unwrap();
                let right_idx: usize = pair[1].id.parse().unwrap();
                prop_assert!(left_idx < right_idx, "ties must keep input order");
            }
        }
    }
}
