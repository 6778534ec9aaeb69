use statrs::distribution::{Binomial, DiscreteCDF};

/// Largest trial count evaluated by exact integer summation.
///
/// `C(60, k)` summed over a tail stays below `2^60`, so the tail is exact in
/// `u64` and only rounds once when divided by `2^n`.
const EXACT_TRIALS_LIMIT: u64 = 60;

/// Two-sided exact binomial test with null proportion 0.5.
///
/// With a symmetric null the two-sided p-value is twice the smaller tail,
/// capped at 1.
pub fn binomial_test(successes: u64, trials: u64) -> f64 {
    if trials == 0 {
        return 1.0;
    }
    let successes = successes.min(trials);
    let tail = successes.min(trials - successes);

    let lower_tail = if trials <= EXACT_TRIALS_LIMIT {
        exact_lower_tail(tail, trials)
    } else {
        match Binomial::new(0.5, trials) {
            Ok(distribution) => distribution.cdf(tail),
            Err(_) => return 1.0,
        }
    };

    (2.0 * lower_tail).min(1.0)
}

/// `P(X <= k)` for `X ~ Binomial(n, 0.5)` with `n <= EXACT_TRIALS_LIMIT`.
fn exact_lower_tail(k: u64, n: u64) -> f64 {
    let mut coefficient: u64 = 1;
    let mut sum: u64 = 1;
    for i in 1..=k {
        // C(n, i) = C(n, i - 1) * (n - i + 1) / i, exact at every step.
        coefficient = coefficient * (n - i + 1) / i;
        sum += coefficient;
    }
    sum as f64 / (1u64 << n) as f64
}

/// Benjamini-Hochberg FDR correction.
///
/// Returns q-values (adjusted p-values) in the same order as input.
pub fn benjamini_hochberg(p_values: &[f64]) -> Vec<f64> {
    let n = p_values.len();
    if n == 0 {
        return vec![];
    }

    let mut indexed: Vec<(usize, f64)> = p_values.iter().copied().enumerate().collect();
    indexed.sort_by(|a, b| a.1.total_cmp(&b.1));

    let mut q_values = vec![0.0; n];
    let n_f64 = n as f64;

    let mut cummin = f64::INFINITY;
    for i in (0..n).rev() {
        let (orig_idx, p) = indexed[i];
        let rank = (i + 1) as f64;
        let adjusted = (p * n_f64 / rank).min(1.0);
        cummin = cummin.min(adjusted);
        q_values[orig_idx] = cummin;
    }

    q_values
}
