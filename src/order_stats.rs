//! Best-of-k transform: distribution of the maximum of k i.i.d. attempts.
//!
//! For independent attempts with CDF F, the maximum has CDF `F_max(x) = F(x)^k`.
//! The PMF is recovered by differencing consecutive `F_max` values in ascending
//! score order; the lowest score keeps its own `F_max`.

use crate::constants::CDF_CLAMP_EPSILON;
use crate::distribution::Distribution;
use crate::error::{DecathlonError, Result};

/// PMF of the best of `k` attempts, given the CDF of one attempt as ascending
/// (score, F(score)) pairs.
pub fn best_of_k(cdf: &[(i32, f64)], k: u32) -> Result<Distribution> {
    if k == 0 {
        return Err(DecathlonError::InvalidConfig(
            "best-of-k needs at least one attempt".to_string(),
        ));
    }
    if cdf.windows(2).any(|w| w[0].0 >= w[1].0) {
        return Err(DecathlonError::InvalidConfig(
            "CDF scores must be strictly ascending".to_string(),
        ));
    }

    let exponent = k as i32;
    let mut pmf = Distribution::new();
    let mut prev = 0.0;
    for &(score, f) in cdf {
        let f = if (f - 1.0).abs() < CDF_CLAMP_EPSILON { 1.0 } else { f };
        let f_max = f.powi(exponent);
        pmf.add_mass(score, f_max - prev);
        prev = f_max;
    }
    Ok(pmf)
}

/// [`best_of_k`] applied to a PMF.
pub fn best_of_k_distribution(attempt: &Distribution, k: u32) -> Result<Distribution> {
    best_of_k(&attempt.cdf(), k)
}
