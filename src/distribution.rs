//! Discrete score distributions and the algebra the solver composes them with.
//!
//! A [`Distribution`] maps an integer final score to its probability mass. The
//! solver builds one per state bottom-up: child distributions are shifted by the
//! points locked in at the transition, scaled by the outcome probability, and
//! accumulated into the parent with [`Distribution::add`].
//!
//! Masses are stored in a `BTreeMap`, so accumulation and moment sums visit keys in
//! a fixed order and repeated runs are bit-identical. Nothing relies on that order
//! for correctness.

use std::collections::btree_map;
use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::constants::{CDF_CLAMP_EPSILON, PERCENTILE_KEYS};
use crate::error::{DecathlonError, Result};

/// Score → probability mass.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Distribution {
    mass: BTreeMap<i32, f64>,
}

impl Distribution {
    pub fn new() -> Self {
        Self::default()
    }

    /// All mass on a single score.
    pub fn point(score: i32) -> Self {
        let mut mass = BTreeMap::new();
        mass.insert(score, 1.0);
        Self { mass }
    }

    /// Build from (score, mass) pairs; repeated scores accumulate.
    pub fn from_pairs<I: IntoIterator<Item = (i32, f64)>>(pairs: I) -> Self {
        let mut dist = Self::new();
        for (score, p) in pairs {
            *dist.mass.entry(score).or_insert(0.0) += p;
        }
        dist
    }

    /// Accumulate `other` scaled by `weight` into `self`. Returns the accumulator.
    pub fn add(&mut self, other: &Distribution, weight: f64) -> &mut Self {
        for (&score, &p) in &other.mass {
            *self.mass.entry(score).or_insert(0.0) += weight * p;
        }
        self
    }

    /// Add `p` to the mass at `score`.
    pub fn add_mass(&mut self, score: i32, p: f64) -> &mut Self {
        *self.mass.entry(score).or_insert(0.0) += p;
        self
    }

    /// New distribution with every mass multiplied by `factor`.
    pub fn scale(&self, factor: f64) -> Distribution {
        Distribution {
            mass: self.mass.iter().map(|(&s, &p)| (s, p * factor)).collect(),
        }
    }

    /// New distribution with every score increased by `delta`.
    pub fn shift(&self, delta: i32) -> Distribution {
        Distribution {
            mass: self.mass.iter().map(|(&s, &p)| (s + delta, p)).collect(),
        }
    }

    /// Mean and standard deviation computed from the mass map.
    pub fn mean_and_sd(&self) -> (f64, f64) {
        let mean: f64 = self.mass.iter().map(|(&s, &p)| s as f64 * p).sum();
        let variance: f64 = self
            .mass
            .iter()
            .map(|(&s, &p)| (s as f64 - mean).powi(2) * p)
            .sum();
        (mean, variance.max(0.0).sqrt())
    }

    pub fn total_mass(&self) -> f64 {
        self.mass.values().sum()
    }

    /// Surface a total mass that departs from 1.0 by more than `tolerance`.
    pub fn check_mass(&self, tolerance: f64, context: &str) -> Result<()> {
        let total = self.total_mass();
        if (total - 1.0).abs() > tolerance || self.mass.values().any(|&p| p < 0.0) {
            return Err(DecathlonError::MassImbalance {
                context: context.to_string(),
                total,
                tolerance,
            });
        }
        Ok(())
    }

    /// Mass at `score` (0 if absent).
    pub fn get(&self, score: i32) -> f64 {
        self.mass.get(&score).copied().unwrap_or(0.0)
    }

    /// Number of scores in the support.
    pub fn len(&self) -> usize {
        self.mass.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mass.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, i32, f64> {
        self.mass.iter()
    }

    /// (score, probability) pairs sorted by score.
    pub fn to_sorted_pmf(&self) -> Vec<(i32, f64)> {
        self.mass.iter().map(|(&s, &p)| (s, p)).collect()
    }

    /// Cumulative (score, F(score)) pairs in ascending score order. A final value
    /// within 1e-12 of 1.0 is snapped to exactly 1.0.
    pub fn cdf(&self) -> Vec<(i32, f64)> {
        let mut acc = 0.0;
        let mut out: Vec<(i32, f64)> = self
            .mass
            .iter()
            .map(|(&s, &p)| {
                acc += p;
                (s, acc)
            })
            .collect();
        if let Some(last) = out.last_mut() {
            if (last.1 - 1.0).abs() < CDF_CLAMP_EPSILON {
                last.1 = 1.0;
            }
        }
        out
    }

    /// Sorted PMF plus exact moments and percentiles.
    pub fn summary(&self) -> DensitySummary {
        let pmf = self.to_sorted_pmf();
        let mean: f64 = pmf.iter().map(|&(s, p)| s as f64 * p).sum();
        let variance: f64 = pmf
            .iter()
            .map(|&(s, p)| (s as f64 - mean).powi(2) * p)
            .sum::<f64>()
            .max(0.0);
        let std_dev = variance.sqrt();

        let mut percentiles = HashMap::new();
        let mut cum_prob = 0.0;
        let mut pct_idx = 0;
        for &(score, prob) in &pmf {
            cum_prob += prob;
            while pct_idx < PERCENTILE_KEYS.len()
                && cum_prob >= PERCENTILE_KEYS[pct_idx] as f64 / 100.0 - CDF_CLAMP_EPSILON
            {
                percentiles.insert(format!("p{}", PERCENTILE_KEYS[pct_idx]), score);
                pct_idx += 1;
            }
        }

        DensitySummary {
            pmf,
            mean,
            variance,
            std_dev,
            percentiles,
        }
    }
}

impl<'a> IntoIterator for &'a Distribution {
    type Item = (&'a i32, &'a f64);
    type IntoIter = btree_map::Iter<'a, i32, f64>;

    fn into_iter(self) -> Self::IntoIter {
        self.mass.iter()
    }
}

/// Exact PMF with summary statistics.
#[derive(Clone, Debug, Serialize)]
pub struct DensitySummary {
    /// (score, probability) pairs, sorted by score.
    pub pmf: Vec<(i32, f64)>,
    pub mean: f64,
    pub variance: f64,
    pub std_dev: f64,
    /// Percentiles: p1, p5, p10, p25, p50, p75, p90, p95, p99.
    pub percentiles: HashMap<String, i32>,
}
