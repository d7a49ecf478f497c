//! Weighted outcome enumeration: canonical dice multisets and their probabilities.
//!
//! Rolling n fair dice has 6^n ordered results but only C(n+5, 5) distinct
//! multisets. Every stochastic transition in both events re-expands one of these
//! enumerations, so outcomes are generated as non-decreasing sequences and weighted
//! by their multinomial count:
//!
//!   P(counts) = n! / (c1!·c2!·...·c6!) / 6^n
//!
//! | n | permutations | canonical outcomes |
//! |---|--------------|--------------------|
//! | 0 | 1            | 1 (empty multiset) |
//! | 4 | 1,296        | 126                |
//! | 5 | 7,776        | 252                |
//!
//! [`OutcomeTable`] materialises n = 0..=5 once and is shared by the whole run.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::*;

/// Canonical multiset of dice as a face-count vector: `self.0[f - 1]` dice show face f.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FaceCounts(pub [u8; NUM_FACES]);

impl FaceCounts {
    pub const EMPTY: FaceCounts = FaceCounts([0; NUM_FACES]);

    /// Build from dice values in any order. Returns `None` if a value is outside 1..=6.
    pub fn from_dice(dice: &[u8]) -> Option<Self> {
        let mut counts = [0u8; NUM_FACES];
        for &d in dice {
            if !(1..=NUM_FACES as u8).contains(&d) {
                return None;
            }
            counts[(d - 1) as usize] += 1;
        }
        Some(FaceCounts(counts))
    }

    /// Dice values in non-decreasing order.
    pub fn to_sorted(&self) -> Vec<u8> {
        let mut dice = Vec::with_capacity(self.total());
        for (i, &c) in self.0.iter().enumerate() {
            for _ in 0..c {
                dice.push(i as u8 + 1);
            }
        }
        dice
    }

    /// Number of dice.
    #[inline]
    pub fn total(&self) -> usize {
        self.0.iter().map(|&c| c as usize).sum()
    }

    /// Number of dice showing `face` (1..=6).
    #[inline]
    pub fn count(&self, face: u8) -> u8 {
        self.0[(face - 1) as usize]
    }

    /// Sum of face values.
    pub fn face_sum(&self) -> i32 {
        self.0
            .iter()
            .enumerate()
            .map(|(i, &c)| (i as i32 + 1) * c as i32)
            .sum()
    }

    /// True if `other` is a sub-multiset of `self`.
    pub fn contains(&self, other: &FaceCounts) -> bool {
        self.0.iter().zip(other.0.iter()).all(|(&a, &b)| b <= a)
    }
}

impl fmt::Display for FaceCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.to_sorted())
    }
}

/// One canonical outcome of rolling n dice.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Outcome {
    pub counts: FaceCounts,
    pub prob: f64,
}

/// n! for n = 0..=5.
const FACTORIAL: [u64; MAX_DICE + 1] = [1, 1, 2, 6, 24, 120];

/// Multinomial coefficient: number of orderings of the multiset.
pub fn multinomial(counts: &FaceCounts) -> u64 {
    let n = counts.total();
    counts
        .0
        .iter()
        .fold(FACTORIAL[n], |acc, &c| acc / FACTORIAL[c as usize])
}

/// Enumerate all distinct outcomes of rolling `n` dice (0 ≤ n ≤ 5), in
/// lexicographic order of their sorted dice.
pub fn enumerate_outcomes(n: usize) -> Vec<Outcome> {
    assert!(n <= MAX_DICE, "at most {} dice per roll, got {}", MAX_DICE, n);
    let mut out = Vec::with_capacity(NUM_OUTCOMES[n]);
    let inv_total = 1.0 / POW6[n] as f64;
    let mut counts = FaceCounts::EMPTY;
    extend_non_decreasing(n, 1, &mut counts, inv_total, &mut out);
    out
}

fn extend_non_decreasing(
    left: usize,
    min_face: u8,
    counts: &mut FaceCounts,
    inv_total: f64,
    out: &mut Vec<Outcome>,
) {
    if left == 0 {
        out.push(Outcome {
            counts: *counts,
            prob: multinomial(counts) as f64 * inv_total,
        });
        return;
    }
    for face in min_face..=NUM_FACES as u8 {
        counts.0[(face - 1) as usize] += 1;
        extend_non_decreasing(left - 1, face, counts, inv_total, out);
        counts.0[(face - 1) as usize] -= 1;
    }
}

/// Outcome lists for every dice count 0..=5, built once per run.
pub struct OutcomeTable {
    by_count: Vec<Vec<Outcome>>,
}

impl Default for OutcomeTable {
    fn default() -> Self {
        Self::new()
    }
}

impl OutcomeTable {
    pub fn new() -> Self {
        Self {
            by_count: (0..=MAX_DICE).map(enumerate_outcomes).collect(),
        }
    }

    /// Outcomes of rolling `n` dice.
    #[inline]
    pub fn get(&self, n: usize) -> &[Outcome] {
        &self.by_count[n]
    }
}
