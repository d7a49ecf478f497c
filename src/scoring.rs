//! Terminal scoring rules for the two events.
//!
//! - 100 Metres: each die scores its face value, except a six which scores −6.
//! - Long Jump: the attempt scores the sum of its frozen jump dice.
//!
//! An attempt that breaks a hard rule (a long-jump run-up over the limit) is a
//! foul. The score a foul receives is a [`FoulRule`] parameter (default 0). A
//! completed jump can also score 0, so a caller that needs the two apart sets a
//! score no completed attempt can reach.

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::dice_mechanics::FaceCounts;

/// Score of one 100 Metres set.
pub fn sprint_set_score(counts: &FaceCounts) -> i32 {
    (1..=5u8)
        .map(|face| face as i32 * counts.count(face) as i32)
        .sum::<i32>()
        + SPRINT_SIX_VALUE * counts.count(6) as i32
}

/// Sum of face values (long-jump run-up and jump).
#[inline]
pub fn face_sum(counts: &FaceCounts) -> i32 {
    counts.face_sum()
}

/// Score folded into the distribution when an outcome fouls.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoulRule {
    pub score: i32,
}

impl Default for FoulRule {
    fn default() -> Self {
        Self { score: FOUL_SCORE }
    }
}
