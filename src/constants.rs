//! Game constants and numerical tolerances.
//!
//! Two events of Knizia's Dice Decathlon are modelled:
//! - **100 Metres**: two sets of [`SPRINT_DICE_PER_SET`] dice sharing
//!   [`SPRINT_REROLLS`] rerolls; sixes score [`SPRINT_SIX_VALUE`].
//! - **Long Jump**: [`LONG_JUMP_DICE`] dice, run-up sum capped at
//!   [`LONG_JUMP_RUNUP_LIMIT`], best of [`LONG_JUMP_ATTEMPTS`] attempts.

/// Faces on a die (1..=6).
pub const NUM_FACES: usize = 6;

/// Largest dice count any roll in either event uses.
pub const MAX_DICE: usize = 5;

/// 6^n for n = 0..=5.
pub const POW6: [u32; MAX_DICE + 1] = [1, 6, 36, 216, 1296, 7776];

/// Number of distinct sorted multisets of n dice: C(n+5, 5) for n = 0..=5.
pub const NUM_OUTCOMES: [usize; MAX_DICE + 1] = [1, 6, 21, 56, 126, 252];

/// Dice in one 100 Metres set.
pub const SPRINT_DICE_PER_SET: usize = 4;

/// Rerolls shared by both 100 Metres sets.
pub const SPRINT_REROLLS: u8 = 5;

/// Score of a six in the 100 Metres.
pub const SPRINT_SIX_VALUE: i32 = -6;

/// Dice available to one long-jump attempt.
pub const LONG_JUMP_DICE: usize = 5;

/// Maximum legal frozen run-up sum.
pub const LONG_JUMP_RUNUP_LIMIT: u8 = 8;

/// Attempts in the long-jump event (the best one counts).
pub const LONG_JUMP_ATTEMPTS: u32 = 3;

/// Score assigned to an attempt that fouls.
pub const FOUL_SCORE: i32 = 0;

/// Two expected values closer than this are considered tied.
pub const EV_TIE_EPSILON: f64 = 1e-12;

/// A CDF value this close to 1.0 is snapped to exactly 1.0.
pub const CDF_CLAMP_EPSILON: f64 = 1e-12;

/// Allowed departure of a distribution's total mass from 1.0.
pub const MASS_TOLERANCE: f64 = 1e-9;

/// Percentiles reported in distribution summaries.
pub const PERCENTILE_KEYS: [u32; 9] = [1, 5, 10, 25, 50, 75, 90, 95, 99];
