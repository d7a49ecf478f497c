//! # Decathlon: exact score distributions under a precomputed policy
//!
//! Given a policy table produced by an upstream optimiser for two events of
//! Knizia's *Dice Decathlon*, reconstructs the exact probability distribution of the
//! final score by enumerating every weighted dice outcome and composing per-state
//! distributions bottom-up with memoisation.
//!
//! ## Pipeline
//!
//! | Step | Rust module | Description |
//! |------|-------------|-------------|
//! | 1 | [`dice_mechanics`] | Canonical dice multisets with multinomial weights, cached per dice count |
//! | 2 | [`oracle`] | State key → decision; direct (action stored) or derived (stop/continue recomputed) resolution |
//! | 3 | [`games`] | 100 Metres and Long Jump transitions: a state plus its decision becomes weighted branches |
//! | 4 | [`solver`] | Memoised recursion composing child distributions into [`distribution::Distribution`]s |
//! | 5 | [`order_stats`] | Best-of-k attempts via `F(x)^k` |
//!
//! [`storage`] reads and writes JSON policy tables, [`simulation`] cross-checks a
//! reconstructed distribution by Monte Carlo.
//!
//! ## Resolution modes
//!
//! - **Direct** (100 Metres): every record names the action, so each state composes
//!   exactly one branch set.
//! - **Derived** (Long Jump run-up): records only say which dice to freeze after a
//!   roll. Whether to stop the run-up is recomputed per state by comparing the
//!   stop and continue distributions: larger mean wins, a tie within 1e-12 goes to
//!   the smaller standard deviation, a full tie stops.

pub mod constants;
pub mod dice_mechanics;
pub mod distribution;
pub mod env_config;
pub mod error;
pub mod games;
pub mod logging;
pub mod oracle;
pub mod order_stats;
pub mod scoring;
pub mod simulation;
pub mod solver;
pub mod storage;

pub use distribution::{DensitySummary, Distribution};
pub use error::{DecathlonError, Result};
pub use oracle::{BranchChoice, PolicyOracle, PolicyTable};
pub use solver::{GameModel, SolverConfig, StateSolver};
