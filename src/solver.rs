//! Memoized state-distribution solver.
//!
//! Computes the exact final-score distribution of any reachable state by
//! recursively expanding the oracle's decisions:
//!
//! - A terminal decision yields a one-point distribution.
//! - A stochastic decision re-enumerates a roll; each canonical outcome becomes a
//!   [`Branch`] weighted by its probability. A [`Branch::Continue`] child is solved
//!   recursively and shifted by the points `locked` in at this step; a
//!   [`Branch::Fixed`] outcome (terminal freeze or foul) keeps its mass at a fixed
//!   score, so probability is conserved exactly.
//!
//! The distribution of a state is the weighted sum of its branches. Each state is
//! solved once per run: [`StateSolver`] owns the cache, and [`StateSolver::reset`]
//! clears it between independent runs. Recursion depth is bounded by the game's
//! resource budget (rerolls or dice remaining), which strictly decreases along
//! every stochastic transition.

use std::collections::HashMap;
use std::fmt::{Debug, Display};
use std::hash::Hash;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::constants::MASS_TOLERANCE;
use crate::distribution::Distribution;
use crate::error::{DecathlonError, Result};
use crate::oracle::{ActionStats, BranchChoice, Resolve};

/// One weighted successor of a transition.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Branch<S> {
    /// Continue from `state`; its distribution is shifted by `locked` points.
    Continue { prob: f64, state: S, locked: i32 },
    /// The outcome ends the game at `score`.
    Fixed { prob: f64, score: i32 },
}

/// A game's state machine, parameterized over its policy oracle.
pub trait GameModel {
    type State: Copy + Eq + Hash + Debug + Display;

    /// Branches of the first roll of the game.
    fn start_branches(&self) -> Vec<Branch<Self::State>>;

    /// The oracle's decision at `state`, ready for the solver to resolve.
    fn decide(&self, state: &Self::State) -> Result<Box<dyn Resolve<Self::State>>>;

    /// Statistics the oracle reports for the action it prescribes at `state`, if any.
    fn reported_stats(&self, _state: &Self::State) -> Result<Option<ActionStats>> {
        Ok(None)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Allowed departure of any solved distribution's mass from 1.0.
    pub mass_tolerance: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            mass_tolerance: MASS_TOLERANCE,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SolverStats {
    pub states_solved: usize,
    pub cache_hits: usize,
    pub max_depth: usize,
}

/// Per-run solver: owns the game model and the state → distribution cache.
pub struct StateSolver<G: GameModel> {
    game: G,
    config: SolverConfig,
    cache: HashMap<G::State, Distribution>,
    choices: HashMap<G::State, BranchChoice>,
    stats: SolverStats,
    depth: usize,
}

impl<G: GameModel> StateSolver<G> {
    pub fn new(game: G, config: SolverConfig) -> Self {
        Self {
            game,
            config,
            cache: HashMap::new(),
            choices: HashMap::new(),
            stats: SolverStats::default(),
            depth: 0,
        }
    }

    pub fn with_defaults(game: G) -> Self {
        Self::new(game, SolverConfig::default())
    }

    pub fn game(&self) -> &G {
        &self.game
    }

    pub fn stats(&self) -> SolverStats {
        self.stats
    }

    pub fn cached_states(&self) -> usize {
        self.cache.len()
    }

    /// Branch taken at a solved state whose stop/continue choice was derived.
    pub fn choice(&self, state: &G::State) -> Option<BranchChoice> {
        self.choices.get(state).copied()
    }

    /// Every derived stop/continue choice made so far in this run.
    pub fn choices(&self) -> &HashMap<G::State, BranchChoice> {
        &self.choices
    }

    /// Drop every cached distribution, choice and counter.
    pub fn reset(&mut self) {
        self.cache.clear();
        self.choices.clear();
        self.stats = SolverStats::default();
        self.depth = 0;
    }

    /// Exact final-score distribution from `state` under the oracle's policy.
    pub fn solve(&mut self, state: &G::State) -> Result<Distribution> {
        if let Some(dist) = self.cache.get(state) {
            self.stats.cache_hits += 1;
            return Ok(dist.clone());
        }

        self.depth += 1;
        self.stats.max_depth = self.stats.max_depth.max(self.depth);
        let result = self.solve_uncached(state);
        self.depth -= 1;
        result
    }

    fn solve_uncached(&mut self, state: &G::State) -> Result<Distribution> {
        let decision = self.game.decide(state)?;
        let resolved =
            decision.resolve(&mut |branches: &[Branch<G::State>]| self.compose(branches))?;
        let dist = resolved.dist;
        dist.check_mass(self.config.mass_tolerance, &format!("state {}", state))?;

        if let Some(choice) = resolved.choice {
            self.choices.insert(*state, choice);
        }
        self.cache.insert(*state, dist.clone());
        self.stats.states_solved += 1;
        Ok(dist)
    }

    /// Weighted sum of branch distributions.
    pub fn compose(&mut self, branches: &[Branch<G::State>]) -> Result<Distribution> {
        let mut acc = Distribution::new();
        for branch in branches {
            match *branch {
                Branch::Fixed { prob, score } => {
                    acc.add_mass(score, prob);
                }
                Branch::Continue {
                    prob,
                    state,
                    locked,
                } => {
                    let child = self.solve(&state)?;
                    if locked == 0 {
                        acc.add(&child, prob);
                    } else {
                        acc.add(&child.shift(locked), prob);
                    }
                }
            }
        }
        Ok(acc)
    }

    /// Distribution of a whole game, starting from the first roll.
    pub fn solve_start(&mut self) -> Result<Distribution> {
        let t0 = Instant::now();
        let branches = self.game.start_branches();
        let dist = self.compose(&branches)?;
        dist.check_mass(self.config.mass_tolerance, "start distribution")?;

        let (mean, sd) = dist.mean_and_sd();
        info!(
            mean,
            sd,
            support = dist.len(),
            total_mass = dist.total_mass(),
            "Start distribution reconstructed"
        );
        debug!(
            states = self.stats.states_solved,
            cache_hits = self.stats.cache_hits,
            max_depth = self.stats.max_depth,
            elapsed_ms = t0.elapsed().as_secs_f64() * 1000.0,
            "Solver cache"
        );
        Ok(dist)
    }

    /// Solve `state` and compare its mean and sd with what the oracle reports.
    ///
    /// Returns the reported statistics that were checked, or `None` when the
    /// oracle reports none for this state.
    pub fn audit(&mut self, state: &G::State, tolerance: f64) -> Result<Option<ActionStats>> {
        let dist = self.solve(state)?;
        let Some(reported) = self.game.reported_stats(state)? else {
            return Ok(None);
        };
        let (mean, sd) = dist.mean_and_sd();
        if (mean - reported.ev).abs() > tolerance || (sd - reported.sd).abs() > tolerance {
            return Err(DecathlonError::StatsMismatch {
                key: state.to_string(),
                expected_ev: reported.ev,
                expected_sd: reported.sd,
                actual_ev: mean,
                actual_sd: sd,
            });
        }
        Ok(Some(reported))
    }
}
