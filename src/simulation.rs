//! Monte Carlo cross-check: play N games by sampling dice and following the policy.
//!
//! Each game walks the same [`GameModel`] the exact solver composes, but samples one
//! branch per roll instead of summing over all of them. Derived stop/continue
//! decisions replay the choice the solver recorded, so a state must be solved
//! before it can be simulated.
//!
//! Games run in parallel with rayon. Game `i` uses its own `SmallRng` seeded with
//! `seed + i`, so results do not depend on the thread count.

use std::collections::HashMap;
use std::time::Instant;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::info;

use crate::error::{DecathlonError, Result};
use crate::oracle::BranchChoice;
use crate::solver::{Branch, GameModel};

/// Results of a batch simulation.
#[derive(Clone, Debug)]
pub struct SimulationResult {
    pub scores: Vec<i32>,
    pub mean: f64,
    pub std_dev: f64,
    pub min: i32,
    pub max: i32,
}

impl SimulationResult {
    fn from_scores(scores: Vec<i32>) -> Self {
        let n = scores.len().max(1) as f64;
        let mean = scores.iter().map(|&s| s as f64).sum::<f64>() / n;
        let variance = scores
            .iter()
            .map(|&s| (s as f64 - mean).powi(2))
            .sum::<f64>()
            / n;
        let min = scores.iter().copied().min().unwrap_or(0);
        let max = scores.iter().copied().max().unwrap_or(0);
        Self {
            scores,
            mean,
            std_dev: variance.sqrt(),
            min,
            max,
        }
    }
}

/// Pick one branch with probability proportional to its weight.
fn sample_branch<S: Copy>(branches: &[Branch<S>], rng: &mut SmallRng) -> Option<Branch<S>> {
    let u: f64 = rng.random();
    let mut cum = 0.0;
    for branch in branches {
        cum += match branch {
            Branch::Continue { prob, .. } | Branch::Fixed { prob, .. } => *prob,
        };
        if u < cum {
            return Some(*branch);
        }
    }
    // Rounding left u above the final cumulative weight.
    branches.last().copied()
}

/// Play one game from the start roll, returning its final score.
fn play_game<G: GameModel>(
    game: &G,
    choices: &HashMap<G::State, BranchChoice>,
    rng: &mut SmallRng,
) -> Result<i32> {
    let mut branches = game.start_branches();
    let mut banked = 0;
    loop {
        let branch = sample_branch(&branches, rng).ok_or_else(|| {
            DecathlonError::InvalidConfig("decision with no branches".to_string())
        })?;
        match branch {
            Branch::Fixed { score, .. } => return Ok(banked + score),
            Branch::Continue { state, locked, .. } => {
                banked += locked;
                branches = game
                    .decide(&state)?
                    .play(choices.get(&state).copied())
                    .ok_or_else(|| DecathlonError::InvalidDecision {
                        key: state.to_string(),
                        reason: "no stop/continue choice recorded; solve the state first"
                            .to_string(),
                    })?;
            }
        }
    }
}

/// Play `num_games` games. Each game scores the best of `attempts` independent plays.
pub fn simulate<G>(
    game: &G,
    choices: &HashMap<G::State, BranchChoice>,
    attempts: u32,
    num_games: usize,
    seed: u64,
) -> Result<SimulationResult>
where
    G: GameModel + Sync,
    G::State: Send + Sync,
{
    if attempts == 0 {
        return Err(DecathlonError::InvalidConfig(
            "simulation needs at least one attempt per game".to_string(),
        ));
    }

    let t0 = Instant::now();
    let scores = (0..num_games)
        .into_par_iter()
        .map(|i| -> Result<i32> {
            let mut rng = SmallRng::seed_from_u64(seed.wrapping_add(i as u64));
            let mut best = i32::MIN;
            for _ in 0..attempts {
                best = best.max(play_game(game, choices, &mut rng)?);
            }
            Ok(best)
        })
        .collect::<Result<Vec<i32>>>()?;

    let result = SimulationResult::from_scores(scores);
    info!(
        games = num_games,
        attempts,
        mean = result.mean,
        std_dev = result.std_dev,
        min = result.min,
        max = result.max,
        elapsed_ms = t0.elapsed().as_secs_f64() * 1000.0,
        "Simulation complete"
    );
    Ok(result)
}
