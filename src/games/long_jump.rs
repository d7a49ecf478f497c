//! Long Jump: derived-mode game model.
//!
//! One attempt has two phases over five dice:
//!
//! 1. **Run-up.** Before each roll the player may stop. Otherwise the remaining dice
//!    are rolled and at least one is frozen; the frozen run-up sum must stay at or
//!    below 8. The number of dice frozen when the run-up ends is the number of jump
//!    dice.
//! 2. **Jump.** Roll the remaining jump dice and freeze at least one per roll until
//!    all are frozen. The attempt scores the sum of the frozen jump dice.
//!
//! The stored policy is keyed on the post-roll state and only says how many dice of
//! each face to freeze. Whether to stop the run-up before rolling is not stored, so
//! each pre-roll run-up state is a [`DerivedDecision`]. A run-up outcome whose
//! prescribed freeze is empty or breaks the limit fouls; its mass goes to the
//! [`FoulRule`] score.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::dice_mechanics::{FaceCounts, OutcomeTable};
use crate::distribution::Distribution;
use crate::error::{DecathlonError, Result};
use crate::oracle::{ActionStats, DerivedDecision, DirectDecision, PolicyOracle, Resolve};
use crate::order_stats::best_of_k_distribution;
use crate::scoring::{face_sum, FoulRule};
use crate::solver::{Branch, GameModel};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LongJumpPhase {
    #[serde(rename = "runup")]
    RunUp,
    Jump,
}

/// Post-roll policy key: phase, frozen run-up sum (run-up only) and the dice just rolled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FreezeKey {
    pub phase: LongJumpPhase,
    pub sum_frozen: Option<u8>,
    pub rolled: FaceCounts,
}

impl fmt::Display for FreezeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase = match self.phase {
            LongJumpPhase::RunUp => "runup",
            LongJumpPhase::Jump => "jump",
        };
        write!(f, "phase={} sum_frozen=", phase)?;
        match self.sum_frozen {
            Some(s) => write!(f, "{}", s)?,
            None => write!(f, "NULL")?,
        }
        write!(f, " rolled={}", self.rolled)
    }
}

/// Pre-roll solver state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LongJumpState {
    RunUp { remaining: u8, frozen_sum: u8 },
    Jump { remaining: u8 },
}

impl fmt::Display for LongJumpState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LongJumpState::RunUp {
                remaining,
                frozen_sum,
            } => write!(f, "runup remaining={} frozen_sum={}", remaining, frozen_sum),
            LongJumpState::Jump { remaining } => write!(f, "jump remaining={}", remaining),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LongJumpConfig {
    pub dice: usize,
    pub runup_limit: u8,
    pub foul: FoulRule,
}

impl Default for LongJumpConfig {
    fn default() -> Self {
        Self {
            dice: LONG_JUMP_DICE,
            runup_limit: LONG_JUMP_RUNUP_LIMIT,
            foul: FoulRule::default(),
        }
    }
}

impl LongJumpConfig {
    pub fn validate(&self) -> Result<()> {
        if self.dice == 0 || self.dice > MAX_DICE {
            return Err(DecathlonError::InvalidConfig(format!(
                "dice must be in 1..={}, got {}",
                MAX_DICE, self.dice
            )));
        }
        Ok(())
    }
}

/// Long Jump over a policy oracle that maps [`FreezeKey`] to per-face freeze counts.
pub struct LongJumpModel<O> {
    oracle: O,
    config: LongJumpConfig,
    outcomes: OutcomeTable,
    attempt_stats: Option<ActionStats>,
}

impl<O> LongJumpModel<O>
where
    O: PolicyOracle<FreezeKey, Decision = FaceCounts>,
{
    pub fn new(oracle: O, config: LongJumpConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            oracle,
            config,
            outcomes: OutcomeTable::new(),
            attempt_stats: None,
        })
    }

    /// Attach the attempt mean/sd the upstream solver reported, for auditing.
    pub fn with_attempt_stats(mut self, stats: ActionStats) -> Self {
        self.attempt_stats = Some(stats);
        self
    }

    pub fn config(&self) -> &LongJumpConfig {
        &self.config
    }

    /// Pre-roll state at the start of an attempt.
    pub fn start_state(&self) -> LongJumpState {
        LongJumpState::RunUp {
            remaining: self.config.dice as u8,
            frozen_sum: 0,
        }
    }

    /// Jump freeze prescribed for `key`, rejected if it freezes dice that were not
    /// rolled.
    pub fn jump_freeze(&self, key: &FreezeKey) -> Result<FaceCounts> {
        let freeze = self.oracle.decide(key)?;
        if !key.rolled.contains(&freeze) {
            return Err(DecathlonError::InvalidDecision {
                key: key.to_string(),
                reason: format!("freeze {} is not a subset of the roll", freeze),
            });
        }
        Ok(freeze)
    }

    /// True if freezing `freeze` out of `rolled` on top of `frozen_sum` fouls the
    /// run-up: nothing frozen, dice frozen that were not rolled, or the limit broken.
    pub fn is_runup_foul(
        &self,
        frozen_sum: u8,
        rolled: &FaceCounts,
        freeze: &FaceCounts,
    ) -> bool {
        let add = face_sum(freeze);
        freeze.total() == 0
            || !rolled.contains(freeze)
            || add <= 0
            || frozen_sum as i32 + add > self.config.runup_limit as i32
    }

    fn runup_decision(
        &self,
        remaining: u8,
        frozen_sum: u8,
    ) -> Result<Box<dyn Resolve<LongJumpState>>> {
        let stop = vec![Branch::Continue {
            prob: 1.0,
            state: LongJumpState::Jump {
                remaining: self.config.dice as u8 - remaining,
            },
            locked: 0,
        }];
        if remaining == 0 {
            return Ok(Box::new(DirectDecision::new(stop)));
        }

        let mut cont = Vec::with_capacity(self.outcomes.get(remaining as usize).len());
        for o in self.outcomes.get(remaining as usize) {
            let freeze = self.oracle.decide(&FreezeKey {
                phase: LongJumpPhase::RunUp,
                sum_frozen: Some(frozen_sum),
                rolled: o.counts,
            })?;
            if self.is_runup_foul(frozen_sum, &o.counts, &freeze) {
                cont.push(Branch::Fixed {
                    prob: o.prob,
                    score: self.config.foul.score,
                });
                continue;
            }
            cont.push(Branch::Continue {
                prob: o.prob,
                state: LongJumpState::RunUp {
                    remaining: remaining - freeze.total() as u8,
                    frozen_sum: frozen_sum + face_sum(&freeze) as u8,
                },
                locked: 0,
            });
        }
        Ok(Box::new(DerivedDecision { stop, cont }))
    }

    fn jump_decision(&self, remaining: u8) -> Result<Box<dyn Resolve<LongJumpState>>> {
        if remaining == 0 {
            return Ok(Box::new(DirectDecision::terminal(0)));
        }
        let mut branches = Vec::with_capacity(self.outcomes.get(remaining as usize).len());
        for o in self.outcomes.get(remaining as usize) {
            let key = FreezeKey {
                phase: LongJumpPhase::Jump,
                sum_frozen: None,
                rolled: o.counts,
            };
            let freeze = self.jump_freeze(&key)?;
            if freeze.total() == 0 {
                return Err(DecathlonError::InvalidDecision {
                    key: key.to_string(),
                    reason: "jump must freeze at least one die".to_string(),
                });
            }
            branches.push(Branch::Continue {
                prob: o.prob,
                state: LongJumpState::Jump {
                    remaining: remaining - freeze.total() as u8,
                },
                locked: face_sum(&freeze),
            });
        }
        Ok(Box::new(DirectDecision::new(branches)))
    }
}

impl<O> GameModel for LongJumpModel<O>
where
    O: PolicyOracle<FreezeKey, Decision = FaceCounts>,
{
    type State = LongJumpState;

    fn start_branches(&self) -> Vec<Branch<LongJumpState>> {
        vec![Branch::Continue {
            prob: 1.0,
            state: self.start_state(),
            locked: 0,
        }]
    }

    fn decide(&self, state: &LongJumpState) -> Result<Box<dyn Resolve<LongJumpState>>> {
        let remaining = match *state {
            LongJumpState::RunUp { remaining, .. } | LongJumpState::Jump { remaining } => remaining,
        };
        if remaining as usize > self.config.dice {
            return Err(DecathlonError::InvalidDecision {
                key: state.to_string(),
                reason: format!("only {} dice in an attempt", self.config.dice),
            });
        }
        match *state {
            LongJumpState::RunUp { frozen_sum, .. } if frozen_sum > self.config.runup_limit => {
                Ok(Box::new(DirectDecision::terminal(self.config.foul.score)))
            }
            LongJumpState::RunUp {
                remaining,
                frozen_sum,
            } => self.runup_decision(remaining, frozen_sum),
            LongJumpState::Jump { remaining } => self.jump_decision(remaining),
        }
    }

    fn reported_stats(&self, state: &LongJumpState) -> Result<Option<ActionStats>> {
        if *state == self.start_state() {
            Ok(self.attempt_stats)
        } else {
            Ok(None)
        }
    }
}

/// Expand a count-only freeze into per-face counts: the `count` smallest dice in the
/// run-up, the `count` largest in the jump. `None` if fewer dice were rolled.
pub fn freeze_by_count(phase: LongJumpPhase, rolled: &FaceCounts, count: u8) -> Option<FaceCounts> {
    let dice = rolled.to_sorted();
    let count = count as usize;
    if count > dice.len() {
        return None;
    }
    let picked = match phase {
        LongJumpPhase::RunUp => &dice[..count],
        LongJumpPhase::Jump => &dice[dice.len() - count..],
    };
    FaceCounts::from_dice(picked)
}

/// Distribution of the event score: the best of `attempts` independent attempts.
pub fn event_distribution(attempt: &Distribution, attempts: u32) -> Result<Distribution> {
    best_of_k_distribution(attempt, attempts)
}
