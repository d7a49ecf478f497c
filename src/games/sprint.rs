//! 100 Metres: direct-mode game model.
//!
//! Two sets of four dice share five rerolls. At every state the stored policy names
//! the action:
//!
//! | Stage | Action | Transition |
//! |-------|--------|------------|
//! | 1 | freeze | set-1 score locked into the key; roll set 2 fresh (rerolls unchanged) |
//! | 1 or 2 | reroll | consume one reroll; redraw all four dice of the current set |
//! | 2 | freeze | terminal: `set1_score + score(set 2)` |
//!
//! State key: (stage, rerolls, sorted dice, set-1 score or NULL in stage 1).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::dice_mechanics::{FaceCounts, OutcomeTable};
use crate::error::{DecathlonError, Result};
use crate::oracle::{ActionStats, DirectDecision, PolicyOracle, Resolve};
use crate::scoring::sprint_set_score;
use crate::solver::{Branch, GameModel};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SprintStage {
    First,
    Second,
}

impl SprintStage {
    /// 1 or 2, as stored in policy tables.
    pub fn number(self) -> u8 {
        match self {
            SprintStage::First => 1,
            SprintStage::Second => 2,
        }
    }

    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(SprintStage::First),
            2 => Some(SprintStage::Second),
            _ => None,
        }
    }
}

/// 100 Metres state, after a roll and before the decision.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SprintState {
    pub stage: SprintStage,
    pub rerolls: u8,
    pub dice: FaceCounts,
    /// Score of the frozen first set; `None` during stage 1.
    pub set1_score: Option<i32>,
}

impl fmt::Display for SprintState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "stage={} rerolls={} dice={} set1=",
            self.stage.number(),
            self.rerolls,
            self.dice
        )?;
        match self.set1_score {
            Some(s) => write!(f, "{}", s),
            None => write!(f, "NULL"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SprintAction {
    Freeze,
    Reroll,
}

/// Stored 100 Metres decision: the best action plus per-action statistics when the
/// upstream solver recorded them (reroll statistics are absent with no rerolls left).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SprintDecision {
    pub best: SprintAction,
    pub freeze: Option<ActionStats>,
    pub reroll: Option<ActionStats>,
}

impl SprintDecision {
    /// A bare action with no statistics.
    pub fn action(best: SprintAction) -> Self {
        Self {
            best,
            freeze: None,
            reroll: None,
        }
    }

    /// Statistics of the prescribed action.
    pub fn best_stats(&self) -> Option<ActionStats> {
        match self.best {
            SprintAction::Freeze => self.freeze,
            SprintAction::Reroll => self.reroll,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SprintConfig {
    pub dice_per_set: usize,
    pub rerolls: u8,
}

impl Default for SprintConfig {
    fn default() -> Self {
        Self {
            dice_per_set: SPRINT_DICE_PER_SET,
            rerolls: SPRINT_REROLLS,
        }
    }
}

impl SprintConfig {
    pub fn validate(&self) -> Result<()> {
        if self.dice_per_set == 0 || self.dice_per_set > MAX_DICE {
            return Err(DecathlonError::InvalidConfig(format!(
                "dice_per_set must be in 1..={}, got {}",
                MAX_DICE, self.dice_per_set
            )));
        }
        Ok(())
    }
}

/// 100 Metres over a policy oracle keyed by [`SprintState`].
pub struct SprintModel<O> {
    oracle: O,
    config: SprintConfig,
    outcomes: OutcomeTable,
}

impl<O> SprintModel<O>
where
    O: PolicyOracle<SprintState, Decision = SprintDecision>,
{
    pub fn new(oracle: O, config: SprintConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            oracle,
            config,
            outcomes: OutcomeTable::new(),
        })
    }

    pub fn config(&self) -> &SprintConfig {
        &self.config
    }

    /// States reached by rolling a fresh set.
    fn roll_branches(
        &self,
        stage: SprintStage,
        rerolls: u8,
        set1_score: Option<i32>,
    ) -> Vec<Branch<SprintState>> {
        self.outcomes
            .get(self.config.dice_per_set)
            .iter()
            .map(|o| Branch::Continue {
                prob: o.prob,
                state: SprintState {
                    stage,
                    rerolls,
                    dice: o.counts,
                    set1_score,
                },
                locked: 0,
            })
            .collect()
    }
}

impl<O> GameModel for SprintModel<O>
where
    O: PolicyOracle<SprintState, Decision = SprintDecision>,
{
    type State = SprintState;

    fn start_branches(&self) -> Vec<Branch<SprintState>> {
        self.roll_branches(SprintStage::First, self.config.rerolls, None)
    }

    fn decide(&self, state: &SprintState) -> Result<Box<dyn Resolve<SprintState>>> {
        let decision = self.oracle.decide(state)?;
        let branches = match (decision.best, state.stage) {
            (SprintAction::Freeze, SprintStage::Second) => {
                let set1 = state
                    .set1_score
                    .ok_or_else(|| DecathlonError::InvalidDecision {
                        key: state.to_string(),
                        reason: "second set has no first-set score".to_string(),
                    })?;
                return Ok(Box::new(DirectDecision::terminal(
                    set1 + sprint_set_score(&state.dice),
                )));
            }
            (SprintAction::Freeze, SprintStage::First) => self.roll_branches(
                SprintStage::Second,
                state.rerolls,
                Some(sprint_set_score(&state.dice)),
            ),
            (SprintAction::Reroll, _) if state.rerolls == 0 => {
                return Err(DecathlonError::InvalidDecision {
                    key: state.to_string(),
                    reason: "reroll prescribed with no rerolls left".to_string(),
                });
            }
            (SprintAction::Reroll, stage) => {
                self.roll_branches(stage, state.rerolls - 1, state.set1_score)
            }
        };
        Ok(Box::new(DirectDecision::new(branches)))
    }

    fn reported_stats(&self, state: &SprintState) -> Result<Option<ActionStats>> {
        Ok(self.oracle.decide(state)?.best_stats())
    }
}
