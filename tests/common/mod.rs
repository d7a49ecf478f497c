//! Reference optimisers that build policy tables for the integration tests.
//!
//! Each one maximises expected score by backward induction over moments
//! (E[X], E[X²]) only, never building a distribution, so the statistics it stores
//! are independent of the reconstruction under test.

#![allow(dead_code)]

use std::collections::HashMap;

use decathlon::dice_mechanics::{enumerate_outcomes, FaceCounts, Outcome};
use decathlon::games::long_jump::{FreezeKey, LongJumpPhase};
use decathlon::games::sprint::{
    SprintAction, SprintConfig, SprintDecision, SprintStage, SprintState,
};
use decathlon::oracle::ActionStats;
use decathlon::scoring::sprint_set_score;
use decathlon::storage::{LongJumpTable, SprintTable, ATTEMPT_EV_KEY, ATTEMPT_SD_KEY};

type Moments = (f64, f64);

fn stats(m: Moments) -> ActionStats {
    ActionStats {
        ev: m.0,
        sd: (m.1 - m.0 * m.0).max(0.0).sqrt(),
    }
}

fn point(x: i32) -> Moments {
    let x = x as f64;
    (x, x * x)
}

/// Optimal 100 Metres policy plus the start moments it implies.
pub struct SprintReference {
    pub table: SprintTable,
    pub start: ActionStats,
}

struct SprintSearch {
    outcomes: Vec<Outcome>,
    memo: HashMap<SprintState, Moments>,
    table: SprintTable,
}

impl SprintSearch {
    fn roll(&mut self, stage: SprintStage, rerolls: u8, set1_score: Option<i32>) -> Moments {
        let mut acc = (0.0, 0.0);
        for o in self.outcomes.clone() {
            let m = self.value(SprintState {
                stage,
                rerolls,
                dice: o.counts,
                set1_score,
            });
            acc.0 += o.prob * m.0;
            acc.1 += o.prob * m.1;
        }
        acc
    }

    fn value(&mut self, state: SprintState) -> Moments {
        if let Some(&m) = self.memo.get(&state) {
            return m;
        }
        let score = sprint_set_score(&state.dice);
        let freeze = match state.stage {
            SprintStage::First => self.roll(SprintStage::Second, state.rerolls, Some(score)),
            SprintStage::Second => point(state.set1_score.unwrap_or(0) + score),
        };
        let reroll = if state.rerolls > 0 {
            Some(self.roll(state.stage, state.rerolls - 1, state.set1_score))
        } else {
            None
        };
        let (best, chosen) = match reroll {
            Some(r) if r.0 > freeze.0 + 1e-12 => (SprintAction::Reroll, r),
            _ => (SprintAction::Freeze, freeze),
        };
        self.table.insert(
            state,
            SprintDecision {
                best,
                freeze: Some(stats(freeze)),
                reroll: reroll.map(stats),
            },
        );
        self.memo.insert(state, chosen);
        chosen
    }
}

pub fn sprint_reference(config: SprintConfig) -> SprintReference {
    let mut search = SprintSearch {
        outcomes: enumerate_outcomes(config.dice_per_set),
        memo: HashMap::new(),
        table: SprintTable::new(),
    };
    let start = search.roll(SprintStage::First, config.rerolls, None);
    SprintReference {
        table: search.table,
        start: stats(start),
    }
}

/// Every sub-multiset of `counts`, including the empty one.
pub fn sub_multisets(counts: &FaceCounts) -> Vec<FaceCounts> {
    let mut out = vec![FaceCounts::EMPTY];
    for face in 0..6 {
        let mut next = Vec::new();
        for base in &out {
            for k in 0..=counts.0[face] {
                let mut f = *base;
                f.0[face] = k;
                next.push(f);
            }
        }
        out = next;
    }
    out
}

/// EV-optimal Long Jump freeze policy plus the attempt mean it implies.
pub struct LongJumpReference {
    pub table: LongJumpTable,
    pub attempt_ev: f64,
}

struct LongJumpSearch {
    dice: u8,
    limit: u8,
    runup_memo: HashMap<(u8, u8), f64>,
    jump_memo: HashMap<u8, f64>,
    table: LongJumpTable,
}

impl LongJumpSearch {
    fn jump(&mut self, n: u8) -> f64 {
        if n == 0 {
            return 0.0;
        }
        if let Some(&v) = self.jump_memo.get(&n) {
            return v;
        }
        let mut ev = 0.0;
        for o in enumerate_outcomes(n as usize) {
            let mut best: Option<(f64, FaceCounts)> = None;
            for f in sub_multisets(&o.counts) {
                if f.total() == 0 {
                    continue;
                }
                let v = f.face_sum() as f64 + self.jump(n - f.total() as u8);
                if best.map_or(true, |(b, _)| v > b) {
                    best = Some((v, f));
                }
            }
            let (v, f) = best.unwrap_or((0.0, FaceCounts::EMPTY));
            self.table.insert(
                FreezeKey {
                    phase: LongJumpPhase::Jump,
                    sum_frozen: None,
                    rolled: o.counts,
                },
                f,
            );
            ev += o.prob * v;
        }
        self.jump_memo.insert(n, ev);
        ev
    }

    fn runup(&mut self, remaining: u8, frozen_sum: u8) -> f64 {
        if let Some(&v) = self.runup_memo.get(&(remaining, frozen_sum)) {
            return v;
        }
        let stop = self.jump(self.dice - remaining);
        let value = if remaining == 0 {
            stop
        } else {
            let mut cont = 0.0;
            for o in enumerate_outcomes(remaining as usize) {
                let mut best: Option<(f64, FaceCounts)> = None;
                for f in sub_multisets(&o.counts) {
                    let add = f.face_sum() as u8;
                    if f.total() == 0 || frozen_sum + add > self.limit {
                        continue;
                    }
                    let v = self.runup(remaining - f.total() as u8, frozen_sum + add);
                    if best.map_or(true, |(b, _)| v > b) {
                        best = Some((v, f));
                    }
                }
                // No legal freeze: record the empty freeze, which fouls.
                let (v, f) = best.unwrap_or((0.0, FaceCounts::EMPTY));
                self.table.insert(
                    FreezeKey {
                        phase: LongJumpPhase::RunUp,
                        sum_frozen: Some(frozen_sum),
                        rolled: o.counts,
                    },
                    f,
                );
                cont += o.prob * v;
            }
            stop.max(cont)
        };
        self.runup_memo.insert((remaining, frozen_sum), value);
        value
    }
}

pub fn long_jump_reference(dice: u8, limit: u8) -> LongJumpReference {
    let mut search = LongJumpSearch {
        dice,
        limit,
        runup_memo: HashMap::new(),
        jump_memo: HashMap::new(),
        table: LongJumpTable::new(),
    };
    let attempt_ev = search.runup(dice, 0);
    LongJumpReference {
        table: search.table,
        attempt_ev,
    }
}

/// Stamp `attempt_ev`/`attempt_sd` metadata onto a table.
pub fn with_attempt_meta(mut table: LongJumpTable, ev: f64, sd: f64) -> LongJumpTable {
    table.set_meta(ATTEMPT_EV_KEY, ev);
    table.set_meta(ATTEMPT_SD_KEY, sd);
    table
}
