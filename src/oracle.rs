//! Policy oracle adapter: translate a state key into the prescribed decision.
//!
//! The oracle is an opaque, read-only mapping produced by an upstream solver. Two
//! resolution modes sit behind the [`Resolve`] capability so the solver never needs
//! to know which one is in effect:
//!
//! | Mode | Used by | What the record stores | What the solver composes |
//! |------|---------|------------------------|--------------------------|
//! | [`DirectDecision`] | 100 Metres, long-jump jump phase | the action itself | the one branch set it prescribes |
//! | [`DerivedDecision`] | long-jump run-up | only how many of each face to freeze | both stop-now and continue, then [`select_branch`] |
//!
//! A key with no record is fatal ([`DecathlonError::MissingPolicy`]): defaulting to
//! "no preference" would silently corrupt the reconstructed distribution.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Display;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

use crate::constants::EV_TIE_EPSILON;
use crate::distribution::Distribution;
use crate::error::{DecathlonError, Result};
use crate::solver::Branch;

/// Read-only policy source queried by exact state key.
pub trait PolicyOracle<K> {
    type Decision;

    /// Prescribed decision for `key`, or `MissingPolicy` if the source has no record.
    fn decide(&self, key: &K) -> Result<Self::Decision>;
}

impl<K, T: PolicyOracle<K> + ?Sized> PolicyOracle<K> for &T {
    type Decision = T::Decision;

    fn decide(&self, key: &K) -> Result<Self::Decision> {
        (**self).decide(key)
    }
}

/// Expected value and standard deviation of one candidate action, as reported by
/// the upstream solver.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActionStats {
    pub ev: f64,
    pub sd: f64,
}

/// In-memory policy table plus scalar metadata (e.g. `attempt_ev`).
#[derive(Clone, Debug)]
pub struct PolicyTable<K, D> {
    records: HashMap<K, D>,
    meta: BTreeMap<String, f64>,
}

impl<K: Eq + Hash, D> Default for PolicyTable<K, D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash, D> PolicyTable<K, D> {
    pub fn new() -> Self {
        Self {
            records: HashMap::new(),
            meta: BTreeMap::new(),
        }
    }

    /// Insert a record, returning the one it replaced.
    pub fn insert(&mut self, key: K, decision: D) -> Option<D> {
        self.records.insert(key, decision)
    }

    pub fn get(&self, key: &K) -> Option<&D> {
        self.records.get(key)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &D)> {
        self.records.iter()
    }

    pub fn meta(&self, name: &str) -> Option<f64> {
        self.meta.get(name).copied()
    }

    pub fn set_meta(&mut self, name: &str, value: f64) {
        self.meta.insert(name.to_string(), value);
    }

    pub fn meta_entries(&self) -> &BTreeMap<String, f64> {
        &self.meta
    }
}

impl<K: Eq + Hash + Display, D: Clone> PolicyOracle<K> for PolicyTable<K, D> {
    type Decision = D;

    fn decide(&self, key: &K) -> Result<D> {
        self.records
            .get(key)
            .cloned()
            .ok_or_else(|| DecathlonError::MissingPolicy {
                key: key.to_string(),
            })
    }
}

/// Distribution of a resolved decision, plus the branch a derived decision took.
#[derive(Clone, Debug, PartialEq)]
pub struct Resolved {
    pub dist: Distribution,
    pub choice: Option<BranchChoice>,
}

/// Turns an oracle decision into a distribution, using `compose` to evaluate a
/// set of weighted branches.
pub trait Resolve<S> {
    fn resolve(
        self: Box<Self>,
        compose: &mut dyn FnMut(&[Branch<S>]) -> Result<Distribution>,
    ) -> Result<Resolved>;

    /// The branch set actually played, given the choice recorded when the state was
    /// solved. `None` if the decision needs a choice and none was recorded.
    fn play(self: Box<Self>, choice: Option<BranchChoice>) -> Option<Vec<Branch<S>>>;
}

/// The oracle already named the action: compose its one branch set.
pub struct DirectDecision<S> {
    pub branches: Vec<Branch<S>>,
}

impl<S> DirectDecision<S> {
    pub fn new(branches: Vec<Branch<S>>) -> Self {
        Self { branches }
    }

    /// A decision that ends the game at `score`.
    pub fn terminal(score: i32) -> Self {
        Self {
            branches: vec![Branch::Fixed { prob: 1.0, score }],
        }
    }
}

impl<S> Resolve<S> for DirectDecision<S> {
    fn resolve(
        self: Box<Self>,
        compose: &mut dyn FnMut(&[Branch<S>]) -> Result<Distribution>,
    ) -> Result<Resolved> {
        Ok(Resolved {
            dist: compose(&self.branches)?,
            choice: None,
        })
    }

    fn play(self: Box<Self>, _choice: Option<BranchChoice>) -> Option<Vec<Branch<S>>> {
        Some(self.branches)
    }
}

/// The oracle only gave a sub-decision; stop-versus-continue is re-derived by
/// composing both branch sets and comparing them with [`select_branch`].
pub struct DerivedDecision<S> {
    pub stop: Vec<Branch<S>>,
    pub cont: Vec<Branch<S>>,
}

impl<S> Resolve<S> for DerivedDecision<S> {
    fn resolve(
        self: Box<Self>,
        compose: &mut dyn FnMut(&[Branch<S>]) -> Result<Distribution>,
    ) -> Result<Resolved> {
        let stop = compose(&self.stop)?;
        let cont = compose(&self.cont)?;
        let choice = select_branch(stop.mean_and_sd(), cont.mean_and_sd());
        let dist = match choice {
            BranchChoice::Stop => stop,
            BranchChoice::Continue => cont,
        };
        Ok(Resolved {
            dist,
            choice: Some(choice),
        })
    }

    fn play(self: Box<Self>, choice: Option<BranchChoice>) -> Option<Vec<Branch<S>>> {
        match choice? {
            BranchChoice::Stop => Some(self.stop),
            BranchChoice::Continue => Some(self.cont),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BranchChoice {
    Stop,
    Continue,
}

/// Pick between stopping and continuing from their (mean, sd).
///
/// Continue wins on a strictly larger mean. Means within [`EV_TIE_EPSILON`] are a
/// tie, broken by the smaller standard deviation; a full tie stops.
pub fn select_branch(stop: (f64, f64), cont: (f64, f64)) -> BranchChoice {
    let (mu_stop, sd_stop) = stop;
    let (mu_cont, sd_cont) = cont;
    if (mu_cont - mu_stop).abs() < EV_TIE_EPSILON {
        if sd_cont < sd_stop {
            BranchChoice::Continue
        } else {
            BranchChoice::Stop
        }
    } else if mu_cont > mu_stop {
        BranchChoice::Continue
    } else {
        BranchChoice::Stop
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_larger_mean_wins() {
        assert_eq!(select_branch((3.0, 0.0), (3.5, 9.0)), BranchChoice::Continue);
        assert_eq!(select_branch((3.5, 9.0), (3.0, 0.0)), BranchChoice::Stop);
    }

    #[test]
    fn test_tie_prefers_smaller_sd() {
        assert_eq!(select_branch((3.0, 2.0), (3.0, 1.0)), BranchChoice::Continue);
        assert_eq!(select_branch((3.0, 1.0), (3.0, 2.0)), BranchChoice::Stop);
        assert_eq!(
            select_branch((3.0, 2.0), (3.0 + 1e-13, 1.0)),
            BranchChoice::Continue
        );
    }

    #[test]
    fn test_full_tie_stops() {
        assert_eq!(select_branch((3.0, 1.0), (3.0, 1.0)), BranchChoice::Stop);
        assert_eq!(select_branch((0.0, 0.0), (0.0, 0.0)), BranchChoice::Stop);
    }

    #[test]
    fn test_derived_resolution_stops_when_moments_tie() {
        // Same mean (1) and sd (1), different shapes.
        let stop_dist = Distribution::from_pairs([(0, 0.5), (2, 0.5)]);
        let cont_dist = Distribution::from_pairs([(-1, 0.125), (1, 0.75), (3, 0.125)]);
        assert_eq!(stop_dist.mean_and_sd(), cont_dist.mean_and_sd());

        let decision: Box<dyn Resolve<u8>> = Box::new(DerivedDecision {
            stop: vec![Branch::Fixed { prob: 1.0, score: 0 }],
            cont: vec![Branch::Fixed { prob: 1.0, score: 1 }],
        });
        let mut calls = 0;
        let resolved = decision
            .resolve(&mut |branches: &[Branch<u8>]| {
                calls += 1;
                match branches[0] {
                    Branch::Fixed { score: 0, .. } => Ok(stop_dist.clone()),
                    _ => Ok(cont_dist.clone()),
                }
            })
            .unwrap();
        assert_eq!(calls, 2);
        assert_eq!(resolved.choice, Some(BranchChoice::Stop));
        assert_eq!(resolved.dist, stop_dist);
    }

    #[test]
    fn test_direct_resolution_composes_once() {
        let decision: Box<dyn Resolve<u8>> = Box::new(DirectDecision::terminal(7));
        let mut calls = 0;
        let resolved = decision
            .resolve(&mut |branches: &[Branch<u8>]| {
                calls += 1;
                assert_eq!(branches.len(), 1);
                Ok(Distribution::point(7))
            })
            .unwrap();
        assert_eq!(calls, 1);
        assert_eq!(resolved.choice, None);
        assert_eq!(resolved.dist, Distribution::point(7));
    }

    #[test]
    fn test_play_follows_recorded_choice() {
        let derived = || -> Box<dyn Resolve<u8>> {
            Box::new(DerivedDecision {
                stop: vec![Branch::Fixed { prob: 1.0, score: 0 }],
                cont: vec![Branch::Continue {
                    prob: 1.0,
                    state: 3,
                    locked: 0,
                }],
            })
        };
        assert!(derived().play(None).is_none());
        assert!(matches!(
            derived().play(Some(BranchChoice::Stop)).unwrap()[0],
            Branch::Fixed { score: 0, .. }
        ));
        assert!(matches!(
            derived().play(Some(BranchChoice::Continue)).unwrap()[0],
            Branch::Continue { state: 3, .. }
        ));
    }

    #[test]
    fn test_missing_record_is_fatal() {
        let mut table: PolicyTable<u32, &'static str> = PolicyTable::new();
        table.insert(1, "freeze");
        assert_eq!(table.decide(&1).unwrap(), "freeze");
        match table.decide(&2) {
            Err(DecathlonError::MissingPolicy { key }) => assert_eq!(key, "2"),
            other => panic!("expected MissingPolicy, got {:?}", other),
        }
    }

    #[test]
    fn test_meta() {
        let mut table: PolicyTable<u32, u32> = PolicyTable::new();
        assert!(table.is_empty());
        table.set_meta("attempt_ev", 12.5);
        assert_eq!(table.meta("attempt_ev"), Some(12.5));
        assert_eq!(table.meta("attempt_sd"), None);
    }
}
