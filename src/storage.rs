//! JSON I/O for policy tables.
//!
//! Both tables are a single JSON object `{ "meta": {..}, "rows": [..] }`, one row per
//! state, mirroring the upstream solver's relational schema:
//!
//! | Table | Row fields | Meta |
//! |-------|------------|------|
//! | 100 Metres | `stage, rerolls, dice, set1_score, best, ev_freeze, sd_freeze, ev_reroll, sd_reroll` | none |
//! | Long Jump | `phase, sum_frozen, counts, freeze` or `freeze_count` | `attempt_ev`, `attempt_sd` |
//!
//! `dice` is the sorted dice list; `counts` and `freeze` are per-face counts (faces
//! 1..6). A Long Jump row may give `freeze_count` instead of `freeze`, which expands
//! through [`freeze_by_count`]. Rows are written in key order so saved files diff
//! cleanly.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::constants::MAX_DICE;
use crate::dice_mechanics::FaceCounts;
use crate::distribution::{DensitySummary, Distribution};
use crate::error::{DecathlonError, Result};
use crate::games::long_jump::{freeze_by_count, FreezeKey, LongJumpPhase};
use crate::games::sprint::{SprintAction, SprintDecision, SprintStage, SprintState};
use crate::oracle::{ActionStats, PolicyTable};

pub const SPRINT_POLICY_PATH: &str = "data/policies/sprint.json";
pub const LONG_JUMP_POLICY_PATH: &str = "data/policies/long_jump.json";

pub const ATTEMPT_EV_KEY: &str = "attempt_ev";
pub const ATTEMPT_SD_KEY: &str = "attempt_sd";

pub type SprintTable = PolicyTable<SprintState, SprintDecision>;
pub type LongJumpTable = PolicyTable<FreezeKey, FaceCounts>;

#[derive(Debug, Serialize, Deserialize)]
struct TableFile<R> {
    #[serde(default)]
    meta: BTreeMap<String, f64>,
    rows: Vec<R>,
}

/// One 100 Metres policy record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SprintRow {
    pub stage: u8,
    pub rerolls: u8,
    pub dice: Vec<u8>,
    pub set1_score: Option<i32>,
    pub best: SprintAction,
    #[serde(default)]
    pub ev_freeze: Option<f64>,
    #[serde(default)]
    pub sd_freeze: Option<f64>,
    #[serde(default)]
    pub ev_reroll: Option<f64>,
    #[serde(default)]
    pub sd_reroll: Option<f64>,
}

/// One Long Jump policy record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LongJumpRow {
    pub phase: LongJumpPhase,
    pub sum_frozen: Option<u8>,
    pub counts: FaceCounts,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub freeze: Option<FaceCounts>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub freeze_count: Option<u8>,
}

fn stats_pair(ev: Option<f64>, sd: Option<f64>) -> Option<ActionStats> {
    match (ev, sd) {
        (Some(ev), Some(sd)) => Some(ActionStats { ev, sd }),
        _ => None,
    }
}

fn bad_row(index: usize, reason: impl Into<String>) -> DecathlonError {
    DecathlonError::InvalidConfig(format!("policy row {}: {}", index, reason.into()))
}

impl SprintRow {
    fn into_record(self, index: usize) -> Result<(SprintState, SprintDecision)> {
        let stage = SprintStage::from_number(self.stage)
            .ok_or_else(|| bad_row(index, format!("stage must be 1 or 2, got {}", self.stage)))?;
        if self.dice.len() > MAX_DICE {
            return Err(bad_row(index, "more than five dice"));
        }
        let dice = FaceCounts::from_dice(&self.dice)
            .ok_or_else(|| bad_row(index, format!("invalid dice {:?}", self.dice)))?;
        match (stage, self.set1_score) {
            (SprintStage::First, Some(_)) => {
                return Err(bad_row(index, "stage 1 row carries a set-1 score"))
            }
            (SprintStage::Second, None) => {
                return Err(bad_row(index, "stage 2 row has no set-1 score"))
            }
            _ => {}
        }
        let state = SprintState {
            stage,
            rerolls: self.rerolls,
            dice,
            set1_score: self.set1_score,
        };
        let decision = SprintDecision {
            best: self.best,
            freeze: stats_pair(self.ev_freeze, self.sd_freeze),
            reroll: stats_pair(self.ev_reroll, self.sd_reroll),
        };
        Ok((state, decision))
    }

    fn from_record(state: &SprintState, decision: &SprintDecision) -> Self {
        Self {
            stage: state.stage.number(),
            rerolls: state.rerolls,
            dice: state.dice.to_sorted(),
            set1_score: state.set1_score,
            best: decision.best,
            ev_freeze: decision.freeze.map(|s| s.ev),
            sd_freeze: decision.freeze.map(|s| s.sd),
            ev_reroll: decision.reroll.map(|s| s.ev),
            sd_reroll: decision.reroll.map(|s| s.sd),
        }
    }
}

impl LongJumpRow {
    fn into_record(self, index: usize) -> Result<(FreezeKey, FaceCounts)> {
        match (self.phase, self.sum_frozen) {
            (LongJumpPhase::RunUp, None) => {
                return Err(bad_row(index, "run-up row has no sum_frozen"))
            }
            (LongJumpPhase::Jump, Some(_)) => {
                return Err(bad_row(index, "jump row carries sum_frozen"))
            }
            _ => {}
        }
        if self.counts.total() > MAX_DICE {
            return Err(bad_row(index, "more than five dice"));
        }
        let freeze = match (self.freeze, self.freeze_count) {
            (Some(_), Some(_)) => {
                return Err(bad_row(index, "both freeze and freeze_count given"))
            }
            (Some(f), None) if f.total() > MAX_DICE => {
                return Err(bad_row(index, "more than five dice"))
            }
            (Some(f), None) => f,
            (None, Some(n)) => freeze_by_count(self.phase, &self.counts, n).ok_or_else(|| {
                bad_row(index, format!("freeze_count {} exceeds the roll", n))
            })?,
            (None, None) => return Err(bad_row(index, "no freeze or freeze_count")),
        };
        let key = FreezeKey {
            phase: self.phase,
            sum_frozen: self.sum_frozen,
            rolled: self.counts,
        };
        Ok((key, freeze))
    }

    fn from_record(key: &FreezeKey, freeze: &FaceCounts) -> Self {
        Self {
            phase: key.phase,
            sum_frozen: key.sum_frozen,
            counts: key.rolled,
            freeze: Some(*freeze),
            freeze_count: None,
        }
    }
}

fn read_table_file<R: for<'de> Deserialize<'de>>(path: &Path) -> Result<TableFile<R>> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, value)?;
    Ok(())
}

/// Load a 100 Metres policy table. Duplicate keys are rejected.
pub fn load_sprint_table(path: &Path) -> Result<SprintTable> {
    let t0 = Instant::now();
    let file: TableFile<SprintRow> = read_table_file(path)?;
    let mut table = SprintTable::new();
    for (name, value) in &file.meta {
        table.set_meta(name, *value);
    }
    for (i, row) in file.rows.into_iter().enumerate() {
        let (state, decision) = row.into_record(i)?;
        if table.insert(state, decision).is_some() {
            return Err(bad_row(i, format!("duplicate state {}", state)));
        }
    }
    info!(
        path = %path.display(),
        records = table.len(),
        elapsed_ms = t0.elapsed().as_secs_f64() * 1000.0,
        "Loaded 100 Metres policy"
    );
    Ok(table)
}

pub fn save_sprint_table(path: &Path, table: &SprintTable) -> Result<()> {
    let mut records: Vec<_> = table.iter().collect();
    records.sort_by_key(|(state, _)| **state);
    let file = TableFile {
        meta: table.meta_entries().clone(),
        rows: records
            .into_iter()
            .map(|(s, d)| SprintRow::from_record(s, d))
            .collect(),
    };
    write_json(path, &file)
}

/// Load a Long Jump policy table. Duplicate keys are rejected.
pub fn load_long_jump_table(path: &Path) -> Result<LongJumpTable> {
    let t0 = Instant::now();
    let file: TableFile<LongJumpRow> = read_table_file(path)?;
    let mut table = LongJumpTable::new();
    for (name, value) in &file.meta {
        table.set_meta(name, *value);
    }
    for (i, row) in file.rows.into_iter().enumerate() {
        let (key, freeze) = row.into_record(i)?;
        if table.insert(key, freeze).is_some() {
            return Err(bad_row(i, format!("duplicate key {}", key)));
        }
    }
    info!(
        path = %path.display(),
        records = table.len(),
        elapsed_ms = t0.elapsed().as_secs_f64() * 1000.0,
        "Loaded Long Jump policy"
    );
    Ok(table)
}

pub fn save_long_jump_table(path: &Path, table: &LongJumpTable) -> Result<()> {
    let mut records: Vec<_> = table.iter().collect();
    records.sort_by_key(|(key, _)| **key);
    let file = TableFile {
        meta: table.meta_entries().clone(),
        rows: records
            .into_iter()
            .map(|(k, f)| LongJumpRow::from_record(k, f))
            .collect(),
    };
    write_json(path, &file)
}

/// Exported PMF/CDF of one reconstructed distribution.
#[derive(Clone, Debug, Serialize)]
pub struct DensityReport {
    pub label: String,
    #[serde(flatten)]
    pub summary: DensitySummary,
    pub cdf: Vec<(i32, f64)>,
}

impl DensityReport {
    pub fn new(label: &str, dist: &Distribution) -> Self {
        Self {
            label: label.to_string(),
            summary: dist.summary(),
            cdf: dist.cdf(),
        }
    }
}

/// Write density reports as a JSON array.
pub fn save_density_reports(path: &Path, reports: &[DensityReport]) -> Result<()> {
    write_json(path, reports)?;
    info!(path = %path.display(), reports = reports.len(), "Wrote density report");
    Ok(())
}

/// Attempt mean/sd stored in a Long Jump table's metadata, if both are present.
pub fn attempt_stats(table: &LongJumpTable) -> Option<ActionStats> {
    stats_pair(table.meta(ATTEMPT_EV_KEY), table.meta(ATTEMPT_SD_KEY))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::PolicyOracle;

    #[test]
    fn test_sprint_rows_parse() {
        let json = r#"{
            "rows": [
                {"stage": 1, "rerolls": 5, "dice": [4, 1, 3, 2], "set1_score": null,
                 "best": "reroll", "ev_freeze": 10.0, "sd_freeze": 0.0, "ev_reroll": 11.5, "sd_reroll": 7.25},
                {"stage": 2, "rerolls": 0, "dice": [5, 5, 5, 5], "set1_score": 3, "best": "freeze"}
            ]
        }"#;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sprint.json");
        fs::write(&path, json).unwrap();

        let table = load_sprint_table(&path).unwrap();
        assert_eq!(table.len(), 2);
        let state = SprintState {
            stage: SprintStage::First,
            rerolls: 5,
            dice: FaceCounts::from_dice(&[1, 2, 3, 4]).unwrap(),
            set1_score: None,
        };
        let decision = table.decide(&state).unwrap();
        assert_eq!(decision.best, SprintAction::Reroll);
        assert_eq!(decision.best_stats(), Some(ActionStats { ev: 11.5, sd: 7.25 }));

        let terminal = SprintState {
            stage: SprintStage::Second,
            rerolls: 0,
            dice: FaceCounts::from_dice(&[5, 5, 5, 5]).unwrap(),
            set1_score: Some(3),
        };
        assert_eq!(table.decide(&terminal).unwrap().best_stats(), None);
    }

    #[test]
    fn test_sprint_stage_and_score_must_agree() {
        let json = r#"{"rows": [{"stage": 1, "rerolls": 5, "dice": [1, 1, 1, 1], "set1_score": 4, "best": "freeze"}]}"#;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, json).unwrap();
        assert!(matches!(
            load_sprint_table(&path),
            Err(DecathlonError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_duplicate_rows_rejected() {
        let row = r#"{"phase": "jump", "sum_frozen": null, "counts": [1, 0, 0, 0, 0, 0], "freeze": [1, 0, 0, 0, 0, 0]}"#;
        let json = format!(r#"{{"rows": [{}, {}]}}"#, row, row);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dup.json");
        fs::write(&path, json).unwrap();
        assert!(load_long_jump_table(&path).is_err());
    }

    #[test]
    fn test_long_jump_meta() {
        let json = r#"{
            "meta": {"attempt_ev": 11.25, "attempt_sd": 6.5},
            "rows": [{"phase": "runup", "sum_frozen": 0, "counts": [0, 0, 0, 0, 0, 1], "freeze": [0, 0, 0, 0, 0, 1]}]
        }"#;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lj.json");
        fs::write(&path, json).unwrap();
        let table = load_long_jump_table(&path).unwrap();
        assert_eq!(attempt_stats(&table), Some(ActionStats { ev: 11.25, sd: 6.5 }));
        let key = FreezeKey {
            phase: LongJumpPhase::RunUp,
            sum_frozen: Some(0),
            rolled: FaceCounts::from_dice(&[6]).unwrap(),
        };
        assert_eq!(table.decide(&key).unwrap(), FaceCounts::from_dice(&[6]).unwrap());
    }

    #[test]
    fn test_long_jump_count_rows_expand() {
        let json = r#"{"rows": [
            {"phase": "runup", "sum_frozen": 2, "counts": [1, 0, 1, 0, 0, 2], "freeze_count": 2},
            {"phase": "jump", "sum_frozen": null, "counts": [1, 0, 1, 0, 0, 2], "freeze_count": 3}
        ]}"#;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lj_count.json");
        fs::write(&path, json).unwrap();
        let table = load_long_jump_table(&path).unwrap();

        let rolled = FaceCounts::from_dice(&[1, 3, 6, 6]).unwrap();
        let runup = FreezeKey {
            phase: LongJumpPhase::RunUp,
            sum_frozen: Some(2),
            rolled,
        };
        let jump = FreezeKey {
            phase: LongJumpPhase::Jump,
            sum_frozen: None,
            rolled,
        };
        assert_eq!(table.decide(&runup).unwrap(), FaceCounts::from_dice(&[1, 3]).unwrap());
        assert_eq!(table.decide(&jump).unwrap(), FaceCounts::from_dice(&[3, 6, 6]).unwrap());

        // Saved back in per-face form.
        let saved = dir.path().join("lj_faces.json");
        save_long_jump_table(&saved, &table).unwrap();
        let text = fs::read_to_string(&saved).unwrap();
        assert!(!text.contains("freeze_count"));
        assert_eq!(load_long_jump_table(&saved).unwrap().len(), 2);
    }

    #[test]
    fn test_long_jump_count_row_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        for row in [
            r#"{"phase": "jump", "sum_frozen": null, "counts": [1, 0, 0, 0, 0, 0], "freeze_count": 2}"#,
            r#"{"phase": "jump", "sum_frozen": null, "counts": [1, 0, 0, 0, 0, 0]}"#,
        ] {
            fs::write(&path, format!(r#"{{"rows": [{}]}}"#, row)).unwrap();
            assert!(matches!(
                load_long_jump_table(&path),
                Err(DecathlonError::InvalidConfig(_))
            ));
        }
    }

    #[test]
    fn test_float_statistics_survive_round_trip() {
        let mut table = SprintTable::new();
        let state = SprintState {
            stage: SprintStage::Second,
            rerolls: 2,
            dice: FaceCounts::from_dice(&[1, 1, 4]).unwrap(),
            set1_score: Some(-18),
        };
        let awkward = [-10.881944444444445, -10.881944444444443, 0.1 + 0.2, 1.0 / 3.0, 7e-300];
        for (i, &ev) in awkward.iter().enumerate() {
            let decision = SprintDecision {
                best: SprintAction::Reroll,
                freeze: Some(ActionStats { ev: -ev, sd: ev.abs().sqrt() }),
                reroll: Some(ActionStats { ev, sd: 1.0 / (i as f64 + 3.0) }),
            };
            table.insert(state, decision);
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("sprint.json");
            save_sprint_table(&path, &table).unwrap();
            let loaded = load_sprint_table(&path).unwrap();
            assert_eq!(loaded.get(&state), Some(&decision), "ev={:e}", ev);
        }
    }

    #[test]
    fn test_density_report_json() {
        let dist = Distribution::from_pairs([(0, 0.25), (4, 0.75)]);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/report.json");
        save_density_reports(&path, &[DensityReport::new("attempt", &dist)]).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        let report = &value[0];
        assert_eq!(report["label"], "attempt");
        assert_eq!(report["mean"], 3.0);
        assert_eq!(report["cdf"][1][1], 1.0);
        assert_eq!(report["pmf"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_sprint_table(&dir.path().join("absent.json")),
            Err(DecathlonError::Io(_))
        ));
    }
}
