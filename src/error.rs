//! Error type shared by the oracle, solver, storage and transforms.
//!
//! Every failure here is deterministic: re-running with the same inputs fails
//! the same way, so nothing is retried. A missing policy record or a mass
//! imbalance means the upstream table or the state-key construction is wrong.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DecathlonError {
    /// The policy source has no record for a state the solver visited.
    #[error("Policy record not found for state {key}")]
    MissingPolicy { key: String },

    /// The policy prescribed an action that is illegal in its state.
    #[error("Invalid decision at state {key}: {reason}")]
    InvalidDecision { key: String, reason: String },

    /// Total probability mass drifted from 1.0 beyond the tolerance.
    #[error("Probability mass imbalance in {context}: total={total:.15}, tolerance={tolerance:e}")]
    MassImbalance {
        context: String,
        total: f64,
        tolerance: f64,
    },

    /// Reconstructed statistics disagree with the statistics the oracle reports.
    #[error("Statistics mismatch at state {key}: oracle ev={expected_ev:.9} sd={expected_sd:.9}, reconstructed ev={actual_ev:.9} sd={actual_sd:.9}")]
    StatsMismatch {
        key: String,
        expected_ev: f64,
        expected_sd: f64,
        actual_ev: f64,
        actual_sd: f64,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DecathlonError>;
