//! Shared environment configuration for the binaries.
//!
//! Consolidates the `DECATHLON_BASE_PATH` and `RAYON_NUM_THREADS` reads.

use std::path::PathBuf;

use tracing::info;

use crate::error::{DecathlonError, Result};

pub const BASE_PATH_ENV_VAR: &str = "DECATHLON_BASE_PATH";

const DEFAULT_THREADS: usize = 8;

/// Read `DECATHLON_BASE_PATH` (default `"."`) and chdir into it, so relative policy
/// paths resolve against it.
pub fn init_base_path() -> Result<PathBuf> {
    let base_path = std::env::var(BASE_PATH_ENV_VAR).unwrap_or_else(|_| ".".to_string());
    std::env::set_current_dir(&base_path).map_err(|e| {
        DecathlonError::InvalidConfig(format!(
            "failed to change directory to {}: {}",
            base_path, e
        ))
    })?;
    let cwd = std::env::current_dir()?;
    info!(base_path = %base_path, cwd = %cwd.display(), "Working directory");
    Ok(PathBuf::from(base_path))
}

/// Thread count from `RAYON_NUM_THREADS` (fallback `OMP_NUM_THREADS`, default 8).
pub fn thread_count() -> usize {
    std::env::var("RAYON_NUM_THREADS")
        .or_else(|_| std::env::var("OMP_NUM_THREADS"))
        .ok()
        .and_then(|s| s.parse().ok())
        .filter(|&n| n > 0)
        .unwrap_or(DEFAULT_THREADS)
}

/// Build the rayon global pool. Tolerates an already-initialized pool. Returns the
/// thread count requested.
pub fn init_rayon_threads() -> usize {
    let num_threads = thread_count();
    if rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build_global()
        .is_err()
    {
        info!("Rayon pool already initialised");
    }
    info!(threads = num_threads, "Rayon threads");
    num_threads
}
