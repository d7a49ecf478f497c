//! Tracing subscriber setup for the binaries.
//!
//! Log level comes from `DECATHLON_LOG` (an `EnvFilter` directive string such as
//! `debug` or `decathlon::solver=debug`), defaulting to `info`. Output goes to
//! stderr so stdout stays clean for JSON results.

use tracing::Level;
use tracing_subscriber::EnvFilter;

pub const LOG_ENV_VAR: &str = "DECATHLON_LOG";

/// Install the global fmt subscriber. Safe to call more than once; later calls are
/// ignored.
pub fn init_logging() {
    let env_filter = EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .with_env_var(LOG_ENV_VAR)
        .from_env_lossy();

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init();
}
