//! long_jump_density: exact Long Jump attempt and event distributions.
//!
//! The attempt distribution is reconstructed from the freeze policy, with the
//! run-up stop/continue decision recomputed per state. The event distribution is
//! the best of `--attempts` independent attempts.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info, warn};

use decathlon::constants::LONG_JUMP_ATTEMPTS;
use decathlon::env_config::{init_base_path, init_rayon_threads};
use decathlon::games::long_jump::{event_distribution, LongJumpConfig, LongJumpModel};
use decathlon::logging::init_logging;
use decathlon::oracle::BranchChoice;
use decathlon::scoring::FoulRule;
use decathlon::simulation::simulate;
use decathlon::storage::{
    attempt_stats, load_long_jump_table, save_density_reports, DensityReport,
    LONG_JUMP_POLICY_PATH,
};
use decathlon::{Result, StateSolver};

#[derive(Debug, Parser)]
#[command(name = "long_jump_density", about = "Exact Long Jump score distributions")]
struct Args {
    /// Policy table (JSON), relative to DECATHLON_BASE_PATH
    #[arg(long, env = "DECATHLON_LONG_JUMP_POLICY", default_value = LONG_JUMP_POLICY_PATH)]
    policy: PathBuf,

    /// Attempts per event; the event scores the best one
    #[arg(long, default_value_t = LONG_JUMP_ATTEMPTS)]
    attempts: u32,

    /// Score assigned to a fouled attempt
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    foul_score: i32,

    /// Write attempt and event PMF/CDF as JSON
    #[arg(long)]
    output: Option<PathBuf>,

    /// Absolute tolerance when comparing with the stored attempt_ev/attempt_sd
    #[arg(long, default_value_t = 1e-6)]
    audit_tolerance: f64,

    /// Monte Carlo events to play as a cross-check (0 disables)
    #[arg(long, default_value_t = 0)]
    simulate: usize,

    #[arg(long, default_value_t = 42)]
    seed: u64,
}

fn run(args: &Args) -> Result<()> {
    init_base_path()?;
    let table = load_long_jump_table(&args.policy)?;
    let config = LongJumpConfig {
        foul: FoulRule {
            score: args.foul_score,
        },
        ..LongJumpConfig::default()
    };
    let mut model = LongJumpModel::new(&table, config)?;
    if let Some(stats) = attempt_stats(&table) {
        model = model.with_attempt_stats(stats);
    }
    let mut solver = StateSolver::with_defaults(model);

    let attempt = solver.solve_start()?;
    let stops = solver
        .choices()
        .values()
        .filter(|&&c| c == BranchChoice::Stop)
        .count();
    info!(
        derived_states = solver.choices().len(),
        stops,
        "Run-up stop/continue decisions"
    );

    let start = solver.game().start_state();
    match solver.audit(&start, args.audit_tolerance)? {
        Some(stats) => info!(ev = stats.ev, sd = stats.sd, "Attempt matches stored statistics"),
        None => warn!("Policy has no attempt_ev/attempt_sd; skipping audit"),
    }

    let event = event_distribution(&attempt, args.attempts)?;
    let (attempt_mean, attempt_sd) = attempt.mean_and_sd();
    let (event_mean, event_sd) = event.mean_and_sd();
    info!(
        attempt_mean,
        attempt_sd,
        mass_at_foul_score = attempt.get(args.foul_score),
        event_mean,
        event_sd,
        attempts = args.attempts,
        "Long Jump"
    );

    if args.simulate > 0 {
        init_rayon_threads();
        let sim = simulate(
            solver.game(),
            solver.choices(),
            args.attempts,
            args.simulate,
            args.seed,
        )?;
        info!(
            exact_mean = event_mean,
            simulated_mean = sim.mean,
            exact_sd = event_sd,
            simulated_sd = sim.std_dev,
            "Monte Carlo cross-check"
        );
    }

    if let Some(path) = &args.output {
        save_density_reports(
            path,
            &[
                DensityReport::new("attempt", &attempt),
                DensityReport::new("event", &event),
            ],
        )?;
    }
    Ok(())
}

fn main() -> ExitCode {
    init_logging();
    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
