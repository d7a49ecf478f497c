//! sprint_density: exact 100 Metres score distribution under a stored policy.
//!
//! Loads the policy table, reconstructs the start distribution, optionally audits
//! every opening state against the policy's own statistics and cross-checks the
//! result by Monte Carlo.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use decathlon::dice_mechanics::enumerate_outcomes;
use decathlon::env_config::{init_base_path, init_rayon_threads};
use decathlon::games::sprint::{SprintConfig, SprintModel, SprintStage, SprintState};
use decathlon::logging::init_logging;
use decathlon::simulation::simulate;
use decathlon::storage::{
    load_sprint_table, save_density_reports, DensityReport, SPRINT_POLICY_PATH,
};
use decathlon::{Result, StateSolver};

#[derive(Debug, Parser)]
#[command(name = "sprint_density", about = "Exact 100 Metres score distribution")]
struct Args {
    /// Policy table (JSON), relative to DECATHLON_BASE_PATH
    #[arg(long, env = "DECATHLON_SPRINT_POLICY", default_value = SPRINT_POLICY_PATH)]
    policy: PathBuf,

    /// Write PMF/CDF and summary statistics as JSON
    #[arg(long)]
    output: Option<PathBuf>,

    /// Compare each opening state's mean/sd with the policy's stored statistics
    #[arg(long)]
    audit: bool,

    /// Absolute tolerance for --audit
    #[arg(long, default_value_t = 1e-6)]
    audit_tolerance: f64,

    /// Monte Carlo games to play as a cross-check (0 disables)
    #[arg(long, default_value_t = 0)]
    simulate: usize,

    #[arg(long, default_value_t = 42)]
    seed: u64,
}

fn run(args: &Args) -> Result<()> {
    init_base_path()?;
    let table = load_sprint_table(&args.policy)?;
    let model = SprintModel::new(&table, SprintConfig::default())?;
    let mut solver = StateSolver::with_defaults(model);

    let dist = solver.solve_start()?;
    let summary = dist.summary();
    info!(
        mean = summary.mean,
        std_dev = summary.std_dev,
        p5 = summary.percentiles.get("p5").copied(),
        p50 = summary.percentiles.get("p50").copied(),
        p95 = summary.percentiles.get("p95").copied(),
        "100 Metres"
    );

    if args.audit {
        let config = *solver.game().config();
        let mut audited = 0;
        for o in enumerate_outcomes(config.dice_per_set) {
            let state = SprintState {
                stage: SprintStage::First,
                rerolls: config.rerolls,
                dice: o.counts,
                set1_score: None,
            };
            if solver.audit(&state, args.audit_tolerance)?.is_some() {
                audited += 1;
            }
        }
        info!(
            audited,
            tolerance = args.audit_tolerance,
            "Opening states match policy statistics"
        );
    }

    if args.simulate > 0 {
        init_rayon_threads();
        let sim = simulate(solver.game(), solver.choices(), 1, args.simulate, args.seed)?;
        info!(
            exact_mean = summary.mean,
            simulated_mean = sim.mean,
            exact_sd = summary.std_dev,
            simulated_sd = sim.std_dev,
            "Monte Carlo cross-check"
        );
    }

    if let Some(path) = &args.output {
        save_density_reports(path, &[DensityReport::new("sprint", &dist)])?;
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
