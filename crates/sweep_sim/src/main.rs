mod sim;

use sim::{resolve_total_ticks, SimConfig, SimError, SimSummary, Simulation};
use sweep::SweepConfig;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn main() {
    init_tracing();
    info!("=== sweep sim startup ===");

    match run() {
        Ok(summary) => log_summary(&summary),
        Err(err) => {
            error!(error = %err, "startup_failed");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<SimSummary, SimError> {
    let sweep_config = SweepConfig::load_from_env()?;
    let defaults = SimConfig::default();
    let sim_config = SimConfig {
        total_ticks: resolve_total_ticks(defaults.total_ticks),
        ..defaults
    };
    let simulation = Simulation::new(sweep_config, sim_config)?;
    Ok(simulation.run())
}

fn log_summary(summary: &SimSummary) {
    match serde_json::to_string(summary) {
        Ok(json) => info!(summary = json.as_str(), "sim_finished"),
        Err(err) => warn!(error = %err, ?summary, "sim_summary_encode_failed"),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}
