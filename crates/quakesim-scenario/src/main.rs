use anyhow::Result;
use clap::Parser;
use quakesim::IntensityTier;
use quakesim_scenario::{run_scenario, ScenarioConfig};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum TierArg {
    Low,
    Medium,
    High,
}

impl From<TierArg> for IntensityTier {
    fn from(tier: TierArg) -> Self {
        match tier {
            TierArg::Low => IntensityTier::Low,
            TierArg::Medium => IntensityTier::Medium,
            TierArg::High => IntensityTier::High,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "quakesim-scenario")]
#[command(author, version, about = "Headless earthquake disturbance scenario runner")]
struct Cli {
    /// Scenario TOML file; built-in defaults when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output base directory
    #[arg(long, default_value = "output-quakesim")]
    outdir: PathBuf,

    /// Shaking time in seconds
    #[arg(long)]
    duration: Option<f64>,

    #[arg(long, value_enum)]
    tier: Option<TierArg>,

    /// Ticks per second
    #[arg(long)]
    tick_rate: Option<f64>,

    /// Random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Start a second activation this many seconds in
    #[arg(long)]
    restart_at: Option<f64>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut cfg = match &cli.config {
        Some(path) => ScenarioConfig::from_toml_file(path)?,
        None => ScenarioConfig::default(),
    };
    if let Some(v) = cli.duration {
        cfg.disturbance.duration = v;
    }
    if let Some(v) = cli.tier {
        cfg.disturbance.tier = v.into();
    }
    if let Some(v) = cli.tick_rate {
        cfg.tick_rate = v;
    }
    if let Some(v) = cli.seed {
        cfg.seed = Some(v);
    }
    if let Some(v) = cli.restart_at {
        cfg.restart_at = Some(v);
    }

    let (summary, paths) = run_scenario(&cfg, &cli.outdir)?;

    println!(
        "Scenario complete. Seed: {} | Ticks: {} ({} running, {} fading)",
        summary.seed, summary.ticks, summary.running_ticks, summary.fading_ticks
    );
    println!(
        "Peak intensity: {:.3} | One-shots: {} | Haptic pulses: {}",
        summary.peak_published, summary.one_shots, summary.haptic_pulses
    );
    println!(
        "Rig residual: {:.3e} | Lights restored: {} | Props restored: {}",
        summary.rig_residual, summary.lights_restored, summary.objects_restored
    );
    println!("Run directory: {}", paths.run_dir.display());
    println!("Trace: {}", paths.trace_csv.display());
    println!("Summary: {}", paths.summary_json.display());

    Ok(())
}
