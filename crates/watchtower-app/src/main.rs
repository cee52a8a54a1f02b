use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use watchtower_app::{load_config, run_headless, write_json};
use watchtower_core::WorldConfig;

#[derive(Parser, Debug)]
#[command(
    name = "watchtower",
    version,
    about = "Run area-of-interest simulations on a tower grid"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Simulate wandering agents headless and report visibility churn.
    Run {
        /// JSON world configuration; missing fields take defaults.
        #[arg(short, long, env = "WATCHTOWER_CONFIG")]
        config: Option<PathBuf>,
        /// Override the number of agents.
        #[arg(long)]
        agents: Option<usize>,
        /// Number of ticks to simulate.
        #[arg(long, default_value_t = 120)]
        ticks: u64,
        /// Override the RNG seed.
        #[arg(long)]
        seed: Option<u64>,
        /// Write the full JSON report here.
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Print the default world configuration as JSON.
    Config,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Command::Run {
            config,
            agents,
            ticks,
            seed,
            report,
        } => {
            let mut world_config = match config {
                Some(path) => load_config(&path)?,
                None => WorldConfig::default(),
            };
            if let Some(agents) = agents {
                world_config.agent_count = agents;
            }
            if seed.is_some() {
                world_config.rng_seed = seed;
            }

            let outcome = run_headless(world_config, ticks)?;
            println!("{}", serde_json::to_string_pretty(&outcome.summary)?);
            if let Some(path) = report {
                write_json(&path, &outcome)?;
                info!(path = %path.display(), "report written");
            }
        }
        Command::Config => {
            println!("{}", serde_json::to_string_pretty(&WorldConfig::default())?);
        }
    }
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
}
