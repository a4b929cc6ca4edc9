//! Dark brem simulation command-line interface.
//!
//! ```sh
//! dbsim run job.toml --events 1000 --header run_header.json
//! dbsim validate job.toml
//! dbsim models
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};
use dark_brem_sim::biasing::operator_class_names;
use dark_brem_sim::{load_config, model_names, Simulator};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "dbsim")]
#[command(about = "Dark bremsstrahlung simulation with cross-section biasing")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a simulation from a TOML configuration file.
    Run {
        /// Path to the job configuration file.
        config: PathBuf,
        /// Number of events (overrides config file setting).
        #[arg(short, long)]
        events: Option<u64>,
        /// Write the run header as JSON to this file.
        #[arg(long)]
        header: Option<PathBuf>,
    },
    /// Validate a configuration file without running the simulation.
    Validate {
        /// Path to the job configuration file.
        config: PathBuf,
    },
    /// List the registered dark brem models and biasing operators.
    Models,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            events,
            header,
        } => {
            let job = load_config(&config)
                .with_context(|| format!("loading {}", config.display()))?;
            println!("Configuration: {}", config.display());

            let mut sim = Simulator::from_config(&job)?;
            sim.begin_run()?;
            let n_events = events.unwrap_or(job.run.events);
            let summary = sim.run(n_events)?;

            println!("Events:               {}", summary.events);
            println!("Interactions:         {}", summary.interactions);
            println!("Dark brem count:      {}", summary.dark_brem_count);
            println!("Weighted dark brem:   {:e}", summary.weighted_dark_brem);

            if let Some(path) = header {
                let json = sim.header().to_json()?;
                std::fs::write(&path, json)
                    .with_context(|| format!("writing run header to {}", path.display()))?;
                println!("Run header written to {}", path.display());
            }
            Ok(())
        }
        Commands::Validate { config } => {
            let job = load_config(&config)
                .with_context(|| format!("loading {}", config.display()))?;
            job.validate()?;
            println!("Configuration is valid: {}", config.display());
            Ok(())
        }
        Commands::Models => {
            println!("Dark brem models:");
            for name in model_names() {
                println!("  {}", name);
            }
            println!();
            println!("Biasing operators:");
            for name in operator_class_names() {
                println!("  {}", name);
            }
            Ok(())
        }
    }
}
