//! HEXFRAY CLI - terminal front end for the battle engine
//!
//! Commands:
//! - play: interactive battle on an ASCII hex board
//! - simulate: headless auto-played battles with outcome tallies

mod play;
mod simulate;

use clap::{Parser, Subcommand};
use hexfray_core::Scenario;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "hexfray")]
#[command(about = "Turn-based tactical hex battles in the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a battle interactively
    Play {
        /// Scenario JSON file (defaults to the built-in skirmish)
        #[arg(long)]
        scenario: Option<PathBuf>,
        #[arg(long, default_value = "42")]
        seed: u64,
        /// Skip the enemy-turn pacing delays
        #[arg(long)]
        no_delay: bool,
    },
    /// Auto-play battles against the AI and report outcomes
    Simulate {
        /// Scenario JSON file (defaults to the built-in skirmish)
        #[arg(long)]
        scenario: Option<PathBuf>,
        #[arg(long, default_value = "20")]
        battles: u32,
        #[arg(long, default_value = "42")]
        seed: u64,
        /// Rounds before a battle is counted as stalled
        #[arg(long, default_value = "60")]
        max_rounds: u32,
    },
}

fn load_scenario(path: Option<&PathBuf>) -> anyhow::Result<Scenario> {
    match path {
        Some(p) => Scenario::load(p),
        None => Ok(Scenario::default_skirmish()),
    }
}

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Play {
            scenario,
            seed,
            no_delay,
        } => play::run(load_scenario(scenario.as_ref())?, seed, no_delay),
        Commands::Simulate {
            scenario,
            battles,
            seed,
            max_rounds,
        } => simulate::run(&load_scenario(scenario.as_ref())?, battles, seed, max_rounds),
    }
}
