//! Grid Tactics - Development Tools

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tactics_core::entity::ArmyId;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tactics_tools::ascii::{army_legend, render_battle};
use tactics_tools::scenario::load_battle;
use tactics_tools::simulate::run_battle;
use tactics_tools::validate::validate_path;

#[derive(Parser)]
#[command(name = "tactics-tools")]
#[command(about = "Development tools for Grid Tactics")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a scenario file or every scenario in a directory
    Validate {
        /// Scenario file or directory
        #[arg(default_value = "crates/tactics_tools/scenarios")]
        path: PathBuf,
    },

    /// Run a headless auto-battle from a scenario
    Simulate {
        /// Scenario file
        scenario: PathBuf,

        /// Stop after this many turns
        #[arg(short, long, default_value = "100")]
        max_turns: u32,

        /// Print the final board
        #[arg(long)]
        show: bool,
    },

    /// Show the tiles an army can move to
    Movement {
        /// Scenario file
        scenario: PathBuf,

        /// Army id (armies are numbered from 1 in file order)
        #[arg(short, long)]
        army: u32,
    },
}

fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { path } => {
            tracing::info!("Validating scenarios in: {}", path.display());
            let results = match validate_path(&path) {
                Ok(results) => results,
                Err(e) => {
                    tracing::error!("Validation failed: {e}");
                    return ExitCode::FAILURE;
                }
            };

            let mut failed = false;
            for (file, result) in results {
                match result {
                    Ok(report) => println!(
                        "ok   {} ({} player, {} enemy, {} armies)",
                        file.display(),
                        report.player_troops,
                        report.enemy_troops,
                        report.armies
                    ),
                    Err(e) => {
                        failed = true;
                        println!("FAIL {}: {e}", file.display());
                    }
                }
            }
            if failed {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }

        Commands::Simulate {
            scenario,
            max_turns,
            show,
        } => {
            let result = load_battle(&scenario)
                .map_err(|e| e.to_string())
                .and_then(|mut state| {
                    run_battle(&mut state, max_turns)
                        .map(|report| (state, report))
                        .map_err(|e| e.to_string())
                });
            match result {
                Ok((state, report)) => {
                    println!("{report:#?}");
                    if show {
                        print!("{}", render_battle(&state, &BTreeSet::new()));
                        print!("{}", army_legend(&state));
                    }
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    tracing::error!("Simulation failed: {e}");
                    ExitCode::FAILURE
                }
            }
        }

        Commands::Movement { scenario, army } => {
            let result = load_battle(&scenario)
                .map_err(|e| e.to_string())
                .and_then(|state| {
                    state
                        .army_movable_tiles(ArmyId::new(army))
                        .map(|tiles| (state, tiles))
                        .map_err(|e| e.to_string())
                });
            match result {
                Ok((state, tiles)) => {
                    print!("{}", render_battle(&state, &tiles));
                    print!("{}", army_legend(&state));
                    println!("{} reachable tiles", tiles.len());
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    tracing::error!("Movement query failed: {e}");
                    ExitCode::FAILURE
                }
            }
        }
    }
}
