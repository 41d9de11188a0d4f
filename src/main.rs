//! Battle Royale - command line entry point
//!
//! Subcommands:
//! - `run`: animated battle over the follower cache, writes a battle artifact
//! - `quick`: non-animated battle, ledger updates only
//! - `revert`: undo the most recent run
//! - `leaderboard`: print the standings

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use battle_royale_engine::store::RosterProvider;
use battle_royale_engine::{AppState, BattleOutcome, BattleRunner, Config};

#[derive(Debug, Parser)]
#[command(name = "battle", about = "Follower battle royale and scoreboard")]
struct Cli {
    /// Environment scope (overrides BATTLE_ENV)
    #[arg(long, global = true)]
    env: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run an animated battle
    Run {
        /// RNG seed for a reproducible battle
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Run a quick battle without an artifact
    Quick {
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Undo the last run
    Revert,
    /// Show the leaderboard
    Leaderboard {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Load configuration
    let mut config = Config::from_env()?;
    if let Some(env) = cli.env.as_deref() {
        config = config.with_env(env);
    }
    if let Command::Run { seed: Some(seed) } | Command::Quick { seed: Some(seed) } = cli.command {
        config.seed = Some(seed);
    }

    init_tracing(&config.log_level);
    info!(env = %config.env, data_dir = %config.data_dir().display(), "Battle royale starting");

    let state = AppState::new(config);
    let mut runner = BattleRunner::new(state);

    match cli.command {
        Command::Run { .. } => {
            let participants = runner.state().roster.participants()?;
            let outcome = runner.run(&participants).context("battle failed")?;
            print_outcome(&outcome);
        }
        Command::Quick { .. } => {
            let participants = runner.state().roster.participants()?;
            let outcome = runner.quick_run(&participants).context("quick battle failed")?;
            print_outcome(&outcome);
        }
        Command::Revert => {
            let report = runner.revert()?;
            println!(
                "Reverted last run of {} fighters (scoreboard: {:?}, stats: {:?})",
                report.participants, report.scoreboard, report.stats
            );
            if let Some(path) = report.removed_artifact {
                println!("Removed {}", path.display());
            }
        }
        Command::Leaderboard { limit } => {
            for (rank, row) in runner.leaderboard(Some(limit)).iter().enumerate() {
                println!(
                    "{:>3}. {:<24} {:>6} pts  {:>4} runs  {:>3} wins  {:>8.0} dmg",
                    rank + 1,
                    row.username,
                    row.points,
                    row.runs,
                    row.wins,
                    row.damage
                );
            }
        }
    }

    Ok(())
}

fn print_outcome(outcome: &BattleOutcome) {
    if let Some(champion) = &outcome.champion {
        println!("Winner: {champion}");
    }
    for entry in outcome.ranking.iter().take(10) {
        println!("{:>3}. {} ({:.0} hp)", entry.order, entry.username, entry.final_health);
    }
    if let Some(path) = &outcome.video_path {
        println!("Battle saved to {}", path.display());
    }
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}
