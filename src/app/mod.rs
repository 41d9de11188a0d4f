//! Application layer

pub mod runner;
pub mod state;

pub use runner::{BattleOutcome, BattleRunner, RevertReport, RevertStrategy, RunError};
pub use state::AppState;
