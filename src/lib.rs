//! Battle Royale Engine - elimination tournament simulation and scoring ledger
//!
//! The crate is split the same way a run flows:
//! - `game`: roster building, the physics arena, damage and ranking
//! - `render`: the boundary to whatever turns frames into an artifact
//! - `store`: file-backed scoreboard, stats and last-run documents
//! - `app`: wiring plus the `run` / `revert` entry points

pub mod app;
pub mod config;
pub mod game;
pub mod render;
pub mod store;
pub mod util;

pub use app::{AppState, BattleOutcome, BattleRunner, RevertReport, RevertStrategy, RunError};
pub use config::Config;
pub use store::last_run::RevertError;
