//! File-backed stores: one JSON document per concern

pub mod cosmetics;
pub mod json;
pub mod last_run;
pub mod roster;
pub mod scoreboard;
pub mod stats;

use std::path::{Path, PathBuf};

pub use cosmetics::{CosmeticLookup, CustomizationFile};
pub use json::StoreError;
pub use last_run::RunRecorder;
pub use roster::{AvatarStore, DirAvatarStore, FollowerCache, RosterProvider};
pub use scoreboard::{Scoreboard, ScoreboardStore};
pub use stats::{StatsBook, StatsStore};

/// Locations of every document in one environment's data directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorePaths {
    pub scoreboard: PathBuf,
    pub stats: PathBuf,
    pub last_run_ranking: PathBuf,
    pub last_run_damage: PathBuf,
    pub last_run_battle: PathBuf,
    pub scoreboard_backup: PathBuf,
    pub stats_backup: PathBuf,
    pub customizations: PathBuf,
    pub follower_cache: PathBuf,
}

impl StorePaths {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            scoreboard: dir.join("scoreboard.json"),
            stats: dir.join("stats.json"),
            last_run_ranking: dir.join("last_run_ranking.json"),
            last_run_damage: dir.join("last_run_damage.json"),
            last_run_battle: dir.join("last_run_battle.json"),
            scoreboard_backup: dir.join("last_run_scoreboard_backup.json"),
            stats_backup: dir.join("last_run_stats_backup.json"),
            customizations: dir.join("customizations.json"),
            follower_cache: dir.join("followers_cache.json"),
        }
    }
}

/// Temp directory for one test, removed on drop
#[cfg(test)]
pub(crate) struct ScratchDir(PathBuf);

#[cfg(test)]
impl std::ops::Deref for ScratchDir {
    type Target = Path;

    fn deref(&self) -> &Path {
        &self.0
    }
}

#[cfg(test)]
impl Drop for ScratchDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}

/// Fresh scratch directory for tests
#[cfg(test)]
pub(crate) fn scratch_dir() -> ScratchDir {
    let dir = std::env::temp_dir().join(format!("battle-royale-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).expect("create scratch dir");
    ScratchDir(dir)
}
