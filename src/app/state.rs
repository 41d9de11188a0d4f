//! Application state: the stores of one environment, wired from config

use std::sync::Arc;

use crate::config::Config;
use crate::render::BattleArchive;
use crate::store::{
    CustomizationFile, DirAvatarStore, FollowerCache, RunRecorder, ScoreboardStore, StatsStore,
    StorePaths,
};

/// Everything a run or revert touches
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub paths: StorePaths,
    pub scoreboard: ScoreboardStore,
    pub stats: StatsStore,
    pub recorder: RunRecorder,
    pub roster: FollowerCache,
    pub avatars: DirAvatarStore,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);
        let paths = StorePaths::in_dir(&config.data_dir());

        let scoreboard = ScoreboardStore::new(&paths.scoreboard);
        let stats = StatsStore::new(&paths.stats);
        let recorder = RunRecorder::new(paths.clone());

        // Roster and avatars share the profile folder
        let roster = FollowerCache::new(&paths.follower_cache, &config.profile_dir);
        let avatars = DirAvatarStore::new(&config.profile_dir);

        Self {
            config,
            paths,
            scoreboard,
            stats,
            recorder,
            roster,
            avatars,
        }
    }

    /// Cosmetic state as of now; re-read for every run
    pub fn cosmetics(&self) -> CustomizationFile {
        CustomizationFile::load(&self.paths.customizations)
    }

    /// Artifact archive for files with `extension`
    pub fn archive(&self, extension: &str) -> BattleArchive {
        BattleArchive::new(self.config.battles_dir(), extension)
    }
}
