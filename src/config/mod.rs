//! Configuration module - environment variable parsing

use std::env;
use std::path::PathBuf;

use crate::game::BattleConfig;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Environment scope (dev, prod, ...) used to separate data and battles
    pub env: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Root of the per-environment data directories
    pub data_root: PathBuf,
    /// Root of the per-environment battle artifact directories
    pub battles_root: PathBuf,
    /// Folder holding `<username>.jpg` avatars
    pub profile_dir: PathBuf,

    /// Optional RNG seed; unset means seeded from entropy
    pub seed: Option<u64>,

    /// Simulation tunables
    pub battle: BattleConfig,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut battle = BattleConfig::default();
        if let Some(max_fighters) = parse_var::<usize>("BATTLE_MAX_FIGHTERS")? {
            if max_fighters == 0 {
                return Err(ConfigError::Invalid {
                    var: "BATTLE_MAX_FIGHTERS",
                    value: "0".to_string(),
                });
            }
            battle.max_fighters = max_fighters;
        }

        Ok(Self {
            env: env::var("BATTLE_ENV")
                .map(|v| v.trim().to_lowercase())
                .unwrap_or_else(|_| "dev".to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),

            data_root: env::var("BATTLE_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data")),
            battles_root: env::var("BATTLE_VIDEO_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("battles")),
            profile_dir: env::var("BATTLE_PROFILE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("follower_pp")),

            seed: parse_var::<u64>("BATTLE_SEED")?,
            battle,
        })
    }

    /// Configuration rooted at `root` with defaults, used by tests and tools
    pub fn rooted_at(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            env: "dev".to_string(),
            log_level: "info".to_string(),
            data_root: root.join("data"),
            battles_root: root.join("battles"),
            profile_dir: root.join("follower_pp"),
            seed: None,
            battle: BattleConfig::default(),
        }
    }

    /// Switch to another environment scope
    pub fn with_env(mut self, env: &str) -> Self {
        self.env = env.trim().to_lowercase();
        self
    }

    /// Directory holding this environment's JSON documents
    pub fn data_dir(&self) -> PathBuf {
        self.data_root.join(&self.env)
    }

    /// Directory holding this environment's battle artifacts
    pub fn battles_dir(&self) -> PathBuf {
        self.battles_root.join(&self.env)
    }
}

fn parse_var<T: std::str::FromStr>(var: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(var) {
        Ok(value) if value.trim().is_empty() => Ok(None),
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { var, value }),
        Err(_) => Ok(None),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_scoped_dirs() {
        let config = Config::rooted_at("/tmp/royale").with_env(" PROD ");
        assert_eq!(config.env, "prod");
        assert_eq!(config.data_dir(), PathBuf::from("/tmp/royale/data/prod"));
        assert_eq!(config.battles_dir(), PathBuf::from("/tmp/royale/battles/prod"));
    }

    #[test]
    fn test_rooted_defaults() {
        let config = Config::rooted_at("/tmp/royale");
        assert_eq!(config.env, "dev");
        assert_eq!(config.battle.max_fighters, 50);
        assert!(config.seed.is_none());
    }
}
