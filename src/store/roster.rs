//! Roster and avatar boundaries backed by local files

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::json::{load_json, read_raw, StoreError};
use crate::game::Participant;

/// Where the roster for a run comes from
pub trait RosterProvider {
    fn participants(&self) -> Result<Vec<Participant>, StoreError>;
}

/// Avatar images by participant id
pub trait AvatarStore {
    fn avatar(&self, username: &str) -> Result<Option<Vec<u8>>, StoreError>;

    fn has_avatar(&self, username: &str) -> bool {
        matches!(self.avatar(username), Ok(Some(_)))
    }
}

fn avatar_path(profile_dir: &Path, username: &str) -> PathBuf {
    profile_dir.join(format!("{username}.jpg"))
}

/// `<profile_dir>/<id>.jpg`
#[derive(Debug, Clone)]
pub struct DirAvatarStore {
    profile_dir: PathBuf,
}

impl DirAvatarStore {
    pub fn new(profile_dir: impl Into<PathBuf>) -> Self {
        Self {
            profile_dir: profile_dir.into(),
        }
    }

    /// Ids with an avatar on disk
    fn local_ids(&self) -> Vec<String> {
        let Ok(dir) = fs::read_dir(&self.profile_dir) else {
            return Vec::new();
        };
        dir.filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "jpg"))
            .filter_map(|path| path.file_stem().and_then(|s| s.to_str()).map(str::to_string))
            .collect()
    }
}

impl AvatarStore for DirAvatarStore {
    fn avatar(&self, username: &str) -> Result<Option<Vec<u8>>, StoreError> {
        read_raw(&avatar_path(&self.profile_dir, username))
    }

    fn has_avatar(&self, username: &str) -> bool {
        avatar_path(&self.profile_dir, username).is_file()
    }
}

/// Roster from `followers_cache.json` (a list of ids) plus every avatar
/// already in the profile folder
#[derive(Debug, Clone)]
pub struct FollowerCache {
    cache_path: PathBuf,
    avatars: DirAvatarStore,
}

impl FollowerCache {
    pub fn new(cache_path: impl Into<PathBuf>, profile_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_path: cache_path.into(),
            avatars: DirAvatarStore::new(profile_dir),
        }
    }
}

impl RosterProvider for FollowerCache {
    fn participants(&self) -> Result<Vec<Participant>, StoreError> {
        let cached: Vec<String> = load_json(&self.cache_path);
        let names: BTreeSet<String> = cached
            .into_iter()
            .chain(self.avatars.local_ids())
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect();

        let missing = names
            .iter()
            .filter(|name| !self.avatars.has_avatar(name))
            .count();
        if missing > 0 {
            warn!(missing, "Some followers have no avatar on disk");
        }
        debug!(participants = names.len(), "Loaded follower cache");

        Ok(names
            .into_iter()
            .map(|name| {
                let pic = avatar_path(&self.avatars.profile_dir, &name);
                Participant::new(name, pic.to_string_lossy())
            })
            .collect())
    }
}

/// A fixed roster, mostly for tests and scripted runs
impl RosterProvider for Vec<Participant> {
    fn participants(&self) -> Result<Vec<Participant>, StoreError> {
        Ok(self.clone())
    }
}
