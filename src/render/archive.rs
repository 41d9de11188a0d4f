//! Battle artifact archive: `battle_<n>.<ext>` numbered from 1

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::info;

use super::RenderError;

const PREFIX: &str = "battle_";

#[derive(Debug, Clone)]
pub struct BattleArchive {
    dir: PathBuf,
    extension: String,
}

impl BattleArchive {
    pub fn new(dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            extension: extension.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Battle number encoded in an artifact file name
    fn number_of(&self, path: &Path) -> Option<u64> {
        if path.extension()? != self.extension.as_str() {
            return None;
        }
        path.file_stem()?
            .to_str()?
            .strip_prefix(PREFIX)?
            .parse()
            .ok()
    }

    fn numbered(&self) -> Vec<(u64, PathBuf)> {
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return Vec::new();
        };
        entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter_map(|path| self.number_of(&path).map(|n| (n, path)))
            .collect()
    }

    /// One past the highest existing number (numeric, not lexicographic)
    pub fn next_battle_number(&self) -> u64 {
        self.latest().map_or(1, |(n, _)| n + 1)
    }

    pub fn path_for(&self, number: u64) -> PathBuf {
        self.dir.join(format!("{PREFIX}{number}.{}", self.extension))
    }

    /// Highest numbered artifact
    pub fn latest(&self) -> Option<(u64, PathBuf)> {
        self.numbered().into_iter().max_by_key(|(n, _)| *n)
    }

    /// Delete the highest numbered artifact, returning its path
    pub fn remove_latest(&self) -> Result<Option<PathBuf>, RenderError> {
        let Some((number, path)) = self.latest() else {
            return Ok(None);
        };
        match fs::remove_file(&path) {
            Ok(()) => {
                info!(battle = number, path = %path.display(), "Removed battle artifact");
                Ok(Some(path))
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(RenderError::io(&path, err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::scratch_dir;

    #[test]
    fn test_numbering_is_numeric() {
        let dir = scratch_dir();
        let archive = BattleArchive::new(dir.to_path_buf(), "jsonl");
        assert_eq!(archive.next_battle_number(), 1);
        assert!(archive.latest().is_none());

        for name in ["battle_2.jsonl", "battle_10.jsonl", "battle_9.jsonl", "battle_11.mp4", "battle_x.jsonl", "notes.jsonl"] {
            fs::write(dir.join(name), b"").unwrap();
        }
        assert_eq!(archive.next_battle_number(), 11);
        assert_eq!(archive.path_for(11), dir.join("battle_11.jsonl"));
    }

    #[test]
    fn test_remove_latest() {
        let dir = scratch_dir();
        let archive = BattleArchive::new(dir.to_path_buf(), "jsonl");
        assert!(archive.remove_latest().unwrap().is_none());

        fs::write(archive.path_for(1), b"").unwrap();
        fs::write(archive.path_for(2), b"").unwrap();
        assert_eq!(archive.remove_latest().unwrap(), Some(archive.path_for(2)));
        assert!(archive.path_for(1).exists());
        assert_eq!(archive.next_battle_number(), 2);
    }
}
