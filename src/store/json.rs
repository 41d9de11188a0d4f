//! JSON document helpers: tolerant loads, atomic saves

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

/// Load a document, falling back to `T::default()` when it is missing or
/// does not parse
pub fn load_json<T: DeserializeOwned + Default>(path: &Path) -> T {
    match read_json(path) {
        Ok(Some(value)) => value,
        Ok(None) => T::default(),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "Unreadable document, using default");
            T::default()
        }
    }
}

/// Load a document strictly: `None` when missing, an error when unparsable
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    match read_raw(path)? {
        Some(bytes) => serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| StoreError::Json {
                path: path.to_path_buf(),
                source,
            }),
        None => Ok(None),
    }
}

/// Persist a document with 2-space indentation.
///
/// Written to a sibling temp file and renamed over the target, so readers see
/// either the old or the new document.
pub fn save_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StoreError> {
    let bytes = serde_json::to_vec_pretty(value).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    write_raw(path, &bytes)
}

/// Raw document bytes, `None` when the file does not exist
pub fn read_raw(path: &Path) -> Result<Option<Vec<u8>>, StoreError> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(source) => Err(StoreError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Atomically replace a file's contents
pub fn write_raw(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let io_err = |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, bytes).map_err(io_err)?;
    fs::rename(&tmp, path).map_err(io_err)
}

/// Delete a file; returns whether it existed
pub fn remove_if_exists(path: &Path) -> Result<bool, StoreError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
        Err(source) => Err(StoreError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::scratch_dir;
    use std::collections::BTreeMap;

    #[test]
    fn test_missing_and_corrupt_fall_back_to_default() {
        let dir = scratch_dir();
        let path = dir.join("board.json");
        let missing: BTreeMap<String, u32> = load_json(&path);
        assert!(missing.is_empty());

        fs::write(&path, b"{not json").unwrap();
        let corrupt: BTreeMap<String, u32> = load_json(&path);
        assert!(corrupt.is_empty());
        assert!(read_json::<BTreeMap<String, u32>>(&path).is_err());
    }

    #[test]
    fn test_save_creates_parents_and_round_trips() {
        let dir = scratch_dir();
        let path = dir.join("nested/deeper/board.json");
        let mut doc = BTreeMap::new();
        doc.insert("ana".to_string(), 3u32);
        save_json(&path, &doc).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text, "{\n  \"ana\": 3\n}");
        assert_eq!(read_json::<BTreeMap<String, u32>>(&path).unwrap(), Some(doc));
        assert!(!dir.join("nested/deeper/board.json.tmp").exists());
    }

    #[test]
    fn test_remove_if_exists() {
        let dir = scratch_dir();
        let path = dir.join("gone.json");
        assert!(!remove_if_exists(&path).unwrap());
        write_raw(&path, b"[]").unwrap();
        assert!(remove_if_exists(&path).unwrap());
        assert!(read_raw(&path).unwrap().is_none());
    }
}
