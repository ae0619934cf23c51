// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Blob storage for named checkpoints.
//!
//! [`CheckpointStore`] is a flat key-value store of byte blobs with atomic
//! create/overwrite. [`FileCheckpointStore`] keeps one file per checkpoint
//! in a directory.

use crate::CheckpointError;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// A key-value blob store with atomic writes.
pub trait CheckpointStore: Send + Sync {
    /// Names of all stored checkpoints.
    fn list(&self) -> Result<Vec<String>, CheckpointError>;

    /// Reads a checkpoint. Returns `NotFound` if it does not exist.
    fn read(&self, name: &str) -> Result<Vec<u8>, CheckpointError>;

    /// Creates or replaces a checkpoint. Readers see either the previous
    /// contents or the new contents, never a mix.
    fn write(&self, name: &str, bytes: &[u8]) -> Result<(), CheckpointError>;

    /// Removes a checkpoint. Succeeds if it does not exist.
    fn remove(&self, name: &str) -> Result<(), CheckpointError>;
}

/// Directory-backed checkpoint store.
#[derive(Debug, Clone)]
pub struct FileCheckpointStore {
    dir: PathBuf,
}

impl FileCheckpointStore {
    /// Opens a store rooted at `dir`, creating the directory if needed.
    pub fn new(dir: &Path) -> Result<Self, CheckpointError> {
        std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    /// The backing directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, name: &str) -> Result<PathBuf, CheckpointError> {
        if name.is_empty()
            || name.starts_with('.')
            || name.contains(std::path::is_separator)
        {
            return Err(CheckpointError::InvalidName(name.to_string()));
        }
        Ok(self.dir.join(name))
    }
}

impl CheckpointStore for FileCheckpointStore {
    fn list(&self) -> Result<Vec<String>, CheckpointError> {
        let mut names = Vec::new();
        let entries = std::fs::read_dir(&self.dir).map_err(|e| io_err(&self.dir, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| io_err(&self.dir, e))?;
            let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
            let name = entry.file_name().to_string_lossy().into_owned();
            // Hidden entries are in-flight temporary files.
            if is_file && !name.starts_with('.') {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    fn read(&self, name: &str) -> Result<Vec<u8>, CheckpointError> {
        let path = self.path_for(name)?;
        std::fs::read(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CheckpointError::NotFound(name.to_string())
            } else {
                io_err(&path, e)
            }
        })
    }

    fn write(&self, name: &str, bytes: &[u8]) -> Result<(), CheckpointError> {
        let path = self.path_for(name)?;
        let tmp = self.dir.join(format!(".{name}.tmp"));

        if let Err(e) = write_then_rename(&tmp, &path, bytes) {
            let _ = std::fs::remove_file(&tmp);
            return Err(e);
        }
        sync_directory(&self.dir)
    }

    fn remove(&self, name: &str) -> Result<(), CheckpointError> {
        let path = self.path_for(name)?;
        match std::fs::remove_file(&path) {
            Ok(()) => sync_directory(&self.dir),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_err(&path, e)),
        }
    }
}

fn write_then_rename(tmp: &Path, path: &Path, bytes: &[u8]) -> Result<(), CheckpointError> {
    let mut f = File::create(tmp).map_err(|e| io_err(tmp, e))?;
    f.write_all(bytes).map_err(|e| io_err(tmp, e))?;
    f.sync_all().map_err(|e| io_err(tmp, e))?;
    std::fs::rename(tmp, path).map_err(|e| io_err(path, e))
}

fn io_err(path: &Path, source: std::io::Error) -> CheckpointError {
    CheckpointError::Io {
        path: path.display().to_string(),
        source,
    }
}

#[cfg(unix)]
fn sync_directory(path: &Path) -> Result<(), CheckpointError> {
    let dir = File::open(path).map_err(|e| io_err(path, e))?;
    dir.sync_all().map_err(|e| io_err(path, e))
}

#[cfg(not(unix))]
fn sync_directory(_path: &Path) -> Result<(), CheckpointError> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_read_list_remove() {
        let tmp = TempDir::new().unwrap();
        let store = FileCheckpointStore::new(tmp.path()).unwrap();
        assert!(store.list().unwrap().is_empty());

        store.write("checkpoint.json", b"one").unwrap();
        store.write("checkpoint.json", b"two").unwrap();
        assert_eq!(store.read("checkpoint.json").unwrap(), b"two".to_vec());
        assert_eq!(store.list().unwrap(), vec!["checkpoint.json".to_string()]);

        store.remove("checkpoint.json").unwrap();
        store.remove("checkpoint.json").unwrap();
        assert!(matches!(
            store.read("checkpoint.json"),
            Err(CheckpointError::NotFound(_))
        ));
    }

    #[test]
    fn test_creates_missing_directory() {
        let tmp = TempDir::new().unwrap();
        let nested = tmp.path().join("plugins").join("cpu.nvidia.com");
        let store = FileCheckpointStore::new(&nested).unwrap();
        store.write("c", b"x").unwrap();
        assert!(nested.join("c").is_file());
    }

    #[test]
    fn test_rejects_path_like_names() {
        let tmp = TempDir::new().unwrap();
        let store = FileCheckpointStore::new(tmp.path()).unwrap();
        assert!(matches!(
            store.write("../escape", b"x"),
            Err(CheckpointError::InvalidName(_))
        ));
        assert!(store.read(".hidden").is_err());
        assert!(store.write("", b"x").is_err());
    }

    #[test]
    fn test_write_is_atomic_when_temp_creation_fails() {
        let tmp = TempDir::new().unwrap();
        let store = FileCheckpointStore::new(tmp.path()).unwrap();
        store.write("checkpoint.json", b"original").unwrap();

        std::fs::create_dir(tmp.path().join(".checkpoint.json.tmp")).unwrap();
        let err = store.write("checkpoint.json", b"replacement").unwrap_err();
        assert!(matches!(err, CheckpointError::Io { .. }));
        assert_eq!(store.read("checkpoint.json").unwrap(), b"original".to_vec());
    }

    #[test]
    fn test_write_is_atomic_when_rename_fails() {
        let tmp = TempDir::new().unwrap();
        let store = FileCheckpointStore::new(tmp.path()).unwrap();
        std::fs::create_dir(tmp.path().join("checkpoint.json")).unwrap();

        assert!(store.write("checkpoint.json", b"data").is_err());
        assert!(tmp.path().join("checkpoint.json").is_dir());
        assert!(!tmp.path().join(".checkpoint.json.tmp").exists());
    }

    #[test]
    fn test_list_skips_temp_files_and_directories() {
        let tmp = TempDir::new().unwrap();
        let store = FileCheckpointStore::new(tmp.path()).unwrap();
        std::fs::write(tmp.path().join(".x.tmp"), b"partial").unwrap();
        std::fs::create_dir(tmp.path().join("subdir")).unwrap();
        store.write("a", b"1").unwrap();
        assert_eq!(store.list().unwrap(), vec!["a".to_string()]);
    }
}
