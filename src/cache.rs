//! Output fingerprints, so unchanged outputs are never rewritten.

use crate::error::{Result, TransformError};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Default)]
pub struct OutputCache {
    fingerprints: HashMap<PathBuf, String>,
}

impl OutputCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn compute_hash(contents: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(contents);
        format!("{:x}", hasher.finalize())
    }

    /// Fingerprint of what is currently at `path`, remembered or read from disk.
    fn current(&mut self, path: &Path) -> Option<String> {
        if let Some(hash) = self.fingerprints.get(path) {
            return Some(hash.clone());
        }
        let existing = fs::read(path).ok()?;
        let hash = Self::compute_hash(&existing);
        self.fingerprints.insert(path.to_path_buf(), hash.clone());
        Some(hash)
    }

    /// Write `contents` to `path` unless it already holds them. Returns whether a write happened.
    pub fn write(&mut self, path: &Path, contents: &[u8]) -> Result<bool> {
        let hash = Self::compute_hash(contents);
        if self.current(path).as_deref() == Some(hash.as_str()) && path.is_file() {
            return Ok(false);
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| TransformError::Io(parent.to_path_buf(), e))?;
        }
        fs::write(path, contents).map_err(|e| TransformError::Io(path.to_path_buf(), e))?;
        self.fingerprints.insert(path.to_path_buf(), hash);
        Ok(true)
    }

    /// Delete the output at `path`, file or whole directory, and forget it.
    /// Returns whether anything was removed.
    pub fn remove(&mut self, path: &Path) -> Result<bool> {
        self.fingerprints.retain(|known, _| !known.starts_with(path));
        if path.is_dir() {
            fs::remove_dir_all(path).map_err(|e| TransformError::Io(path.to_path_buf(), e))?;
            return Ok(true);
        }
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(path).map_err(|e| TransformError::Io(path.to_path_buf(), e))?;
        Ok(true)
    }

    /// Delete every file under `root` that is not in `keep`, then the directories
    /// left empty. Returns the removed files.
    pub fn prune(&mut self, root: &Path, keep: &HashSet<PathBuf>) -> Result<Vec<PathBuf>> {
        let mut removed = Vec::new();
        if !root.is_dir() {
            return Ok(removed);
        }
        for entry in WalkDir::new(root).min_depth(1).contents_first(true) {
            let entry = entry.map_err(|e| TransformError::Io(root.to_path_buf(), e.into()))?;
            let path = entry.path();
            if entry.file_type().is_dir() {
                let empty = fs::read_dir(path).is_ok_and(|mut children| children.next().is_none());
                if empty {
                    fs::remove_dir(path).map_err(|e| TransformError::Io(path.to_path_buf(), e))?;
                }
            } else if !keep.contains(path) {
                fs::remove_file(path).map_err(|e| TransformError::Io(path.to_path_buf(), e))?;
                self.fingerprints.remove(path);
                removed.push(path.to_path_buf());
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_skips_identical_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out.js");
        let mut cache = OutputCache::new();
        assert!(cache.write(&path, b"a").unwrap());
        assert!(!cache.write(&path, b"a").unwrap());
        assert!(cache.write(&path, b"b").unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "b");
    }

    #[test]
    fn test_fresh_cache_reads_existing_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.js");
        fs::write(&path, "same").unwrap();
        let mut cache = OutputCache::new();
        assert!(!cache.write(&path, b"same").unwrap());
    }

    #[test]
    fn test_remove() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.js");
        let mut cache = OutputCache::new();
        cache.write(&path, b"x").unwrap();
        assert!(cache.remove(&path).unwrap());
        assert!(!path.exists());
        assert!(!cache.remove(&path).unwrap());
        // Rewriting after removal must hit the disk again.
        assert!(cache.write(&path, b"x").unwrap());
    }

    #[test]
    fn test_remove_directory() {
        let dir = tempfile::tempdir().unwrap();
        let page = dir.path().join("pages/a/index.js");
        let mut cache = OutputCache::new();
        cache.write(&page, b"x").unwrap();
        assert!(cache.remove(&dir.path().join("pages/a")).unwrap());
        assert!(!page.exists());
        assert!(cache.write(&page, b"x").unwrap());
    }

    #[test]
    fn test_prune_keeps_listed_files() {
        let dir = tempfile::tempdir().unwrap();
        let kept = dir.path().join("app.js");
        let stale = dir.path().join("pages/old/index.js");
        let mut cache = OutputCache::new();
        cache.write(&kept, b"app").unwrap();
        cache.write(&stale, b"old").unwrap();

        let keep = HashSet::from([kept.clone()]);
        assert_eq!(cache.prune(dir.path(), &keep).unwrap(), vec![stale.clone()]);
        assert!(kept.exists());
        assert!(!dir.path().join("pages").exists());
        assert!(cache.prune(&dir.path().join("missing"), &keep).unwrap().is_empty());
    }
}
