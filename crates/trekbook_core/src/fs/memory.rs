// ============================================================================
// InMemoryFileSystem - Available on all targets
// ============================================================================

use std::collections::{HashMap, HashSet};
use std::io::{Error, ErrorKind, Result};
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, RwLock};

use super::FileSystem;

/// An in-memory filesystem implementation
/// Useful for tests and for ephemeral runs that should not touch the disk
#[derive(Clone, Default)]
pub struct InMemoryFileSystem {
    /// Files stored as path -> bytes
    files: Arc<RwLock<HashMap<PathBuf, Vec<u8>>>>,
    /// Directories that exist (implicitly created when files are added)
    directories: Arc<RwLock<HashSet<PathBuf>>>,
}

impl InMemoryFileSystem {
    /// Create a new empty in-memory filesystem
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a list of all file paths in the filesystem
    pub fn list_all_files(&self) -> Vec<PathBuf> {
        let files = self.files.read().unwrap_or_else(|e| e.into_inner());
        let mut paths: Vec<PathBuf> = files.keys().cloned().collect();
        paths.sort();
        paths
    }

    /// Clear all files and directories
    pub fn clear(&self) {
        self.files.write().unwrap_or_else(|e| e.into_inner()).clear();
        self.directories
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    /// Helper to normalize paths (remove . and .. components where possible)
    fn normalize_path(path: &Path) -> PathBuf {
        let mut components = Vec::new();
        for component in path.components() {
            match component {
                Component::CurDir => {}
                Component::ParentDir => {
                    components.pop();
                }
                c => components.push(c),
            }
        }
        components.iter().collect()
    }

    fn register_parents(&self, path: &Path) {
        let mut dirs = self.directories.write().unwrap_or_else(|e| e.into_inner());
        let mut current = path;
        while let Some(parent) = current.parent() {
            if !parent.as_os_str().is_empty() {
                dirs.insert(parent.to_path_buf());
            }
            current = parent;
        }
    }

    fn store(&self, path: &Path, content: Vec<u8>) {
        let path = Self::normalize_path(path);
        self.register_parents(&path);
        self.files
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(path, content);
    }
}

impl FileSystem for InMemoryFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        let bytes = self.read_binary(path)?;
        String::from_utf8(bytes).map_err(|e| Error::new(ErrorKind::InvalidData, e))
    }

    fn write_file(&self, path: &Path, content: &str) -> Result<()> {
        self.store(path, content.as_bytes().to_vec());
        Ok(())
    }

    fn delete_file(&self, path: &Path) -> Result<()> {
        let path = Self::normalize_path(path);
        let mut files = self.files.write().unwrap_or_else(|e| e.into_inner());
        match files.remove(&path) {
            Some(_) => Ok(()),
            None => Err(Error::new(
                ErrorKind::NotFound,
                format!("File not found: {:?}", path),
            )),
        }
    }

    fn exists(&self, path: &Path) -> bool {
        let path = Self::normalize_path(path);
        self.files
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(&path)
            || self
                .directories
                .read()
                .unwrap_or_else(|e| e.into_inner())
                .contains(&path)
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        let path = Self::normalize_path(path);
        self.register_parents(&path);
        self.directories
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(path);
        Ok(())
    }

    fn replace_file(&self, from: &Path, to: &Path) -> Result<()> {
        let from = Self::normalize_path(from);
        let content = self
            .files
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&from)
            .ok_or_else(|| {
                Error::new(
                    ErrorKind::NotFound,
                    format!("Source file not found: {:?}", from),
                )
            })?;
        self.store(to, content);
        Ok(())
    }

    fn read_binary(&self, path: &Path) -> Result<Vec<u8>> {
        let path = Self::normalize_path(path);
        self.files
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&path)
            .cloned()
            .ok_or_else(|| Error::new(ErrorKind::NotFound, format!("File not found: {:?}", path)))
    }

    fn write_binary(&self, path: &Path, content: &[u8]) -> Result<()> {
        self.store(path, content.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parents_are_implicit_directories() {
        let fs = InMemoryFileSystem::new();
        fs.write_file(Path::new("data/offlineQueue/pendingMemories.json"), "[]")
            .unwrap();
        assert!(fs.exists(Path::new("data/offlineQueue")));
        assert!(fs.exists(Path::new("data")));
    }

    #[test]
    fn test_replace_overwrites_destination() {
        let fs = InMemoryFileSystem::new();
        fs.write_file(Path::new("a.json"), "old").unwrap();
        fs.write_file(Path::new("a.json.tmp"), "new").unwrap();
        fs.replace_file(Path::new("a.json.tmp"), Path::new("a.json"))
            .unwrap();
        assert_eq!(fs.read_to_string(Path::new("a.json")).unwrap(), "new");
        assert_eq!(fs.list_all_files(), vec![PathBuf::from("a.json")]);
    }

    #[test]
    fn test_delete_missing_file_is_not_found() {
        let fs = InMemoryFileSystem::new();
        let err = fs.delete_file(Path::new("./nope.jpg")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
