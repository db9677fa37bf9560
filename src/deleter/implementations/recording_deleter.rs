use std::collections::HashSet;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::deleter::PathDeleter;

/// Test double that records delete calls instead of touching the filesystem.
#[derive(Clone, Default)]
pub struct RecordingDeleter {
    calls: Arc<Mutex<Vec<PathBuf>>>,
    deleted: Arc<Mutex<Vec<PathBuf>>>,
    fail_once: Arc<Mutex<HashSet<PathBuf>>>,
}

impl RecordingDeleter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next delete of `path` fail; later attempts succeed.
    pub fn fail_once(&self, path: impl Into<PathBuf>) {
        self.fail_once.lock().unwrap().insert(path.into());
    }

    /// All delete calls in issue order, including failed attempts.
    pub fn calls(&self) -> Vec<PathBuf> {
        self.calls.lock().unwrap().clone()
    }

    /// Paths whose deletion succeeded, in issue order.
    pub fn deleted(&self) -> Vec<PathBuf> {
        self.deleted.lock().unwrap().clone()
    }

    pub fn was_deleted(&self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        self.deleted.lock().unwrap().iter().any(|p| p == path)
    }
}

impl PathDeleter for RecordingDeleter {
    fn delete(&self, path: &Path) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.calls.lock().unwrap().push(path.to_path_buf());
        if self.fail_once.lock().unwrap().remove(path) {
            return Err(format!("injected failure deleting '{}'", path.display()).into());
        }
        self.deleted.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }
}
