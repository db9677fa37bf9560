use std::error::Error;
use std::path::Path;

pub mod fs_deleter;
pub mod implementations;

pub use fs_deleter::FsDeleter;

/// Filesystem primitive that removes task outputs and working directories.
pub trait PathDeleter: Send + Sync {
    /// Remove a file, or recursively remove a directory. Implementations
    /// must treat an already-deleted path as success so that deletions can
    /// be retried safely.
    fn delete(&self, path: &Path) -> Result<(), Box<dyn Error + Send + Sync>>;
}
