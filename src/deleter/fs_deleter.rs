use log::debug;
use std::error::Error;
use std::io;
use std::path::Path;

use super::PathDeleter;


/// Deletes paths on the local filesystem.
pub struct FsDeleter;

impl PathDeleter for FsDeleter {
    fn delete(&self, path: &Path) -> Result<(), Box<dyn Error + Send + Sync>> {
        let meta = match std::fs::symlink_metadata(path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("Path '{}' is already gone", path.display());
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        let result = if meta.is_dir() {
            std::fs::remove_dir_all(path)
        } else {
            std::fs::remove_file(path)
        };
        match result {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
