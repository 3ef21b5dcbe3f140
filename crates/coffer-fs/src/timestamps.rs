use std::path::Path;
use std::time::SystemTime;

use filetime::FileTime;

use crate::{Error, Result};

/// Set the modification time of `path`, leaving its access time alone.
pub fn set_modified(path: impl AsRef<Path>, modified: SystemTime) -> Result<()> {
    let path = path.as_ref();
    filetime::set_file_mtime(path, FileTime::from_system_time(modified)).map_err(|e| {
        Error::Timestamp {
            path: path.to_path_buf(),
            source: e,
        }
    })
}

/// Modification time of `path`.
pub fn modified(path: impl AsRef<Path>) -> Result<SystemTime> {
    let path = path.as_ref();
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(|e| Error::Read {
            path: path.to_path_buf(),
            source: e,
        })
}
