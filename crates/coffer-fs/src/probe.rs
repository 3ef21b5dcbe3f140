use std::path::Path;

use crate::{Error, Result};

/// What currently occupies a path on disk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PathState {
    Missing,
    File,
    Directory { children: usize },
}

impl PathState {
    pub fn exists(self) -> bool {
        !matches!(self, Self::Missing)
    }

    pub fn is_directory(self) -> bool {
        matches!(self, Self::Directory { .. })
    }

    pub fn is_non_empty_directory(self) -> bool {
        matches!(self, Self::Directory { children } if children > 0)
    }
}

/// Classify `path` without following a trailing symlink.
///
/// Symlinks and other non-directory objects are reported as [`PathState::File`],
/// since removing them never touches what they point at.
pub fn probe(path: impl AsRef<Path>) -> Result<PathState> {
    let path = path.as_ref();
    let metadata = match std::fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(PathState::Missing),
        Err(e) => {
            return Err(Error::Read {
                path: path.to_path_buf(),
                source: e,
            });
        }
    };

    if !metadata.is_dir() {
        return Ok(PathState::File);
    }

    let children = std::fs::read_dir(path)
        .map_err(|e| Error::Read {
            path: path.to_path_buf(),
            source: e,
        })?
        .count();

    Ok(PathState::Directory { children })
}

/// Remove whatever `state` says is at `path`.
///
/// Directories are only removed when empty; a non-empty directory is an error
/// and is left as is.
pub fn remove_existing(path: impl AsRef<Path>, state: PathState) -> Result<()> {
    let path = path.as_ref();
    let removed = match state {
        PathState::Missing => return Ok(()),
        PathState::File => std::fs::remove_file(path),
        PathState::Directory { children } if children > 0 => {
            return Err(Error::DirectoryNotEmpty(path.to_path_buf()));
        }
        PathState::Directory { .. } => std::fs::remove_dir(path),
    };

    removed.map_err(|e| Error::Remove {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Whether new entries can be created inside `dir`.
pub fn is_writable_dir(dir: impl AsRef<Path>) -> bool {
    std::fs::metadata(dir.as_ref())
        .map(|m| m.is_dir() && !m.permissions().readonly())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn probe_missing() {
        let dir = tempdir().unwrap();
        assert_eq!(probe(dir.path().join("nope")).unwrap(), PathState::Missing);
    }

    #[test]
    fn probe_file_and_directory() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "a").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();

        assert_eq!(probe(dir.path().join("a.txt")).unwrap(), PathState::File);
        assert_eq!(
            probe(dir.path().join("sub")).unwrap(),
            PathState::Directory { children: 0 }
        );
        assert_eq!(
            probe(dir.path()).unwrap(),
            PathState::Directory { children: 2 }
        );
    }

    #[test]
    fn remove_existing_refuses_non_empty_directory() {
        let dir = tempdir().unwrap();
        let sub = dir.path().join("sub");
        std::fs::create_dir(&sub).unwrap();
        std::fs::write(sub.join("keep.txt"), "keep").unwrap();

        let state = probe(&sub).unwrap();
        let err = remove_existing(&sub, state).unwrap_err();
        assert!(matches!(err, Error::DirectoryNotEmpty(_)));
        assert!(sub.join("keep.txt").exists());
    }

    #[test]
    fn remove_existing_file_and_empty_directory() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("a.txt");
        let empty = dir.path().join("empty");
        std::fs::write(&file, "a").unwrap();
        std::fs::create_dir(&empty).unwrap();

        remove_existing(&file, PathState::File).unwrap();
        remove_existing(&empty, PathState::Directory { children: 0 }).unwrap();

        assert!(!file.exists());
        assert!(!empty.exists());
    }

    #[test]
    fn writable_dir() {
        let dir = tempdir().unwrap();
        assert!(is_writable_dir(dir.path()));
        assert!(!is_writable_dir(dir.path().join("missing")));
    }
}
