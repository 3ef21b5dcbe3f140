use crate::{Error, Result};
use std::path::Path;

pub struct Options {
    pub retry_count: u32,
    pub retry_delay: std::time::Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            retry_count: 5,
            retry_delay: std::time::Duration::from_millis(100),
        }
    }
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn retry_count(mut self, count: u32) -> Self {
        self.retry_count = count;
        self
    }
    pub fn retry_delay(mut self, delay: std::time::Duration) -> Self {
        self.retry_delay = delay;
        self
    }
}

/// Move `replacement` onto `dest`, replacing the file that is there.
///
/// On Unix this is a single `rename`, so `dest` either keeps its old content or
/// gets the new one. Elsewhere the old file has to be removed first; that happens
/// immediately before the move, and the move is retried while the old handle
/// drains. If the move ultimately fails after removal, the error reports
/// `original_removed: true` and `replacement` is left in place.
pub fn replace_file(
    replacement: impl AsRef<Path>,
    dest: impl AsRef<Path>,
    options: Options,
) -> Result<()> {
    let replacement = replacement.as_ref();
    let dest = dest.as_ref();

    #[cfg(unix)]
    {
        let _ = options;
        std::fs::rename(replacement, dest).map_err(|e| Error::ReplaceFile {
            path: dest.to_path_buf(),
            replacement: replacement.to_path_buf(),
            original_removed: false,
            source: e,
        })
    }

    #[cfg(not(unix))]
    {
        use std::thread;
        let mut attempts = 0;
        let mut original_removed = !dest.exists();
        loop {
            if !original_removed {
                match std::fs::remove_file(dest) {
                    Ok(()) => original_removed = true,
                    Err(e) => {
                        attempts += 1;
                        if attempts >= options.retry_count {
                            return Err(Error::ReplaceFile {
                                path: dest.to_path_buf(),
                                replacement: replacement.to_path_buf(),
                                original_removed,
                                source: e,
                            });
                        }
                        thread::sleep(options.retry_delay * attempts);
                        continue;
                    }
                }
            }

            match std::fs::rename(replacement, dest) {
                Ok(_) => return Ok(()),
                Err(e) => {
                    attempts += 1;
                    if attempts >= options.retry_count {
                        return Err(Error::ReplaceFile {
                            path: dest.to_path_buf(),
                            replacement: replacement.to_path_buf(),
                            original_removed,
                            source: e,
                        });
                    }
                    thread::sleep(options.retry_delay * attempts);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_replace_file() {
        let dir = tempdir().unwrap();
        let shadow = dir.path().join("archive.tar.shadow");
        let dest = dir.path().join("archive.tar");
        std::fs::write(&dest, "old").unwrap();
        std::fs::write(&shadow, "new").unwrap();

        replace_file(&shadow, &dest, Options::new()).unwrap();
        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "new");
        assert!(!shadow.exists());
    }

    #[test]
    fn test_replace_file_missing_replacement_keeps_original() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("archive.tar");
        std::fs::write(&dest, "old").unwrap();

        let options = Options::new().retry_count(1);
        let err = replace_file(dir.path().join("gone"), &dest, options).unwrap_err();
        assert!(matches!(err, Error::ReplaceFile { .. }));
        #[cfg(unix)]
        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "old");
    }
}
