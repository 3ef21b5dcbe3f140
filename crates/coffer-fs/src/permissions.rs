use crate::Result;
use std::path::Path;

/// Permission bits to restore on an extracted file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PermissionMode {
    /// Leave whatever the process umask produced.
    #[default]
    Inherit,

    /// POSIX mode bits as stored in the archive (e.g. `0o755`).
    ///
    /// Only the permission bits (`0o7777`) are applied; file-type bits that some
    /// archivers keep in the same field are masked off.
    Unix(u32),
}

impl PermissionMode {
    /// Build from an optional stored mode, honouring whether the host applies
    /// POSIX bits at all.
    pub fn from_stored(mode: Option<u32>, posix: bool) -> Self {
        match mode {
            Some(mode) if posix => Self::Unix(mode & 0o7777),
            _ => Self::Inherit,
        }
    }

    pub fn to_unix_mode(self) -> Option<u32> {
        match self {
            Self::Inherit => None,
            Self::Unix(mode) => Some(mode & 0o7777),
        }
    }

    /// Apply the mode to `path`.
    ///
    /// No-op for [`PermissionMode::Inherit`] and on non-Unix hosts.
    pub fn apply_to_path(self, path: &Path) -> Result<()> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let Some(mode) = self.to_unix_mode() else {
                return Ok(());
            };
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).map_err(|e| {
                crate::Error::Permissions {
                    path: path.to_path_buf(),
                    source: e,
                }
            })?;
        }

        #[cfg(not(unix))]
        {
            let _ = path;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_mode_default() {
        assert_eq!(PermissionMode::default(), PermissionMode::Inherit);
    }

    #[test]
    fn from_stored_respects_host() {
        assert_eq!(
            PermissionMode::from_stored(Some(0o755), true),
            PermissionMode::Unix(0o755)
        );
        assert_eq!(
            PermissionMode::from_stored(Some(0o755), false),
            PermissionMode::Inherit
        );
        assert_eq!(PermissionMode::from_stored(None, true), PermissionMode::Inherit);
    }

    #[test]
    fn file_type_bits_are_masked() {
        // regular file type bits as written by some zip/tar producers
        let mode = PermissionMode::from_stored(Some(0o100644), true);
        assert_eq!(mode.to_unix_mode(), Some(0o644));
        assert_eq!(PermissionMode::Unix(0o104755).to_unix_mode(), Some(0o4755));
    }

    #[cfg(unix)]
    #[test]
    fn apply_unix_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tool");
        std::fs::write(&path, "#!/bin/sh").unwrap();

        PermissionMode::Unix(0o750).apply_to_path(&path).unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o750);
    }
}
