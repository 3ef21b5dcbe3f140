use std::path::{Path, PathBuf};

/// Facts about the machine an archive is extracted on.
///
/// Passed explicitly into extraction so nothing reads process-wide state
/// behind the caller's back.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Host {
    working_dir: Option<PathBuf>,
    posix_modes: bool,
}

impl Default for Host {
    fn default() -> Self {
        Self::current()
    }
}

impl Host {
    /// Snapshot of the running process: its working directory and whether
    /// the platform has POSIX permission bits.
    pub fn current() -> Self {
        Self {
            working_dir: std::env::current_dir().ok(),
            posix_modes: cfg!(unix),
        }
    }

    /// A host with no working directory and the platform's permission model.
    pub fn detached() -> Self {
        Self {
            working_dir: None,
            posix_modes: cfg!(unix),
        }
    }

    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn posix_modes(mut self, enabled: bool) -> Self {
        self.posix_modes = enabled;
        self
    }

    pub fn current_dir(&self) -> Option<&Path> {
        self.working_dir.as_deref()
    }

    pub fn has_posix_modes(&self) -> bool {
        self.posix_modes
    }

    /// Whether `path` names the working directory, comparing canonical forms
    /// when both sides exist.
    pub fn is_working_dir(&self, path: &Path) -> bool {
        let Some(cwd) = self.current_dir() else {
            return false;
        };
        match (std::fs::canonicalize(cwd), std::fs::canonicalize(path)) {
            (Ok(cwd), Ok(path)) => cwd == path,
            _ => cwd == path,
        }
    }
}
