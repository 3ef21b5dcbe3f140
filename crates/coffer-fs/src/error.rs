use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to remove existing '{path}': {source}")]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("refusing to remove non-empty directory '{0}'")]
    DirectoryNotEmpty(PathBuf),

    #[error("failed to replace '{path}' with '{replacement}': {source}")]
    ReplaceFile {
        path: PathBuf,
        replacement: PathBuf,
        /// Whether the original was already removed when the move failed.
        original_removed: bool,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to set modification time on '{path}': {source}")]
    Timestamp {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to set permissions on '{path}': {source}")]
    Permissions {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// The path the failed operation was acting on.
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::Read { path, .. }
            | Self::Write { path, .. }
            | Self::Remove { path, .. }
            | Self::DirectoryNotEmpty(path)
            | Self::ReplaceFile { path, .. }
            | Self::Timestamp { path, .. }
            | Self::Permissions { path, .. } => path,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
