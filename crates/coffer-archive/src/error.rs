use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use crate::archive::ArchiveMode;
use crate::format::ArchiveFormat;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unsupported archive format '{0}'")]
    UnsupportedFormat(String),

    #[error("cannot {operation} on an archive opened for {mode}")]
    InvalidOperationForMode {
        mode: ArchiveMode,
        operation: &'static str,
    },

    #[error("{format} archives cannot {operation}")]
    FormatUnsupportedOperation {
        format: ArchiveFormat,
        operation: &'static str,
    },

    #[error("gzip archive '{path}' already holds an entry, cannot add '{entry}'")]
    MultipleEntriesNotSupported { path: PathBuf, entry: String },

    #[error("archive '{0}' is already closed")]
    ArchiveClosed(PathBuf),

    #[error("failed to open archive '{path}': {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to finalize archive '{path}': {source}")]
    ArchiveFinalizationFailed {
        path: PathBuf,
        #[source]
        source: Box<Error>,
    },

    #[error("archive '{path}' is corrupted: {reason}")]
    Corrupted { path: PathBuf, reason: String },

    #[error("invalid entry path '{entry}': {reason}")]
    InvalidPath { entry: String, reason: &'static str },

    #[error("destination '{0}' already exists")]
    DestinationExists(PathBuf),

    #[error("destination '{0}' is a non-empty directory")]
    DestinationIsNonEmptyDirectory(PathBuf),

    #[error("refusing to overwrite the working directory '{0}'")]
    CannotOverwriteWorkingDirectory(PathBuf),

    #[error("entry '{entry}' is neither a file nor a directory")]
    UnsupportedEntryKind { entry: String },

    #[error("source '{0}' does not exist")]
    SourceNotFound(PathBuf),

    #[error("source '{0}' is a directory, expected a file")]
    SourceIsDirectory(PathBuf),

    #[error("destination '{0}' is the source archive itself")]
    DestinationEqualsSource(PathBuf),

    #[error("destination root '{path}' cannot be used: {source}")]
    DestinationRootUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write archive '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to extract '{entry}' to '{path}': {source}")]
    Materialize {
        entry: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("zip archive '{path}': {source}")]
    Zip {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error(transparent)]
    Fs(#[from] coffer_fs::Error),
}

/// Stable identifier for every [`Error`] variant, suitable for callers that
/// render warnings or map errors to exit codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorId {
    UnsupportedFormat,
    InvalidOperationForMode,
    FormatUnsupportedOperation,
    MultipleEntriesNotSupported,
    ArchiveClosed,
    Open,
    ArchiveFinalizationFailed,
    Corrupted,
    InvalidPath,
    DestinationExists,
    DestinationIsNonEmptyDirectory,
    CannotOverwriteWorkingDirectory,
    UnsupportedEntryKind,
    SourceNotFound,
    SourceIsDirectory,
    DestinationEqualsSource,
    DestinationRootUnavailable,
    Read,
    Write,
    Materialize,
    Zip,
    Fs,
}

impl ErrorId {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UnsupportedFormat => "UnsupportedFormat",
            Self::InvalidOperationForMode => "InvalidOperationForMode",
            Self::FormatUnsupportedOperation => "FormatUnsupportedOperation",
            Self::MultipleEntriesNotSupported => "MultipleEntriesNotSupported",
            Self::ArchiveClosed => "ArchiveClosed",
            Self::Open => "Open",
            Self::ArchiveFinalizationFailed => "ArchiveFinalizationFailed",
            Self::Corrupted => "Corrupted",
            Self::InvalidPath => "InvalidPath",
            Self::DestinationExists => "DestinationExists",
            Self::DestinationIsNonEmptyDirectory => "DestinationIsNonEmptyDirectory",
            Self::CannotOverwriteWorkingDirectory => "CannotOverwriteWorkingDirectory",
            Self::UnsupportedEntryKind => "UnsupportedEntryKind",
            Self::SourceNotFound => "SourceNotFound",
            Self::SourceIsDirectory => "SourceIsDirectory",
            Self::DestinationEqualsSource => "DestinationEqualsSource",
            Self::DestinationRootUnavailable => "DestinationRootUnavailable",
            Self::Read => "Read",
            Self::Write => "Write",
            Self::Materialize => "Materialize",
            Self::Zip => "Zip",
            Self::Fs => "Fs",
        }
    }
}

impl fmt::Display for ErrorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Error {
    pub fn id(&self) -> ErrorId {
        match self {
            Self::UnsupportedFormat(_) => ErrorId::UnsupportedFormat,
            Self::InvalidOperationForMode { .. } => ErrorId::InvalidOperationForMode,
            Self::FormatUnsupportedOperation { .. } => ErrorId::FormatUnsupportedOperation,
            Self::MultipleEntriesNotSupported { .. } => ErrorId::MultipleEntriesNotSupported,
            Self::ArchiveClosed(_) => ErrorId::ArchiveClosed,
            Self::Open { .. } => ErrorId::Open,
            Self::ArchiveFinalizationFailed { .. } => ErrorId::ArchiveFinalizationFailed,
            Self::Corrupted { .. } => ErrorId::Corrupted,
            Self::InvalidPath { .. } => ErrorId::InvalidPath,
            Self::DestinationExists(_) => ErrorId::DestinationExists,
            Self::DestinationIsNonEmptyDirectory(_) => ErrorId::DestinationIsNonEmptyDirectory,
            Self::CannotOverwriteWorkingDirectory(_) => ErrorId::CannotOverwriteWorkingDirectory,
            Self::UnsupportedEntryKind { .. } => ErrorId::UnsupportedEntryKind,
            Self::SourceNotFound(_) => ErrorId::SourceNotFound,
            Self::SourceIsDirectory(_) => ErrorId::SourceIsDirectory,
            Self::DestinationEqualsSource(_) => ErrorId::DestinationEqualsSource,
            Self::DestinationRootUnavailable { .. } => ErrorId::DestinationRootUnavailable,
            Self::Read { .. } => ErrorId::Read,
            Self::Write { .. } => ErrorId::Write,
            Self::Materialize { .. } => ErrorId::Materialize,
            Self::Zip { .. } => ErrorId::Zip,
            Self::Fs(_) => ErrorId::Fs,
        }
    }

    /// The filesystem path the error is about, when there is one.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::MultipleEntriesNotSupported { path, .. }
            | Self::Open { path, .. }
            | Self::ArchiveFinalizationFailed { path, .. }
            | Self::Corrupted { path, .. }
            | Self::DestinationRootUnavailable { path, .. }
            | Self::Read { path, .. }
            | Self::Write { path, .. }
            | Self::Materialize { path, .. }
            | Self::Zip { path, .. } => Some(path),
            Self::ArchiveClosed(path)
            | Self::DestinationExists(path)
            | Self::DestinationIsNonEmptyDirectory(path)
            | Self::CannotOverwriteWorkingDirectory(path)
            | Self::SourceNotFound(path)
            | Self::SourceIsDirectory(path)
            | Self::DestinationEqualsSource(path) => Some(path),
            Self::Fs(e) => Some(e.path()),
            Self::UnsupportedFormat(_)
            | Self::InvalidOperationForMode { .. }
            | Self::FormatUnsupportedOperation { .. }
            | Self::InvalidPath { .. }
            | Self::UnsupportedEntryKind { .. } => None,
        }
    }

    /// Errors that only disqualify the current entry; extraction carries on
    /// with the next one.
    pub fn is_per_entry(&self) -> bool {
        matches!(
            self,
            Self::InvalidPath { .. }
                | Self::DestinationExists(_)
                | Self::DestinationIsNonEmptyDirectory(_)
                | Self::CannotOverwriteWorkingDirectory(_)
                | Self::UnsupportedEntryKind { .. }
        )
    }

    pub(crate) fn read(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| Self::Read { path, source }
    }

    pub(crate) fn write(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| Self::Write { path, source }
    }

    pub(crate) fn zip(path: impl Into<PathBuf>) -> impl FnOnce(zip::result::ZipError) -> Self {
        let path = path.into();
        move |source| Self::Zip { path, source }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
