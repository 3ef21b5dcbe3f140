use std::fmt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use crate::addition::ArchiveAddition;
use crate::codec::FormatCodec;
use crate::entry::EntryHandle;
use crate::error::{Error, Result};
use crate::format::ArchiveFormat;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArchiveMode {
    /// Write a brand-new archive; the path must not exist.
    Create,
    /// Read existing entries and add new ones.
    Update,
    /// Read entries only.
    Extract,
}

impl fmt::Display for ArchiveMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Extract => "extract",
        })
    }
}

/// An open archive file.
///
/// The archive owns its file handle until [`Archive::close`] is called or
/// the value is dropped. Closing is idempotent; dropping an archive that was
/// never closed finalizes it and logs any error.
pub struct Archive {
    path: PathBuf,
    format: ArchiveFormat,
    mode: ArchiveMode,
    codec: Option<FormatCodec>,
}

impl Archive {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> ArchiveFormat {
        self.format
    }

    pub fn mode(&self) -> ArchiveMode {
        self.mode
    }

    pub fn is_closed(&self) -> bool {
        self.codec.is_none()
    }

    /// Queue one file or directory into the archive.
    pub fn add(&mut self, addition: &ArchiveAddition) -> Result<()> {
        if self.mode == ArchiveMode::Extract {
            return Err(Error::InvalidOperationForMode {
                mode: self.mode,
                operation: "add entries",
            });
        }
        let codec = self.open_codec()?;
        tracing::trace!(entry = addition.entry_name(), "adding archive entry");
        codec.add(addition)
    }

    /// Next entry in container order, or `None` once all entries were seen.
    pub fn next_entry(&mut self) -> Result<Option<EntryHandle<'_>>> {
        if self.mode == ArchiveMode::Create {
            return Err(Error::InvalidOperationForMode {
                mode: self.mode,
                operation: "read entries",
            });
        }
        self.open_codec()?.next_entry()
    }

    /// Flush pending writes, swap in any shadow file, and release the handle.
    pub fn close(&mut self) -> Result<()> {
        let Some(codec) = self.codec.take() else {
            return Ok(());
        };
        codec
            .finalize()
            .map_err(|e| Error::ArchiveFinalizationFailed {
                path: self.path.clone(),
                source: Box::new(e),
            })?;
        tracing::debug!(
            path = %self.path.display(),
            format = %self.format,
            mode = %self.mode,
            "closed archive"
        );
        Ok(())
    }

    fn open_codec(&mut self) -> Result<&mut FormatCodec> {
        self.codec
            .as_mut()
            .ok_or_else(|| Error::ArchiveClosed(self.path.clone()))
    }
}

impl Drop for Archive {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!(path = %self.path.display(), error = %e, "archive dropped with error");
        }
    }
}

impl fmt::Debug for Archive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Archive")
            .field("path", &self.path)
            .field("format", &self.format)
            .field("mode", &self.mode)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Open `path` as an archive of `format` in `mode`.
///
/// `level` is the compression level for zip and gzip output (0-9) and is
/// ignored by tar.
pub fn open_archive(
    format: ArchiveFormat,
    path: impl AsRef<Path>,
    mode: ArchiveMode,
    level: Option<u32>,
) -> Result<Archive> {
    let path = path.as_ref();
    if format == ArchiveFormat::TarGz && mode == ArchiveMode::Update {
        return Err(Error::FormatUnsupportedOperation {
            format,
            operation: "be updated in place",
        });
    }

    let file = open_file(path, mode)?;
    let codec = match FormatCodec::open(format, file, path, mode, level) {
        Ok(codec) => codec,
        Err(e) => {
            if mode == ArchiveMode::Create {
                discard_partial(path);
            }
            return Err(e);
        }
    };
    tracing::debug!(path = %path.display(), %format, %mode, "opened archive");

    Ok(Archive {
        path: path.to_path_buf(),
        format,
        mode,
        codec: Some(codec),
    })
}

/// Remove an output file whose codec never came up. Failures are logged only.
fn discard_partial(path: &Path) -> bool {
    match std::fs::remove_file(path) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to remove partially created archive"
            );
            false
        }
    }
}

fn open_file(path: &Path, mode: ArchiveMode) -> Result<File> {
    let mut options = OpenOptions::new();
    match mode {
        ArchiveMode::Create => options.write(true).create_new(true),
        ArchiveMode::Update => options.read(true).write(true),
        ArchiveMode::Extract => options.read(true),
    };
    options.open(path).map_err(|source| Error::Open {
        path: path.to_path_buf(),
        source,
    })
}
