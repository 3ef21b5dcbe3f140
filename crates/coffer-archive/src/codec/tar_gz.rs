use std::fs::File;
use std::io::{self, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use tempfile::TempPath;

use super::{TarCodec, unsupported};
use crate::addition::ArchiveAddition;
use crate::archive::ArchiveMode;
use crate::entry::EntryHandle;
use crate::error::{Error, Result};
use crate::format::ArchiveFormat;

/// Tar over an uncompressed scratch file; the gzip layer is applied when
/// the archive is closed (create) or stripped when it is opened (extract).
pub(crate) struct TarGzCodec {
    path: PathBuf,
    level: Compression,
    state: TarGzState,
}

enum TarGzState {
    Create {
        output: File,
        scratch: TempPath,
        inner: TarCodec,
    },
    Extract {
        _source: File,
        scratch: TempPath,
        inner: TarCodec,
    },
}

impl TarGzCodec {
    pub(crate) fn open(
        file: File,
        path: PathBuf,
        mode: ArchiveMode,
        level: Option<u32>,
    ) -> Result<Self> {
        let state = match mode {
            ArchiveMode::Create => {
                let (scratch_file, scratch) = scratch_tar(&path)?;
                TarGzState::Create {
                    output: file,
                    inner: TarCodec::open(
                        scratch_file,
                        scratch.to_path_buf(),
                        ArchiveMode::Create,
                    )?,
                    scratch,
                }
            }
            ArchiveMode::Extract => {
                let (mut scratch_file, scratch) = scratch_tar(&path)?;
                let mut source = file;
                io::copy(&mut MultiGzDecoder::new(&mut source), &mut scratch_file).map_err(|e| {
                    match e.kind() {
                        io::ErrorKind::InvalidInput
                        | io::ErrorKind::InvalidData
                        | io::ErrorKind::UnexpectedEof => Error::Corrupted {
                            path: path.clone(),
                            reason: e.to_string(),
                        },
                        _ => Error::read(&path)(e),
                    }
                })?;
                scratch_file
                    .seek(SeekFrom::Start(0))
                    .map_err(Error::read(scratch.to_path_buf()))?;
                TarGzState::Extract {
                    _source: source,
                    inner: TarCodec::open(
                        scratch_file,
                        scratch.to_path_buf(),
                        ArchiveMode::Extract,
                    )?,
                    scratch,
                }
            }
            ArchiveMode::Update => {
                return Err(unsupported(ArchiveFormat::TarGz, "be updated in place"));
            }
        };

        Ok(Self {
            path,
            level: Compression::new(level.unwrap_or(super::DEFAULT_LEVEL).min(9)),
            state,
        })
    }

    pub(crate) fn add(&mut self, addition: &ArchiveAddition) -> Result<()> {
        match &mut self.state {
            TarGzState::Create { inner, .. } => inner.add(addition),
            TarGzState::Extract { .. } => Err(Error::InvalidOperationForMode {
                mode: ArchiveMode::Extract,
                operation: "add entries",
            }),
        }
    }

    pub(crate) fn next_entry(&mut self) -> Result<Option<EntryHandle<'_>>> {
        match &mut self.state {
            TarGzState::Extract { inner, .. } => inner.next_entry(),
            TarGzState::Create { .. } => Err(Error::InvalidOperationForMode {
                mode: ArchiveMode::Create,
                operation: "read entries",
            }),
        }
    }

    pub(crate) fn finalize(self) -> Result<()> {
        let path = self.path;
        match self.state {
            TarGzState::Create {
                output,
                scratch,
                inner,
            } => {
                inner.finalize()?;
                let mut tar = File::open(&scratch).map_err(Error::read(scratch.to_path_buf()))?;
                let mut encoder = GzEncoder::new(output, self.level);
                io::copy(&mut tar, &mut encoder).map_err(Error::write(&path))?;
                let output = encoder.finish().map_err(Error::write(&path))?;
                output.sync_all().map_err(Error::write(&path))?;
                drop(tar);
                release(scratch);
                Ok(())
            }
            TarGzState::Extract { scratch, inner, .. } => {
                drop(inner);
                release(scratch);
                Ok(())
            }
        }
    }
}

fn scratch_tar(path: &Path) -> Result<(File, TempPath)> {
    let scratch = tempfile::Builder::new()
        .prefix("coffer-")
        .suffix(".tar")
        .tempfile()
        .map_err(Error::write(path))?;
    Ok(scratch.into_parts())
}

fn release(scratch: TempPath) {
    let scratch_path = scratch.to_path_buf();
    if let Err(e) = scratch.close() {
        tracing::warn!(path = %scratch_path.display(), error = %e, "failed to remove scratch tar");
    }
}
