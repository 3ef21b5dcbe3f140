use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::{Compression, GzBuilder};

use super::unsupported;
use crate::addition::{AdditionKind, ArchiveAddition};
use crate::archive::ArchiveMode;
use crate::entry::{EntryBody, EntryHandle, EntryKind};
use crate::error::{Error, Result};
use crate::format::ArchiveFormat;

/// A gzip stream treated as an archive of exactly one file.
pub(crate) struct GzipCodec {
    path: PathBuf,
    level: Compression,
    state: GzipState,
}

enum GzipState {
    /// The output file waits for the single entry; `None` once it is taken.
    Create {
        file: Option<File>,
        encoder: Option<(GzEncoder<File>, String)>,
    },
    Read {
        mode: ArchiveMode,
        decoder: MultiGzDecoder<File>,
        name: String,
        modified: Option<SystemTime>,
        yielded: bool,
    },
}

impl GzipCodec {
    pub(crate) fn open(
        file: File,
        path: PathBuf,
        mode: ArchiveMode,
        level: Option<u32>,
    ) -> Result<Self> {
        let state = match mode {
            ArchiveMode::Create => GzipState::Create {
                file: Some(file),
                encoder: None,
            },
            ArchiveMode::Extract | ArchiveMode::Update => {
                let decoder = MultiGzDecoder::new(file);
                let header = decoder.header();
                let name = header
                    .and_then(|h| h.filename())
                    .map(|raw| String::from_utf8_lossy(raw).into_owned())
                    .filter(|name| !name.is_empty())
                    .unwrap_or_else(|| fallback_name(&path));
                let modified = header
                    .map(|h| h.mtime())
                    .filter(|&secs| secs != 0)
                    .map(|secs| UNIX_EPOCH + Duration::from_secs(u64::from(secs)));
                GzipState::Read {
                    mode,
                    decoder,
                    name,
                    modified,
                    yielded: false,
                }
            }
        };
        Ok(Self {
            path,
            level: Compression::new(level.unwrap_or(super::DEFAULT_LEVEL).min(9)),
            state,
        })
    }

    pub(crate) fn add(&mut self, addition: &ArchiveAddition) -> Result<()> {
        let (file, encoder) = match &mut self.state {
            GzipState::Create { file, encoder } => (file, encoder),
            GzipState::Read {
                mode: ArchiveMode::Update,
                ..
            } => return Err(unsupported(ArchiveFormat::Gzip, "be updated in place")),
            GzipState::Read { mode, .. } => {
                return Err(Error::InvalidOperationForMode {
                    mode: *mode,
                    operation: "add entries",
                });
            }
        };

        if addition.kind() == AdditionKind::Directory {
            return Err(unsupported(ArchiveFormat::Gzip, "store directories"));
        }
        if encoder.is_some() {
            return Err(Error::MultipleEntriesNotSupported {
                path: self.path.clone(),
                entry: addition.entry_name().to_owned(),
            });
        }
        let Some(out) = file.take() else {
            return Err(Error::ArchiveClosed(self.path.clone()));
        };

        let source = addition.source_path();
        let mut input = File::open(source).map_err(Error::read(source))?;
        let mtime = input
            .metadata()
            .and_then(|m| m.modified())
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| u32::try_from(d.as_secs()).unwrap_or(0))
            .unwrap_or(0);

        let mut gz = GzBuilder::new()
            .filename(addition.file_name())
            .mtime(mtime)
            .write(out, self.level);
        io::copy(&mut input, &mut gz).map_err(Error::write(&self.path))?;
        *encoder = Some((gz, addition.entry_name().to_owned()));
        Ok(())
    }

    pub(crate) fn next_entry(&mut self) -> Result<Option<EntryHandle<'_>>> {
        match &mut self.state {
            GzipState::Read {
                decoder,
                name,
                modified,
                yielded,
                ..
            } => {
                if *yielded {
                    return Ok(None);
                }
                *yielded = true;
                let handle = EntryHandle::new(name.clone(), EntryKind::File, EntryBody::Stream(decoder))
                    .with_modified(*modified);
                Ok(Some(handle))
            }
            GzipState::Create { .. } => Err(Error::InvalidOperationForMode {
                mode: ArchiveMode::Create,
                operation: "read entries",
            }),
        }
    }

    pub(crate) fn finalize(self) -> Result<()> {
        let path = self.path;
        match self.state {
            GzipState::Create {
                encoder: Some((encoder, name)),
                ..
            } => {
                let file = encoder.finish().map_err(Error::write(&path))?;
                file.sync_all().map_err(Error::write(&path))?;
                tracing::debug!(path = %path.display(), entry = %name, "finished gzip member");
                Ok(())
            }
            GzipState::Create {
                file: Some(file), ..
            } => {
                // an empty member keeps the file a valid gzip stream
                let file = GzEncoder::new(file, self.level)
                    .finish()
                    .map_err(Error::write(&path))?;
                file.sync_all().map_err(Error::write(&path))
            }
            GzipState::Create { .. } | GzipState::Read { .. } => Ok(()),
        }
    }
}

/// Entry name for a member without a stored file name: the archive's own
/// name minus its `.gz` suffix.
fn fallback_name(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let lower = name.to_ascii_lowercase();
    for suffix in [".gzip", ".gz"] {
        if lower.ends_with(suffix) && name.len() > suffix.len() {
            return name[..name.len() - suffix.len()].to_owned();
        }
    }
    name
}
