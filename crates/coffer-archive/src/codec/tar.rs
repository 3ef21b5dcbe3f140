use std::fs::File;
use std::io::{self, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use ::tar::{Archive as TarArchive, Builder, EntryType, Header, HeaderMode};
use tempfile::TempPath;

use super::{shadow_file, swap_shadow};
use crate::addition::{AdditionKind, ArchiveAddition};
use crate::archive::ArchiveMode;
use crate::entry::{EntryBody, EntryHandle, EntryKind};
use crate::error::{Error, Result};

pub(crate) struct TarCodec {
    path: PathBuf,
    state: TarState,
}

enum TarState {
    Create(Builder<File>),
    Extract(TarIndex),
    Update {
        index: TarIndex,
        shadow: Option<Shadow>,
    },
}

/// Header offsets recorded in one pass so entries can be read back by
/// seeking instead of re-scanning the stream.
struct TarIndex {
    file: File,
    entries: Vec<IndexedEntry>,
    next: usize,
}

struct IndexedEntry {
    name: String,
    kind: EntryKind,
    size: u64,
    offset: u64,
    modified: Option<SystemTime>,
    mode: Option<u32>,
}

/// Copy of the original archive that update-mode additions are appended to.
struct Shadow {
    builder: Builder<File>,
    path: TempPath,
}

impl TarCodec {
    pub(crate) fn open(file: File, path: PathBuf, mode: ArchiveMode) -> Result<Self> {
        let state = match mode {
            ArchiveMode::Create => TarState::Create(Builder::new(file)),
            ArchiveMode::Extract => TarState::Extract(TarIndex::scan(file, &path)?),
            ArchiveMode::Update => TarState::Update {
                index: TarIndex::scan(file, &path)?,
                shadow: None,
            },
        };
        Ok(Self { path, state })
    }

    pub(crate) fn add(&mut self, addition: &ArchiveAddition) -> Result<()> {
        match &mut self.state {
            TarState::Create(builder) => append(builder, addition, &self.path),
            TarState::Update { index, shadow } => {
                let shadow = match shadow {
                    Some(shadow) => shadow,
                    slot @ None => slot.insert(Shadow::copy_of(index, &self.path)?),
                };
                append(&mut shadow.builder, addition, &self.path)
            }
            TarState::Extract(_) => Err(Error::InvalidOperationForMode {
                mode: ArchiveMode::Extract,
                operation: "add entries",
            }),
        }
    }

    pub(crate) fn next_entry(&mut self) -> Result<Option<EntryHandle<'_>>> {
        match &mut self.state {
            TarState::Extract(index) | TarState::Update { index, .. } => Ok(index.next_entry()),
            TarState::Create(_) => Err(Error::InvalidOperationForMode {
                mode: ArchiveMode::Create,
                operation: "read entries",
            }),
        }
    }

    pub(crate) fn finalize(self) -> Result<()> {
        let path = self.path;
        match self.state {
            TarState::Create(builder) => {
                let file = builder.into_inner().map_err(Error::write(&path))?;
                file.sync_all().map_err(Error::write(&path))
            }
            TarState::Extract(_) => Ok(()),
            TarState::Update { shadow: None, .. } => Ok(()),
            TarState::Update {
                index,
                shadow: Some(shadow),
            } => {
                let file = shadow.builder.into_inner().map_err(Error::write(&path))?;
                file.sync_all().map_err(Error::write(&path))?;
                drop(file);
                drop(index);
                swap_shadow(shadow.path, &path)
            }
        }
    }
}

impl TarIndex {
    fn scan(mut file: File, path: &Path) -> Result<Self> {
        let corrupted = |e: io::Error| Error::Corrupted {
            path: path.to_path_buf(),
            reason: e.to_string(),
        };

        let mut entries = Vec::new();
        {
            let mut archive = TarArchive::new(&mut file);
            for entry in archive.entries_with_seek().map_err(corrupted)? {
                let entry = entry.map_err(corrupted)?;
                let header = entry.header();
                let entry_type = header.entry_type();
                if entry_type == EntryType::XGlobalHeader {
                    continue;
                }
                let kind = if entry_type.is_dir() {
                    EntryKind::Directory
                } else if entry_type.is_file() {
                    EntryKind::File
                } else {
                    EntryKind::Other
                };
                entries.push(IndexedEntry {
                    name: String::from_utf8_lossy(&entry.path_bytes()).into_owned(),
                    kind,
                    size: entry.size(),
                    offset: entry.raw_file_position(),
                    modified: header
                        .mtime()
                        .ok()
                        .map(|secs| UNIX_EPOCH + Duration::from_secs(secs)),
                    mode: header.mode().ok(),
                });
            }
        }
        tracing::debug!(path = %path.display(), entries = entries.len(), "indexed tar archive");
        Ok(Self {
            file,
            entries,
            next: 0,
        })
    }

    fn next_entry(&mut self) -> Option<EntryHandle<'_>> {
        let entry = self.entries.get(self.next)?;
        self.next += 1;
        let body = match entry.kind {
            EntryKind::File => EntryBody::Tar {
                file: &mut self.file,
                offset: entry.offset,
            },
            EntryKind::Directory | EntryKind::Other => EntryBody::Empty,
        };
        Some(
            EntryHandle::new(entry.name.clone(), entry.kind, body)
                .with_size(entry.size)
                .with_modified(entry.modified)
                .with_mode(entry.mode),
        )
    }
}

impl Shadow {
    /// Start a shadow holding every entry of the original archive.
    fn copy_of(index: &mut TarIndex, path: &Path) -> Result<Self> {
        let (file, shadow_path) = shadow_file(path)?.into_parts();
        let mut builder = Builder::new(file);

        index
            .file
            .seek(SeekFrom::Start(0))
            .map_err(Error::read(path))?;
        let mut original = TarArchive::new(&mut index.file);
        // raw records keep GNU long names and pax extensions attached
        let entries = original.entries().map_err(Error::read(path))?.raw(true);
        for entry in entries {
            let mut entry = entry.map_err(Error::read(path))?;
            let header = entry.header().clone();
            builder
                .append(&header, &mut entry)
                .map_err(Error::write(shadow_path.to_path_buf()))?;
        }
        tracing::debug!(path = %path.display(), "copied tar entries into shadow");

        Ok(Self {
            builder,
            path: shadow_path,
        })
    }
}

fn append(builder: &mut Builder<File>, addition: &ArchiveAddition, path: &Path) -> Result<()> {
    let source = addition.source_path();
    let mut header = Header::new_ustar();

    match addition.kind() {
        AdditionKind::Directory => {
            let metadata = std::fs::metadata(source).map_err(Error::read(source))?;
            header.set_metadata_in_mode(&metadata, HeaderMode::Complete);
            header.set_entry_type(EntryType::Directory);
            header.set_size(0);
            builder
                .append_data(&mut header, format!("{}/", addition.entry_name()), io::empty())
                .map_err(Error::write(path))
        }
        AdditionKind::File => {
            let mut input = File::open(source).map_err(Error::read(source))?;
            let metadata = input.metadata().map_err(Error::read(source))?;
            header.set_metadata_in_mode(&metadata, HeaderMode::Complete);
            header.set_entry_type(EntryType::Regular);
            builder
                .append_data(&mut header, addition.entry_name(), &mut input)
                .map_err(Error::write(path))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(dir: &Path) -> PathBuf {
        let src = dir.join("a.txt");
        std::fs::write(&src, "alpha").unwrap();
        let sub = dir.join("sub");
        std::fs::create_dir(&sub).unwrap();

        let path = dir.join("t.tar");
        let file = File::create(&path).unwrap();
        let mut codec = TarCodec::open(file, path.clone(), ArchiveMode::Create).unwrap();
        codec.add(&ArchiveAddition::directory(&sub, "sub")).unwrap();
        codec.add(&ArchiveAddition::file(&src, "sub/a.txt")).unwrap();
        codec.finalize().unwrap();
        path
    }

    #[test]
    fn index_records_kinds_and_sizes() {
        let dir = tempfile::tempdir().unwrap();
        let path = build(dir.path());

        let index = TarIndex::scan(File::open(&path).unwrap(), &path).unwrap();
        let summary: Vec<_> = index
            .entries
            .iter()
            .map(|e| (e.name.as_str(), e.kind, e.size))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("sub/", EntryKind::Directory, 0),
                ("sub/a.txt", EntryKind::File, 5)
            ]
        );
        assert!(index.entries.iter().all(|e| e.modified.is_some()));
    }

    #[test]
    fn update_without_additions_leaves_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = build(dir.path());
        let before = std::fs::read(&path).unwrap();

        let file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .unwrap();
        let codec = TarCodec::open(file, path.clone(), ArchiveMode::Update).unwrap();
        codec.finalize().unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), before);
    }

    #[test]
    fn bad_checksum_is_corrupted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.tar");
        let mut header = vec![0u8; 512];
        header[0] = b'x';
        header[124..135].copy_from_slice(b"00000001000");
        std::fs::write(&path, &header).unwrap();

        let err = TarIndex::scan(File::open(&path).unwrap(), &path)
            .err()
            .unwrap();
        assert!(matches!(err, Error::Corrupted { .. }));
    }
}
