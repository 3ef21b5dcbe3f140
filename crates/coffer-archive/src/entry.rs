use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use coffer_fs::PermissionMode;
use zip::ZipArchive;

use crate::error::{Error, Result};
use crate::host::Host;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    /// Links, devices, sparse files and anything else that cannot be
    /// materialized as a plain file or directory.
    Other,
}

/// Where an entry's bytes live inside the open container.
pub(crate) enum EntryBody<'a> {
    Zip {
        archive: &'a mut ZipArchive<File>,
        index: usize,
    },
    Tar {
        file: &'a mut File,
        offset: u64,
    },
    Stream(&'a mut dyn Read),
    Empty,
}

/// A single entry yielded while iterating an open archive.
///
/// The handle borrows the archive, so it must be consumed (or dropped)
/// before the next entry is requested.
pub struct EntryHandle<'a> {
    name: String,
    kind: EntryKind,
    size: u64,
    modified: Option<SystemTime>,
    mode: Option<u32>,
    body: EntryBody<'a>,
}

impl<'a> EntryHandle<'a> {
    pub(crate) fn new(name: String, kind: EntryKind, body: EntryBody<'a>) -> Self {
        Self {
            name,
            kind,
            size: 0,
            modified: None,
            mode: None,
            body,
        }
    }

    pub(crate) fn with_size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    pub(crate) fn with_modified(mut self, modified: Option<SystemTime>) -> Self {
        self.modified = modified;
        self
    }

    pub(crate) fn with_mode(mut self, mode: Option<u32>) -> Self {
        self.mode = mode;
        self
    }

    /// Entry name exactly as stored in the container.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    pub fn is_directory(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    /// Uncompressed size when the container records it, otherwise zero.
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn modified(&self) -> Option<SystemTime> {
        self.modified
    }

    /// Stored POSIX mode bits, only present for tar entries.
    pub fn mode(&self) -> Option<u32> {
        self.mode
    }

    /// Write the entry to `target`, which must not exist yet, and restore
    /// its timestamp and (for files on POSIX hosts) its permission bits.
    pub fn materialize(self, target: &Path, host: &Host) -> Result<u64> {
        let EntryHandle {
            name,
            kind,
            size,
            modified,
            mode,
            body,
        } = self;

        let written = match kind {
            EntryKind::Other => return Err(Error::UnsupportedEntryKind { entry: name }),
            EntryKind::Directory => {
                std::fs::create_dir_all(target).map_err(materialize_err(&name, target))?;
                0
            }
            EntryKind::File => {
                if let Some(parent) = target.parent() {
                    std::fs::create_dir_all(parent).map_err(materialize_err(&name, parent))?;
                }
                let mut out = OpenOptions::new()
                    .write(true)
                    .create_new(true)
                    .open(target)
                    .map_err(materialize_err(&name, target))?;
                let written =
                    copy_body(body, size, &mut out).map_err(materialize_err(&name, target))?;
                if written < size {
                    return Err(Error::Corrupted {
                        path: target.to_path_buf(),
                        reason: format!("entry '{name}' ended after {written} of {size} bytes"),
                    });
                }
                out.sync_all().map_err(materialize_err(&name, target))?;
                PermissionMode::from_stored(mode, host.has_posix_modes()).apply_to_path(target)?;
                written
            }
        };

        if let Some(modified) = modified {
            coffer_fs::set_modified(target, modified)?;
        }
        Ok(written)
    }
}

impl std::fmt::Debug for EntryHandle<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntryHandle")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("size", &self.size)
            .field("modified", &self.modified)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

fn copy_body(body: EntryBody<'_>, size: u64, out: &mut File) -> io::Result<u64> {
    match body {
        EntryBody::Zip { archive, index } => {
            let mut file = archive.by_index(index).map_err(io::Error::other)?;
            io::copy(&mut file, out)
        }
        EntryBody::Tar { file, offset } => {
            file.seek(SeekFrom::Start(offset))?;
            io::copy(&mut Read::take(file, size), out)
        }
        EntryBody::Stream(reader) => io::copy(reader, out),
        EntryBody::Empty => Ok(0),
    }
}

fn materialize_err(entry: &str, path: &Path) -> impl FnOnce(io::Error) -> Error {
    let entry = entry.to_owned();
    let path: PathBuf = path.to_path_buf();
    move |source| Error::Materialize {
        entry,
        path,
        source,
    }
}
