use std::collections::HashMap;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use ::zip::write::SimpleFileOptions;
use ::zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};
use chrono::{Datelike, Local, NaiveDate, TimeZone, Timelike};

use super::{shadow_file, swap_shadow};
use crate::addition::{AdditionKind, ArchiveAddition};
use crate::archive::ArchiveMode;
use crate::entry::{EntryBody, EntryHandle, EntryKind};
use crate::error::{Error, Result};

pub(crate) struct ZipCodec {
    path: PathBuf,
    options: SimpleFileOptions,
    state: ZipState,
}

enum ZipState {
    Create(ZipWriter<File>),
    Extract(ZipReader),
    Update(Box<ZipUpdate>),
}

struct ZipReader {
    archive: ZipArchive<File>,
    next: usize,
}

/// Additions made in update mode go into an anonymous staging zip and are
/// merged with the original entries when the archive is closed.
struct ZipUpdate {
    original: ZipReader,
    staging: Option<ZipWriter<File>>,
    staged: HashMap<String, usize>,
    staged_order: Vec<String>,
}

impl ZipCodec {
    pub(crate) fn open(
        file: File,
        path: PathBuf,
        mode: ArchiveMode,
        level: Option<u32>,
    ) -> Result<Self> {
        let state = match mode {
            ArchiveMode::Create => ZipState::Create(ZipWriter::new(file)),
            ArchiveMode::Extract => ZipState::Extract(ZipReader::new(file, &path)?),
            ArchiveMode::Update => ZipState::Update(Box::new(ZipUpdate {
                original: ZipReader::new(file, &path)?,
                staging: None,
                staged: HashMap::new(),
                staged_order: Vec::new(),
            })),
        };
        Ok(Self {
            path,
            options: file_options(level),
            state,
        })
    }

    pub(crate) fn add(&mut self, addition: &ArchiveAddition) -> Result<()> {
        match &mut self.state {
            ZipState::Create(writer) => write_addition(writer, addition, self.options, &self.path),
            ZipState::Update(update) => {
                let staging = match &mut update.staging {
                    Some(staging) => staging,
                    slot @ None => {
                        let file = tempfile::tempfile().map_err(Error::write(&self.path))?;
                        slot.insert(ZipWriter::new(file))
                    }
                };
                write_addition(staging, addition, self.options, &self.path)?;
                let name = stored_name(addition);
                update.staged.insert(name.clone(), update.staged_order.len());
                update.staged_order.push(name);
                Ok(())
            }
            ZipState::Extract(_) => Err(Error::InvalidOperationForMode {
                mode: ArchiveMode::Extract,
                operation: "add entries",
            }),
        }
    }

    pub(crate) fn next_entry(&mut self) -> Result<Option<EntryHandle<'_>>> {
        match &mut self.state {
            ZipState::Extract(reader) => reader.next_entry(&self.path),
            ZipState::Update(update) => update.original.next_entry(&self.path),
            ZipState::Create(_) => Err(Error::InvalidOperationForMode {
                mode: ArchiveMode::Create,
                operation: "read entries",
            }),
        }
    }

    pub(crate) fn finalize(self) -> Result<()> {
        let path = self.path;
        match self.state {
            ZipState::Create(writer) => {
                let file = writer.finish().map_err(Error::zip(&path))?;
                file.sync_all().map_err(Error::write(&path))
            }
            ZipState::Extract(_) => Ok(()),
            ZipState::Update(update) => update.merge(&path),
        }
    }
}

impl ZipReader {
    fn new(file: File, path: &Path) -> Result<Self> {
        let archive = ZipArchive::new(file).map_err(|e| match e {
            ::zip::result::ZipError::Io(source) => Error::Read {
                path: path.to_path_buf(),
                source,
            },
            other => Error::Corrupted {
                path: path.to_path_buf(),
                reason: other.to_string(),
            },
        })?;
        Ok(Self { archive, next: 0 })
    }

    fn next_entry(&mut self, path: &Path) -> Result<Option<EntryHandle<'_>>> {
        if self.next >= self.archive.len() {
            return Ok(None);
        }
        let index = self.next;
        self.next += 1;

        let (name, is_dir, size, modified) = {
            let file = self.archive.by_index_raw(index).map_err(Error::zip(path))?;
            (
                file.name().to_owned(),
                file.is_dir(),
                file.size(),
                file.last_modified().and_then(from_zip_time),
            )
        };
        let kind = if is_dir {
            EntryKind::Directory
        } else {
            EntryKind::File
        };
        let body = EntryBody::Zip {
            archive: &mut self.archive,
            index,
        };
        Ok(Some(
            EntryHandle::new(name, kind, body)
                .with_size(size)
                .with_modified(modified),
        ))
    }
}

impl ZipUpdate {
    fn merge(self: Box<Self>, path: &Path) -> Result<()> {
        let ZipUpdate {
            original,
            staging,
            staged,
            staged_order,
        } = *self;
        let Some(staging) = staging else {
            return Ok(());
        };
        let mut original = original.archive;
        let staging_file = staging.finish().map_err(Error::zip(path))?;
        let mut staged_archive = ZipArchive::new(staging_file).map_err(Error::zip(path))?;

        let (shadow, shadow_path) = shadow_file(path)?.into_parts();
        let mut out = ZipWriter::new(shadow);
        let mut replaced = vec![false; staged_order.len()];

        for index in 0..original.len() {
            let name = original
                .by_index_raw(index)
                .map_err(Error::zip(path))?
                .name()
                .to_owned();
            match staged.get(&name) {
                Some(&staged_index) => {
                    let entry = staged_archive
                        .by_index_raw(staged_index)
                        .map_err(Error::zip(path))?;
                    out.raw_copy_file(entry).map_err(Error::zip(path))?;
                    replaced[staged_index] = true;
                }
                None => {
                    let entry = original.by_index_raw(index).map_err(Error::zip(path))?;
                    out.raw_copy_file(entry).map_err(Error::zip(path))?;
                }
            }
        }
        for (staged_index, _) in staged_order.iter().enumerate() {
            if replaced[staged_index] {
                continue;
            }
            let entry = staged_archive
                .by_index_raw(staged_index)
                .map_err(Error::zip(path))?;
            out.raw_copy_file(entry).map_err(Error::zip(path))?;
        }

        let shadow = out.finish().map_err(Error::zip(path))?;
        shadow.sync_all().map_err(Error::write(shadow_path.to_path_buf()))?;
        drop(shadow);
        // the original handle must be released before the swap on Windows
        drop(original);
        tracing::debug!(
            path = %path.display(),
            added = staged_order.len(),
            "merged zip update"
        );
        swap_shadow(shadow_path, path)
    }
}

fn write_addition(
    writer: &mut ZipWriter<File>,
    addition: &ArchiveAddition,
    options: SimpleFileOptions,
    path: &Path,
) -> Result<()> {
    let source = addition.source_path();
    let metadata = std::fs::metadata(source).map_err(Error::read(source))?;
    let options = match metadata.modified() {
        Ok(modified) => options.last_modified_time(to_zip_time(modified)),
        Err(_) => options,
    };

    match addition.kind() {
        AdditionKind::Directory => writer
            .add_directory(stored_name(addition), options)
            .map_err(Error::zip(path)),
        AdditionKind::File => {
            let mut input = File::open(source).map_err(Error::read(source))?;
            writer
                .start_file(stored_name(addition), options)
                .map_err(Error::zip(path))?;
            io::copy(&mut input, writer).map_err(Error::write(path))?;
            Ok(())
        }
    }
}

/// Zip directory entries carry a trailing slash.
fn stored_name(addition: &ArchiveAddition) -> String {
    match addition.kind() {
        AdditionKind::Directory => format!("{}/", addition.entry_name()),
        AdditionKind::File => addition.entry_name().to_owned(),
    }
}

fn file_options(level: Option<u32>) -> SimpleFileOptions {
    let options = SimpleFileOptions::default();
    match level {
        Some(0) => options.compression_method(CompressionMethod::Stored),
        Some(level) => options
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(i64::from(level.min(9)))),
        None => options.compression_method(CompressionMethod::Deflated),
    }
}

/// Zip timestamps are local wall-clock time limited to 1980..=2107;
/// anything outside collapses to the format's epoch.
fn to_zip_time(time: SystemTime) -> DateTime {
    let local: chrono::DateTime<Local> = time.into();
    if !(1980..=2107).contains(&local.year()) {
        return zip_epoch();
    }
    DateTime::from_date_and_time(
        local.year() as u16,
        local.month() as u8,
        local.day() as u8,
        local.hour() as u8,
        local.minute() as u8,
        local.second() as u8,
    )
    .unwrap_or_else(|_| zip_epoch())
}

fn zip_epoch() -> DateTime {
    DateTime::default()
}

fn from_zip_time(time: DateTime) -> Option<SystemTime> {
    let naive = NaiveDate::from_ymd_opt(
        i32::from(time.year()),
        u32::from(time.month()),
        u32::from(time.day()),
    )?
    .and_hms_opt(
        u32::from(time.hour()),
        u32::from(time.minute()),
        u32::from(time.second()),
    )?;
    let local = Local.from_local_datetime(&naive).earliest()?;
    Some(local.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, UNIX_EPOCH};

    #[test]
    fn time_roundtrip_within_two_seconds() {
        let when = UNIX_EPOCH + Duration::from_secs(1_600_000_000);
        let back = from_zip_time(to_zip_time(when)).unwrap();
        let delta = when
            .duration_since(back)
            .unwrap_or_else(|e| e.duration());
        assert!(delta <= Duration::from_secs(2), "delta {delta:?}");
    }

    #[test]
    fn out_of_range_time_clamps_to_epoch() {
        let before = UNIX_EPOCH + Duration::from_secs(60 * 60 * 24 * 365);
        let time = to_zip_time(before);
        assert_eq!((time.year(), time.month(), time.day()), (1980, 1, 1));
    }

    #[test]
    fn level_zero_is_stored() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("a.txt");
        std::fs::write(&src, "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaa").unwrap();
        let path = dir.path().join("a.zip");

        let file = File::create(&path).unwrap();
        let mut codec = ZipCodec::open(file, path.clone(), ArchiveMode::Create, Some(0)).unwrap();
        codec.add(&ArchiveAddition::file(&src, "a.txt")).unwrap();
        codec.finalize().unwrap();

        let mut archive = ZipArchive::new(File::open(&path).unwrap()).unwrap();
        let entry = archive.by_index(0).unwrap();
        assert_eq!(entry.compression(), CompressionMethod::Stored);
    }

    #[test]
    fn directory_entries_get_trailing_slash() {
        assert_eq!(stored_name(&ArchiveAddition::directory("x", "a/b")), "a/b/");
        assert_eq!(stored_name(&ArchiveAddition::file("x", "a/b")), "a/b");
    }
}
