//! Per-format container codecs.
//!
//! Every codec owns the archive's file handle for as long as the archive is
//! open and is consumed exactly once by `finalize`.

use std::fs::File;
use std::path::{Path, PathBuf};

use tempfile::{NamedTempFile, TempPath};

use crate::addition::ArchiveAddition;
use crate::archive::ArchiveMode;
use crate::entry::EntryHandle;
use crate::error::{Error, Result};
use crate::format::ArchiveFormat;

mod gzip;
mod tar;
mod tar_gz;
mod zip;

pub(crate) use self::gzip::GzipCodec;
pub(crate) use self::tar::TarCodec;
pub(crate) use self::tar_gz::TarGzCodec;
pub(crate) use self::zip::ZipCodec;

/// Default gzip/deflate level when the caller does not pick one.
pub(crate) const DEFAULT_LEVEL: u32 = 6;

pub(crate) enum FormatCodec {
    Zip(ZipCodec),
    Tar(TarCodec),
    Gzip(GzipCodec),
    TarGz(TarGzCodec),
}

impl FormatCodec {
    pub(crate) fn open(
        format: ArchiveFormat,
        file: File,
        path: &Path,
        mode: ArchiveMode,
        level: Option<u32>,
    ) -> Result<Self> {
        let path = path.to_path_buf();
        let codec = match format {
            ArchiveFormat::Zip => Self::Zip(ZipCodec::open(file, path, mode, level)?),
            ArchiveFormat::Tar => Self::Tar(TarCodec::open(file, path, mode)?),
            ArchiveFormat::Gzip => Self::Gzip(GzipCodec::open(file, path, mode, level)?),
            ArchiveFormat::TarGz => Self::TarGz(TarGzCodec::open(file, path, mode, level)?),
        };
        Ok(codec)
    }

    pub(crate) fn add(&mut self, addition: &ArchiveAddition) -> Result<()> {
        match self {
            Self::Zip(codec) => codec.add(addition),
            Self::Tar(codec) => codec.add(addition),
            Self::Gzip(codec) => codec.add(addition),
            Self::TarGz(codec) => codec.add(addition),
        }
    }

    pub(crate) fn next_entry(&mut self) -> Result<Option<EntryHandle<'_>>> {
        match self {
            Self::Zip(codec) => codec.next_entry(),
            Self::Tar(codec) => codec.next_entry(),
            Self::Gzip(codec) => codec.next_entry(),
            Self::TarGz(codec) => codec.next_entry(),
        }
    }

    pub(crate) fn finalize(self) -> Result<()> {
        match self {
            Self::Zip(codec) => codec.finalize(),
            Self::Tar(codec) => codec.finalize(),
            Self::Gzip(codec) => codec.finalize(),
            Self::TarGz(codec) => codec.finalize(),
        }
    }
}

/// Create a hidden sibling of `original` to build a replacement in.
pub(crate) fn shadow_file(original: &Path) -> Result<NamedTempFile> {
    let dir = parent_dir(original);
    let stem = original
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    tempfile::Builder::new()
        .prefix(&format!(".{stem}."))
        .suffix(".shadow")
        .tempfile_in(&dir)
        .map_err(Error::write(dir))
}

/// Swap a fully written shadow file onto `original`.
///
/// If the swap fails after the original was already removed, the shadow is
/// kept on disk so no data is lost.
pub(crate) fn swap_shadow(shadow: TempPath, original: &Path) -> Result<()> {
    match coffer_fs::replace_file(&shadow, original, coffer_fs::ReplaceOptions::new()) {
        Ok(()) => {
            // already renamed away; keep() only disarms the delete-on-drop
            let _ = shadow.keep();
            Ok(())
        }
        Err(e) => {
            if let coffer_fs::Error::ReplaceFile {
                original_removed: true,
                ..
            } = &e
            {
                match shadow.keep() {
                    Ok(kept) => tracing::error!(
                        shadow = %kept.display(),
                        original = %original.display(),
                        "original removed but replacement could not be moved into place"
                    ),
                    Err(keep_err) => tracing::error!(error = %keep_err, "failed to keep shadow file"),
                }
            }
            Err(e.into())
        }
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Unsupported-operation error for `format`.
pub(crate) fn unsupported(format: ArchiveFormat, operation: &'static str) -> Error {
    Error::FormatUnsupportedOperation { format, operation }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn shadow_lives_next_to_original() {
        let dir = tempfile::tempdir().unwrap();
        let original = dir.path().join("bundle.tar");
        std::fs::write(&original, b"v1").unwrap();

        let shadow = shadow_file(&original).unwrap();
        assert_eq!(shadow.path().parent(), Some(dir.path()));
        let name = shadow.path().file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with(".bundle.tar."));
        assert!(name.ends_with(".shadow"));
    }

    #[test]
    fn swap_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let original = dir.path().join("bundle.tar");
        std::fs::write(&original, b"v1").unwrap();

        let mut shadow = shadow_file(&original).unwrap();
        shadow.write_all(b"v2").unwrap();
        let (file, path) = shadow.into_parts();
        drop(file);
        swap_shadow(path, &original).unwrap();

        assert_eq!(std::fs::read(&original).unwrap(), b"v2");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn bare_file_name_uses_current_dir() {
        assert_eq!(parent_dir(Path::new("a.zip")), PathBuf::from("."));
        assert_eq!(parent_dir(Path::new("x/a.zip")), PathBuf::from("x"));
    }
}
