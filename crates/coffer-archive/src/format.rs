use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::Error;
use crate::detect::detect_from_path;

/// Container formats handled behind the [`Archive`](crate::Archive) abstraction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArchiveFormat {
    Zip,
    Tar,
    /// A single gzip member holding exactly one file.
    Gzip,
    TarGz,
}

impl ArchiveFormat {
    pub const ALL: [ArchiveFormat; 4] = [Self::Zip, Self::Tar, Self::Gzip, Self::TarGz];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Zip => "zip",
            Self::Tar => "tar",
            Self::Gzip => "gzip",
            Self::TarGz => "tar.gz",
        }
    }

    /// Conventional file extension, without the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Zip => "zip",
            Self::Tar => "tar",
            Self::Gzip => "gz",
            Self::TarGz => "tar.gz",
        }
    }

    /// Whether the container can hold directory entries.
    pub fn supports_directories(self) -> bool {
        !matches!(self, Self::Gzip)
    }

    /// Infer the format from the file name alone.
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        let name = path.as_ref().file_name()?.to_str()?.to_ascii_lowercase();
        if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Some(Self::TarGz)
        } else if name.ends_with(".tar") {
            Some(Self::Tar)
        } else if name.ends_with(".gz") || name.ends_with(".gzip") {
            Some(Self::Gzip)
        } else if name.ends_with(".zip") {
            Some(Self::Zip)
        } else {
            None
        }
    }

    /// Infer the format from the file name, then from the file content when
    /// it exists, and fall back to zip with a warning.
    pub fn infer_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if let Some(format) = Self::from_path(path) {
            return format;
        }
        match detect_from_path(path) {
            Ok(Some(format)) => format,
            _ => {
                tracing::warn!(
                    path = %path.display(),
                    "cannot infer archive format, defaulting to zip"
                );
                Self::Zip
            }
        }
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArchiveFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "zip" => Ok(Self::Zip),
            "tar" => Ok(Self::Tar),
            "gz" | "gzip" => Ok(Self::Gzip),
            "tgz" | "tar.gz" | "targz" => Ok(Self::TarGz),
            _ => Err(Error::UnsupportedFormat(s.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_path_by_extension() {
        assert_eq!(ArchiveFormat::from_path("a/b.zip"), Some(ArchiveFormat::Zip));
        assert_eq!(ArchiveFormat::from_path("b.TAR"), Some(ArchiveFormat::Tar));
        assert_eq!(ArchiveFormat::from_path("b.tar.gz"), Some(ArchiveFormat::TarGz));
        assert_eq!(ArchiveFormat::from_path("b.tgz"), Some(ArchiveFormat::TarGz));
        assert_eq!(ArchiveFormat::from_path("notes.txt.gz"), Some(ArchiveFormat::Gzip));
        assert_eq!(ArchiveFormat::from_path("b.rar"), None);
        assert_eq!(ArchiveFormat::from_path("noext"), None);
    }

    #[test]
    fn parse_names() {
        assert_eq!("ZIP".parse::<ArchiveFormat>().unwrap(), ArchiveFormat::Zip);
        assert_eq!("gz".parse::<ArchiveFormat>().unwrap(), ArchiveFormat::Gzip);
        assert_eq!("tgz".parse::<ArchiveFormat>().unwrap(), ArchiveFormat::TarGz);

        let err = "rar".parse::<ArchiveFormat>().unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(name) if name == "rar"));
    }

    #[test]
    fn display_matches_parse() {
        for format in ArchiveFormat::ALL {
            assert_eq!(format.to_string().parse::<ArchiveFormat>().unwrap(), format);
        }
    }

    #[test]
    fn unknown_missing_file_defaults_to_zip() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            ArchiveFormat::infer_or_default(dir.path().join("bundle")),
            ArchiveFormat::Zip
        );
    }

    #[test]
    fn only_gzip_rejects_directories() {
        assert!(ArchiveFormat::Zip.supports_directories());
        assert!(ArchiveFormat::TarGz.supports_directories());
        assert!(!ArchiveFormat::Gzip.supports_directories());
    }
}
