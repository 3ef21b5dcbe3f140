use std::fs::File;
use std::io::{self, Read, Seek};
use std::path::Path;

use flate2::read::GzDecoder;

use crate::format::ArchiveFormat;

const TAR_BLOCK: usize = 512;

/// Sniff the container format from the first bytes of a file.
///
/// A gzip member is reported as [`ArchiveFormat::Gzip`]; telling a
/// compressed tar apart needs the decompressed payload, see
/// [`detect_from_path`].
pub fn detect_format(data: &[u8]) -> Option<ArchiveFormat> {
    match data {
        [0x50, 0x4B, 0x03, 0x04, ..] | [0x50, 0x4B, 0x05, 0x06, ..] => Some(ArchiveFormat::Zip),
        [0x1F, 0x8B, ..] => Some(ArchiveFormat::Gzip),
        _ if is_tar_header(data) => Some(ArchiveFormat::Tar),
        _ => None,
    }
}

fn is_tar_header(data: &[u8]) -> bool {
    data.len() >= TAR_BLOCK && data[257..262] == *b"ustar"
}

pub fn detect_from_reader<R: Read + Seek>(reader: &mut R) -> io::Result<Option<ArchiveFormat>> {
    let mut header = Vec::with_capacity(TAR_BLOCK);
    reader.by_ref().take(TAR_BLOCK as u64).read_to_end(&mut header)?;
    reader.rewind()?;
    Ok(detect_format(&header))
}

/// Sniff a file on disk, looking inside gzip members for a tar header.
pub fn detect_from_path(path: impl AsRef<Path>) -> io::Result<Option<ArchiveFormat>> {
    let mut file = File::open(path)?;
    match detect_from_reader(&mut file)? {
        Some(ArchiveFormat::Gzip) => {
            let mut inner = Vec::with_capacity(TAR_BLOCK);
            let read = GzDecoder::new(file)
                .take(TAR_BLOCK as u64)
                .read_to_end(&mut inner);
            match read {
                Ok(_) if is_tar_header(&inner) => Ok(Some(ArchiveFormat::TarGz)),
                _ => Ok(Some(ArchiveFormat::Gzip)),
            }
        }
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn detect_zip_format() {
        let zip_header = [0x50, 0x4B, 0x03, 0x04, 0x14, 0x00, 0x00, 0x00];
        assert_eq!(detect_format(&zip_header), Some(ArchiveFormat::Zip));
    }

    #[test]
    fn detect_empty_zip_format() {
        let eocd = [0x50, 0x4B, 0x05, 0x06, 0x00, 0x00];
        assert_eq!(detect_format(&eocd), Some(ArchiveFormat::Zip));
    }

    #[test]
    fn detect_gzip_format() {
        let gz_header = [0x1F, 0x8B, 0x08, 0x00];
        assert_eq!(detect_format(&gz_header), Some(ArchiveFormat::Gzip));
    }

    #[test]
    fn detect_tar_plain_format() {
        let mut tar_header = [0u8; 512];
        tar_header[257..263].copy_from_slice(b"ustar\0");
        assert_eq!(detect_format(&tar_header), Some(ArchiveFormat::Tar));
    }

    #[test]
    fn detect_unknown_format() {
        let random_data = [0xDE, 0xAD, 0xBE, 0xEF, 0x00, 0x00, 0x00, 0x00];
        assert_eq!(detect_format(&random_data), None);
    }

    #[test]
    fn detect_truncated_tar_header() {
        let short_data = [0u8; 256];
        assert_eq!(detect_format(&short_data), None);
    }

    #[test]
    fn reader_is_rewound() {
        let mut cursor = io::Cursor::new(vec![0x50, 0x4B, 0x03, 0x04, 0x00]);
        assert_eq!(detect_from_reader(&mut cursor).unwrap(), Some(ArchiveFormat::Zip));
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn gzip_wrapping_tar_is_tar_gz() {
        let dir = tempfile::tempdir().unwrap();

        let mut tar_bytes = Vec::new();
        {
            let mut builder = tar::Builder::new(&mut tar_bytes);
            let mut header = tar::Header::new_ustar();
            header.set_size(2);
            header.set_mode(0o644);
            builder.append_data(&mut header, "a.txt", &b"hi"[..]).unwrap();
            builder.finish().unwrap();
        }

        let tgz = dir.path().join("bundle.bin");
        let mut encoder =
            flate2::write::GzEncoder::new(File::create(&tgz).unwrap(), flate2::Compression::default());
        encoder.write_all(&tar_bytes).unwrap();
        encoder.finish().unwrap();
        assert_eq!(detect_from_path(&tgz).unwrap(), Some(ArchiveFormat::TarGz));

        let gz = dir.path().join("notes.bin");
        let mut encoder =
            flate2::write::GzEncoder::new(File::create(&gz).unwrap(), flate2::Compression::default());
        encoder.write_all(b"plain text").unwrap();
        encoder.finish().unwrap();
        assert_eq!(detect_from_path(&gz).unwrap(), Some(ArchiveFormat::Gzip));
    }
}
