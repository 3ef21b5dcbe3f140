use std::path::Path;

use crate::addition::{AdditionKind, collect_additions};
use crate::archive::{ArchiveMode, open_archive};
use crate::error::{Error, Result};
use crate::format::ArchiveFormat;
use crate::options::CompressOptions;
use crate::report::CompressReport;

/// Pack `sources` into the archive at `destination`.
///
/// Directories are added recursively under their own name. With
/// `options.update` the destination must already exist and the new entries
/// are merged into it; otherwise the destination must not exist.
pub fn compress<P: AsRef<Path>>(
    sources: &[P],
    destination: impl AsRef<Path>,
    options: &CompressOptions,
) -> Result<CompressReport> {
    let destination = destination.as_ref();
    let format = options
        .format
        .unwrap_or_else(|| ArchiveFormat::infer_or_default(destination));
    let mode = if options.update {
        ArchiveMode::Update
    } else {
        ArchiveMode::Create
    };

    // an update may walk over the archive itself
    let own_path = std::fs::canonicalize(destination).ok();
    let mut additions = Vec::new();
    for source in sources {
        let source = source.as_ref();
        if !format.supports_directories() && source.is_dir() {
            return Err(Error::SourceIsDirectory(source.to_path_buf()));
        }
        additions.extend(
            collect_additions(source)?
                .into_iter()
                .filter(|a| own_path.as_deref() != Some(a.source_path())),
        );
    }

    let mut archive = open_archive(format, destination, mode, options.level)?;
    let mut report = CompressReport {
        format,
        entry_count: 0,
        total_bytes: 0,
    };
    for addition in &additions {
        archive.add(addition)?;
        report.entry_count += 1;
        if addition.kind() == AdditionKind::File {
            report.total_bytes += std::fs::metadata(addition.source_path())
                .map(|m| m.len())
                .unwrap_or(0);
        }
    }
    archive.close()?;

    tracing::info!(
        archive = %destination.display(),
        %format,
        entries = report.entry_count,
        bytes = report.total_bytes,
        "compressed"
    );
    Ok(report)
}
