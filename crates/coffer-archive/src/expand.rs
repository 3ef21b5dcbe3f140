use std::io;
use std::path::Path;

use coffer_fs::PathState;

use crate::archive::{ArchiveMode, open_archive};
use crate::error::{Error, Result};
use crate::format::ArchiveFormat;
use crate::options::ExpandOptions;
use crate::planner::ExtractionPlanner;
use crate::report::{EntryFailure, ExpandReport, ExtractedEntry};

/// Unpack the archive at `source` under `destination`.
///
/// Entries that collide with the existing tree or carry unusable names are
/// logged, recorded in [`ExpandReport::failures`] and skipped. Any other
/// error aborts the extraction.
pub fn expand(
    source: impl AsRef<Path>,
    destination: impl AsRef<Path>,
    options: &ExpandOptions,
) -> Result<ExpandReport> {
    let source = source.as_ref();
    let destination = destination.as_ref();

    match coffer_fs::probe(source)? {
        PathState::Missing => return Err(Error::SourceNotFound(source.to_path_buf())),
        PathState::Directory { .. } => return Err(Error::SourceIsDirectory(source.to_path_buf())),
        PathState::File => {}
    }
    if same_file(source, destination) {
        return Err(Error::DestinationEqualsSource(destination.to_path_buf()));
    }
    prepare_root(destination)?;

    let format = options
        .format
        .unwrap_or_else(|| ArchiveFormat::infer_or_default(source));
    let mut archive = open_archive(format, source, ArchiveMode::Extract, None)?;
    let planner = ExtractionPlanner::new(destination, options.policy, options.host.clone());
    let mut report = ExpandReport::new(format);

    while let Some(entry) = archive.next_entry()? {
        let name = entry.name().to_owned();
        let size = entry.size();
        let is_directory = entry.is_directory();
        match planner.place(entry) {
            Ok(decision) => report.entries.push(ExtractedEntry {
                name,
                target_path: decision.target_path,
                size,
                is_directory,
                action: decision.action,
            }),
            Err(error) if error.is_per_entry() => {
                tracing::warn!(entry = %name, error = %error, id = %error.id(), "skipping entry");
                report.failures.push(EntryFailure { name, error });
            }
            Err(error) => return Err(error),
        }
    }
    archive.close()?;

    tracing::info!(
        archive = %source.display(),
        destination = %destination.display(),
        %format,
        entries = report.entry_count(),
        skipped = report.failures.len(),
        "expanded"
    );
    Ok(report)
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (std::fs::canonicalize(a), std::fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn prepare_root(destination: &Path) -> Result<()> {
    let unavailable = |source| Error::DestinationRootUnavailable {
        path: destination.to_path_buf(),
        source,
    };
    std::fs::create_dir_all(destination).map_err(unavailable)?;
    if !coffer_fs::is_writable_dir(destination) {
        return Err(unavailable(io::Error::new(
            io::ErrorKind::PermissionDenied,
            "destination is read-only",
        )));
    }
    Ok(())
}
