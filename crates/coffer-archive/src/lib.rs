//! Create, update and extract zip, tar, gzip and tar.gz archives behind one
//! lifecycle, and reconcile extracted entries with an existing tree.
//!
//! # Architecture
//!
//! - `format.rs` / `detect.rs` - format names, extension inference, magic sniffing
//! - `archive.rs` - `Archive` lifecycle and the `open_archive` factory
//! - `codec/` - per-format containers (zip, tar, gzip, tar.gz)
//! - `entry.rs` - entries yielded while reading, and their materialization
//! - `sanitize.rs` / `planner.rs` - entry name validation and collision policy
//! - `compress.rs` / `expand.rs` - whole-tree operations
//!
//! ```no_run
//! use coffer_archive::{CompressOptions, ExpandOptions, compress, expand};
//!
//! # fn main() -> coffer_archive::Result<()> {
//! compress(&["site"], "site.tar.gz", &CompressOptions::default())?;
//! let report = expand("site.tar.gz", "out", &ExpandOptions::default().overwrite())?;
//! for failure in &report.failures {
//!     eprintln!("skipped {}: {}", failure.name, failure.error);
//! }
//! # Ok(())
//! # }
//! ```

pub use addition::{AdditionKind, ArchiveAddition, collect_additions};
pub use archive::{Archive, ArchiveMode, open_archive};
pub use compress::compress;
pub use detect::{detect_format, detect_from_path, detect_from_reader};
pub use entry::{EntryHandle, EntryKind};
pub use error::{Error, ErrorId, Result};
pub use expand::expand;
pub use format::ArchiveFormat;
pub use host::Host;
pub use options::{CompressOptions, ExpandOptions};
pub use planner::{CollisionDecision, ExtractionPlanner, PlacementAction, WritePolicy};
pub use report::{CompressReport, EntryFailure, ExpandReport, ExtractedEntry};
pub use sanitize::{SanitizedPath, sanitize_entry_name};

pub use coffer_fs::PathState;

mod addition;
mod archive;
mod codec;
mod compress;
mod detect;
mod entry;
mod error;
mod expand;
mod format;
mod host;
pub mod options;
mod planner;
mod report;
mod sanitize;
