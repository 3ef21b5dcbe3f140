use std::path::PathBuf;

use crate::error::Error;
use crate::format::ArchiveFormat;
use crate::planner::PlacementAction;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompressReport {
    pub format: ArchiveFormat,
    pub entry_count: usize,
    pub total_bytes: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtractedEntry {
    pub name: String,
    pub target_path: PathBuf,
    pub size: u64,
    pub is_directory: bool,
    pub action: PlacementAction,
}

/// An entry that was skipped because of a per-entry error.
#[derive(Debug)]
pub struct EntryFailure {
    pub name: String,
    pub error: Error,
}

#[derive(Debug)]
pub struct ExpandReport {
    pub format: ArchiveFormat,
    pub entries: Vec<ExtractedEntry>,
    pub failures: Vec<EntryFailure>,
}

impl ExpandReport {
    pub(crate) fn new(format: ArchiveFormat) -> Self {
        Self {
            format,
            entries: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    pub fn total_bytes(&self) -> u64 {
        self.entries.iter().map(|e| e.size).sum()
    }

    /// True when every entry was placed.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}
