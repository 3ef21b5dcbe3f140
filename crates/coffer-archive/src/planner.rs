use std::path::{Path, PathBuf};

use coffer_fs::PathState;

use crate::entry::EntryHandle;
use crate::error::{Error, Result};
use crate::host::Host;
use crate::sanitize::{SanitizedPath, sanitize_entry_name};

/// How extraction treats paths that already exist under the destination.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WritePolicy {
    /// Only create new paths; any existing target is reported and skipped.
    #[default]
    Expand,
    /// Replace existing files and empty directories.
    Overwrite,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlacementAction {
    Create,
    Overwrite,
    /// The target already is what the entry describes.
    Skip,
}

/// Outcome of checking one entry against the destination tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CollisionDecision {
    pub target_path: PathBuf,
    pub existing: PathState,
    pub action: PlacementAction,
}

impl CollisionDecision {
    pub fn exists_as_file(&self) -> bool {
        self.existing == PathState::File
    }

    pub fn exists_as_directory(&self) -> bool {
        self.existing.is_directory()
    }

    pub fn is_non_empty_directory(&self) -> bool {
        self.existing.is_non_empty_directory()
    }
}

/// Places archive entries under a destination root according to a
/// [`WritePolicy`].
#[derive(Clone, Debug)]
pub struct ExtractionPlanner {
    root: PathBuf,
    policy: WritePolicy,
    host: Host,
}

impl ExtractionPlanner {
    pub fn new(root: impl Into<PathBuf>, policy: WritePolicy, host: Host) -> Self {
        Self {
            root: root.into(),
            policy,
            host,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn policy(&self) -> WritePolicy {
        self.policy
    }

    /// Decide what to do with an entry without touching the filesystem
    /// beyond probing.
    pub fn decide(&self, entry_name: &str, is_directory: bool) -> Result<CollisionDecision> {
        let sanitized = sanitize_entry_name(entry_name, &self.root)?;
        let is_root = sanitized.is_root();
        let SanitizedPath {
            relative,
            resolved: target,
            ..
        } = sanitized;

        if is_root {
            if !is_directory {
                return Err(Error::InvalidPath {
                    entry: entry_name.to_owned(),
                    reason: "empty file name",
                });
            }
            let existing = coffer_fs::probe(&target)?;
            return Ok(CollisionDecision {
                target_path: target,
                existing,
                action: PlacementAction::Skip,
            });
        }

        self.check_ancestors(&relative)?;

        let existing = coffer_fs::probe(&target)?;
        let action = match existing {
            PathState::Missing => PlacementAction::Create,
            PathState::Directory { children: 0 } if is_directory => PlacementAction::Skip,
            PathState::Directory { .. } if is_directory => {
                return Err(Error::DestinationIsNonEmptyDirectory(target));
            }
            _ if self.policy == WritePolicy::Expand => {
                return Err(Error::DestinationExists(target));
            }
            _ if self.host.is_working_dir(&target) => {
                return Err(Error::CannotOverwriteWorkingDirectory(target));
            }
            PathState::Directory { children } if children > 0 => {
                return Err(Error::DestinationIsNonEmptyDirectory(target));
            }
            PathState::File | PathState::Directory { .. } => PlacementAction::Overwrite,
        };

        Ok(CollisionDecision {
            target_path: target,
            existing,
            action,
        })
    }

    /// Decide, then carry out the decision for `entry`.
    pub fn place(&self, entry: EntryHandle<'_>) -> Result<CollisionDecision> {
        let decision = self.decide(entry.name(), entry.is_directory())?;
        match decision.action {
            PlacementAction::Skip => {}
            PlacementAction::Create => {
                entry.materialize(&decision.target_path, &self.host)?;
            }
            PlacementAction::Overwrite => {
                coffer_fs::remove_existing(&decision.target_path, decision.existing)?;
                entry.materialize(&decision.target_path, &self.host)?;
            }
        }
        tracing::trace!(
            target = %decision.target_path.display(),
            action = ?decision.action,
            "placed entry"
        );
        Ok(decision)
    }

    /// A non-directory anywhere between the root and the target blocks the
    /// entry; only the target itself is ever replaced.
    fn check_ancestors(&self, relative: &Path) -> Result<()> {
        let mut current = self.root.clone();
        let mut components = relative.components().peekable();
        while let Some(component) = components.next() {
            if components.peek().is_none() {
                break;
            }
            current.push(component);
            match coffer_fs::probe(&current)? {
                PathState::Missing => return Ok(()),
                PathState::Directory { .. } => {}
                PathState::File => return Err(Error::DestinationExists(current)),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn planner(root: &Path, policy: WritePolicy) -> ExtractionPlanner {
        ExtractionPlanner::new(root, policy, Host::detached())
    }

    #[test]
    fn missing_target_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let decision = planner(dir.path(), WritePolicy::Expand)
            .decide("a/b.txt", false)
            .unwrap();
        assert_eq!(decision.action, PlacementAction::Create);
        assert_eq!(decision.target_path, dir.path().join("a").join("b.txt"));
    }

    #[test]
    fn expand_reports_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "old").unwrap();
        let err = planner(dir.path(), WritePolicy::Expand)
            .decide("a.txt", false)
            .unwrap_err();
        assert!(matches!(err, Error::DestinationExists(_)));
    }

    #[test]
    fn overwrite_replaces_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "old").unwrap();
        let decision = planner(dir.path(), WritePolicy::Overwrite)
            .decide("a.txt", false)
            .unwrap();
        assert_eq!(decision.action, PlacementAction::Overwrite);
        assert!(decision.exists_as_file());
    }

    #[test]
    fn directory_entry_on_empty_directory_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("d")).unwrap();
        for policy in [WritePolicy::Expand, WritePolicy::Overwrite] {
            let decision = planner(dir.path(), policy).decide("d/", true).unwrap();
            assert_eq!(decision.action, PlacementAction::Skip);
        }
    }

    #[test]
    fn non_empty_directory_is_never_replaced() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("d")).unwrap();
        std::fs::write(dir.path().join("d").join("keep"), "k").unwrap();

        let err = planner(dir.path(), WritePolicy::Overwrite)
            .decide("d", false)
            .unwrap_err();
        assert!(matches!(err, Error::DestinationIsNonEmptyDirectory(_)));

        let err = planner(dir.path(), WritePolicy::Expand)
            .decide("d", false)
            .unwrap_err();
        assert!(matches!(err, Error::DestinationExists(_)));

        let err = planner(dir.path(), WritePolicy::Overwrite)
            .decide("d/", true)
            .unwrap_err();
        assert!(matches!(err, Error::DestinationIsNonEmptyDirectory(_)));
    }

    #[test]
    fn working_directory_is_protected() {
        let dir = tempfile::tempdir().unwrap();
        let cwd = dir.path().join("cwd");
        std::fs::create_dir(&cwd).unwrap();
        let planner = ExtractionPlanner::new(
            dir.path(),
            WritePolicy::Overwrite,
            Host::detached().working_dir(&cwd),
        );

        let err = planner.decide("cwd", false).unwrap_err();
        assert!(matches!(err, Error::CannotOverwriteWorkingDirectory(_)));
    }

    #[test]
    fn file_ancestor_blocks_entry() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a"), "file").unwrap();
        let err = planner(dir.path(), WritePolicy::Overwrite)
            .decide("a/b.txt", false)
            .unwrap_err();
        assert!(matches!(err, Error::DestinationExists(p) if p == dir.path().join("a")));
    }

    #[test]
    fn root_entries() {
        let dir = tempfile::tempdir().unwrap();
        let decision = planner(dir.path(), WritePolicy::Expand)
            .decide("./", true)
            .unwrap();
        assert_eq!(decision.action, PlacementAction::Skip);

        let err = planner(dir.path(), WritePolicy::Expand)
            .decide(".", false)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidPath { .. }));
    }
}
