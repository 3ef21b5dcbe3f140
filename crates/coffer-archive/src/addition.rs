use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{Error, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdditionKind {
    File,
    Directory,
}

/// A filesystem item queued for insertion into an archive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArchiveAddition {
    source_path: PathBuf,
    entry_name: String,
    kind: AdditionKind,
}

impl ArchiveAddition {
    pub fn new(source_path: impl Into<PathBuf>, entry_name: &str, kind: AdditionKind) -> Self {
        Self {
            source_path: source_path.into(),
            entry_name: normalize_entry_name(entry_name),
            kind,
        }
    }

    pub fn file(source_path: impl Into<PathBuf>, entry_name: &str) -> Self {
        Self::new(source_path, entry_name, AdditionKind::File)
    }

    pub fn directory(source_path: impl Into<PathBuf>, entry_name: &str) -> Self {
        Self::new(source_path, entry_name, AdditionKind::Directory)
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    /// Archive-relative name, always with forward slashes.
    pub fn entry_name(&self) -> &str {
        &self.entry_name
    }

    pub fn kind(&self) -> AdditionKind {
        self.kind
    }

    pub fn is_directory(&self) -> bool {
        self.kind == AdditionKind::Directory
    }

    /// Final path component of the entry name.
    pub fn file_name(&self) -> &str {
        self.entry_name
            .rsplit('/')
            .next()
            .unwrap_or(&self.entry_name)
    }
}

fn normalize_entry_name(name: &str) -> String {
    name.replace('\\', "/")
        .split('/')
        .filter(|part| !part.is_empty() && *part != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// Walk `source` and produce one addition per file and directory, named
/// relative to the parent of `source` so the top-level name is kept.
///
/// Symbolic links are skipped.
pub fn collect_additions(source: impl AsRef<Path>) -> Result<Vec<ArchiveAddition>> {
    let source = source.as_ref();
    let root = std::fs::canonicalize(source).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => Error::SourceNotFound(source.to_path_buf()),
        _ => Error::read(source)(e),
    })?;
    let base = root.parent().unwrap_or(&root).to_path_buf();

    let mut additions = Vec::new();
    for entry in WalkDir::new(&root).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(&root).to_path_buf();
            Error::Read {
                path,
                source: e.into(),
            }
        })?;

        let file_type = entry.file_type();
        let kind = if file_type.is_dir() {
            AdditionKind::Directory
        } else if file_type.is_file() {
            AdditionKind::File
        } else {
            tracing::warn!(path = %entry.path().display(), "skipping non-regular file");
            continue;
        };

        let relative = entry.path().strip_prefix(&base).unwrap_or(entry.path());
        let Some(name) = relative_name(relative) else {
            return Err(Error::InvalidPath {
                entry: relative.to_string_lossy().into_owned(),
                reason: "name is not valid UTF-8",
            });
        };
        if name.is_empty() {
            continue;
        }
        additions.push(ArchiveAddition::new(entry.path(), &name, kind));
    }
    Ok(additions)
}

fn relative_name(relative: &Path) -> Option<String> {
    let parts = relative
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<Vec<_>>>()?;
    Some(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_names_are_normalized() {
        let addition = ArchiveAddition::file("x", "./docs\\guide//intro.md");
        assert_eq!(addition.entry_name(), "docs/guide/intro.md");
        assert_eq!(addition.file_name(), "intro.md");
        assert!(!addition.is_directory());

        let addition = ArchiveAddition::directory("x", "/docs/");
        assert_eq!(addition.entry_name(), "docs");
        assert!(addition.is_directory());
    }

    #[test]
    fn collect_keeps_top_level_name() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("site");
        std::fs::create_dir_all(root.join("css")).unwrap();
        std::fs::write(root.join("index.html"), "<p>").unwrap();
        std::fs::write(root.join("css").join("main.css"), "p{}").unwrap();

        let names: Vec<_> = collect_additions(&root)
            .unwrap()
            .into_iter()
            .map(|a| (a.entry_name().to_owned(), a.kind()))
            .collect();

        assert_eq!(
            names,
            vec![
                ("site".to_owned(), AdditionKind::Directory),
                ("site/css".to_owned(), AdditionKind::Directory),
                ("site/css/main.css".to_owned(), AdditionKind::File),
                ("site/index.html".to_owned(), AdditionKind::File),
            ]
        );
    }

    #[test]
    fn collect_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("notes.txt");
        std::fs::write(&file, "n").unwrap();

        let additions = collect_additions(&file).unwrap();
        assert_eq!(additions.len(), 1);
        assert_eq!(additions[0].entry_name(), "notes.txt");
        assert_eq!(additions[0].kind(), AdditionKind::File);
    }

    #[test]
    fn collect_missing_source() {
        let dir = tempfile::tempdir().unwrap();
        let err = collect_additions(dir.path().join("missing")).unwrap_err();
        assert!(matches!(err, Error::SourceNotFound(_)));
    }
}
