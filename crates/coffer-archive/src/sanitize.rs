use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Result of sanitizing an archive entry name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SanitizedPath {
    pub original: String,
    /// Host-relative path; empty when the entry names the root itself.
    pub relative: PathBuf,
    pub resolved: PathBuf,
}

impl SanitizedPath {
    pub fn is_root(&self) -> bool {
        self.relative.as_os_str().is_empty()
    }
}

/// Turn an archive entry name into a path under `base`.
///
/// Separators become host separators, one trailing separator is dropped,
/// and `.` components vanish. Absolute names, `..` components and
/// characters the host cannot store are rejected.
pub fn sanitize_entry_name(entry: &str, base: impl AsRef<Path>) -> Result<SanitizedPath> {
    let invalid = |reason| Error::InvalidPath {
        entry: entry.to_owned(),
        reason,
    };

    if entry.starts_with(is_separator) {
        return Err(invalid("absolute path"));
    }
    let trimmed = entry.strip_suffix(is_separator).unwrap_or(entry);

    let mut relative = PathBuf::new();
    for part in trimmed.split(is_separator) {
        match part {
            "" | "." => continue,
            ".." => return Err(invalid("parent directory component")),
            _ => {}
        }
        if let Some(reason) = invalid_char(part) {
            return Err(invalid(reason));
        }
        relative.push(part);
    }

    Ok(SanitizedPath {
        original: entry.to_owned(),
        resolved: base.as_ref().join(&relative),
        relative,
    })
}

fn is_separator(c: char) -> bool {
    c == '/' || c == '\\'
}

fn invalid_char(part: &str) -> Option<&'static str> {
    if part.chars().any(char::is_control) {
        return Some("control character");
    }
    if cfg!(windows) && part.chars().any(|c| matches!(c, '<' | '>' | ':' | '"' | '|' | '?' | '*')) {
        return Some("character not allowed on this host");
    }
    None
}
