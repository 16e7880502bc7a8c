//! Path normalization
//!
//! Every path that is compared against another (playlist entries, library
//! rows, state keys) goes through [`normalize_path`]. Normalization is purely
//! lexical: `.` and `..` components and redundant separators are resolved
//! without touching the file system, so symlinks are never followed.

use std::path::{Component, Path, PathBuf};

use crate::error::DecodeError;

/// Normalize a textual path into its canonical absolute form
///
/// Relative paths are anchored at the current working directory.
pub fn normalize_path(path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
    };
    lexical_clean(&absolute)
}

/// Decode a raw path (as stored by the library database) and normalize it
pub fn normalize_bytes(bytes: &[u8]) -> Result<PathBuf, DecodeError> {
    let text = std::str::from_utf8(bytes)?;
    Ok(normalize_path(text))
}

/// Expand a leading `~` to the user's home directory
pub fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}

fn lexical_clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                // `..` at the root stays at the root
                if out.parent().is_some() {
                    out.pop();
                }
            }
            Component::Normal(part) => out.push(part),
        }
    }
    out
}
