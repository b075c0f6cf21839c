//! Path expansion for key files and configuration locations
//!
//! Turns `~`, `~/rest` and relative paths into absolute paths.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Path expansion errors
#[derive(Error, Debug)]
pub enum PathError {
    #[error("cannot expand '{0}': home directory could not be determined")]
    NoHomeDir(String),

    #[error("path is not valid UTF-8: {}", .0.display())]
    NotUnicode(PathBuf),

    #[error("cannot resolve '{path}': failed to read current directory: {source}")]
    CurrentDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Expand a user-supplied path into an absolute path.
///
/// - `~` becomes the home directory
/// - `~/rest` becomes the home directory joined with `rest`
/// - absolute paths are returned unchanged
/// - any other path is joined onto the current working directory
///
/// `~user` forms are not expanded; they are treated as ordinary relative paths.
pub fn expand_path(path: &str) -> Result<PathBuf, PathError> {
    if path == "~" {
        return home_dir(path);
    }

    if let Some(rest) = path.strip_prefix("~/") {
        return Ok(home_dir(path)?.join(rest));
    }

    let candidate = Path::new(path);
    if candidate.is_absolute() {
        return Ok(candidate.to_path_buf());
    }

    let cwd = std::env::current_dir().map_err(|source| PathError::CurrentDir {
        path: path.to_string(),
        source,
    })?;
    Ok(cwd.join(candidate))
}

fn home_dir(path: &str) -> Result<PathBuf, PathError> {
    dirs::home_dir().ok_or_else(|| PathError::NoHomeDir(path.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tilde_alone_is_home() {
        let Some(home) = dirs::home_dir() else {
            return;
        };
        assert_eq!(expand_path("~").unwrap(), home);
    }

    #[test]
    fn test_tilde_prefix_joins_home() {
        let Some(home) = dirs::home_dir() else {
            return;
        };
        assert_eq!(
            expand_path("~/.config/gh/key.pem").unwrap(),
            home.join(".config/gh/key.pem")
        );
    }

    #[test]
    fn test_relative_becomes_absolute() {
        let expanded = expand_path("key.pem").unwrap();
        assert!(expanded.is_absolute());
        assert!(expanded.ends_with("key.pem"));
        assert_eq!(expanded, std::env::current_dir().unwrap().join("key.pem"));
    }

    #[cfg(unix)]
    #[test]
    fn test_absolute_unchanged() {
        assert_eq!(
            expand_path("/abs/path").unwrap(),
            PathBuf::from("/abs/path")
        );
    }

    #[test]
    fn test_named_user_tilde_is_relative() {
        let expanded = expand_path("~bob/key.pem").unwrap();
        assert!(expanded.is_absolute());
        assert!(expanded.ends_with("~bob/key.pem"));
    }
}
