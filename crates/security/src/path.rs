//! Path validation: filesystem sandboxing to the workspace root.
//!
//! Paths coming from the model are untrusted. They are joined onto the root,
//! normalized, and resolved through any symlinks before the containment
//! check, so `output/../../etc/passwd` and a symlink pointing at `/etc` are
//! both refused.

use std::path::{Component, Path, PathBuf};

/// Error returned when path validation fails.
#[derive(Debug, thiserror::Error)]
pub enum PathValidationError {
    #[error("Path '{path}' is outside the workspace")]
    OutsideRoot { path: String },

    #[error("Invalid path '{path}'")]
    InvalidPath { path: String },

    #[error("Failed to canonicalize path '{path}': {reason}")]
    CanonicalizeFailed { path: String, reason: String },
}

/// Resolve `requested` against `root` and ensure the result stays inside it.
///
/// The target does not need to exist (writes create files), but the deepest
/// existing ancestor is canonicalized so symlinks cannot escape. Absolute
/// paths are accepted only when they already point inside the root.
///
/// Returns the resolved absolute path on success.
pub fn contain_path(root: &Path, requested: &str) -> Result<PathBuf, PathValidationError> {
    if requested.contains('\0') {
        return Err(PathValidationError::InvalidPath {
            path: requested.into(),
        });
    }

    let canonical_root = root
        .canonicalize()
        .map_err(|e| PathValidationError::CanonicalizeFailed {
            path: root.display().to_string(),
            reason: e.to_string(),
        })?;

    let normalized_input = requested.replace('\\', "/");
    let input_path = Path::new(&normalized_input);
    let joined = if input_path.is_absolute() {
        input_path.to_path_buf()
    } else {
        canonical_root.join(input_path)
    };

    let lexical = normalize_lexically(&joined);
    let resolved = resolve_existing_prefix(&lexical).map_err(|reason| {
        PathValidationError::CanonicalizeFailed {
            path: requested.into(),
            reason,
        }
    })?;

    if !resolved.starts_with(&canonical_root) {
        tracing::warn!(path = requested, "Rejected path outside workspace");
        return Err(PathValidationError::OutsideRoot {
            path: requested.into(),
        });
    }

    Ok(resolved)
}

/// Render `path` relative to `root` with `/` separators.
///
/// Returns an empty string for the root itself.
pub fn relative_display(root: &Path, path: &Path) -> String {
    let canonical_root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
    let relative = path
        .strip_prefix(&canonical_root)
        .or_else(|_| path.strip_prefix(root))
        .unwrap_or(path);
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Collapse `.` and `..` without touching the filesystem.
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Canonicalize the longest existing ancestor and re-attach the rest.
fn resolve_existing_prefix(path: &Path) -> Result<PathBuf, String> {
    let mut existing = path.to_path_buf();
    let mut missing = Vec::new();

    while !existing.exists() {
        match (existing.file_name(), existing.parent()) {
            (Some(name), Some(parent)) => {
                missing.push(name.to_os_string());
                existing = parent.to_path_buf();
            }
            _ => break,
        }
    }

    let mut resolved = existing.canonicalize().map_err(|e| e.to_string())?;
    for name in missing.into_iter().rev() {
        resolved.push(name);
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn root() -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("output/emails")).unwrap();
        std::fs::write(dir.path().join("output/report.md"), "# Report").unwrap();
        dir
    }

    #[test]
    fn relative_path_inside_root() {
        let dir = root();
        let resolved = contain_path(dir.path(), "output/report.md").unwrap();
        assert!(resolved.ends_with("output/report.md"));
        assert!(resolved.starts_with(dir.path().canonicalize().unwrap()));
    }

    #[test]
    fn empty_path_is_the_root() {
        let dir = root();
        let resolved = contain_path(dir.path(), "").unwrap();
        assert_eq!(resolved, dir.path().canonicalize().unwrap());
    }

    #[test]
    fn nonexistent_target_is_allowed() {
        let dir = root();
        let resolved = contain_path(dir.path(), "output/case_studies/new/file.md").unwrap();
        assert!(resolved.ends_with("output/case_studies/new/file.md"));
    }

    #[test]
    fn traversal_that_stays_inside_is_allowed() {
        let dir = root();
        let resolved = contain_path(dir.path(), "output/emails/../report.md").unwrap();
        assert!(resolved.ends_with("output/report.md"));
    }

    #[test]
    fn traversal_out_of_root_blocked() {
        let dir = root();
        let err = contain_path(dir.path(), "../../../etc/passwd").unwrap_err();
        assert!(matches!(err, PathValidationError::OutsideRoot { .. }));

        let err = contain_path(dir.path(), "output/../../secret.txt").unwrap_err();
        assert!(matches!(err, PathValidationError::OutsideRoot { .. }));
    }

    #[test]
    fn absolute_path_outside_root_blocked() {
        let dir = root();
        let err = contain_path(dir.path(), "/etc/passwd").unwrap_err();
        assert!(matches!(err, PathValidationError::OutsideRoot { .. }));
    }

    #[test]
    fn absolute_path_inside_root_allowed() {
        let dir = root();
        let inside = dir.path().canonicalize().unwrap().join("output/report.md");
        let resolved = contain_path(dir.path(), inside.to_str().unwrap()).unwrap();
        assert_eq!(resolved, inside);
    }

    #[test]
    fn sibling_with_common_prefix_blocked() {
        let parent = TempDir::new().unwrap();
        let data = parent.path().join("data");
        let sibling = parent.path().join("data2");
        std::fs::create_dir_all(&data).unwrap();
        std::fs::create_dir_all(&sibling).unwrap();
        let err = contain_path(&data, "../data2/x.txt").unwrap_err();
        assert!(matches!(err, PathValidationError::OutsideRoot { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn symlink_escape_blocked() {
        let dir = root();
        let outside = TempDir::new().unwrap();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("escape")).unwrap();
        let err = contain_path(dir.path(), "escape/loot.txt").unwrap_err();
        assert!(matches!(err, PathValidationError::OutsideRoot { .. }));
    }

    #[test]
    fn nul_byte_rejected() {
        let dir = root();
        let err = contain_path(dir.path(), "output/\0evil").unwrap_err();
        assert!(matches!(err, PathValidationError::InvalidPath { .. }));
    }

    #[test]
    fn missing_root_fails_to_canonicalize() {
        let err = contain_path(Path::new("/definitely/not/here"), "x").unwrap_err();
        assert!(matches!(err, PathValidationError::CanonicalizeFailed { .. }));
    }

    #[test]
    fn relative_display_uses_forward_slashes() {
        let dir = root();
        let resolved = contain_path(dir.path(), "output/report.md").unwrap();
        assert_eq!(relative_display(dir.path(), &resolved), "output/report.md");
        let root_path = contain_path(dir.path(), "").unwrap();
        assert_eq!(relative_display(dir.path(), &root_path), "");
    }
}
