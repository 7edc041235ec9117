//! Path safety gate for bulk extraction.
//!
//! Every entry path, hardlink target and symlink target is checked here before
//! it is used to build a real filesystem path. The check is purely lexical:
//! a `..` component anywhere is rejected, under either separator.
//!
//! # Example
//!
//! ```rust
//! use tarsmith::is_path_safe;
//!
//! assert!(is_path_safe("a/b/c"));
//! assert!(is_path_safe(""));
//! assert!(!is_path_safe("/etc/passwd"));
//! assert!(!is_path_safe("a/../../b"));
//! assert!(!is_path_safe("C:\\x"));
//! ```

use crate::error::UnsafePathKind;
use crate::{Error, Result};

/// Returns true if `path` can be joined under an extraction root without
/// escaping it.
///
/// Rejects:
/// - paths starting with `/` (absolute Unix paths)
/// - paths starting with a drive letter and a colon (absolute Windows paths)
/// - paths containing a `..` component anywhere, where components are
///   separated by `/` or `\`
///
/// The empty path is accepted.
pub fn is_path_safe(path: &str) -> bool {
    let bytes = path.as_bytes();

    if bytes.first() == Some(&b'/') {
        return false;
    }

    if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
        return false;
    }

    !path.split(['/', '\\']).any(|component| component == "..")
}

/// Fails with a security error if `path` is not safe.
pub(crate) fn check(path: &str, kind: UnsafePathKind) -> Result<()> {
    if is_path_safe(path) {
        Ok(())
    } else {
        log::warn!("Rejecting unsafe {} '{}'", kind, path);
        Err(Error::unsafe_path(path, kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolute_unix() {
        assert!(!is_path_safe("/etc/passwd"));
        assert!(!is_path_safe("/"));
    }

    #[test]
    fn test_drive_letters() {
        assert!(!is_path_safe("C:\\x"));
        assert!(!is_path_safe("c:relative"));
        assert!(!is_path_safe("z:"));
        // Only a single letter counts as a drive designator.
        assert!(is_path_safe("ab:c"));
        assert!(is_path_safe("1:x"));
    }

    #[test]
    fn test_parent_components() {
        assert!(!is_path_safe(".."));
        assert!(!is_path_safe("../../x"));
        assert!(!is_path_safe("a/../../b"));
        assert!(!is_path_safe("a/b/.."));
        assert!(!is_path_safe("a\\..\\b"));
        assert!(!is_path_safe("a/..\\b"));
    }

    #[test]
    fn test_dots_inside_names_are_fine() {
        assert!(is_path_safe("a/b/c"));
        assert!(is_path_safe("..a/b"));
        assert!(is_path_safe("a../b"));
        assert!(is_path_safe("a/.../b"));
        assert!(is_path_safe("./a"));
        assert!(is_path_safe("dir/"));
    }

    #[test]
    fn test_empty_is_safe() {
        assert!(is_path_safe(""));
    }

    #[test]
    fn test_check_reports_kind() {
        assert!(check("ok/path", UnsafePathKind::Entry).is_ok());
        let err = check("../x", UnsafePathKind::HardlinkTarget).unwrap_err();
        assert!(matches!(
            err,
            Error::UnsafePath {
                kind: UnsafePathKind::HardlinkTarget,
                ..
            }
        ));
    }
}
