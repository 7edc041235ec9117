//! Unix file ownership support.
//!
//! [`UnixOwnership`] holds the numeric uid/gid of an entry so they can be
//! captured from a file when archiving and applied to a path when
//! extracting. Owner and group names travel in the header only; they are
//! never resolved against the local user database.
//!
//! # Example
//!
//! ```rust
//! use tarsmith::UnixOwnership;
//!
//! let ownership = UnixOwnership::from_ids(1000, 100);
//! assert_eq!(ownership.uid, Some(1000));
//! ```

use std::fs::Metadata;
use std::path::Path;

/// Unix file ownership information.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnixOwnership {
    /// User ID (UID).
    pub uid: Option<u64>,
    /// Group ID (GID).
    pub gid: Option<u64>,
}

impl UnixOwnership {
    /// Creates a new empty ownership record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates ownership from UID and GID only.
    pub fn from_ids(uid: u64, gid: u64) -> Self {
        Self {
            uid: Some(uid),
            gid: Some(gid),
        }
    }

    /// Captures the numeric owner of already-fetched metadata.
    ///
    /// On non-Unix platforms the record is empty.
    #[cfg(unix)]
    pub fn from_metadata(metadata: &Metadata) -> Self {
        use std::os::unix::fs::MetadataExt;

        Self::from_ids(metadata.uid() as u64, metadata.gid() as u64)
    }

    /// Captures the numeric owner of already-fetched metadata.
    #[cfg(not(unix))]
    pub fn from_metadata(_metadata: &Metadata) -> Self {
        Self::default()
    }

    /// Applies ownership to a path, following symlinks.
    ///
    /// Requires appropriate privileges. IDs that do not fit the platform's
    /// native width are skipped.
    #[cfg(unix)]
    pub fn apply_to_path(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let (uid, gid) = self.native_ids();
        if uid.is_some() || gid.is_some() {
            std::os::unix::fs::chown(path, uid, gid)?;
        }
        Ok(())
    }

    /// Applies ownership to a path, following symlinks.
    #[cfg(not(unix))]
    pub fn apply_to_path(&self, _path: impl AsRef<Path>) -> std::io::Result<()> {
        Ok(())
    }

    /// Applies ownership to a symbolic link itself.
    #[cfg(unix)]
    pub fn apply_to_link(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let (uid, gid) = self.native_ids();
        if uid.is_some() || gid.is_some() {
            std::os::unix::fs::lchown(path, uid, gid)?;
        }
        Ok(())
    }

    /// Applies ownership to a symbolic link itself.
    #[cfg(not(unix))]
    pub fn apply_to_link(&self, _path: impl AsRef<Path>) -> std::io::Result<()> {
        Ok(())
    }

    #[cfg(unix)]
    fn native_ids(&self) -> (Option<u32>, Option<u32>) {
        (
            self.uid.and_then(|id| u32::try_from(id).ok()),
            self.gid.and_then(|id| u32::try_from(id).ok()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty() {
        let ownership = UnixOwnership::new();
        assert_eq!(ownership, UnixOwnership::default());
        assert_eq!(ownership.uid, None);
        // nothing to apply
        ownership.apply_to_path("/nonexistent/path").unwrap();
    }

    #[test]
    fn test_ids() {
        let ownership = UnixOwnership::from_ids(1000, 100);
        assert_eq!(ownership.uid, Some(1000));
        assert_eq!(ownership.gid, Some(100));
    }

    #[cfg(unix)]
    #[test]
    fn test_from_metadata_matches_current_user() {
        use std::os::unix::fs::MetadataExt;

        let temp = tempfile::NamedTempFile::new().unwrap();
        let metadata = temp.as_file().metadata().unwrap();
        let ownership = UnixOwnership::from_metadata(&metadata);
        assert_eq!(ownership.uid, Some(metadata.uid() as u64));
        assert_eq!(ownership.gid, Some(metadata.gid() as u64));
    }

    #[cfg(unix)]
    #[test]
    fn test_apply_own_ids_is_allowed() {
        let temp = tempfile::NamedTempFile::new().unwrap();
        let metadata = temp.as_file().metadata().unwrap();
        let ownership = UnixOwnership::from_metadata(&metadata);
        // chown to the current owner needs no privileges
        ownership.apply_to_path(temp.path()).unwrap();
    }
}
