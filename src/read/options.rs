//! Extraction options.

use std::path::PathBuf;

/// Options for [`TarArchive::extract_all`](crate::TarArchive::extract_all).
///
/// # Example
///
/// ```rust
/// use tarsmith::ExtractOptions;
///
/// let options = ExtractOptions::new()
///     .overwrite(false)
///     .strip_count(1)
///     .preserve_ownership(true);
/// assert!(options.preserve_times);
/// ```
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Extraction root. When set it replaces the directory passed to
    /// `extract_all`.
    pub destination: Option<PathBuf>,
    /// Restore permission bits including setuid, setgid and sticky
    /// (default true). When false only the rwx bits are restored.
    pub preserve_permissions: bool,
    /// Restore owner uid/gid (default false). Failures are logged, not
    /// fatal.
    pub preserve_ownership: bool,
    /// Restore access times in addition to modification times, which are
    /// always restored (default true).
    pub preserve_times: bool,
    /// Replace existing files (default true). When false an existing file
    /// is an [`AlreadyExists`](std::io::ErrorKind::AlreadyExists) error.
    pub overwrite: bool,
    /// Create missing parent directories (default true). When false the
    /// parent of every entry must already exist.
    pub create_directories: bool,
    /// Number of leading path components to drop from every entry path and
    /// hardlink target. Entries left with an empty path are skipped.
    pub strip_count: usize,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            destination: None,
            preserve_permissions: true,
            preserve_ownership: false,
            preserve_times: true,
            overwrite: true,
            create_directories: true,
            strip_count: 0,
        }
    }
}

impl ExtractOptions {
    /// Creates options with all defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the extraction root, overriding the `extract_all` argument.
    pub fn destination(mut self, dest: impl Into<PathBuf>) -> Self {
        self.destination = Some(dest.into());
        self
    }

    /// Sets whether full permission bits are restored.
    pub fn preserve_permissions(mut self, preserve: bool) -> Self {
        self.preserve_permissions = preserve;
        self
    }

    /// Sets whether owner uid/gid are restored.
    pub fn preserve_ownership(mut self, preserve: bool) -> Self {
        self.preserve_ownership = preserve;
        self
    }

    /// Sets whether access times are restored.
    pub fn preserve_times(mut self, preserve: bool) -> Self {
        self.preserve_times = preserve;
        self
    }

    /// Sets whether existing files are replaced.
    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Sets whether missing parent directories are created.
    pub fn create_directories(mut self, create: bool) -> Self {
        self.create_directories = create;
        self
    }

    /// Sets how many leading path components are dropped.
    pub fn strip_count(mut self, count: usize) -> Self {
        self.strip_count = count;
        self
    }
}
