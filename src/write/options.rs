//! Options for creating archives and adding entries.

use crate::codec::{self, CompressionMethod};
use crate::config::ArchiveConfig;
use crate::format::Dialect;
use crate::format::header::HeaderSpec;
use crate::read::EntryType;
use crate::timestamp::Timestamp;

/// Options for sessions that write: create, append, in-memory and
/// stream-backed writers.
///
/// # Example
///
/// ```rust
/// use tarsmith::{CompressionMethod, CreateOptions, Dialect};
///
/// let options = CreateOptions::new()
///     .compression(CompressionMethod::Gzip)
///     .level(9)?
///     .dialect(Dialect::Gnu);
/// assert_eq!(options.level, Some(9));
///
/// assert!(CreateOptions::new().level(0).is_err());
/// # Ok::<(), tarsmith::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct CreateOptions {
    /// Compression method. `None` means: guess from the file name for
    /// file-backed sessions, no compression otherwise.
    pub compression: Option<CompressionMethod>,
    /// Compression level hint, 1-9.
    pub level: Option<u32>,
    /// Header dialect for new entries.
    pub dialect: Dialect,
    /// Session configuration.
    pub config: ArchiveConfig,
}

impl CreateOptions {
    /// Default options: auto compression, no level, pax headers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the compression method explicitly.
    pub fn compression(mut self, method: CompressionMethod) -> Self {
        self.compression = Some(method);
        self
    }

    /// Sets the compression level.
    ///
    /// Returns [`Error::InvalidCompressionLevel`](crate::Error::InvalidCompressionLevel)
    /// unless `level` is within 1-9.
    pub fn level(mut self, level: u32) -> crate::Result<Self> {
        self.level = Some(codec::validate_level(level)?);
        Ok(self)
    }

    /// Sets the header dialect.
    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Sets the session configuration.
    pub fn config(mut self, config: ArchiveConfig) -> Self {
        self.config = config;
        self
    }
}

pub(crate) const DEFAULT_FILE_MODE: u32 = 0o644;
pub(crate) const DEFAULT_DIR_MODE: u32 = 0o755;
pub(crate) const DEFAULT_SYMLINK_MODE: u32 = 0o777;

/// Per-entry options for `add*` calls and output streams.
///
/// Unset fields fall back to the entry kind's defaults: mode 0644 for files
/// and hardlinks, 0755 for directories, 0777 for symlinks, owner 0:0 without
/// names, modification time now.
#[derive(Debug, Clone)]
pub struct AddOptions {
    /// Permission bits.
    pub mode: Option<u32>,
    /// Owner user ID.
    pub uid: Option<u64>,
    /// Owner group ID.
    pub gid: Option<u64>,
    /// Owner user name.
    pub uname: Option<String>,
    /// Owner group name.
    pub gname: Option<String>,
    /// Modification time.
    pub modified: Option<Timestamp>,
    /// Keep the source file's permission bits in `add_file` (default true).
    pub preserve_permissions: bool,
    /// Archive what a symlink points to instead of the link itself in
    /// `add_file` (default false).
    pub dereference_symlinks: bool,
    /// Declared payload size for output streams. A stream whose buffered
    /// size differs fails at close.
    pub size_hint: Option<u64>,
}

impl Default for AddOptions {
    fn default() -> Self {
        Self {
            mode: None,
            uid: None,
            gid: None,
            uname: None,
            gname: None,
            modified: None,
            preserve_permissions: true,
            dereference_symlinks: false,
            size_hint: None,
        }
    }
}

impl AddOptions {
    /// Creates options with all defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the permission bits.
    pub fn mode(mut self, mode: u32) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Sets the numeric owner.
    pub fn owner(mut self, uid: u64, gid: u64) -> Self {
        self.uid = Some(uid);
        self.gid = Some(gid);
        self
    }

    /// Sets owner and group names.
    pub fn names(mut self, uname: impl Into<String>, gname: impl Into<String>) -> Self {
        self.uname = Some(uname.into());
        self.gname = Some(gname.into());
        self
    }

    /// Sets the modification time.
    pub fn modified(mut self, modified: impl Into<Timestamp>) -> Self {
        self.modified = Some(modified.into());
        self
    }

    /// Sets whether `add_file` keeps the source permission bits.
    pub fn preserve_permissions(mut self, preserve: bool) -> Self {
        self.preserve_permissions = preserve;
        self
    }

    /// Sets whether `add_file` follows symlinks.
    pub fn dereference_symlinks(mut self, dereference: bool) -> Self {
        self.dereference_symlinks = dereference;
        self
    }

    /// Declares the payload size of an output stream.
    pub fn size_hint(mut self, size: u64) -> Self {
        self.size_hint = Some(size);
        self
    }

    /// Builds a header spec with these options applied over the defaults.
    pub(crate) fn header_spec(&self, name: &str, entry_type: EntryType, default_mode: u32) -> HeaderSpec {
        let mut spec = HeaderSpec::new(name, entry_type, self.mode.unwrap_or(default_mode));
        self.apply_owner(&mut spec);
        if let Some(modified) = self.modified {
            spec.modified = modified;
        }
        spec
    }

    /// Overrides owner fields that were set explicitly.
    pub(crate) fn apply_owner(&self, spec: &mut HeaderSpec) {
        if let Some(uid) = self.uid {
            spec.uid = uid;
        }
        if let Some(gid) = self.gid {
            spec.gid = gid;
        }
        if let Some(uname) = self.uname.as_ref().filter(|n| !n.is_empty()) {
            spec.uname = Some(uname.clone());
        }
        if let Some(gname) = self.gname.as_ref().filter(|n| !n.is_empty()) {
            spec.gname = Some(gname.clone());
        }
    }
}
