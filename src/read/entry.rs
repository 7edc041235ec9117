//! Archive entry metadata.

use std::fmt;
use std::io::Read;

use super::sparse::{SPARSE_PREFIX, SparseLayout, SparseRecords, strip_placeholder};
use crate::config::ArchiveConfig;
use crate::timestamp::Timestamp;
use crate::{Error, Result};

/// Entry type as reported by enumeration and lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryType {
    /// Regular file.
    File,
    /// Directory.
    Directory,
    /// Symbolic link.
    Symlink,
    /// Hard link to an earlier entry.
    Hardlink,
    /// Character device.
    CharDevice,
    /// Block device.
    BlockDevice,
    /// Named pipe.
    Fifo,
    /// Unix domain socket.
    Socket,
    /// Anything else (volume labels, vendor extensions).
    Unknown,
}

impl EntryType {
    /// Short lowercase name: `file`, `directory`, `symlink`, `hardlink`,
    /// `chardev`, `blockdev`, `fifo`, `socket` or `unknown`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Directory => "directory",
            Self::Symlink => "symlink",
            Self::Hardlink => "hardlink",
            Self::CharDevice => "chardev",
            Self::BlockDevice => "blockdev",
            Self::Fifo => "fifo",
            Self::Socket => "socket",
            Self::Unknown => "unknown",
        }
    }

    /// Classifies an entry from its filetype flag and hardlink target.
    ///
    /// A non-empty hardlink target wins over the filetype flag.
    ///
    /// ```rust
    /// use tarsmith::{EntryType, FileKind};
    ///
    /// assert_eq!(EntryType::classify(FileKind::Regular, Some("a.txt")), EntryType::Hardlink);
    /// assert_eq!(EntryType::classify(FileKind::Regular, Some("")), EntryType::File);
    /// assert_eq!(EntryType::classify(FileKind::Directory, None), EntryType::Directory);
    /// ```
    pub fn classify(kind: FileKind, hardlink_target: Option<&str>) -> Self {
        if hardlink_target.is_some_and(|t| !t.is_empty()) {
            return Self::Hardlink;
        }
        match kind {
            FileKind::Regular => Self::File,
            FileKind::Directory => Self::Directory,
            FileKind::Symlink => Self::Symlink,
            FileKind::CharDevice => Self::CharDevice,
            FileKind::BlockDevice => Self::BlockDevice,
            FileKind::Fifo => Self::Fifo,
            FileKind::Socket => Self::Socket,
            FileKind::Unknown => Self::Unknown,
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Filetype flag of a header, before hardlink classification.
///
/// Hardlinks have no filetype of their own: a TAR link header reports
/// [`FileKind::Regular`] plus a hardlink target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    /// Regular file (also contiguous and sparse files).
    Regular,
    /// Directory.
    Directory,
    /// Symbolic link.
    Symlink,
    /// Character device.
    CharDevice,
    /// Block device.
    BlockDevice,
    /// Named pipe.
    Fifo,
    /// Unix domain socket.
    Socket,
    /// Unrecognized type flag.
    Unknown,
}

impl FileKind {
    pub(crate) fn from_tar(entry_type: tar::EntryType) -> Self {
        use tar::EntryType as T;
        match entry_type {
            T::Regular | T::Continuous | T::GNUSparse | T::Link => Self::Regular,
            T::Directory => Self::Directory,
            T::Symlink => Self::Symlink,
            T::Char => Self::CharDevice,
            T::Block => Self::BlockDevice,
            T::Fifo => Self::Fifo,
            _ => Self::Unknown,
        }
    }
}

/// Metadata of one archive member.
///
/// Built fresh from the header under the read cursor on every enumeration
/// or lookup; it is a snapshot, not a handle into the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct Entry {
    /// Slash-separated path as stored in the archive.
    pub name: String,
    /// Payload size in bytes.
    pub size: u64,
    /// Modification time.
    pub modified: Option<Timestamp>,
    /// Access time, when the archive records one (pax `atime`, GNU header).
    pub accessed: Option<Timestamp>,
    /// Change/creation time, when the archive records one (pax `ctime`, GNU header).
    pub created: Option<Timestamp>,
    /// Permission bits (`0o7777` mask).
    pub mode: u32,
    /// Owner user ID.
    pub uid: u64,
    /// Owner group ID.
    pub gid: u64,
    /// Owner user name.
    pub uname: Option<String>,
    /// Owner group name.
    pub gname: Option<String>,
    /// Classified entry type.
    pub entry_type: EntryType,
    /// Symlink target, or hardlink target for hardlinks.
    pub link_target: Option<String>,
    /// Filetype flag is a directory.
    pub is_directory: bool,
    /// Filetype flag is a symbolic link.
    pub is_symlink: bool,
    /// A hardlink target is present.
    pub is_hardlink: bool,
    /// Device major number (character and block devices only).
    pub devmajor: Option<u32>,
    /// Device minor number (character and block devices only).
    pub devminor: Option<u32>,
    /// Segment map of a pax sparse file; `size` is then the expanded size.
    pub(crate) sparse: Option<SparseLayout>,
}

impl Entry {
    /// Reads the metadata of the entry under the cursor.
    pub(crate) fn from_tar<R: Read>(raw: &mut tar::Entry<'_, R>, config: &ArchiveConfig) -> Result<Self> {
        let kind = FileKind::from_tar(raw.header().entry_type());
        let mut name = config.decode(&raw.path_bytes()).into_owned();
        let link = raw
            .link_name_bytes()
            .map(|l| config.decode(&l).into_owned())
            .filter(|l| !l.is_empty());
        let hardlink = match raw.header().entry_type() {
            tar::EntryType::Link => link.clone(),
            _ => None,
        };
        let entry_type = EntryType::classify(kind, hardlink.as_deref());
        let symlink = match kind {
            FileKind::Symlink => link,
            _ => None,
        };

        let header = raw.header();
        let invalid = |e| Error::provider(format!("invalid header field in '{}'", name), e);
        let mode = header.mode().map_err(invalid)? & 0o7777;
        let mut uid = header.uid().map_err(invalid)?;
        let mut gid = header.gid().map_err(invalid)?;
        let mut modified = Timestamp::from_unix_secs(header.mtime().map_err(invalid)? as i64);
        let mut uname = header
            .username_bytes()
            .filter(|b| !b.is_empty())
            .map(|b| config.decode(b).into_owned());
        let mut gname = header
            .groupname_bytes()
            .filter(|b| !b.is_empty())
            .map(|b| config.decode(b).into_owned());
        let (mut accessed, mut created) = match header.as_gnu() {
            Some(gnu) => (
                gnu.atime().ok().filter(|&t| t > 0).map(|t| Timestamp::from_unix_secs(t as i64)),
                gnu.ctime().ok().filter(|&t| t > 0).map(|t| Timestamp::from_unix_secs(t as i64)),
            ),
            None => (None, None),
        };
        let (devmajor, devminor) = match kind {
            FileKind::CharDevice | FileKind::BlockDevice => (
                header.device_major().map_err(invalid)?,
                header.device_minor().map_err(invalid)?,
            ),
            _ => (None, None),
        };

        let mut size = raw.size();
        let mut sparse = SparseRecords::default();
        let mut sparse_name = None;

        if let Some(extensions) = raw.pax_extensions().map_err(invalid)? {
            for ext in extensions {
                let ext = ext.map_err(invalid)?;
                let Ok(key) = ext.key() else { continue };
                let value = ext.value_bytes();
                let text = || std::str::from_utf8(value).ok();
                match key {
                    "uid" => uid = text().and_then(|v| v.parse().ok()).unwrap_or(uid),
                    "gid" => gid = text().and_then(|v| v.parse().ok()).unwrap_or(gid),
                    "uname" => uname = Some(config.decode(value).into_owned()),
                    "gname" => gname = Some(config.decode(value).into_owned()),
                    "mtime" => {
                        modified = text().and_then(Timestamp::parse_pax).unwrap_or(modified)
                    }
                    "atime" => accessed = text().and_then(Timestamp::parse_pax).or(accessed),
                    "ctime" => created = text().and_then(Timestamp::parse_pax).or(created),
                    "GNU.sparse.name" => sparse_name = Some(config.decode(value).into_owned()),
                    _ => {
                        if let Some(field) = key.strip_prefix(SPARSE_PREFIX) {
                            sparse
                                .record(field, text().unwrap_or_default())
                                .map_err(invalid)?;
                        }
                    }
                }
            }
        }

        // old GNU `S` entries arrive already expanded
        let expanded = raw.header().entry_type().is_gnu_sparse();
        let sparse = match (kind, &hardlink) {
            (FileKind::Regular, None) if !expanded => sparse.finish().map_err(invalid)?,
            _ => None,
        };
        if let Some(layout) = &sparse {
            size = layout.real_size();
            name = sparse_name.or_else(|| strip_placeholder(&name)).unwrap_or(name);
        }

        Ok(Self {
            name,
            size,
            modified: Some(modified),
            accessed,
            created,
            mode,
            uid,
            gid,
            uname,
            gname,
            entry_type,
            link_target: symlink.or(hardlink),
            is_directory: kind == FileKind::Directory,
            is_symlink: kind == FileKind::Symlink,
            is_hardlink: entry_type == EntryType::Hardlink,
            devmajor,
            devminor,
            sparse,
        })
    }

    /// Returns true for regular files.
    pub fn is_file(&self) -> bool {
        self.entry_type == EntryType::File
    }

    /// The hardlink target, if this entry is a hardlink.
    pub fn hardlink_target(&self) -> Option<&str> {
        match self.entry_type {
            EntryType::Hardlink => self.link_target.as_deref(),
            _ => None,
        }
    }

    /// The symlink target, if this entry is a symbolic link.
    pub fn symlink_target(&self) -> Option<&str> {
        if self.is_symlink {
            self.link_target.as_deref()
        } else {
            None
        }
    }
}
