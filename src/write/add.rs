use std::fs::{self, File, Metadata};
use std::io::{self, BufReader, Read};
use std::path::Path;

use super::options::{AddOptions, DEFAULT_DIR_MODE, DEFAULT_FILE_MODE, DEFAULT_SYMLINK_MODE};
use crate::archive::TarArchive;
use crate::format::header::HeaderSpec;
use crate::ownership::UnixOwnership;
use crate::read::EntryType;
use crate::timestamp::Timestamp;
use crate::{Error, Result};

impl TarArchive {
    /// Adds a regular file with the given contents.
    ///
    /// Defaults: mode 0644, owner 0:0, modified now.
    pub fn add(&mut self, name: &str, data: &[u8], options: &AddOptions) -> Result<()> {
        let mut spec = options.header_spec(name, EntryType::File, DEFAULT_FILE_MODE);
        spec.size = data.len() as u64;
        self.write_coder()?.append(&spec, data)
    }

    /// Adds a regular file holding the UTF-8 bytes of `text`.
    pub fn add_text(&mut self, name: &str, text: &str, options: &AddOptions) -> Result<()> {
        self.add(name, text.as_bytes(), options)
    }

    /// Adds a directory entry. A trailing `/` is appended to `name` when
    /// missing. Default mode 0755.
    pub fn add_directory(&mut self, name: &str, options: &AddOptions) -> Result<()> {
        let spec = options.header_spec(&directory_name(name), EntryType::Directory, DEFAULT_DIR_MODE);
        self.write_coder()?.append(&spec, io::empty())
    }

    /// Adds a symbolic link to `target`. Default mode 0777.
    ///
    /// The target is stored as given.
    pub fn add_symlink(&mut self, name: &str, target: &str, options: &AddOptions) -> Result<()> {
        let mut spec = options.header_spec(name, EntryType::Symlink, DEFAULT_SYMLINK_MODE);
        spec.link_target = Some(target.to_string());
        self.write_coder()?.append(&spec, io::empty())
    }

    /// Adds a hard link to the earlier entry `target`. Default mode 0644.
    pub fn add_hardlink(&mut self, name: &str, target: &str, options: &AddOptions) -> Result<()> {
        let mut spec = options.header_spec(name, EntryType::Hardlink, DEFAULT_FILE_MODE);
        spec.link_target = Some(target.to_string());
        self.write_coder()?.append(&spec, io::empty())
    }

    /// Adds the file, directory, symlink, device or fifo at `source` under
    /// `name`.
    ///
    /// Type, size, permissions, owner and times are taken from the source;
    /// options that are set explicitly override them. Symlinks are stored as
    /// links unless [`AddOptions::dereference_symlinks`] is set. Regular file
    /// contents are streamed through the session's transfer buffer.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use tarsmith::{AddOptions, CreateOptions, TarArchive};
    ///
    /// let mut archive = TarArchive::create_path("etc.tar.zst", &CreateOptions::default())?;
    /// archive.add_file("hosts", "/etc/hosts", &AddOptions::default())?;
    /// archive.add_file("shared", "/etc/hosts", &AddOptions::new().mode(0o600).owner(0, 0))?;
    /// archive.close()?;
    /// # Ok::<(), tarsmith::Error>(())
    /// ```
    pub fn add_file(&mut self, name: &str, source: impl AsRef<Path>, options: &AddOptions) -> Result<()> {
        let source = source.as_ref();
        self.check_writable()?;
        let stat = |e| Error::provider(format!("failed to stat '{}'", source.display()), e);
        let metadata = if options.dereference_symlinks {
            fs::metadata(source).map_err(stat)?
        } else {
            fs::symlink_metadata(source).map_err(stat)?
        };

        let entry_type = source_type(&metadata);
        if matches!(entry_type, EntryType::Socket | EntryType::Unknown) {
            return Err(Error::InvalidFormat(format!(
                "cannot archive '{}': {} entries are not supported",
                source.display(),
                entry_type
            )));
        }

        let name = match entry_type {
            EntryType::Directory => directory_name(name),
            _ => name.to_string(),
        };
        let mut spec = HeaderSpec::new(name, entry_type, source_mode(&metadata, entry_type));
        if !options.preserve_permissions {
            spec.mode = default_mode(entry_type);
        }
        if let Some(mode) = options.mode {
            spec.mode = mode;
        }

        let owner = UnixOwnership::from_metadata(&metadata);
        spec.uid = owner.uid.unwrap_or(0);
        spec.gid = owner.gid.unwrap_or(0);
        options.apply_owner(&mut spec);

        if let Ok(modified) = metadata.modified() {
            spec.modified = Timestamp::from(modified);
        }
        spec.accessed = metadata.accessed().ok().map(Timestamp::from);
        spec.created = changed_time(&metadata);
        if let Some(modified) = options.modified {
            spec.modified = modified;
        }
        spec.device = device_numbers(&metadata, entry_type);

        match entry_type {
            EntryType::Symlink => {
                let target = fs::read_link(source).map_err(|e| {
                    Error::provider(format!("failed to read link '{}'", source.display()), e)
                })?;
                spec.link_target = Some(target.to_string_lossy().into_owned());
                self.write_coder()?.append(&spec, io::empty())
            }
            EntryType::File => {
                spec.size = metadata.len();
                let buffer_size = self.config.transfer_buffer_size();
                let file = File::open(source).map_err(|e| {
                    Error::provider(format!("failed to open '{}'", source.display()), e)
                })?;
                let content = ExactSize::new(BufReader::with_capacity(buffer_size, file), spec.size);
                self.write_coder()?.append(&spec, content)
            }
            _ => self.write_coder()?.append(&spec, io::empty()),
        }
    }
}

fn directory_name(name: &str) -> String {
    if name.ends_with('/') {
        name.to_string()
    } else {
        format!("{}/", name)
    }
}

fn default_mode(entry_type: EntryType) -> u32 {
    match entry_type {
        EntryType::Directory => DEFAULT_DIR_MODE,
        EntryType::Symlink => DEFAULT_SYMLINK_MODE,
        _ => DEFAULT_FILE_MODE,
    }
}

/// Yields exactly `size` bytes: the source truncated, or zero-padded if the
/// file shrank after it was stat'ed. Either way the header stays truthful.
struct ExactSize<R> {
    inner: io::Take<R>,
    remaining: u64,
}

impl<R: Read> ExactSize<R> {
    fn new(inner: R, size: u64) -> Self {
        Self {
            inner: inner.take(size),
            remaining: size,
        }
    }
}

impl<R: Read> Read for ExactSize<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.remaining == 0 || buf.is_empty() {
            return Ok(0);
        }
        let mut n = self.inner.read(buf)?;
        if n == 0 {
            n = buf.len().min(usize::try_from(self.remaining).unwrap_or(usize::MAX));
            buf[..n].fill(0);
            log::warn!("Source file shrank while archiving, padding {} bytes", self.remaining);
        }
        self.remaining -= n as u64;
        Ok(n)
    }
}

#[cfg(unix)]
fn source_type(metadata: &Metadata) -> EntryType {
    use std::os::unix::fs::FileTypeExt;
    let ft = metadata.file_type();
    if ft.is_dir() {
        EntryType::Directory
    } else if ft.is_symlink() {
        EntryType::Symlink
    } else if ft.is_file() {
        EntryType::File
    } else if ft.is_char_device() {
        EntryType::CharDevice
    } else if ft.is_block_device() {
        EntryType::BlockDevice
    } else if ft.is_fifo() {
        EntryType::Fifo
    } else if ft.is_socket() {
        EntryType::Socket
    } else {
        EntryType::Unknown
    }
}

#[cfg(not(unix))]
fn source_type(metadata: &Metadata) -> EntryType {
    let ft = metadata.file_type();
    if ft.is_dir() {
        EntryType::Directory
    } else if ft.is_symlink() {
        EntryType::Symlink
    } else if ft.is_file() {
        EntryType::File
    } else {
        EntryType::Unknown
    }
}

#[cfg(unix)]
fn source_mode(metadata: &Metadata, _entry_type: EntryType) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn source_mode(metadata: &Metadata, entry_type: EntryType) -> u32 {
    let mode = default_mode(entry_type);
    if metadata.permissions().readonly() {
        mode & !0o222
    } else {
        mode
    }
}

#[cfg(unix)]
fn changed_time(metadata: &Metadata) -> Option<Timestamp> {
    use std::os::unix::fs::MetadataExt;
    let nanos = u32::try_from(metadata.ctime_nsec()).ok()?;
    Timestamp::from_unix_secs_nanos(metadata.ctime(), nanos)
}

#[cfg(not(unix))]
fn changed_time(metadata: &Metadata) -> Option<Timestamp> {
    metadata.created().ok().map(Timestamp::from)
}

#[cfg(unix)]
fn device_numbers(metadata: &Metadata, entry_type: EntryType) -> Option<(u32, u32)> {
    use std::os::unix::fs::MetadataExt;
    match entry_type {
        EntryType::CharDevice | EntryType::BlockDevice => Some(split_rdev(metadata.rdev())),
        _ => None,
    }
}

#[cfg(not(unix))]
fn device_numbers(_metadata: &Metadata, _entry_type: EntryType) -> Option<(u32, u32)> {
    None
}

/// Splits a raw device number into (major, minor).
#[cfg(any(target_os = "macos", target_os = "ios"))]
fn split_rdev(rdev: u64) -> (u32, u32) {
    (((rdev >> 24) & 0xff) as u32, (rdev & 0xff_ffff) as u32)
}

/// Splits a raw device number into (major, minor), glibc encoding.
#[cfg(all(unix, not(any(target_os = "macos", target_os = "ios"))))]
fn split_rdev(rdev: u64) -> (u32, u32) {
    let major = ((rdev >> 8) & 0xfff) | ((rdev >> 32) & !0xfff);
    let minor = (rdev & 0xff) | ((rdev >> 12) & !0xff);
    (major as u32, minor as u32)
}
