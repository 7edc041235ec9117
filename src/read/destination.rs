//! Materializing entries on the filesystem.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use super::{Entry, EntryType, ExtractOptions, ReadStream};
use crate::ownership::UnixOwnership;
use crate::timestamp::Timestamp;
use crate::{Error, Result};

/// Metadata applied to a directory once everything below it exists.
struct DeferredDir {
    path: PathBuf,
    depth: usize,
    mode: u32,
    modified: Option<Timestamp>,
    accessed: Option<Timestamp>,
    uid: u64,
    gid: u64,
}

/// Writes entries below an extraction root.
///
/// Paths handed in are already safety-checked and relative to the root.
pub(crate) struct DiskWriter<'o> {
    root: PathBuf,
    options: &'o ExtractOptions,
    dirs: Vec<DeferredDir>,
}

impl<'o> DiskWriter<'o> {
    pub(crate) fn new(root: PathBuf, options: &'o ExtractOptions) -> Self {
        Self {
            root,
            options,
            dirs: Vec::new(),
        }
    }

    /// Materializes one entry at `relative`. `link_target` is the (stripped)
    /// hardlink target or the symlink target.
    pub(crate) fn write(
        &mut self,
        raw: &mut tar::Entry<'_, ReadStream>,
        entry: &Entry,
        relative: &str,
        link_target: Option<&str>,
    ) -> Result<()> {
        let path = self.root.join(relative);
        match entry.entry_type {
            EntryType::Directory => self.directory(&path, entry),
            EntryType::Hardlink => {
                let target = self.root.join(link_target.unwrap_or_default());
                self.prepare(&path)?;
                fs::hard_link(&target, &path).map_err(|e| {
                    Error::provider(
                        format!("failed to link '{}' to '{}'", path.display(), target.display()),
                        e,
                    )
                })
            }
            EntryType::Symlink => {
                self.prepare(&path)?;
                create_symlink(&path, link_target.unwrap_or_default())?;
                set_times(&path, entry, self.options.preserve_times, true);
                if self.options.preserve_ownership {
                    let owner = UnixOwnership::from_ids(entry.uid, entry.gid);
                    if let Err(e) = owner.apply_to_link(&path) {
                        log::warn!("Failed to set ownership of '{}': {}", path.display(), e);
                    }
                }
                Ok(())
            }
            EntryType::File | EntryType::CharDevice | EntryType::BlockDevice | EntryType::Fifo => {
                self.prepare(&path)?;
                match &entry.sparse {
                    Some(layout) => {
                        let mut file = File::create(&path)?;
                        layout.unpack(raw, &mut file).map_err(|e| {
                            Error::provider(format!("failed to extract sparse file '{}'", path.display()), e)
                        })?;
                        set_mode(&path, self.file_mode(entry.mode));
                    }
                    None => {
                        raw.unpack(&path)?;
                    }
                }
                if self.options.preserve_ownership {
                    let owner = UnixOwnership::from_ids(entry.uid, entry.gid);
                    match owner.apply_to_path(&path) {
                        // chown clears setuid/setgid
                        Ok(()) if self.options.preserve_permissions => set_mode(&path, entry.mode),
                        Ok(()) => {}
                        Err(e) => log::warn!("Failed to set ownership of '{}': {}", path.display(), e),
                    }
                }
                set_times(&path, entry, self.options.preserve_times, false);
                Ok(())
            }
            EntryType::Socket | EntryType::Unknown => {
                log::warn!("Skipping '{}': cannot extract {} entries", entry.name, entry.entry_type);
                Ok(())
            }
        }
    }

    /// Applies deferred directory metadata, deepest directories first.
    pub(crate) fn finish(mut self) {
        self.dirs.sort_by(|a, b| b.depth.cmp(&a.depth));
        for dir in &self.dirs {
            if self.options.preserve_ownership {
                if let Err(e) = UnixOwnership::from_ids(dir.uid, dir.gid).apply_to_path(&dir.path) {
                    log::warn!("Failed to set ownership of '{}': {}", dir.path.display(), e);
                }
            }
            set_mode(&dir.path, self.file_mode(dir.mode));
            if let Some(modified) = dir.modified {
                apply_times(&dir.path, modified, dir.accessed.filter(|_| self.options.preserve_times), false);
            }
        }
    }

    /// Permission bits to restore for a stored `mode`.
    fn file_mode(&self, mode: u32) -> u32 {
        if self.options.preserve_permissions {
            mode
        } else {
            mode & 0o777
        }
    }

    fn directory(&mut self, path: &Path, entry: &Entry) -> Result<()> {
        let created = if self.options.create_directories {
            fs::create_dir_all(path)
        } else {
            match fs::create_dir(path) {
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists && path.is_dir() => Ok(()),
                other => other,
            }
        };
        created.map_err(|e| Error::provider(format!("failed to create directory '{}'", path.display()), e))?;
        self.dirs.push(DeferredDir {
            path: path.to_path_buf(),
            depth: path.components().count(),
            mode: entry.mode,
            modified: entry.modified,
            accessed: entry.accessed,
            uid: entry.uid,
            gid: entry.gid,
        });
        Ok(())
    }

    /// Makes room for a non-directory entry at `path`.
    fn prepare(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if self.options.create_directories {
                fs::create_dir_all(parent).map_err(|e| {
                    Error::provider(format!("failed to create directory '{}'", parent.display()), e)
                })?;
            } else if !parent.is_dir() {
                return Err(Error::Io(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("parent directory of '{}' does not exist", path.display()),
                )));
            }
        }

        match fs::symlink_metadata(path) {
            Ok(_) if !self.options.overwrite => Err(Error::Io(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("'{}' already exists", path.display()),
            ))),
            Ok(meta) if meta.is_dir() => Err(Error::Io(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("'{}' is a directory", path.display()),
            ))),
            Ok(_) => Ok(fs::remove_file(path)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Io(e)),
        }
    }
}

/// Creates a symbolic link at `link_path` pointing to `target`.
#[cfg(unix)]
fn create_symlink(link_path: &Path, target: &str) -> Result<()> {
    std::os::unix::fs::symlink(target, link_path).map_err(Error::Io)
}

/// Creates a symbolic link at `link_path` pointing to `target`.
#[cfg(windows)]
fn create_symlink(link_path: &Path, target: &str) -> Result<()> {
    // Windows needs to know whether the target is a directory.
    let resolved = link_path.parent().map(|p| p.join(target));
    if resolved.is_some_and(|p| p.is_dir()) {
        std::os::windows::fs::symlink_dir(target, link_path).map_err(Error::Io)
    } else {
        std::os::windows::fs::symlink_file(target, link_path).map_err(Error::Io)
    }
}

#[cfg(not(any(unix, windows)))]
fn create_symlink(link_path: &Path, _target: &str) -> Result<()> {
    log::warn!("Skipping symlink '{}': not supported on this platform", link_path.display());
    Ok(())
}

fn set_times(path: &Path, entry: &Entry, preserve_atime: bool, symlink: bool) {
    if let Some(modified) = entry.modified {
        apply_times(path, modified, entry.accessed.filter(|_| preserve_atime), symlink);
    }
}

fn apply_times(path: &Path, modified: Timestamp, accessed: Option<Timestamp>, symlink: bool) {
    let mtime = modified.as_file_time();
    let result = match (accessed, symlink) {
        (Some(atime), false) => filetime::set_file_times(path, atime.as_file_time(), mtime),
        (None, false) => filetime::set_file_mtime(path, mtime),
        // symlinks have no mtime-only setter; keep atime in step
        (atime, true) => filetime::set_symlink_file_times(path, atime.map_or(mtime, |t| t.as_file_time()), mtime),
    };
    if let Err(e) = result {
        log::warn!("Failed to set times of '{}': {}", path.display(), e);
    }
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(mode)) {
        log::warn!("Failed to set permissions of '{}': {}", path.display(), e);
    }
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) {}
