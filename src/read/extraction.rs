//! Bulk extraction.

use std::fs;
use std::ops::ControlFlow;
use std::path::Path;

use super::destination::DiskWriter;
use super::{EntryType, ExtractOptions, ReadCoder};
use crate::archive::TarArchive;
use crate::error::UnsafePathKind;
use crate::{Error, Result, safety};

impl TarArchive {
    /// Extracts every entry below `dest`.
    ///
    /// Each entry path, hardlink target and symlink target goes through the
    /// [path safety gate](crate::is_path_safe) first. The first violation
    /// aborts the whole extraction with a security error
    /// ([`Error::UnsafePath`]); entries extracted before it stay in place.
    ///
    /// Regular files keep their holes: sparse entries are written by
    /// seeking over the gaps. Modification times are always restored;
    /// permissions, ownership, access times and overwrite behavior follow
    /// `options`. Directory metadata is applied last so that creating
    /// children does not disturb it.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use tarsmith::{ExtractOptions, TarArchive};
    ///
    /// let mut archive = TarArchive::open_path("upload.tar")?;
    /// match archive.extract_all("./unpacked", &ExtractOptions::default()) {
    ///     Err(e) if e.is_security_error() => eprintln!("rejected: {}", e),
    ///     other => other?,
    /// }
    /// # Ok::<(), tarsmith::Error>(())
    /// ```
    pub fn extract_all(&mut self, dest: impl AsRef<Path>, options: &ExtractOptions) -> Result<()> {
        let root = options
            .destination
            .clone()
            .unwrap_or_else(|| dest.as_ref().to_path_buf());
        if !root.exists() {
            fs::create_dir_all(&root)
                .map_err(|e| Error::provider(format!("failed to create '{}'", root.display()), e))?;
        }

        let mut disk = DiskWriter::new(root, options);
        let mut extracted = 0usize;
        // the coder applies permissions itself; times and ownership are ours
        let configure = |coder: &mut ReadCoder| {
            coder.set_overwrite(options.overwrite);
            coder.set_preserve_permissions(options.preserve_permissions);
            coder.set_preserve_mtime(false);
            coder.set_preserve_ownerships(false);
        };
        self.scan_with(configure, |raw, entry| {
            safety::check(&entry.name, UnsafePathKind::Entry)?;
            let link_target = match entry.entry_type {
                EntryType::Hardlink => {
                    let target = entry.link_target.as_deref().unwrap_or_default();
                    safety::check(target, UnsafePathKind::HardlinkTarget)?;
                    match strip(target, options.strip_count) {
                        Some(stripped) => Some(stripped),
                        None => {
                            log::warn!("Skipping hardlink '{}': target stripped away", entry.name);
                            return Ok(ControlFlow::Continue(()));
                        }
                    }
                }
                EntryType::Symlink => {
                    let target = entry.link_target.clone().unwrap_or_default();
                    safety::check(&target, UnsafePathKind::SymlinkTarget)?;
                    Some(target)
                }
                _ => None,
            };

            let Some(relative) = strip(&entry.name, options.strip_count) else {
                return Ok(ControlFlow::Continue(()));
            };
            disk.write(raw, &entry, &relative, link_target.as_deref())?;
            extracted += 1;
            Ok(ControlFlow::<()>::Continue(()))
        })?;

        disk.finish();
        log::debug!("Extracted {} entries", extracted);
        Ok(())
    }
}

/// Drops the first `count` components of a slash-separated path.
///
/// Returns `None` when nothing is left. Empty and `.` components do not
/// count.
fn strip(path: &str, count: usize) -> Option<String> {
    if count == 0 {
        return (!path.is_empty()).then(|| path.to_string());
    }
    let trailing_slash = path.ends_with('/');
    let rest: Vec<&str> = path
        .split('/')
        .filter(|c| !c.is_empty() && *c != ".")
        .skip(count)
        .collect();
    if rest.is_empty() {
        return None;
    }
    let mut stripped = rest.join("/");
    if trailing_slash {
        stripped.push('/');
    }
    Some(stripped)
}
