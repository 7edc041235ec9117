//! Appending to an existing archive.
//!
//! TAR streams cannot be reopened for writing in place once compressed, so
//! appending rewrites the file: the old contents are read into memory, the
//! file is truncated, every prior entry is copied over header for header, and
//! the session then accepts new entries like any write session.
//!
//! The existing archive is walked once in memory before the file is touched,
//! so a corrupt archive is rejected with the file left as it was. Past that
//! point the rewrite is not atomic: if writing fails part way, the file holds
//! only what was copied before the failure.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use super::{AccessMode, SessionState, TarArchive};
use crate::backing::Backing;
use crate::read::{self, ReadCoder};
use crate::write::{CreateOptions, WriteCoder};
use crate::{Error, Result};

impl TarArchive {
    /// Opens an archive file for appending.
    ///
    /// If `path` does not exist this is the same as
    /// [`create_path`](Self::create_path). Otherwise the existing entries are
    /// kept and new entries go after them. Without an explicit
    /// [`CreateOptions::compression`], the rewritten archive keeps the
    /// compression of the existing one.
    ///
    /// Only writing is possible on the returned session.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use tarsmith::{AddOptions, CreateOptions, TarArchive};
    ///
    /// let mut archive = TarArchive::append_path("log.tar", &CreateOptions::default())?;
    /// archive.add_text("day-2.txt", "more lines\n", &AddOptions::default())?;
    /// archive.close()?;
    /// # Ok::<(), tarsmith::Error>(())
    /// ```
    pub fn append_path(path: impl AsRef<Path>, options: &CreateOptions) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            log::debug!("'{}' does not exist, creating a new archive", path.display());
            let method = options
                .compression
                .unwrap_or_else(|| crate::CompressionMethod::from_path(path));
            return Self::create_file(path, method, options, AccessMode::Append);
        }

        let existing = fs::read(path)
            .map_err(|e| Error::provider(format!("failed to read '{}'", path.display()), e))?;
        let snapshot = Backing::Memory(Arc::new(existing));
        let mut check = tar::Archive::new(read::open_read_stream(&snapshot, &options.config)?);
        let headers = count_headers(&mut check)?;
        let stream = read::open_read_stream(&snapshot, &options.config)?;
        let method = options.compression.unwrap_or(stream.method());
        let reader = tar::Archive::new(stream);

        let mut archive = Self::create_file(path, method, options, AccessMode::Append)?;
        archive.backing = snapshot;
        archive.reader = Some(reader);
        archive.state = SessionState::AppendBootstrap;

        let copied = match (archive.reader.as_mut(), archive.writer.as_mut()) {
            (Some(reader), Some(writer)) => copy_entries(reader, writer)?,
            _ => 0,
        };

        archive.reader = None;
        archive.backing = Backing::File(path.to_path_buf());
        archive.state = SessionState::WriteAfterAppend;
        debug_assert_eq!(copied, headers);
        log::debug!(
            "Copied {} existing headers from '{}' for appending",
            copied,
            path.display()
        );
        Ok(archive)
    }
}

/// Walks every header without writing anything.
fn count_headers(reader: &mut ReadCoder) -> Result<u64> {
    let entries = reader
        .entries()
        .map_err(|e| Error::provider("failed to read existing archive", e))?;
    let mut count = 0;
    for raw in entries.raw(true) {
        raw.map_err(|e| Error::provider("failed to read existing entry", e))?;
        count += 1;
    }
    Ok(count)
}

/// Copies every header block and payload unchanged, including pax and GNU
/// long-name pseudo-entries. Returns the number of headers copied.
fn copy_entries(reader: &mut ReadCoder, writer: &mut WriteCoder) -> Result<u64> {
    let entries = reader
        .entries()
        .map_err(|e| Error::provider("failed to read existing archive", e))?;
    let mut copied = 0;
    for raw in entries.raw(true) {
        let mut raw = raw.map_err(|e| Error::provider("failed to read existing entry", e))?;
        let header = raw.header().clone();
        writer.append_raw(&header, &mut raw)?;
        copied += 1;
    }
    Ok(copied)
}
