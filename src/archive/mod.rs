//! The archive session.
//!
//! A [`TarArchive`] is one open archive over one backing (file, memory or
//! caller stream) in one access mode. It moves through these states:
//!
//! ```text
//!              open_path / from_bytes / from_reader
//!   (start) ──────────────────────────────────────────▶ Read ──────┐
//!      │       create_path / in_memory / to_writer                 │
//!      ├──────────────────────────────────────────────▶ Write ─────┤
//!      │       append_path                                         │ close()
//!      └──▶ AppendBootstrap ──copy prior entries──▶ WriteAfterAppend ─┤
//!                                                                  ▼
//!                                                               Closed
//! ```
//!
//! The read coder is forward-only, so every query starts over from the first
//! byte of the backing. Repeated lookups on a large archive are each a full
//! scan; callers doing many lookups should call
//! [`entries`](TarArchive::entries) once and index the result themselves.

mod append;
mod open;

use std::fmt;
use std::mem;
use std::path::Path;
use std::sync::Arc;

use crate::backing::Backing;
use crate::codec::CompressionMethod;
use crate::config::ArchiveConfig;
use crate::format::Dialect;
use crate::read::{self, ReadCoder};
use crate::write::WriteCoder;
use crate::{Error, Result};

/// How a session was opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessMode {
    /// Enumerate, look up, read and extract entries.
    Read,
    /// Create a new archive and add entries.
    Write,
    /// Keep the entries of an existing archive and add more.
    Append,
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Append => "append",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SessionState {
    Read,
    Write,
    /// Both coders exist while prior entries are copied.
    AppendBootstrap,
    WriteAfterAppend,
    Closed,
}

/// An open TAR archive.
///
/// Sessions are created by the constructors in this module (`open_path`,
/// `create_path`, `append_path`, `from_bytes`, `in_memory`, `from_reader`,
/// `to_writer`, `open_file`). Read operations fail with
/// [`Error::WrongMode`] on write sessions and vice versa; every operation
/// except [`close`](Self::close) fails with [`Error::Closed`] once the
/// session is closed.
///
/// Dropping an open session closes it. Errors at that point are logged and
/// otherwise lost; call [`close`](Self::close) to observe them.
///
/// # Example
///
/// ```rust
/// use tarsmith::{AddOptions, CreateOptions, TarArchive};
///
/// let mut writer = TarArchive::in_memory(&CreateOptions::default())?;
/// writer.add("a.txt", b"hello", &AddOptions::default())?;
/// let bytes = writer.into_data()?;
///
/// let mut reader = TarArchive::from_bytes(bytes)?;
/// assert_eq!(reader.count()?, 1);
/// assert_eq!(reader.read("a.txt")?, b"hello");
/// # Ok::<(), tarsmith::Error>(())
/// ```
pub struct TarArchive {
    pub(crate) backing: Backing,
    pub(crate) state: SessionState,
    pub(crate) mode: AccessMode,
    pub(crate) compression: CompressionMethod,
    pub(crate) dialect: Dialect,
    pub(crate) config: ArchiveConfig,
    pub(crate) reader: Option<ReadCoder>,
    pub(crate) writer: Option<WriteCoder>,
}

impl TarArchive {
    /// Path of the archive file, for file-backed sessions.
    pub fn path(&self) -> Option<&Path> {
        self.backing.path()
    }

    /// Compression method: detected on read sessions, selected on write
    /// sessions.
    pub fn compression(&self) -> CompressionMethod {
        self.compression
    }

    /// Header dialect: the one new entries are written with, or on read
    /// sessions the one the first entry was stored with.
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// The mode the session was opened in.
    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    /// Returns false once the session has been closed.
    pub fn is_open(&self) -> bool {
        self.state != SessionState::Closed
    }

    /// The session configuration.
    pub fn config(&self) -> &ArchiveConfig {
        &self.config
    }

    /// Finishes the session.
    ///
    /// Write sessions get their end-of-archive marker and compression
    /// trailer here, and file backings are flushed. Calling `close` again
    /// does nothing. The session is closed even if finishing fails.
    pub fn close(&mut self) -> Result<()> {
        if self.state == SessionState::Closed {
            return Ok(());
        }
        self.state = SessionState::Closed;
        self.reader = None;
        if let Some(writer) = self.writer.take() {
            let entries = writer.entries_written();
            writer.finish()?;
            log::debug!(
                "Closed {} archive after writing {} entries",
                self.backing.kind(),
                entries
            );
        } else {
            log::debug!("Closed {} archive", self.backing.kind());
        }
        Ok(())
    }

    /// Returns the archive bytes of a memory-backed session.
    ///
    /// A write session is finalized first (end-of-archive marker and
    /// compression trailer) and becomes read-only: entries can be
    /// enumerated and read, no longer added. A read session over memory
    /// returns a copy of its input.
    ///
    /// Fails with [`Error::NotInMemory`] for file and stream backings.
    pub fn to_data(&mut self) -> Result<Vec<u8>> {
        self.finalize_memory()?;
        match &self.backing {
            Backing::Memory(data) => Ok(Vec::clone(data)),
            _ => Err(Error::NotInMemory),
        }
    }

    /// Like [`to_data`](Self::to_data), but consumes the session and hands
    /// the buffer back without copying it.
    pub fn into_data(mut self) -> Result<Vec<u8>> {
        self.finalize_memory()?;
        self.reader = None;
        self.state = SessionState::Closed;
        match mem::replace(&mut self.backing, Backing::Sink) {
            Backing::Memory(data) => Ok(Arc::try_unwrap(data).unwrap_or_else(|shared| Vec::clone(&shared))),
            _ => Err(Error::NotInMemory),
        }
    }

    fn finalize_memory(&mut self) -> Result<()> {
        if self.state == SessionState::Closed {
            return Err(Error::Closed);
        }
        if !matches!(self.backing, Backing::Memory(_)) {
            return Err(Error::NotInMemory);
        }
        if let Some(writer) = self.writer.take() {
            match writer.finish() {
                Ok(data) => {
                    self.backing = Backing::Memory(Arc::new(data.unwrap_or_default()));
                    self.state = SessionState::Read;
                    log::debug!("Finalized in-memory archive, session is now read-only");
                }
                Err(e) => {
                    self.state = SessionState::Closed;
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    pub(crate) fn check_readable(&self) -> Result<()> {
        match self.state {
            SessionState::Read => Ok(()),
            SessionState::Closed => Err(Error::Closed),
            _ => Err(Error::WrongMode { expected: "reading" }),
        }
    }

    pub(crate) fn check_writable(&self) -> Result<()> {
        match self.state {
            SessionState::Write | SessionState::WriteAfterAppend => Ok(()),
            SessionState::Closed => Err(Error::Closed),
            _ => Err(Error::WrongMode { expected: "writing" }),
        }
    }

    /// The write coder, if the session accepts new entries.
    pub(crate) fn write_coder(&mut self) -> Result<&mut WriteCoder> {
        self.check_writable()?;
        self.writer.as_mut().ok_or(Error::WrongMode { expected: "writing" })
    }

    /// Replaces the read coder with a fresh one positioned at the first entry.
    pub(crate) fn rewind(&mut self) -> Result<&mut ReadCoder> {
        self.check_readable()?;
        self.reader = None;
        log::debug!("Rewinding {} archive", self.backing.kind());
        let stream = read::open_read_stream(&self.backing, &self.config)?;
        Ok(self.reader.insert(tar::Archive::new(stream)))
    }
}

impl fmt::Debug for TarArchive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TarArchive")
            .field("backing", &self.backing.kind())
            .field("state", &self.state)
            .field("mode", &self.mode)
            .field("compression", &self.compression)
            .field("dialect", &self.dialect)
            .finish_non_exhaustive()
    }
}

impl Drop for TarArchive {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::warn!("Failed to close {} archive on drop: {}", self.backing.kind(), e);
        }
    }
}
