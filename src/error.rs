//! Error types for TAR archive operations.
//!
//! This module provides the [`Error`] enum which represents all possible
//! failure modes of an archive session, along with a convenient
//! [`Result<T>`] type alias.
//!
//! Every error also carries a machine-readable [`ErrorCode`]. Path safety
//! violations are reported with [`ErrorCode::Security`] so callers can tell
//! a hostile archive apart from an ordinary I/O or format problem:
//!
//! ```rust,no_run
//! use tarsmith::{ErrorCode, ExtractOptions, TarArchive};
//!
//! fn unpack(path: &str, dest: &str) -> tarsmith::Result<()> {
//!     let mut archive = TarArchive::open_path(path)?;
//!     match archive.extract_all(dest, &ExtractOptions::default()) {
//!         Err(e) if e.code() == ErrorCode::Security => {
//!             eprintln!("refusing hostile archive: {}", e);
//!             Err(e)
//!         }
//!         other => other,
//!     }
//! }
//! ```

use std::fmt;
use std::io;

/// Machine-readable error class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorCode {
    /// Generic usage, I/O or format failure.
    Tar,
    /// A path or link target was rejected by the extraction safety gate.
    Security,
    /// An entry stream was used after it had been closed.
    StreamClosed,
    /// Pulling entry payload through an input stream failed.
    Read,
}

impl ErrorCode {
    /// Returns the code as its wire string, e.g. `"TAR-SECURITY-ERROR"`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tar => "TAR-ERROR",
            Self::Security => "TAR-SECURITY-ERROR",
            Self::StreamClosed => "STREAM-CLOSED-ERROR",
            Self::Read => "TAR-READ-ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which part of an entry failed the path safety gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnsafePathKind {
    /// The entry's own path.
    Entry,
    /// The target of a hardlink entry.
    HardlinkTarget,
    /// The target of a symbolic link entry.
    SymlinkTarget,
}

impl fmt::Display for UnsafePathKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Entry => write!(f, "entry path"),
            Self::HardlinkTarget => write!(f, "hardlink target"),
            Self::SymlinkTarget => write!(f, "symlink target"),
        }
    }
}

/// The main error type for archive sessions.
///
/// | Category | Variants |
/// |----------|----------|
/// | Usage | [`Closed`][Self::Closed], [`WrongMode`][Self::WrongMode], [`EntryNotFound`][Self::EntryNotFound], [`UnsupportedCompression`][Self::UnsupportedCompression], [`InvalidCompressionLevel`][Self::InvalidCompressionLevel], [`NotInMemory`][Self::NotInMemory] |
/// | I/O | [`Io`][Self::Io], [`Provider`][Self::Provider], [`EntryRead`][Self::EntryRead] |
/// | Format | [`InvalidFormat`][Self::InvalidFormat] |
/// | Security | [`UnsafePath`][Self::UnsafePath] |
/// | Streams | [`StreamClosed`][Self::StreamClosed] |
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// An I/O error occurred during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The codec or format provider reported a failure.
    ///
    /// `context` names the step that failed (opening, reading the next
    /// header, writing an entry, finalizing) and `source` carries the
    /// provider's own diagnostic.
    #[error("{context}: {source}")]
    Provider {
        /// What the session was doing.
        context: String,
        /// The provider's diagnostic.
        #[source]
        source: io::Error,
    },

    /// The session has been closed.
    #[error("archive is closed")]
    Closed,

    /// The session was opened in a mode that does not allow the operation.
    #[error("archive not open for {expected}")]
    WrongMode {
        /// `"reading"` or `"writing"`.
        expected: &'static str,
    },

    /// No entry with the requested name exists.
    #[error("entry not found: {name}")]
    EntryNotFound {
        /// The name that was looked up.
        name: String,
    },

    /// The compression method is unknown or was not compiled in.
    #[error("unsupported compression method: {method}")]
    UnsupportedCompression {
        /// Name of the requested method.
        method: String,
    },

    /// A compression level outside 1-9 was requested.
    #[error("invalid compression level {level} (expected 1-9)")]
    InvalidCompressionLevel {
        /// The rejected level.
        level: u32,
    },

    /// A path or link target failed the extraction safety gate.
    ///
    /// This is a **security error**: the archive tried to place something
    /// outside the extraction root. The whole extraction is aborted; entries
    /// written before the violation are left in place.
    #[error("unsafe {kind} in archive: {path}")]
    UnsafePath {
        /// The offending path as stored in the archive.
        path: String,
        /// Which field carried it.
        kind: UnsafePathKind,
    },

    /// An entry stream was used after `close()`.
    #[error("stream is closed")]
    StreamClosed,

    /// Reading entry payload through an input stream failed.
    #[error("failed to read entry data: {0}")]
    EntryRead(#[source] io::Error),

    /// Binary export was requested from a session not backed by memory.
    #[error("cannot get binary data from file-based archive")]
    NotInMemory,

    /// The archive data or a header value is invalid for the operation.
    #[error("invalid tar archive: {0}")]
    InvalidFormat(String),
}

/// A specialized Result type for archive operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns the machine-readable error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::UnsafePath { .. } => ErrorCode::Security,
            Error::StreamClosed => ErrorCode::StreamClosed,
            Error::EntryRead(_) => ErrorCode::Read,
            _ => ErrorCode::Tar,
        }
    }

    /// Returns true if this error is a security violation.
    pub fn is_security_error(&self) -> bool {
        self.code() == ErrorCode::Security
    }

    /// Returns true if this error reports misuse of the session rather than
    /// a problem with the data or the filesystem.
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            Error::Closed
                | Error::WrongMode { .. }
                | Error::EntryNotFound { .. }
                | Error::UnsupportedCompression { .. }
                | Error::InvalidCompressionLevel { .. }
                | Error::NotInMemory
                | Error::StreamClosed
        )
    }

    pub(crate) fn provider(context: impl Into<String>, source: io::Error) -> Self {
        Error::Provider {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn entry_not_found(name: &str) -> Self {
        Error::EntryNotFound {
            name: name.to_string(),
        }
    }

    pub(crate) fn unsafe_path(path: &str, kind: UnsafePathKind) -> Self {
        Error::UnsafePath {
            path: path.to_string(),
            kind,
        }
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Io(e) | Error::EntryRead(e) => e,
            Error::Provider { source, .. } => source,
            other => io::Error::other(other),
        }
    }
}
