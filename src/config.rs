//! Per-session configuration.
//!
//! [`ArchiveConfig`] is handed to a session when it is constructed and stays
//! fixed for the session's lifetime. It replaces any process-wide locale or
//! platform switch: how header bytes become strings ([`PathEncoding`]) and how
//! names are compared during lookups ([`NameMatching`]) are explicit values.
//!
//! # Example
//!
//! ```rust
//! use tarsmith::{ArchiveConfig, NameMatching, PathEncoding};
//!
//! let config = ArchiveConfig::new()
//!     .encoding(PathEncoding::Latin1)
//!     .name_matching(NameMatching::Canonical);
//! assert!(config.names_match("caf\u{e9}", "cafe\u{301}"));
//! ```

use std::borrow::Cow;
use std::fmt;

use unicode_normalization::UnicodeNormalization;

use crate::READ_BUFFER_SIZE;

/// Smallest accepted transfer buffer (one TAR block).
const MIN_BUFFER_SIZE: usize = 512;

/// How raw header bytes (names, link targets, owner names) map to strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PathEncoding {
    /// UTF-8. Invalid sequences are replaced with U+FFFD when reading.
    #[default]
    Utf8,
    /// ISO-8859-1: every byte is the code point of the same value. Characters
    /// above U+00FF are written as `?`.
    Latin1,
}

impl PathEncoding {
    /// Decodes header bytes into a string.
    pub fn decode<'a>(&self, bytes: &'a [u8]) -> Cow<'a, str> {
        match self {
            Self::Utf8 => String::from_utf8_lossy(bytes),
            Self::Latin1 => match std::str::from_utf8(bytes) {
                Ok(s) if s.is_ascii() => Cow::Borrowed(s),
                _ => Cow::Owned(bytes.iter().map(|&b| b as char).collect()),
            },
        }
    }

    /// Encodes a string into header bytes.
    pub fn encode<'a>(&self, text: &'a str) -> Cow<'a, [u8]> {
        match self {
            Self::Utf8 => Cow::Borrowed(text.as_bytes()),
            Self::Latin1 if text.is_ascii() => Cow::Borrowed(text.as_bytes()),
            Self::Latin1 => Cow::Owned(
                text.chars()
                    .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
                    .collect(),
            ),
        }
    }
}

/// Strategy used to compare a requested name with an entry's stored name.
#[derive(Clone, Copy, Default)]
pub enum NameMatching {
    /// Byte-for-byte equality.
    #[default]
    Exact,
    /// Equality after Unicode canonical decomposition (NFD), so `"é"` and
    /// `"e\u{301}"` name the same entry.
    Canonical,
    /// Caller-supplied comparison: `(requested, stored) -> bool`.
    Custom(fn(&str, &str) -> bool),
}

impl NameMatching {
    /// Returns true if `requested` names the entry stored as `stored`.
    pub fn matches(&self, requested: &str, stored: &str) -> bool {
        match self {
            Self::Exact => requested == stored,
            Self::Canonical => {
                requested == stored || requested.nfd().eq(stored.nfd())
            }
            Self::Custom(f) => f(requested, stored),
        }
    }
}

impl fmt::Debug for NameMatching {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact => write!(f, "Exact"),
            Self::Canonical => write!(f, "Canonical"),
            Self::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

/// Configuration threaded through an archive session.
#[derive(Debug, Clone)]
pub struct ArchiveConfig {
    /// Header byte encoding.
    pub encoding: PathEncoding,
    /// Lookup comparison strategy.
    pub name_matching: NameMatching,
    /// Transfer buffer size for payload copies. Values below 512 bytes are
    /// treated as 512.
    pub buffer_size: usize,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            encoding: PathEncoding::default(),
            name_matching: NameMatching::default(),
            buffer_size: READ_BUFFER_SIZE,
        }
    }
}

impl ArchiveConfig {
    /// Creates the default configuration (UTF-8, exact matching, 64 KiB).
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the header encoding.
    pub fn encoding(mut self, encoding: PathEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Sets the name comparison strategy.
    pub fn name_matching(mut self, name_matching: NameMatching) -> Self {
        self.name_matching = name_matching;
        self
    }

    /// Sets the transfer buffer size. Values below 512 bytes are raised to 512.
    pub fn buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.max(MIN_BUFFER_SIZE);
        self
    }

    /// Compares names using the configured strategy.
    pub fn names_match(&self, requested: &str, stored: &str) -> bool {
        self.name_matching.matches(requested, stored)
    }

    /// The transfer buffer size actually used, never below one block.
    pub(crate) fn transfer_buffer_size(&self) -> usize {
        self.buffer_size.max(MIN_BUFFER_SIZE)
    }

    pub(crate) fn decode<'a>(&self, bytes: &'a [u8]) -> Cow<'a, str> {
        self.encoding.decode(bytes)
    }
}
