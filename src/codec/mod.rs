//! Compression layer wrapped around the TAR stream.
//!
//! Exactly one compression method applies to a session. On the write side it
//! comes from [`CreateOptions`](crate::CreateOptions) or, for file-backed
//! sessions, from the file name; on the read side it is detected from the
//! first bytes of the data.
//!
//! Each method other than [`CompressionMethod::None`] is behind a cargo
//! feature of the same name. Selecting a method that was not compiled in is
//! an [`Error::UnsupportedCompression`].

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::{Error, Result};

mod decode;
mod encode;

pub(crate) use decode::Decoder;
pub(crate) use encode::Encoder;

/// Number of leading bytes needed to recognize every supported method.
pub(crate) const MAGIC_LEN: usize = 6;

/// Compression method of a TAR archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CompressionMethod {
    /// Plain, uncompressed TAR.
    #[default]
    None,
    /// gzip (`.tar.gz`, `.tgz`).
    Gzip,
    /// bzip2 (`.tar.bz2`, `.tbz2`, `.tbz`).
    Bzip2,
    /// xz (`.tar.xz`, `.txz`).
    Xz,
    /// Zstandard (`.tar.zst`, `.tar.zstd`).
    Zstd,
    /// LZ4 frame format (`.tar.lz4`).
    Lz4,
}

/// File name suffixes, checked in order.
const SUFFIXES: &[(&str, CompressionMethod)] = &[
    (".tar.gz", CompressionMethod::Gzip),
    (".tgz", CompressionMethod::Gzip),
    (".tar.bz2", CompressionMethod::Bzip2),
    (".tbz2", CompressionMethod::Bzip2),
    (".tbz", CompressionMethod::Bzip2),
    (".tar.xz", CompressionMethod::Xz),
    (".txz", CompressionMethod::Xz),
    (".tar.zst", CompressionMethod::Zstd),
    (".tar.zstd", CompressionMethod::Zstd),
    (".tar.lz4", CompressionMethod::Lz4),
];

impl CompressionMethod {
    /// All methods, in declaration order.
    pub const ALL: [CompressionMethod; 6] = [
        Self::None,
        Self::Gzip,
        Self::Bzip2,
        Self::Xz,
        Self::Zstd,
        Self::Lz4,
    ];

    /// Canonical lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Gzip => "gzip",
            Self::Bzip2 => "bzip2",
            Self::Xz => "xz",
            Self::Zstd => "zstd",
            Self::Lz4 => "lz4",
        }
    }

    /// Guesses the method from a file name suffix.
    ///
    /// `.tar` and unrecognized names map to [`CompressionMethod::None`].
    ///
    /// ```rust
    /// use tarsmith::CompressionMethod;
    ///
    /// assert_eq!(CompressionMethod::from_path("backup.tgz"), CompressionMethod::Gzip);
    /// assert_eq!(CompressionMethod::from_path("data.tar.zstd"), CompressionMethod::Zstd);
    /// assert_eq!(CompressionMethod::from_path("plain.tar"), CompressionMethod::None);
    /// ```
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let name = path.as_ref().to_string_lossy();
        SUFFIXES
            .iter()
            .find(|(suffix, _)| name.ends_with(suffix))
            .map(|&(_, method)| method)
            .unwrap_or(Self::None)
    }

    /// Recognizes the method from the leading bytes of an archive.
    pub fn from_magic(data: &[u8]) -> Self {
        match data {
            [0x1F, 0x8B, ..] => Self::Gzip,
            [b'B', b'Z', b'h', ..] => Self::Bzip2,
            [0xFD, b'7', b'z', b'X', b'Z', 0x00, ..] => Self::Xz,
            [0x28, 0xB5, 0x2F, 0xFD, ..] => Self::Zstd,
            [0x04, 0x22, 0x4D, 0x18, ..] => Self::Lz4,
            _ => Self::None,
        }
    }

    /// Returns true if this build can encode and decode the method.
    pub fn is_supported(self) -> bool {
        match self {
            Self::None => true,
            Self::Gzip => cfg!(feature = "gzip"),
            Self::Bzip2 => cfg!(feature = "bzip2"),
            Self::Xz => cfg!(feature = "xz"),
            Self::Zstd => cfg!(feature = "zstd"),
            Self::Lz4 => cfg!(feature = "lz4"),
        }
    }

    pub(crate) fn unsupported(self) -> Error {
        Error::UnsupportedCompression {
            method: self.as_str().to_string(),
        }
    }
}

impl fmt::Display for CompressionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompressionMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "" => Ok(Self::None),
            "gzip" | "gz" => Ok(Self::Gzip),
            "bzip2" | "bz2" => Ok(Self::Bzip2),
            "xz" => Ok(Self::Xz),
            "zstd" | "zst" => Ok(Self::Zstd),
            "lz4" => Ok(Self::Lz4),
            _ => Err(Error::UnsupportedCompression {
                method: s.to_string(),
            }),
        }
    }
}

/// Validates a compression level hint.
pub(crate) fn validate_level(level: u32) -> Result<u32> {
    if (1..=9).contains(&level) {
        Ok(level)
    } else {
        Err(Error::InvalidCompressionLevel { level })
    }
}
