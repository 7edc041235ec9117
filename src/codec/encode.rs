//! Write-side compression.

use std::io::{self, Write};

use super::CompressionMethod;
use crate::Result;

/// Compressing writer. [`Encoder::finish`] must be called to flush the
/// compressed tail; dropping an encoder loses it.
pub(crate) enum Encoder<W: Write> {
    Plain(W),
    #[cfg(feature = "gzip")]
    Gzip(Box<flate2::write::GzEncoder<W>>),
    #[cfg(feature = "bzip2")]
    Bzip2(Box<bzip2::write::BzEncoder<W>>),
    #[cfg(feature = "xz")]
    Xz(Box<xz2::write::XzEncoder<W>>),
    #[cfg(feature = "zstd")]
    Zstd(Box<zstd::stream::write::Encoder<'static, W>>),
    #[cfg(feature = "lz4")]
    Lz4(Box<lz4_flex::frame::FrameEncoder<W>>),
}

impl<W: Write> std::fmt::Debug for Encoder<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Encoder").field(&self.method()).finish()
    }
}

impl<W: Write> Encoder<W> {
    /// Wraps `writer` in the encoder for `method`.
    ///
    /// `level` is an already validated 1-9 hint. Methods without levels
    /// ignore it with a warning and never fail because of it.
    pub(crate) fn new(method: CompressionMethod, writer: W, level: Option<u32>) -> Result<Self> {
        match method {
            CompressionMethod::None => Ok(Self::Plain(writer)),
            #[cfg(feature = "gzip")]
            CompressionMethod::Gzip => {
                let level = level.map_or_else(flate2::Compression::default, flate2::Compression::new);
                Ok(Self::Gzip(Box::new(flate2::write::GzEncoder::new(writer, level))))
            }
            #[cfg(feature = "bzip2")]
            CompressionMethod::Bzip2 => {
                let level = level.map_or_else(bzip2::Compression::default, bzip2::Compression::new);
                Ok(Self::Bzip2(Box::new(bzip2::write::BzEncoder::new(writer, level))))
            }
            #[cfg(feature = "xz")]
            CompressionMethod::Xz => Ok(Self::Xz(Box::new(xz2::write::XzEncoder::new(
                writer,
                level.unwrap_or(6),
            )))),
            #[cfg(feature = "zstd")]
            CompressionMethod::Zstd => {
                let level = level.map_or(zstd::DEFAULT_COMPRESSION_LEVEL, |l| l as i32);
                let encoder = zstd::stream::write::Encoder::new(writer, level)?;
                Ok(Self::Zstd(Box::new(encoder)))
            }
            #[cfg(feature = "lz4")]
            CompressionMethod::Lz4 => {
                if let Some(level) = level {
                    log::warn!("lz4 has no compression levels, ignoring level {}", level);
                }
                Ok(Self::Lz4(Box::new(lz4_flex::frame::FrameEncoder::new(writer))))
            }
            #[allow(unreachable_patterns)]
            other => Err(other.unsupported()),
        }
    }

    pub(crate) fn method(&self) -> CompressionMethod {
        match self {
            Self::Plain(_) => CompressionMethod::None,
            #[cfg(feature = "gzip")]
            Self::Gzip(_) => CompressionMethod::Gzip,
            #[cfg(feature = "bzip2")]
            Self::Bzip2(_) => CompressionMethod::Bzip2,
            #[cfg(feature = "xz")]
            Self::Xz(_) => CompressionMethod::Xz,
            #[cfg(feature = "zstd")]
            Self::Zstd(_) => CompressionMethod::Zstd,
            #[cfg(feature = "lz4")]
            Self::Lz4(_) => CompressionMethod::Lz4,
        }
    }

    /// Flushes the compressed tail and returns the inner writer.
    pub(crate) fn finish(self) -> io::Result<W> {
        match self {
            Self::Plain(w) => Ok(w),
            #[cfg(feature = "gzip")]
            Self::Gzip(e) => e.finish(),
            #[cfg(feature = "bzip2")]
            Self::Bzip2(e) => e.finish(),
            #[cfg(feature = "xz")]
            Self::Xz(e) => e.finish(),
            #[cfg(feature = "zstd")]
            Self::Zstd(e) => e.finish(),
            #[cfg(feature = "lz4")]
            Self::Lz4(e) => e.finish().map_err(io::Error::other),
        }
    }
}

impl<W: Write> Write for Encoder<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Plain(w) => w.write(buf),
            #[cfg(feature = "gzip")]
            Self::Gzip(e) => e.write(buf),
            #[cfg(feature = "bzip2")]
            Self::Bzip2(e) => e.write(buf),
            #[cfg(feature = "xz")]
            Self::Xz(e) => e.write(buf),
            #[cfg(feature = "zstd")]
            Self::Zstd(e) => e.write(buf),
            #[cfg(feature = "lz4")]
            Self::Lz4(e) => e.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Plain(w) => w.flush(),
            #[cfg(feature = "gzip")]
            Self::Gzip(e) => e.flush(),
            #[cfg(feature = "bzip2")]
            Self::Bzip2(e) => e.flush(),
            #[cfg(feature = "xz")]
            Self::Xz(e) => e.flush(),
            #[cfg(feature = "zstd")]
            Self::Zstd(e) => e.flush(),
            #[cfg(feature = "lz4")]
            Self::Lz4(e) => e.flush(),
        }
    }
}
