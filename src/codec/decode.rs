//! Read-side decompression.

use std::io::{self, BufRead, Read};

use super::CompressionMethod;
use crate::Result;

/// Decompressing reader over a buffered source.
///
/// Multi-member streams (concatenated gzip members, multiple bzip2/xz
/// streams) are read through to the end.
pub(crate) enum Decoder<R: BufRead> {
    Plain(R),
    #[cfg(feature = "gzip")]
    Gzip(Box<flate2::bufread::MultiGzDecoder<R>>),
    #[cfg(feature = "bzip2")]
    Bzip2(Box<bzip2::bufread::MultiBzDecoder<R>>),
    #[cfg(feature = "xz")]
    Xz(Box<xz2::bufread::XzDecoder<R>>),
    #[cfg(feature = "zstd")]
    Zstd(Box<zstd::stream::read::Decoder<'static, R>>),
    #[cfg(feature = "lz4")]
    Lz4(Box<lz4_flex::frame::FrameDecoder<R>>),
}

impl<R: BufRead> std::fmt::Debug for Decoder<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Decoder").field(&self.method()).finish()
    }
}

impl<R: BufRead> Decoder<R> {
    /// Wraps `reader` in the decoder for `method`.
    pub(crate) fn new(method: CompressionMethod, reader: R) -> Result<Self> {
        match method {
            CompressionMethod::None => Ok(Self::Plain(reader)),
            #[cfg(feature = "gzip")]
            CompressionMethod::Gzip => Ok(Self::Gzip(Box::new(
                flate2::bufread::MultiGzDecoder::new(reader),
            ))),
            #[cfg(feature = "bzip2")]
            CompressionMethod::Bzip2 => Ok(Self::Bzip2(Box::new(
                bzip2::bufread::MultiBzDecoder::new(reader),
            ))),
            #[cfg(feature = "xz")]
            CompressionMethod::Xz => Ok(Self::Xz(Box::new(
                xz2::bufread::XzDecoder::new_multi_decoder(reader),
            ))),
            #[cfg(feature = "zstd")]
            CompressionMethod::Zstd => {
                let decoder = zstd::stream::read::Decoder::with_buffer(reader)?;
                Ok(Self::Zstd(Box::new(decoder)))
            }
            #[cfg(feature = "lz4")]
            CompressionMethod::Lz4 => Ok(Self::Lz4(Box::new(
                lz4_flex::frame::FrameDecoder::new(reader),
            ))),
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
}

impl<R: BufRead> Read for Decoder<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Plain(r) => r.read(buf),
            #[cfg(feature = "gzip")]
            Self::Gzip(d) => d.read(buf),
            #[cfg(feature = "bzip2")]
            Self::Bzip2(d) => d.read(buf),
            #[cfg(feature = "xz")]
            Self::Xz(d) => d.read(buf),
            #[cfg(feature = "zstd")]
            Self::Zstd(d) => d.read(buf),
            #[cfg(feature = "lz4")]
            Self::Lz4(d) => d.read(buf),
        }
    }
}
