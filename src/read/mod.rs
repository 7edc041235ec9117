//! Archive reading: enumeration, lookup, payload access and extraction.
//!
//! # Example
//!
//! ```rust,no_run
//! use tarsmith::{ExtractOptions, TarArchive};
//!
//! let mut archive = TarArchive::open_path("release.tar.xz")?;
//!
//! for entry in archive.entries()? {
//!     println!("{:>10} {} {}", entry.size, entry.entry_type, entry.name);
//! }
//!
//! let readme = archive.read_text("release/README")?;
//! println!("{}", readme);
//!
//! archive.extract_all("./out", &ExtractOptions::new().strip_count(1))?;
//! # Ok::<(), tarsmith::Error>(())
//! ```

mod destination;
mod entry;
mod extraction;
mod options;
mod query;
mod sparse;
mod stream;

pub use entry::{Entry, EntryType, FileKind};
pub use options::ExtractOptions;
pub use stream::EntryReader;

use std::io::{self, BufReader, Read};

use crate::backing::{Backing, BackingReader};
use crate::codec::{CompressionMethod, Decoder};
use crate::config::ArchiveConfig;
use crate::{Error, Result};
use sparse::SparseReader;

/// Decompressed byte stream the read coder parses.
pub(crate) type ReadStream = Decoder<BufReader<BackingReader>>;

/// Read-side coder over one pass of the backing.
pub(crate) type ReadCoder = tar::Archive<ReadStream>;

/// Opens `backing` at its first byte and wraps it in the decoder its magic
/// bytes call for.
pub(crate) fn open_read_stream(backing: &Backing, config: &ArchiveConfig) -> Result<ReadStream> {
    let opening = |e| Error::provider(format!("failed to open {} archive for reading", backing.kind()), e);
    let mut reader = backing.reader().map_err(opening)?;
    let magic = reader.sniff().map_err(opening)?;
    let method = CompressionMethod::from_magic(&magic);
    Decoder::new(method, BufReader::with_capacity(config.transfer_buffer_size(), reader))
}

/// Whether a header is bookkeeping rather than an archive member.
pub(crate) fn is_metadata_header(entry_type: tar::EntryType) -> bool {
    matches!(
        entry_type,
        tar::EntryType::XGlobalHeader | tar::EntryType::XHeader
    ) || entry_type.is_gnu_longname()
        || entry_type.is_gnu_longlink()
}

/// An entry's payload as the file it stands for: the stored bytes, or a
/// pax sparse file expanded with its holes.
pub(crate) enum Payload<R> {
    Stored(R),
    Sparse(SparseReader<R>),
}

impl<R: Read> Payload<R> {
    /// Wraps `data`, reading a sparse map stored in front of it if `entry`
    /// has one.
    pub(crate) fn new(data: R, entry: &Entry) -> io::Result<Self> {
        match &entry.sparse {
            Some(layout) => Ok(Self::Sparse(layout.reader(data)?)),
            None => Ok(Self::Stored(data)),
        }
    }
}

impl<R: Read> Read for Payload<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Stored(data) => data.read(buf),
            Self::Sparse(data) => data.read(buf),
        }
    }
}
