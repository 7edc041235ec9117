//! Archive writing.
//!
//! Entries are added through the `add*` methods of
//! [`TarArchive`](crate::TarArchive) or through an [`EntryWriter`] from
//! [`open_output_stream`](crate::TarArchive::open_output_stream). Both end
//! up in a [`WriteCoder`], which lays out headers for the session's dialect
//! and pushes them through the compression encoder into the backing.
//!
//! # Example
//!
//! ```rust
//! use tarsmith::{AddOptions, CompressionMethod, CreateOptions, TarArchive};
//!
//! let options = CreateOptions::new().compression(CompressionMethod::Gzip);
//! let mut archive = TarArchive::in_memory(&options)?;
//! archive.add_directory("docs", &AddOptions::default())?;
//! archive.add("docs/readme.txt", b"hello", &AddOptions::new().mode(0o600))?;
//!
//! let bytes = archive.into_data()?;
//! assert_eq!(&bytes[..2], &[0x1F, 0x8B]);
//! # Ok::<(), tarsmith::Error>(())
//! ```

mod add;
pub(crate) mod options;
mod stream;

pub use options::{AddOptions, CreateOptions};
pub use stream::EntryWriter;

use std::io::Read;

use crate::backing::BackingWriter;
use crate::codec::{CompressionMethod, Encoder};
use crate::config::PathEncoding;
use crate::format::Dialect;
use crate::format::header::{self, HeaderSpec};
use crate::{Error, Result};

/// Write-side coder: header layout, compression and the backing writer.
pub(crate) struct WriteCoder {
    builder: tar::Builder<Encoder<BackingWriter>>,
    dialect: Dialect,
    encoding: PathEncoding,
    entries_written: u64,
}

impl WriteCoder {
    pub(crate) fn open(
        writer: BackingWriter,
        method: CompressionMethod,
        level: Option<u32>,
        dialect: Dialect,
        encoding: PathEncoding,
    ) -> Result<Self> {
        let encoder = Encoder::new(method, writer, level)?;
        Ok(Self {
            builder: tar::Builder::new(encoder),
            dialect,
            encoding,
            entries_written: 0,
        })
    }

    /// Writes one entry: its extension records, its header, then `data`.
    ///
    /// `data` must yield exactly `spec.size` bytes.
    pub(crate) fn append(&mut self, spec: &HeaderSpec, data: impl Read) -> Result<()> {
        let built = header::build(spec, self.dialect, self.encoding)?;
        let failed = |e| Error::provider(format!("failed to write entry '{}'", spec.path), e);
        for (extension, payload) in &built.extensions {
            self.builder.append(extension, payload.as_slice()).map_err(failed)?;
        }
        self.builder.append(&built.header, data).map_err(failed)?;
        self.entries_written += 1;
        Ok(())
    }

    /// Writes an already serialized header and its payload unchanged.
    pub(crate) fn append_raw(&mut self, header: &tar::Header, data: impl Read) -> Result<()> {
        self.builder
            .append(header, data)
            .map_err(|e| Error::provider("failed to copy entry", e))?;
        self.entries_written += 1;
        Ok(())
    }

    pub(crate) fn entries_written(&self) -> u64 {
        self.entries_written
    }

    /// Writes the end-of-archive marker, finishes compression and flushes.
    /// Memory backings hand their buffer back.
    pub(crate) fn finish(self) -> Result<Option<Vec<u8>>> {
        let encoder = self
            .builder
            .into_inner()
            .map_err(|e| Error::provider("failed to write end of archive", e))?;
        let writer = encoder
            .finish()
            .map_err(|e| Error::provider("failed to finish compressed stream", e))?;
        writer
            .finish()
            .map_err(|e| Error::provider("failed to flush archive", e))
    }
}

impl std::fmt::Debug for WriteCoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteCoder")
            .field("dialect", &self.dialect)
            .field("entries_written", &self.entries_written)
            .finish_non_exhaustive()
    }
}
