//! Sequential writing of one entry.

use std::io::{self, Write};

use super::WriteCoder;
use super::options::{AddOptions, DEFAULT_FILE_MODE};
use crate::archive::TarArchive;
use crate::read::EntryType;
use crate::{Error, Result};

/// Writer for one new regular-file entry, from
/// [`TarArchive::open_output_stream`].
///
/// A TAR header must state the payload size, so nothing reaches the archive
/// until [`close`](Self::close): writes only accumulate in memory, and close
/// emits the header followed by the whole buffer. Closing twice is a no-op.
/// Dropping an unclosed writer closes it; errors at that point are logged.
///
/// # Example
///
/// ```rust
/// use std::io::Write;
/// use tarsmith::{AddOptions, CreateOptions, TarArchive};
///
/// let mut archive = TarArchive::in_memory(&CreateOptions::default())?;
/// let mut stream = archive.open_output_stream("log.txt", &AddOptions::default())?;
/// writeln!(stream, "first line")?;
/// stream.write_bytes(b"second line\n")?;
/// stream.close()?;
/// drop(stream);
///
/// let mut archive = TarArchive::from_bytes(archive.into_data()?)?;
/// assert_eq!(archive.read_text("log.txt")?, "first line\nsecond line\n");
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct EntryWriter<'a> {
    coder: &'a mut WriteCoder,
    name: String,
    options: AddOptions,
    buffer: Vec<u8>,
    closed: bool,
}

impl<'a> EntryWriter<'a> {
    /// Appends `data` to the entry. Returns the number of bytes taken.
    pub fn write_bytes(&mut self, data: &[u8]) -> Result<usize> {
        if self.closed {
            return Err(Error::StreamClosed);
        }
        self.buffer.extend_from_slice(data);
        Ok(data.len())
    }

    /// Bytes buffered so far.
    pub fn len(&self) -> u64 {
        self.buffer.len() as u64
    }

    /// Returns true if nothing has been written yet.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Returns true until [`close`](Self::close) is called.
    pub fn is_open(&self) -> bool {
        !self.closed
    }

    /// Writes the entry: header with the final size, then the buffered data.
    ///
    /// Fails with [`Error::InvalidFormat`] if a declared
    /// [`size_hint`](AddOptions::size_hint) does not match what was written;
    /// nothing is emitted in that case. Later calls do nothing.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        let data = std::mem::take(&mut self.buffer);
        let size = data.len() as u64;
        if let Some(hint) = self.options.size_hint {
            if hint != size {
                return Err(Error::InvalidFormat(format!(
                    "entry '{}' declared {} bytes but {} were written",
                    self.name, hint, size
                )));
            }
        }
        let mut spec = self.options.header_spec(&self.name, EntryType::File, DEFAULT_FILE_MODE);
        spec.size = size;
        self.coder.append(&spec, data.as_slice())
    }
}

impl Write for EntryWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_bytes(buf).map_err(io::Error::from)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for EntryWriter<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::warn!("Failed to close output stream for '{}': {}", self.name, e);
        }
    }
}

impl std::fmt::Debug for EntryWriter<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntryWriter")
            .field("name", &self.name)
            .field("buffered", &self.buffer.len())
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl TarArchive {
    /// Starts a new regular-file entry whose contents are written
    /// incrementally.
    ///
    /// Mode, owner and modification time come from `options` as for
    /// [`add`](Self::add). The writer borrows the session; no other
    /// operation is possible until it is dropped.
    pub fn open_output_stream(&mut self, name: &str, options: &AddOptions) -> Result<EntryWriter<'_>> {
        let coder = self.write_coder()?;
        Ok(EntryWriter {
            coder,
            name: name.to_string(),
            options: options.clone(),
            buffer: Vec::new(),
            closed: false,
        })
    }
}
