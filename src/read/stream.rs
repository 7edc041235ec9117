//! Sequential reading of one entry's payload.

use std::io::{self, Read};

use super::{Entry, Payload, ReadStream, is_metadata_header};
use crate::archive::TarArchive;
use crate::{Error, Result};

/// Reader over the payload of one entry, from
/// [`TarArchive::open_input_stream`].
///
/// Supports a one-byte lookahead with [`peek`](Self::peek). Reads stop at
/// the entry's size and then return 0. Once [`close`](Self::close) has been
/// called every operation fails with [`Error::StreamClosed`]; dropping the
/// reader closes it silently.
///
/// # Example
///
/// ```rust
/// use tarsmith::{AddOptions, CreateOptions, TarArchive};
///
/// let mut writer = TarArchive::in_memory(&CreateOptions::default())?;
/// writer.add("greeting", b"hi!", &AddOptions::default())?;
/// let mut archive = TarArchive::from_bytes(writer.into_data()?)?;
///
/// let mut stream = archive.open_input_stream("greeting")?;
/// assert_eq!(stream.peek()?, Some(b'h'));
/// let mut buf = [0u8; 8];
/// assert_eq!(stream.read(&mut buf)?, 3);
/// assert_eq!(&buf[..3], b"hi!");
/// assert_eq!(stream.read(&mut buf)?, 0);
/// stream.close()?;
/// # Ok::<(), tarsmith::Error>(())
/// ```
pub struct EntryReader<'a> {
    inner: Payload<tar::Entry<'a, ReadStream>>,
    entry: Entry,
    position: u64,
    lookahead: Option<u8>,
    closed: bool,
}

impl<'a> EntryReader<'a> {
    fn new(inner: Payload<tar::Entry<'a, ReadStream>>, entry: Entry) -> Self {
        Self {
            inner,
            entry,
            position: 0,
            lookahead: None,
            closed: false,
        }
    }

    /// Metadata of the entry being read.
    pub fn entry(&self) -> &Entry {
        &self.entry
    }

    /// Bytes delivered so far.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Total payload size.
    pub fn size(&self) -> u64 {
        self.entry.size
    }

    /// Reads up to `buf.len()` bytes. Returns 0 at the end of the entry.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.ensure_open()?;
        let remaining = self.entry.size - self.position;
        if remaining == 0 || buf.is_empty() {
            return Ok(0);
        }
        let want = buf.len().min(usize::try_from(remaining).unwrap_or(usize::MAX));

        let mut filled = 0;
        if let Some(byte) = self.lookahead.take() {
            buf[0] = byte;
            filled = 1;
        }
        if filled < want {
            match self.inner.read(&mut buf[filled..want]) {
                Ok(n) => filled += n,
                // the peeked byte is delivered; the error resurfaces on the next call
                Err(_) if filled > 0 => {}
                Err(e) => return Err(Error::EntryRead(e)),
            }
        }
        self.position += filled as u64;
        Ok(filled)
    }

    /// Returns the next byte without consuming it, or `None` at the end.
    pub fn peek(&mut self) -> Result<Option<u8>> {
        self.ensure_open()?;
        if let Some(byte) = self.lookahead {
            return Ok(Some(byte));
        }
        if self.position >= self.entry.size {
            return Ok(None);
        }
        let mut byte = [0u8; 1];
        loop {
            match self.inner.read(&mut byte) {
                Ok(0) => return Ok(None),
                Ok(_) => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(Error::EntryRead(e)),
            }
        }
        self.lookahead = Some(byte[0]);
        Ok(Some(byte[0]))
    }

    /// Closes the stream. Closing twice is an error.
    pub fn close(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.closed = true;
        self.lookahead = None;
        Ok(())
    }

    /// Returns true until [`close`](Self::close) is called.
    pub fn is_open(&self) -> bool {
        !self.closed
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            Err(Error::StreamClosed)
        } else {
            Ok(())
        }
    }
}

impl Read for EntryReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        EntryReader::read(self, buf).map_err(io::Error::from)
    }
}

impl std::fmt::Debug for EntryReader<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntryReader")
            .field("name", &self.entry.name)
            .field("position", &self.position)
            .field("size", &self.entry.size)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl TarArchive {
    /// Opens the payload of the first entry named `name` for sequential
    /// reading.
    ///
    /// The reader borrows the session; no other operation is possible until
    /// it is dropped.
    pub fn open_input_stream(&mut self, name: &str) -> Result<EntryReader<'_>> {
        let config = self.config.clone();
        let coder = self.rewind()?;
        let entries = coder
            .entries()
            .map_err(|e| Error::provider("failed to read archive", e))?;
        for raw in entries {
            let mut raw = raw.map_err(|e| Error::provider("failed to read next header", e))?;
            if is_metadata_header(raw.header().entry_type()) {
                continue;
            }
            let entry = Entry::from_tar(&mut raw, &config)?;
            if config.names_match(name, &entry.name) {
                let payload = Payload::new(raw, &entry).map_err(|e| {
                    Error::provider(format!("failed to read sparse map of '{}'", entry.name), e)
                })?;
                return Ok(EntryReader::new(payload, entry));
            }
        }
        Err(Error::entry_not_found(name))
    }
}
