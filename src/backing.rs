//! Physical backings of an archive session.
//!
//! A session reads through a [`BackingReader`] (pull) and writes through a
//! [`BackingWriter`] (push), whatever the medium underneath:
//!
//! | Backing | Read side | Write side |
//! |---------|-----------|------------|
//! | File | reopened from its path on every rewind | truncating create |
//! | Memory | shared snapshot with its own cursor | growable buffer |
//! | Stream | caller's reader, spooled so it can be replayed | caller's writer |
//!
//! Query operations restart from the first byte every time, so every read
//! backing must support a cheap restart. For streams that means keeping every
//! byte pulled so far; a stream-backed session holds the consumed part of the
//! stream in memory for its whole lifetime.

use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::codec::MAGIC_LEN;

/// Where a session's bytes live, kept so read cursors can be rebuilt.
pub(crate) enum Backing {
    /// Archive file on disk.
    File(PathBuf),
    /// Immutable bytes. Empty while a memory write session is still open.
    Memory(Arc<Vec<u8>>),
    /// Replayable caller stream.
    Stream(StreamSpool),
    /// Caller writer; nothing to read back.
    Sink,
}

impl Backing {
    /// Opens a fresh reader positioned at the first byte.
    pub(crate) fn reader(&self) -> io::Result<BackingReader> {
        match self {
            Backing::File(path) => Ok(BackingReader::File(File::open(path)?)),
            Backing::Memory(data) => Ok(BackingReader::Memory(MemoryReader::new(Arc::clone(data)))),
            Backing::Stream(spool) => Ok(BackingReader::Stream(spool.replay())),
            Backing::Sink => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "write-only stream cannot be read back",
            )),
        }
    }

    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Backing::File(_) => "file",
            Backing::Memory(_) => "memory",
            Backing::Stream(_) => "stream",
            Backing::Sink => "sink",
        }
    }

    pub(crate) fn path(&self) -> Option<&Path> {
        match self {
            Backing::File(path) => Some(path),
            _ => None,
        }
    }
}

/// Pull side of a backing.
pub(crate) enum BackingReader {
    File(File),
    Memory(MemoryReader),
    Stream(ReplayReader),
}

impl BackingReader {
    /// Returns up to [`MAGIC_LEN`] leading bytes and restarts at the beginning.
    pub(crate) fn sniff(&mut self) -> io::Result<Vec<u8>> {
        let mut magic = Vec::with_capacity(MAGIC_LEN);
        (&mut *self).take(MAGIC_LEN as u64).read_to_end(&mut magic)?;
        match self {
            BackingReader::File(file) => {
                use std::io::Seek;
                file.rewind()?;
            }
            BackingReader::Memory(reader) => reader.pos = 0,
            BackingReader::Stream(reader) => reader.pos = 0,
        }
        Ok(magic)
    }
}

impl Read for BackingReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            BackingReader::File(file) => file.read(buf),
            BackingReader::Memory(reader) => reader.read(buf),
            BackingReader::Stream(reader) => reader.read(buf),
        }
    }
}

/// Cursor over a shared byte snapshot. Advances monotonically and never wraps.
pub(crate) struct MemoryReader {
    data: Arc<Vec<u8>>,
    pos: usize,
}

impl MemoryReader {
    pub(crate) fn new(data: Arc<Vec<u8>>) -> Self {
        Self { data, pos: 0 }
    }
}

impl Read for MemoryReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = &self.data[self.pos.min(self.data.len())..];
        let n = remaining.len().min(buf.len());
        buf[..n].copy_from_slice(&remaining[..n]);
        self.pos += n;
        Ok(n)
    }
}

struct SpoolState {
    source: Box<dyn Read + Send>,
    consumed: Vec<u8>,
}

/// A caller stream plus every byte pulled from it so far.
#[derive(Clone)]
pub(crate) struct StreamSpool {
    state: Arc<Mutex<SpoolState>>,
}

impl StreamSpool {
    pub(crate) fn new(source: Box<dyn Read + Send>) -> Self {
        Self {
            state: Arc::new(Mutex::new(SpoolState {
                source,
                consumed: Vec::new(),
            })),
        }
    }

    /// A reader that replays the consumed prefix, then continues the stream.
    pub(crate) fn replay(&self) -> ReplayReader {
        ReplayReader {
            spool: self.clone(),
            pos: 0,
        }
    }

    /// Bytes pulled from the stream so far.
    #[cfg(test)]
    pub(crate) fn consumed_len(&self) -> usize {
        self.lock().consumed.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SpoolState> {
        self.state.lock().unwrap_or_else(|poisoned| {
            log::warn!("Stream spool lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }
}

/// Reader handed out by [`StreamSpool::replay`].
pub(crate) struct ReplayReader {
    spool: StreamSpool,
    pos: usize,
}

impl Read for ReplayReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.spool.lock();
        if self.pos < state.consumed.len() {
            let available = &state.consumed[self.pos..];
            let n = available.len().min(buf.len());
            buf[..n].copy_from_slice(&available[..n]);
            self.pos += n;
            return Ok(n);
        }
        let n = state.source.read(buf)?;
        state.consumed.extend_from_slice(&buf[..n]);
        self.pos += n;
        Ok(n)
    }
}

/// Push side of a backing.
pub(crate) enum BackingWriter {
    File(BufWriter<File>),
    Memory(Vec<u8>),
    Stream(Box<dyn Write + Send>),
}

impl BackingWriter {
    /// Creates (truncating) the archive file.
    pub(crate) fn create_file(path: &Path, buffer_size: usize) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(BackingWriter::File(BufWriter::with_capacity(buffer_size, file)))
    }

    /// Flushes everything. Memory backings hand their buffer back.
    pub(crate) fn finish(self) -> io::Result<Option<Vec<u8>>> {
        match self {
            BackingWriter::File(mut writer) => {
                writer.flush()?;
                Ok(None)
            }
            BackingWriter::Memory(buffer) => Ok(Some(buffer)),
            BackingWriter::Stream(mut writer) => {
                writer.flush()?;
                Ok(None)
            }
        }
    }
}

impl Write for BackingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            BackingWriter::File(writer) => writer.write(buf),
            BackingWriter::Memory(buffer) => {
                buffer.extend_from_slice(buf);
                Ok(buf.len())
            }
            BackingWriter::Stream(writer) => writer.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            BackingWriter::File(writer) => writer.flush(),
            BackingWriter::Memory(_) => Ok(()),
            BackingWriter::Stream(writer) => writer.flush(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Yields at most `chunk` bytes per read, like a pipe.
    struct Trickle {
        data: Vec<u8>,
        pos: usize,
        chunk: usize,
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.chunk.min(buf.len()).min(self.data.len() - self.pos);
            buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    #[test]
    fn test_memory_reader_never_wraps() {
        let mut reader = MemoryReader::new(Arc::new(b"abcdef".to_vec()));
        let mut buf = [0u8; 4];
        assert_eq!(reader.read(&mut buf).unwrap(), 4);
        assert_eq!(&buf, b"abcd");
        assert_eq!(reader.read(&mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], b"ef");
        assert_eq!(reader.read(&mut buf).unwrap(), 0);
        assert_eq!(reader.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_stream_replay() {
        let spool = StreamSpool::new(Box::new(Trickle {
            data: b"0123456789".to_vec(),
            pos: 0,
            chunk: 3,
        }));

        let mut first = spool.replay();
        let mut buf = [0u8; 5];
        let n = first.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"012");
        assert_eq!(spool.consumed_len(), 3);
        drop(first);

        let mut second = spool.replay();
        let mut all = Vec::new();
        second.read_to_end(&mut all).unwrap();
        assert_eq!(all, b"0123456789");
        assert_eq!(spool.consumed_len(), 10);
    }

    #[test]
    fn test_sniff_restarts() {
        let backing = Backing::Memory(Arc::new(vec![0x1F, 0x8B, 8, 0, 1, 2, 3, 4]));
        let mut reader = backing.reader().unwrap();
        assert_eq!(reader.sniff().unwrap(), vec![0x1F, 0x8B, 8, 0, 1, 2]);
        let mut all = Vec::new();
        reader.read_to_end(&mut all).unwrap();
        assert_eq!(all.len(), 8);
    }

    #[test]
    fn test_sniff_short_stream() {
        let backing = Backing::Stream(StreamSpool::new(Box::new(Trickle {
            data: vec![1, 2, 3, 4, 5, 6, 7],
            pos: 0,
            chunk: 1,
        })));
        let mut reader = backing.reader().unwrap();
        assert_eq!(reader.sniff().unwrap(), vec![1, 2, 3, 4, 5, 6]);
        let mut all = Vec::new();
        reader.read_to_end(&mut all).unwrap();
        assert_eq!(all, vec![1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn test_sink_has_no_reader() {
        assert!(Backing::Sink.reader().is_err());
        assert_eq!(Backing::Sink.kind(), "sink");
    }

    #[test]
    fn test_memory_writer_returns_buffer() {
        let mut writer = BackingWriter::Memory(Vec::new());
        writer.write_all(b"abc").unwrap();
        writer.write_all(b"def").unwrap();
        assert_eq!(writer.finish().unwrap(), Some(b"abcdef".to_vec()));
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.tar");
        let mut writer = BackingWriter::create_file(&path, 1024).unwrap();
        writer.write_all(b"payload").unwrap();
        assert_eq!(writer.finish().unwrap(), None);

        let backing = Backing::File(path.clone());
        assert_eq!(backing.path(), Some(path.as_path()));
        let mut reader = backing.reader().unwrap();
        let mut all = String::new();
        reader.read_to_string(&mut all).unwrap();
        assert_eq!(all, "payload");
    }
}
