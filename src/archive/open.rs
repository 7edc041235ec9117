//! Session constructors.

use std::io::{Read, Write};
use std::path::Path;
use std::sync::Arc;

use super::{AccessMode, SessionState, TarArchive};
use crate::backing::{Backing, BackingWriter, StreamSpool};
use crate::codec::{self, CompressionMethod};
use crate::config::ArchiveConfig;
use crate::format::Dialect;
use crate::read::{self, ReadCoder};
use crate::write::{CreateOptions, WriteCoder};
use crate::{Error, Result};

impl TarArchive {
    /// Opens an archive file for reading.
    ///
    /// Compression is detected from the data, not the file name. The first
    /// header is read right away, so a damaged or non-TAR file fails here
    /// rather than on first use.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use tarsmith::TarArchive;
    ///
    /// let mut archive = TarArchive::open_path("backup.tar.gz")?;
    /// for entry in archive.entries()? {
    ///     println!("{} {} bytes", entry.name, entry.size);
    /// }
    /// # Ok::<(), tarsmith::Error>(())
    /// ```
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_path_with_config(path, ArchiveConfig::default())
    }

    /// Opens an archive file for reading with a custom configuration.
    pub fn open_path_with_config(path: impl AsRef<Path>, config: ArchiveConfig) -> Result<Self> {
        Self::open_read(Backing::File(path.as_ref().to_path_buf()), config)
    }

    /// Opens archive bytes for reading.
    pub fn from_bytes(data: impl Into<Vec<u8>>) -> Result<Self> {
        Self::from_bytes_with_config(data, ArchiveConfig::default())
    }

    /// Opens archive bytes for reading with a custom configuration.
    pub fn from_bytes_with_config(data: impl Into<Vec<u8>>, config: ArchiveConfig) -> Result<Self> {
        Self::open_read(Backing::Memory(Arc::new(data.into())), config)
    }

    /// Opens a caller stream for reading.
    ///
    /// Bytes are pulled on demand. Because every query restarts from the
    /// beginning, everything pulled so far stays buffered in memory for the
    /// life of the session.
    pub fn from_reader<R: Read + Send + 'static>(reader: R) -> Result<Self> {
        Self::from_reader_with_config(reader, ArchiveConfig::default())
    }

    /// Opens a caller stream for reading with a custom configuration.
    pub fn from_reader_with_config<R: Read + Send + 'static>(reader: R, config: ArchiveConfig) -> Result<Self> {
        Self::open_read(Backing::Stream(StreamSpool::new(Box::new(reader))), config)
    }

    /// Creates (or truncates) an archive file for writing.
    ///
    /// Without an explicit [`CreateOptions::compression`] the method is
    /// guessed from the file name (`.tar.gz`, `.tgz`, `.tar.zst`, ...).
    pub fn create_path(path: impl AsRef<Path>, options: &CreateOptions) -> Result<Self> {
        let path = path.as_ref();
        let method = options
            .compression
            .unwrap_or_else(|| CompressionMethod::from_path(path));
        Self::create_file(path, method, options, AccessMode::Write)
    }

    /// Starts a new archive in memory. Retrieve it with
    /// [`to_data`](Self::to_data) or [`into_data`](Self::into_data).
    pub fn in_memory(options: &CreateOptions) -> Result<Self> {
        Self::open_write(
            Backing::Memory(Arc::new(Vec::new())),
            BackingWriter::Memory(Vec::new()),
            options.compression.unwrap_or_default(),
            options,
            AccessMode::Write,
        )
    }

    /// Writes a new archive to a caller stream. The stream receives the
    /// end-of-archive marker when the session is closed.
    pub fn to_writer<W: Write + Send + 'static>(writer: W, options: &CreateOptions) -> Result<Self> {
        Self::open_write(
            Backing::Sink,
            BackingWriter::Stream(Box::new(writer)),
            options.compression.unwrap_or_default(),
            options,
            AccessMode::Write,
        )
    }

    /// Opens an archive file in the given mode.
    ///
    /// Read sessions use only `options.config`.
    pub fn open_file(path: impl AsRef<Path>, mode: AccessMode, options: &CreateOptions) -> Result<Self> {
        match mode {
            AccessMode::Read => Self::open_path_with_config(path, options.config.clone()),
            AccessMode::Write => Self::create_path(path, options),
            AccessMode::Append => Self::append_path(path, options),
        }
    }

    fn open_read(backing: Backing, config: ArchiveConfig) -> Result<Self> {
        let stream = read::open_read_stream(&backing, &config)?;
        let compression = stream.method();
        let mut coder = tar::Archive::new(stream);
        let dialect = peek_first_header(&mut coder)?.unwrap_or_default();
        log::debug!(
            "Opened {} archive for reading ({} compression, {} headers)",
            backing.kind(),
            compression,
            dialect
        );
        Ok(Self {
            backing,
            state: SessionState::Read,
            mode: AccessMode::Read,
            compression,
            dialect,
            config,
            reader: Some(coder),
            writer: None,
        })
    }

    pub(crate) fn create_file(
        path: &Path,
        method: CompressionMethod,
        options: &CreateOptions,
        mode: AccessMode,
    ) -> Result<Self> {
        // refuse before truncating anything
        if !method.is_supported() {
            return Err(method.unsupported());
        }
        let writer = BackingWriter::create_file(path, options.config.transfer_buffer_size())
            .map_err(|e| Error::provider(format!("failed to create '{}'", path.display()), e))?;
        Self::open_write(Backing::File(path.to_path_buf()), writer, method, options, mode)
    }

    pub(crate) fn open_write(
        backing: Backing,
        writer: BackingWriter,
        method: CompressionMethod,
        options: &CreateOptions,
        mode: AccessMode,
    ) -> Result<Self> {
        let level = options.level.map(codec::validate_level).transpose()?;
        if level.is_some() && method == CompressionMethod::None {
            log::debug!("Ignoring compression level for uncompressed archive");
        }
        let coder = WriteCoder::open(writer, method, level, options.dialect, options.config.encoding)?;
        log::debug!(
            "Opened {} archive for writing ({} compression, {} headers)",
            backing.kind(),
            method,
            options.dialect
        );
        Ok(Self {
            backing,
            state: SessionState::Write,
            mode,
            compression: method,
            dialect: options.dialect,
            config: options.config.clone(),
            reader: None,
            writer: Some(coder),
        })
    }
}

/// Reads the first header, failing on anything that is not a TAR stream.
///
/// Returns the dialect the first entry was written with, or `None` for an
/// empty archive.
fn peek_first_header(coder: &mut ReadCoder) -> Result<Option<Dialect>> {
    let mut entries = coder
        .entries()
        .map_err(|e| Error::provider("failed to open archive for reading", e))?;
    let Some(first) = entries.next() else {
        return Ok(None);
    };
    let mut first = first.map_err(|e| Error::provider("failed to read archive header", e))?;
    let has_pax = first
        .pax_extensions()
        .map_err(|e| Error::provider("failed to read archive header", e))?
        .is_some();
    let header = first.header();
    let dialect = if has_pax || header.entry_type() == tar::EntryType::XGlobalHeader {
        Dialect::Pax
    } else if header.as_ustar().is_some() {
        Dialect::Ustar
    } else if header.as_gnu().is_some() {
        Dialect::Gnu
    } else {
        Dialect::V7
    };
    Ok(Some(dialect))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AddOptions;

    fn archive_with(dialect: Dialect) -> Vec<u8> {
        let mut archive = TarArchive::in_memory(&CreateOptions::new().dialect(dialect)).unwrap();
        archive.add("x", b"x", &AddOptions::default()).unwrap();
        archive.into_data().unwrap()
    }

    #[test]
    fn test_empty_input_is_empty_archive() {
        let mut archive = TarArchive::from_bytes(Vec::new()).unwrap();
        assert_eq!(archive.count().unwrap(), 0);
        assert_eq!(archive.compression(), CompressionMethod::None);

        let mut archive = TarArchive::from_bytes(vec![0u8; 1024]).unwrap();
        assert_eq!(archive.count().unwrap(), 0);
    }

    #[test]
    fn test_garbage_fails_fast() {
        let garbage: Vec<u8> = (0..1024u32).map(|i| (i * 7 + 3) as u8).collect();
        let err = TarArchive::from_bytes(garbage).unwrap_err();
        assert!(matches!(err, Error::Provider { .. }));

        let err = TarArchive::from_bytes(b"short".to_vec()).unwrap_err();
        assert!(matches!(err, Error::Provider { .. }));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = TarArchive::open_path(dir.path().join("nope.tar")).unwrap_err();
        match err {
            Error::Provider { source, .. } => assert_eq!(source.kind(), std::io::ErrorKind::NotFound),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_detects_dialect() {
        for dialect in [Dialect::Ustar, Dialect::Gnu, Dialect::V7] {
            let archive = TarArchive::from_bytes(archive_with(dialect)).unwrap();
            assert_eq!(archive.dialect(), dialect);
        }
    }

    #[test]
    fn test_compression_from_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.tar.gz");
        let mut archive = TarArchive::create_path(&path, &CreateOptions::default()).unwrap();
        assert_eq!(archive.compression(), CompressionMethod::Gzip);
        archive.close().unwrap();

        let reopened = TarArchive::open_path(&path).unwrap();
        assert_eq!(reopened.compression(), CompressionMethod::Gzip);
        assert_eq!(reopened.path(), Some(path.as_path()));
    }

    #[test]
    fn test_explicit_compression_wins() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.tar.gz");
        let options = CreateOptions::new().compression(CompressionMethod::None);
        let archive = TarArchive::create_path(&path, &options).unwrap();
        assert_eq!(archive.compression(), CompressionMethod::None);
    }

    #[test]
    fn test_invalid_level_field() {
        let options = CreateOptions {
            level: Some(12),
            ..CreateOptions::default()
        };
        assert!(matches!(
            TarArchive::in_memory(&options),
            Err(Error::InvalidCompressionLevel { level: 12 })
        ));
    }

    #[test]
    fn test_open_file_dispatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("d.tar");
        let options = CreateOptions::default();

        let mut archive = TarArchive::open_file(&path, AccessMode::Write, &options).unwrap();
        assert_eq!(archive.mode(), AccessMode::Write);
        archive.add("one", b"1", &AddOptions::default()).unwrap();
        archive.close().unwrap();

        let mut archive = TarArchive::open_file(&path, AccessMode::Append, &options).unwrap();
        assert_eq!(archive.mode(), AccessMode::Append);
        archive.add("two", b"2", &AddOptions::default()).unwrap();
        archive.close().unwrap();

        let mut archive = TarArchive::open_file(&path, AccessMode::Read, &options).unwrap();
        assert_eq!(archive.count().unwrap(), 2);
    }

    #[test]
    fn test_stream_backed_read_and_write() {
        let mut out = Vec::new();
        {
            let shared = SharedBuf::default();
            let mut archive = TarArchive::to_writer(shared.clone(), &CreateOptions::default()).unwrap();
            archive.add("s.txt", b"streamed", &AddOptions::default()).unwrap();
            assert!(matches!(archive.entries(), Err(Error::WrongMode { .. })));
            archive.close().unwrap();
            out.extend_from_slice(&shared.0.lock().unwrap());
        }

        let mut archive = TarArchive::from_reader(std::io::Cursor::new(out)).unwrap();
        assert_eq!(archive.read("s.txt").unwrap(), b"streamed");
        // queries replay the consumed prefix
        assert_eq!(archive.count().unwrap(), 1);
        assert!(matches!(archive.to_data(), Err(Error::NotInMemory)));
    }

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<std::sync::Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}
