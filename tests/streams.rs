//! Caller-supplied streams and per-entry input/output streams.

mod common;

use std::io::{self, Cursor, Read, Write};
use std::sync::{Arc, Mutex};

use common::{build_mixed, build_plain, fixed_options};
use tarsmith::{AddOptions, CompressionMethod, CreateOptions, Dialect, Error, ErrorCode, TarArchive};

/// A `Write` whose bytes stay reachable after the session takes ownership.
#[derive(Clone, Default)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    fn contents(&self) -> Vec<u8> {
        self.0.lock().unwrap().clone()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A reader that hands out at most `chunk` bytes per call.
struct Trickle {
    data: Cursor<Vec<u8>>,
    chunk: usize,
}

impl Read for Trickle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = buf.len().min(self.chunk);
        self.data.read(&mut buf[..n])
    }
}

#[test]
fn test_write_to_caller_stream() {
    let sink = SharedBuf::default();
    let options = CreateOptions::new().compression(CompressionMethod::Gzip);
    let mut archive = TarArchive::to_writer(sink.clone(), &options).unwrap();
    archive.add("a.txt", b"streamed", &fixed_options()).unwrap();
    assert!(matches!(archive.to_data(), Err(Error::NotInMemory)));
    archive.close().unwrap();

    let mut reader = TarArchive::from_bytes(sink.contents()).unwrap();
    assert_eq!(reader.compression(), CompressionMethod::Gzip);
    assert_eq!(reader.read("a.txt").unwrap(), b"streamed");
}

#[test]
fn test_read_from_caller_stream_repeatedly() {
    let data = build_mixed(CompressionMethod::Zstd, Dialect::Gnu).unwrap();
    let trickle = Trickle {
        data: Cursor::new(data),
        chunk: 7,
    };
    let mut archive = TarArchive::from_reader(trickle).unwrap();
    assert_eq!(archive.compression(), CompressionMethod::Zstd);
    assert_eq!(archive.path(), None);
    // every query restarts from the first entry
    assert_eq!(archive.read("bin/run.sh").unwrap(), b"#!/bin/sh\necho hi\n");
    assert_eq!(archive.read("docs/readme.txt").unwrap(), b"read me first\n");
    assert_eq!(archive.count().unwrap(), 6);
    assert_eq!(archive.count().unwrap(), 6);
}

#[test]
fn test_input_stream_reads_incrementally() {
    let payload: Vec<u8> = (0..=255u8).cycle().take(10_000).collect();
    let data = common::build_archive(
        &CreateOptions::default(),
        &[("first", &b"1"[..]), ("big.bin", payload.as_slice())],
    )
    .unwrap();
    let mut archive = TarArchive::from_bytes(data).unwrap();

    let mut stream = archive.open_input_stream("big.bin").unwrap();
    assert_eq!(stream.size(), 10_000);
    assert_eq!(stream.entry().name, "big.bin");
    assert_eq!(stream.peek().unwrap(), Some(0));
    assert_eq!(stream.position(), 0);

    let mut head = [0u8; 100];
    let mut filled = 0;
    while filled < head.len() {
        filled += stream.read(&mut head[filled..]).unwrap();
    }
    assert_eq!(&head[..], &payload[..100]);
    assert_eq!(stream.position(), 100);

    let mut rest = Vec::new();
    stream.read_to_end(&mut rest).unwrap();
    assert_eq!(rest, &payload[100..]);
    assert_eq!(stream.peek().unwrap(), None);
    assert_eq!(stream.read(&mut head).unwrap(), 0);

    stream.close().unwrap();
    assert!(!stream.is_open());
    let err = stream.read(&mut head).unwrap_err();
    assert_eq!(err.code(), ErrorCode::StreamClosed);
    assert!(matches!(stream.close(), Err(Error::StreamClosed)));
    drop(stream);

    // the session is usable again once the stream is gone
    assert_eq!(archive.read("first").unwrap(), b"1");
}

#[test]
fn test_input_stream_missing_entry() {
    let mut archive = TarArchive::from_bytes(build_plain(&[("a", &b"a"[..])])).unwrap();
    let err = archive.open_input_stream("b").unwrap_err();
    assert!(matches!(err, Error::EntryNotFound { ref name } if name == "b"));
}

#[test]
fn test_output_stream_into_compressed_archive() {
    let options = CreateOptions::new().compression(CompressionMethod::Bzip2);
    let mut archive = TarArchive::in_memory(&options).unwrap();
    archive.add("before", b"b", &fixed_options()).unwrap();
    {
        let mut stream = archive
            .open_output_stream("log.txt", &fixed_options().mode(0o640))
            .unwrap();
        for i in 0..100 {
            writeln!(stream, "line {}", i).unwrap();
        }
        stream.close().unwrap();
    }
    archive.add("after", b"a", &fixed_options()).unwrap();

    let mut reader = TarArchive::from_bytes(archive.into_data().unwrap()).unwrap();
    assert_eq!(common::entry_names(&mut reader), ["before", "log.txt", "after"]);
    let text = reader.read_text("log.txt").unwrap();
    assert_eq!(text.lines().count(), 100);
    assert!(text.ends_with("line 99\n"));
    assert_eq!(reader.entry("log.txt").unwrap().unwrap().mode, 0o640);
}

#[test]
fn test_output_stream_needs_write_session() {
    let mut archive = TarArchive::from_bytes(build_plain(&[("a", &b"a"[..])])).unwrap();
    assert!(matches!(
        archive.open_output_stream("x", &AddOptions::default()),
        Err(Error::WrongMode { .. })
    ));

    let mut writer = TarArchive::in_memory(&CreateOptions::default()).unwrap();
    assert!(matches!(writer.open_input_stream("x"), Err(Error::WrongMode { .. })));
}
