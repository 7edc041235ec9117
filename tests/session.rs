//! Session lifecycle: mode checks, closing, and in-memory buffers.

mod common;

use common::{build_plain, fixed_options};
use tarsmith::{AccessMode, ArchiveConfig, CompressionMethod, CreateOptions, Error, ErrorCode, TarArchive};

#[test]
fn test_read_session_rejects_writes() {
    let mut archive = TarArchive::from_bytes(build_plain(&[("a", &b"a"[..])])).unwrap();
    assert_eq!(archive.mode(), AccessMode::Read);
    let err = archive.add("b", b"b", &fixed_options()).unwrap_err();
    assert!(matches!(err, Error::WrongMode { expected: "writing" }));
    assert!(err.is_usage_error());
    assert_eq!(err.code(), ErrorCode::Tar);
    assert!(archive.add_directory("d", &fixed_options()).is_err());
}

#[test]
fn test_write_session_rejects_reads() {
    let mut archive = TarArchive::in_memory(&CreateOptions::default()).unwrap();
    assert_eq!(archive.mode(), AccessMode::Write);
    archive.add("a", b"a", &fixed_options()).unwrap();
    assert!(matches!(archive.entries(), Err(Error::WrongMode { expected: "reading" })));
    assert!(matches!(archive.has_entry("a"), Err(Error::WrongMode { .. })));
}

#[test]
fn test_close_is_idempotent() {
    let mut archive = TarArchive::from_bytes(build_plain(&[("a", &b"a"[..])])).unwrap();
    assert!(archive.is_open());
    archive.close().unwrap();
    archive.close().unwrap();
    assert!(!archive.is_open());
    assert!(matches!(archive.entries(), Err(Error::Closed)));
    assert!(matches!(archive.read("a"), Err(Error::Closed)));
    assert!(matches!(archive.to_data(), Err(Error::Closed)));
}

#[test]
fn test_to_data_finalizes_write_session() {
    let mut archive = TarArchive::in_memory(&CreateOptions::default()).unwrap();
    archive.add("a", b"alpha", &fixed_options()).unwrap();
    let first = archive.to_data().unwrap();
    // finalized: the buffer holds the end-of-archive marker
    assert_eq!(first.len() % 512, 0);
    assert!(first.ends_with(&[0u8; 1024]));

    // the session turned read-only
    assert!(matches!(archive.add("b", b"", &fixed_options()), Err(Error::WrongMode { .. })));
    assert_eq!(archive.read("a").unwrap(), b"alpha");
    assert_eq!(archive.to_data().unwrap(), first);
    assert_eq!(archive.into_data().unwrap(), first);
}

#[test]
fn test_closed_memory_session_keeps_no_data() {
    let mut archive = TarArchive::in_memory(&CreateOptions::default()).unwrap();
    archive.add("a", b"a", &fixed_options()).unwrap();
    archive.close().unwrap();
    assert!(matches!(archive.into_data(), Err(Error::Closed)));
}

#[test]
fn test_file_sessions_are_not_in_memory() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("f.tar");
    let mut writer = TarArchive::create_path(&path, &CreateOptions::default()).unwrap();
    assert!(matches!(writer.to_data(), Err(Error::NotInMemory)));
    writer.add("a", b"a", &fixed_options()).unwrap();
    drop(writer);

    // dropping closes and finishes the file
    let mut reader = TarArchive::open_path(&path).unwrap();
    assert_eq!(reader.count().unwrap(), 1);
    assert!(matches!(reader.into_data(), Err(Error::NotInMemory)));
}

#[test]
fn test_open_rejects_bad_input() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        TarArchive::open_path(dir.path().join("missing.tar")),
        Err(Error::Io(_)) | Err(Error::Provider { .. })
    ));

    let garbage = vec![0x5Au8; 2048];
    let err = TarArchive::from_bytes(garbage).unwrap_err();
    assert_eq!(err.code(), ErrorCode::Tar);

    // a gzip magic with a broken body fails on open, not on first query
    let mut broken = vec![0x1F, 0x8B, 0x08, 0x00];
    broken.extend_from_slice(&[0xFF; 64]);
    assert!(TarArchive::from_bytes(broken).is_err());
}

#[test]
fn test_empty_archives() {
    let mut empty = TarArchive::from_bytes(Vec::new()).unwrap();
    assert_eq!(empty.count().unwrap(), 0);

    let mut writer = TarArchive::in_memory(&CreateOptions::new().compression(CompressionMethod::Xz)).unwrap();
    let data = writer.to_data().unwrap();
    let mut reader = TarArchive::from_bytes(data).unwrap();
    assert_eq!(reader.compression(), CompressionMethod::Xz);
    assert!(reader.entries().unwrap().is_empty());
}

#[test]
fn test_create_path_unsupported_method_keeps_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("keep.tar");
    std::fs::write(&path, b"precious").unwrap();
    let method: CompressionMethod = "lz4".parse().unwrap();
    if method.is_supported() {
        return;
    }
    let options = CreateOptions::new().compression(method);
    assert!(matches!(
        TarArchive::create_path(&path, &options),
        Err(Error::UnsupportedCompression { .. })
    ));
    assert_eq!(std::fs::read(&path).unwrap(), b"precious");
}

#[test]
fn test_zero_buffer_size_in_literal_config() {
    let config = ArchiveConfig {
        buffer_size: 0,
        ..ArchiveConfig::default()
    };
    for method in common::supported_methods() {
        let options = CreateOptions::new().compression(method).config(config.clone());
        let data = common::build_archive(&options, &[("a.txt", &b"tiny buffers"[..])]).unwrap();

        let mut archive = TarArchive::from_bytes_with_config(data, config.clone()).unwrap();
        assert_eq!(archive.compression(), method);
        assert_eq!(archive.read("a.txt").unwrap(), b"tiny buffers", "{}", method);

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("a.txt");
        archive.extract_to("a.txt", &dest).unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"tiny buffers");
    }
}
