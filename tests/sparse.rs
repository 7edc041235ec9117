//! Sparse files: old GNU headers and the three pax record formats.

mod common;

use std::fs;
use std::io::Read;

use common::{SPARSE_REAL_SIZE, SparseFormat, assert_sparse_contents, build_sparse, summarize};
use tarsmith::{ExtractOptions, TarArchive};

#[test]
fn test_entries_report_real_name_and_size() {
    for format in SparseFormat::ALL {
        let mut archive = TarArchive::from_bytes(build_sparse(format, true)).unwrap();
        let entries = archive.entries().unwrap();
        assert_eq!(
            summarize(&entries),
            [
                ("sparse.bin".to_string(), "file".to_string(), SPARSE_REAL_SIZE),
                ("after.txt".to_string(), "file".to_string(), 6),
            ],
            "{:?}",
            format
        );
        assert_eq!(entries[0].mode, 0o640);
        assert!(archive.has_entry("sparse.bin").unwrap());
    }
}

#[test]
fn test_placeholder_name_without_name_record() {
    for format in [SparseFormat::Pax0_0, SparseFormat::Pax0_1, SparseFormat::Pax1_0] {
        let mut archive = TarArchive::from_bytes(build_sparse(format, false)).unwrap();
        assert_eq!(common::entry_names(&mut archive), ["sparse.bin", "after.txt"], "{:?}", format);
    }
}

#[test]
fn test_read_expands_holes() {
    for format in SparseFormat::ALL {
        let mut archive = TarArchive::from_bytes(build_sparse(format, true)).unwrap();
        assert_sparse_contents(&archive.read("sparse.bin").unwrap());
        // the entry after the sparse one is still where it should be
        assert_eq!(archive.read("after.txt").unwrap(), b"after\n");
    }
}

#[test]
fn test_input_stream_expands_holes() {
    let mut archive = TarArchive::from_bytes(build_sparse(SparseFormat::Pax1_0, true)).unwrap();
    let mut stream = archive.open_input_stream("sparse.bin").unwrap();
    assert_eq!(stream.size(), SPARSE_REAL_SIZE);
    // the map in front of the data is not part of the file
    assert_eq!(stream.peek().unwrap(), Some(0));
    let mut data = Vec::new();
    stream.read_to_end(&mut data).unwrap();
    assert_sparse_contents(&data);
    assert_eq!(stream.position(), SPARSE_REAL_SIZE);
}

#[test]
fn test_extract_to_expands_holes() {
    let dir = tempfile::tempdir().unwrap();
    let mut archive = TarArchive::from_bytes(build_sparse(SparseFormat::Pax0_1, true)).unwrap();
    let dest = dir.path().join("copy.bin");
    archive.extract_to("sparse.bin", &dest).unwrap();
    assert_sparse_contents(&fs::read(&dest).unwrap());
}

#[test]
fn test_extract_all_restores_sparse_files() {
    for format in SparseFormat::ALL {
        let dir = tempfile::tempdir().unwrap();
        let mut archive = TarArchive::from_bytes(build_sparse(format, true)).unwrap();
        archive.extract_all(dir.path(), &ExtractOptions::default()).unwrap();

        let path = dir.path().join("sparse.bin");
        assert_sparse_contents(&fs::read(&path).unwrap());
        assert_eq!(fs::read(dir.path().join("after.txt")).unwrap(), b"after\n");
        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names.len(), 2, "{:?}: {:?}", format, names);

        #[cfg(unix)]
        {
            use std::os::unix::fs::{MetadataExt, PermissionsExt};

            let metadata = fs::metadata(&path).unwrap();
            assert_eq!(metadata.permissions().mode() & 0o777, 0o640);
            // holes are skipped, not written as zeros
            assert!(metadata.blocks() * 512 < SPARSE_REAL_SIZE, "{:?}", format);
        }
    }
}

#[test]
fn test_truncated_sparse_map_fails() {
    let mut data = build_sparse(SparseFormat::Pax1_0, true);
    // corrupt the segment count at the start of the sparse payload
    let at = data
        .windows(3)
        .position(|w| w == b"2\n2")
        .unwrap();
    data[at] = b'x';
    let mut archive = TarArchive::from_bytes(data).unwrap();
    assert!(archive.read("sparse.bin").is_err());
    assert!(archive.entries().is_ok());
}
