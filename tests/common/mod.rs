//! Shared test utilities for integration tests.
//!
//! Note: `#![allow(dead_code)]` is required because each integration test file
//! compiles as a separate crate and may only use a subset of these helpers.

#![allow(dead_code)]

use std::fs;
use std::path::Path;

use tarsmith::{AddOptions, CompressionMethod, CreateOptions, Dialect, Entry, TarArchive, Timestamp};

/// Fixed modification time used by the helpers, so archives are reproducible.
pub const FIXED_MTIME: i64 = 1_700_000_000;

/// Options with a pinned mtime and root ownership.
pub fn fixed_options() -> AddOptions {
    AddOptions::new()
        .modified(Timestamp::from_unix_secs(FIXED_MTIME))
        .owner(0, 0)
}

/// Builds an in-memory archive holding `entries` as regular files.
pub fn build_archive(options: &CreateOptions, entries: &[(&str, &[u8])]) -> tarsmith::Result<Vec<u8>> {
    let mut archive = TarArchive::in_memory(options)?;
    for (name, data) in entries {
        archive.add(name, data, &fixed_options())?;
    }
    archive.into_data()
}

/// Builds an uncompressed pax archive holding `entries`.
pub fn build_plain(entries: &[(&str, &[u8])]) -> Vec<u8> {
    build_archive(&CreateOptions::default(), entries).unwrap()
}

/// Builds an archive with a directory, files, a symlink and a hardlink.
pub fn build_mixed(method: CompressionMethod, dialect: Dialect) -> tarsmith::Result<Vec<u8>> {
    let options = CreateOptions::new().compression(method).dialect(dialect);
    let mut archive = TarArchive::in_memory(&options)?;
    let add = fixed_options();
    archive.add_directory("docs", &add.clone().mode(0o750))?;
    archive.add("docs/readme.txt", b"read me first\n", &add)?;
    archive.add("docs/empty.txt", b"", &add)?;
    archive.add_symlink("docs/latest", "readme.txt", &add)?;
    archive.add_hardlink("docs/copy.txt", "docs/readme.txt", &add)?;
    archive.add("bin/run.sh", b"#!/bin/sh\necho hi\n", &add.clone().mode(0o755))?;
    archive.into_data()
}

/// `(name, type, size)` for every entry, in archive order.
pub fn summarize(entries: &[Entry]) -> Vec<(String, String, u64)> {
    entries
        .iter()
        .map(|e| (e.name.clone(), e.entry_type.to_string(), e.size))
        .collect()
}

/// Names of every entry, in archive order.
pub fn entry_names(archive: &mut TarArchive) -> Vec<String> {
    archive
        .entries()
        .unwrap()
        .into_iter()
        .map(|e| e.name)
        .collect()
}

/// Writes `content` to `root/relative`, creating parent directories.
pub fn write_file(root: &Path, relative: &str, content: &[u8]) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

/// Every compression method compiled into this build.
pub fn supported_methods() -> Vec<CompressionMethod> {
    CompressionMethod::ALL
        .iter()
        .copied()
        .filter(|m| m.is_supported())
        .collect()
}

/// Expanded size of the sparse fixtures (3 MiB).
pub const SPARSE_REAL_SIZE: u64 = 3 * 1024 * 1024;

/// Offset of the only data run in the sparse fixtures (2 MiB).
pub const SPARSE_DATA_OFFSET: u64 = 2 * 1024 * 1024;

/// Ways GNU tar stores a sparse file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SparseFormat {
    /// Old GNU `S` header with an inline segment table.
    OldGnu,
    /// pax, repeated `GNU.sparse.offset`/`numbytes` records.
    Pax0_0,
    /// pax, one `GNU.sparse.map` record.
    Pax0_1,
    /// pax, segment map in front of the data (`tar --format=pax -S`).
    Pax1_0,
}

impl SparseFormat {
    pub const ALL: [SparseFormat; 4] = [Self::OldGnu, Self::Pax0_0, Self::Pax0_1, Self::Pax1_0];
}

/// The data run stored for `sparse.bin`: `DATA` padded to 4 KiB.
pub fn sparse_run() -> Vec<u8> {
    let mut run = b"DATA".to_vec();
    run.resize(4096, 0);
    run
}

/// Builds a plain archive holding `sparse.bin`, a 3 MiB file whose only data
/// is [`sparse_run`] at 2 MiB, followed by a regular `after.txt`.
///
/// pax variants use GNU tar's `GNUSparseFile.<pid>` placeholder as header
/// name; `record_name` adds the `GNU.sparse.name` record holding the real one.
pub fn build_sparse(format: SparseFormat, record_name: bool) -> Vec<u8> {
    let run = sparse_run();
    let offset = SPARSE_DATA_OFFSET.to_string();
    let real_size = SPARSE_REAL_SIZE.to_string();
    let len = run.len().to_string();

    let mut records: Vec<(&str, Vec<u8>)> = Vec::new();
    let mut stored = Vec::new();
    match format {
        SparseFormat::OldGnu => {}
        SparseFormat::Pax0_0 => {
            records.push(("GNU.sparse.size", real_size.clone().into_bytes()));
            records.push(("GNU.sparse.numblocks", b"1".to_vec()));
            records.push(("GNU.sparse.offset", offset.clone().into_bytes()));
            records.push(("GNU.sparse.numbytes", len.clone().into_bytes()));
        }
        SparseFormat::Pax0_1 => {
            records.push(("GNU.sparse.major", b"0".to_vec()));
            records.push(("GNU.sparse.minor", b"1".to_vec()));
            records.push(("GNU.sparse.size", real_size.clone().into_bytes()));
            records.push(("GNU.sparse.numblocks", b"1".to_vec()));
            records.push(("GNU.sparse.map", format!("{},{}", offset, len).into_bytes()));
        }
        SparseFormat::Pax1_0 => {
            records.push(("GNU.sparse.major", b"1".to_vec()));
            records.push(("GNU.sparse.minor", b"0".to_vec()));
            records.push(("GNU.sparse.realsize", real_size.clone().into_bytes()));
            stored = format!("2\n{}\n{}\n{}\n0\n", offset, len, real_size).into_bytes();
            stored.resize(512, 0);
        }
    }
    if record_name && format != SparseFormat::OldGnu {
        records.push(("GNU.sparse.name", b"sparse.bin".to_vec()));
    }
    stored.extend_from_slice(&run);

    let mut builder = tar::Builder::new(Vec::new());
    builder
        .append_pax_extensions(records.iter().map(|(key, value)| (*key, value.as_slice())))
        .unwrap();

    let mut header = if format == SparseFormat::OldGnu {
        let mut header = tar::Header::new_gnu();
        header.set_path("sparse.bin").unwrap();
        header.set_entry_type(tar::EntryType::GNUSparse);
        let gnu = header.as_gnu_mut().unwrap();
        gnu.sparse[0].set_offset(SPARSE_DATA_OFFSET);
        gnu.sparse[0].set_length(run.len() as u64);
        // zero-length marker closing the map at the real size
        gnu.sparse[1].set_offset(SPARSE_REAL_SIZE);
        gnu.sparse[1].set_length(0);
        gnu.set_real_size(SPARSE_REAL_SIZE);
        header
    } else {
        let mut header = tar::Header::new_ustar();
        header.set_path("./GNUSparseFile.4301/sparse.bin").unwrap();
        header.set_entry_type(tar::EntryType::Regular);
        header
    };
    header.set_size(stored.len() as u64);
    header.set_mode(0o640);
    header.set_mtime(FIXED_MTIME as u64);
    header.set_cksum();
    builder.append(&header, stored.as_slice()).unwrap();

    let mut after = tar::Header::new_ustar();
    after.set_path("after.txt").unwrap();
    after.set_size(6);
    after.set_mode(0o644);
    after.set_mtime(FIXED_MTIME as u64);
    after.set_entry_type(tar::EntryType::Regular);
    after.set_cksum();
    builder.append(&after, &b"after\n"[..]).unwrap();
    builder.into_inner().unwrap()
}

/// Checks that `data` is the expanded `sparse.bin`.
pub fn assert_sparse_contents(data: &[u8]) {
    assert_eq!(data.len() as u64, SPARSE_REAL_SIZE);
    let start = SPARSE_DATA_OFFSET as usize;
    let run = sparse_run();
    assert_eq!(&data[start..start + run.len()], run.as_slice());
    assert!(data[..start].iter().all(|&b| b == 0));
    assert!(data[start + run.len()..].iter().all(|&b| b == 0));
}
