//! Property-based tests using proptest.
//!
//! These tests check invariants of the path safety gate and of
//! write-then-read round trips using randomly generated inputs.

mod common;

use proptest::prelude::*;
use tarsmith::{CompressionMethod, CreateOptions, Dialect, TarArchive, is_path_safe};

/// Strategy for relative paths made of ordinary components.
///
/// - 1-4 components separated by '/'
/// - each component starts with an alphanumeric character, so none is `.`
///   or `..` and none looks like a drive letter
fn safe_path_strategy() -> impl Strategy<Value = String> {
    proptest::collection::vec("[a-zA-Z0-9][a-zA-Z0-9_.-]{0,9}", 1..5)
        .prop_map(|parts| parts.join("/"))
}

fn dialect_strategy() -> impl Strategy<Value = Dialect> {
    prop_oneof![
        Just(Dialect::Ustar),
        Just(Dialect::Pax),
        Just(Dialect::Gnu),
        Just(Dialect::V7),
    ]
}

fn method_strategy() -> impl Strategy<Value = CompressionMethod> {
    proptest::sample::select(common::supported_methods())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Ordinary relative paths pass the gate.
    #[test]
    fn safe_paths_accepted(path in safe_path_strategy()) {
        prop_assert!(is_path_safe(&path), "'{}' was rejected", path);
    }

    /// A `..` component anywhere is rejected, whatever the separator.
    #[test]
    fn parent_component_rejected(
        prefix in safe_path_strategy(),
        suffix in safe_path_strategy(),
        backslash in any::<bool>()
    ) {
        let sep = if backslash { '\\' } else { '/' };
        let path = format!("{prefix}{sep}..{sep}{suffix}");
        prop_assert!(!is_path_safe(&path), "'{}' was accepted", path);
        let path = format!("..{sep}{suffix}");
        prop_assert!(!is_path_safe(&path));
    }

    /// Leading slashes and drive letters are rejected.
    #[test]
    fn absolute_rejected(path in safe_path_strategy(), drive in "[a-zA-Z]") {
        let unix = format!("/{}", path);
        let windows = format!("{}:\\{}", drive, path);
        prop_assert!(!is_path_safe(&unix));
        prop_assert!(!is_path_safe(&windows));
    }

    /// Files come back with the same names, order and contents.
    #[test]
    fn roundtrip_preserves_entries(
        files in proptest::collection::vec(
            (safe_path_strategy(), proptest::collection::vec(any::<u8>(), 0..2048)),
            1..8,
        ),
        dialect in dialect_strategy(),
        method in method_strategy()
    ) {
        let options = CreateOptions::new().compression(method).dialect(dialect);
        let entries: Vec<(&str, &[u8])> = files
            .iter()
            .map(|(name, data)| (name.as_str(), data.as_slice()))
            .collect();
        let bytes = common::build_archive(&options, &entries).unwrap();

        let mut archive = TarArchive::from_bytes(bytes).unwrap();
        prop_assert_eq!(archive.compression(), method);
        let listed = archive.entries().unwrap();
        prop_assert_eq!(listed.len(), files.len());
        for (entry, (name, data)) in listed.iter().zip(&files) {
            prop_assert_eq!(&entry.name, name);
            prop_assert_eq!(entry.size, data.len() as u64);
        }
        // the first entry with a given name wins on lookup
        let (name, data) = &files[0];
        prop_assert_eq!(&archive.read(name).unwrap(), data);
    }
}
