//! Fuzz target for the extraction path safety gate.
//!
//! Run with: cargo +nightly fuzz run path_safety
//!
//! Properties checked for every accepted path:
//! - no `..` component under either separator
//! - not absolute, and no drive letter prefix

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(path) = std::str::from_utf8(data) else {
        return;
    };
    if !tarsmith::is_path_safe(path) {
        return;
    }

    assert!(
        !path.split(['/', '\\']).any(|c| c == ".."),
        "Parent component accepted: {:?}",
        path
    );
    assert!(!path.starts_with('/'), "Absolute path accepted: {:?}", path);
    let bytes = path.as_bytes();
    assert!(
        !(bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'),
        "Drive letter accepted: {:?}",
        path
    );
});
