//! Fuzz target for opening and walking arbitrary bytes as a TAR archive.
//!
//! Exercises compression sniffing, header probing and entry parsing with
//! malformed or adversarial input, looking for panics and hangs.
//!
//! Run with: cargo +nightly fuzz run archive_open

#![no_main]

use libfuzzer_sys::fuzz_target;
use tarsmith::TarArchive;

fuzz_target!(|data: &[u8]| {
    let Ok(mut archive) = TarArchive::from_bytes(data) else {
        return;
    };

    if let Ok(entries) = archive.entries() {
        for entry in entries.iter().take(64) {
            let _ = entry.entry_type;
            let _ = entry.link_target.as_deref();
            // payload reads walk the archive again
            if entry.is_file() && entry.size < 1 << 20 {
                let _ = archive.read(&entry.name);
            }
        }
    }
    let _ = archive.count();
});
