//! # tarsmith
//!
//! A library for reading, writing, appending and extracting TAR archives.
//!
//! A [`TarArchive`] session works over a file, an in-memory buffer or a
//! caller-supplied stream, with optional gzip, bzip2, xz, zstd or lz4
//! compression and ustar, pax, GNU or V7 headers. Extraction runs every
//! entry path and link target through a [path safety gate](is_path_safe)
//! before anything touches the filesystem.
//!
//! ## Quick Start
//!
//! ### Creating an Archive
//!
//! ```rust,no_run
//! use tarsmith::{AddOptions, CreateOptions, TarArchive, Result};
//!
//! fn main() -> Result<()> {
//!     // compression is picked from the file name
//!     let mut archive = TarArchive::create_path("site.tar.gz", &CreateOptions::default())?;
//!
//!     archive.add_directory("site", &AddOptions::default())?;
//!     archive.add_file("site/index.html", "public/index.html", &AddOptions::default())?;
//!     archive.add_text("site/robots.txt", "User-agent: *\n", &AddOptions::new().mode(0o444))?;
//!
//!     // writes the end-of-archive marker and the gzip trailer
//!     archive.close()
//! }
//! ```
//!
//! ### Reading an Archive
//!
//! ```rust,no_run
//! use tarsmith::{ExtractOptions, TarArchive, Result};
//!
//! fn main() -> Result<()> {
//!     let mut archive = TarArchive::open_path("site.tar.gz")?;
//!
//!     for entry in archive.entries()? {
//!         println!("{} {} {}", entry.entry_type, entry.size, entry.name);
//!     }
//!
//!     let robots = archive.read_text("site/robots.txt")?;
//!     print!("{}", robots);
//!
//!     archive.extract_all("./out", &ExtractOptions::default())?;
//!     Ok(())
//! }
//! ```
//!
//! ### Working in Memory
//!
//! ```rust
//! use tarsmith::{AddOptions, CompressionMethod, CreateOptions, Dialect, TarArchive};
//!
//! let options = CreateOptions::new()
//!     .compression(CompressionMethod::Zstd)
//!     .dialect(Dialect::Gnu);
//! let mut archive = TarArchive::in_memory(&options)?;
//! archive.add("a.txt", b"hello", &AddOptions::default())?;
//! let bytes = archive.into_data()?;
//!
//! let mut archive = TarArchive::from_bytes(bytes)?;
//! assert_eq!(archive.compression(), CompressionMethod::Zstd);
//! assert_eq!(archive.read("a.txt")?, b"hello");
//! # Ok::<(), tarsmith::Error>(())
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `gzip` | Yes | gzip compression (flate2) |
//! | `bzip2` | Yes | bzip2 compression |
//! | `xz` | Yes | xz compression (liblzma) |
//! | `zstd` | Yes | Zstandard compression |
//! | `lz4` | Yes | LZ4 frame compression (lz4_flex) |
//!
//! ### Disabling Default Features
//!
//! ```toml
//! [dependencies]
//! tarsmith = { version = "0.1", default-features = false, features = ["gzip"] }
//! ```
//!
//! Selecting a method that was not compiled in fails with
//! [`Error::UnsupportedCompression`].
//!
//! ## Error Handling
//!
//! All operations return [`Result<T>`]. Every [`Error`] carries an
//! [`ErrorCode`]; path safety violations use a code of their own:
//!
//! ```rust,no_run
//! use tarsmith::{Error, ErrorCode, ExtractOptions, TarArchive};
//!
//! fn unpack(path: &str) -> tarsmith::Result<()> {
//!     let mut archive = TarArchive::open_path(path)?;
//!     match archive.extract_all("./out", &ExtractOptions::default()) {
//!         Err(e) if e.code() == ErrorCode::Security => {
//!             eprintln!("hostile archive: {}", e);
//!             Err(e)
//!         }
//!         Err(Error::Io(e)) => {
//!             eprintln!("I/O error: {}", e);
//!             Err(Error::Io(e))
//!         }
//!         other => other,
//!     }
//! }
//! # fn main() {}
//! ```
//!
//! ## Threading
//!
//! Sessions are synchronous and blocking. A session is not meant for
//! concurrent use; wrap it in a lock if several threads share one.
//!
//! ## Minimum Supported Rust Version (MSRV)
//!
//! This crate requires **Rust 1.85** or later.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]

/// Default transfer buffer size (64 KiB).
pub(crate) const READ_BUFFER_SIZE: usize = 64 * 1024;

pub mod archive;
mod backing;
pub mod codec;
pub mod config;
pub mod error;
pub mod format;
pub mod ownership;
pub mod read;
pub mod safety;
pub mod timestamp;
pub mod write;

pub use archive::{AccessMode, TarArchive};
pub use codec::CompressionMethod;
pub use config::{ArchiveConfig, NameMatching, PathEncoding};
pub use error::{Error, ErrorCode, Result, UnsafePathKind};
pub use format::Dialect;
pub use ownership::UnixOwnership;
pub use read::{Entry, EntryReader, EntryType, ExtractOptions, FileKind};
pub use safety::is_path_safe;
pub use timestamp::Timestamp;
pub use write::{AddOptions, CreateOptions, EntryWriter};
