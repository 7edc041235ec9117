//! Header layout per dialect.
//!
//! Names are copied into the raw header fields rather than through
//! `tar::Header::set_path`, which refuses `..` and absolute paths. What an
//! archive may contain is not this module's call; extraction runs every name
//! through the path safety gate instead.

use tar::{EntryType as TarType, Header};

use super::Dialect;
use super::pax::PaxRecords;
use crate::config::PathEncoding;
use crate::read::EntryType;
use crate::{Error, Result, Timestamp};

const NAME_LEN: usize = 100;
const PREFIX_LEN: usize = 155;
/// Largest value of an 11-digit octal field.
const MAX_OCTAL_SIZE: u64 = 0o777_7777_7777;
/// Largest value of a 7-digit octal field.
const MAX_OCTAL_ID: u64 = 0o777_7777;

/// Metadata for one entry about to be written.
#[derive(Debug, Clone)]
pub(crate) struct HeaderSpec {
    pub(crate) path: String,
    pub(crate) entry_type: EntryType,
    pub(crate) size: u64,
    pub(crate) mode: u32,
    pub(crate) uid: u64,
    pub(crate) gid: u64,
    pub(crate) uname: Option<String>,
    pub(crate) gname: Option<String>,
    pub(crate) modified: Timestamp,
    pub(crate) accessed: Option<Timestamp>,
    pub(crate) created: Option<Timestamp>,
    pub(crate) link_target: Option<String>,
    pub(crate) device: Option<(u32, u32)>,
}

impl HeaderSpec {
    /// A header-only entry owned by root, modified now.
    pub(crate) fn new(path: impl Into<String>, entry_type: EntryType, mode: u32) -> Self {
        Self {
            path: path.into(),
            entry_type,
            size: 0,
            mode,
            uid: 0,
            gid: 0,
            uname: None,
            gname: None,
            modified: Timestamp::now(),
            accessed: None,
            created: None,
            link_target: None,
            device: None,
        }
    }
}

/// Serialized headers for one entry.
#[derive(Debug)]
pub(crate) struct BuiltHeader {
    /// Pseudo-entries that must be written first, each with its payload.
    pub(crate) extensions: Vec<(Header, Vec<u8>)>,
    /// The entry's own header.
    pub(crate) header: Header,
}

/// Lays out `spec` for `dialect`.
///
/// Values the dialect cannot represent are moved into extension records
/// (pax, GNU) or rejected with [`Error::InvalidFormat`] (ustar, V7).
pub(crate) fn build(spec: &HeaderSpec, dialect: Dialect, encoding: PathEncoding) -> Result<BuiltHeader> {
    let tar_type = tar_entry_type(spec.entry_type, dialect)?;
    let mut header = dialect.new_header();
    let mut pax = PaxRecords::new();
    let mut extensions = Vec::new();

    let path = encoding.encode(&spec.path);
    if !place_path(&mut header, &path, dialect) {
        match dialect {
            Dialect::Pax => pax.push("path", &path),
            Dialect::Gnu => extensions.push(gnu_long(TarType::GNULongName, &path)),
            _ => return Err(too_long("path", &spec.path, dialect)),
        }
    }

    if let Some(target) = &spec.link_target {
        let bytes = encoding.encode(target);
        if !copy_field(&mut header.as_old_mut().linkname, &bytes) {
            match dialect {
                Dialect::Pax => pax.push("linkpath", &bytes),
                Dialect::Gnu => extensions.push(gnu_long(TarType::GNULongLink, &bytes)),
                _ => return Err(too_long("link target", target, dialect)),
            }
        }
    }

    for (key, value) in [("uname", &spec.uname), ("gname", &spec.gname)] {
        let Some(value) = value else { continue };
        let bytes = encoding.encode(value);
        // V7 has no owner name fields; the names are dropped.
        let Some(field) = owner_field(&mut header, key == "uname") else {
            continue;
        };
        if !copy_field(field, &bytes) {
            if dialect == Dialect::Pax {
                pax.push(key, &bytes);
            } else {
                return Err(too_long(key, value, dialect));
            }
        }
    }

    header.set_mode(spec.mode & 0o7777);
    header.set_uid(spec.uid);
    header.set_gid(spec.gid);
    header.set_size(spec.size);
    header.set_mtime(spec.modified.header_secs());
    header.set_entry_type(tar_type);

    if dialect == Dialect::Pax {
        if spec.uid > MAX_OCTAL_ID {
            pax.push("uid", spec.uid.to_string().as_bytes());
        }
        if spec.gid > MAX_OCTAL_ID {
            pax.push("gid", spec.gid.to_string().as_bytes());
        }
        if spec.size > MAX_OCTAL_SIZE {
            pax.push("size", spec.size.to_string().as_bytes());
        }
        if spec.modified.sub_second_nanos() != 0 || spec.modified.as_unix_secs() < 0 {
            pax.push("mtime", spec.modified.to_pax().as_bytes());
        }
        if let Some(atime) = spec.accessed {
            pax.push("atime", atime.to_pax().as_bytes());
        }
        if let Some(ctime) = spec.created {
            pax.push("ctime", ctime.to_pax().as_bytes());
        }
    } else if let Some(gnu) = header.as_gnu_mut() {
        if let Some(atime) = spec.accessed {
            gnu.set_atime(atime.header_secs());
        }
        if let Some(ctime) = spec.created {
            gnu.set_ctime(ctime.header_secs());
        }
    }

    if let Some((major, minor)) = spec.device {
        if dialect != Dialect::V7 {
            header.set_device_major(major)?;
            header.set_device_minor(minor)?;
        }
    }

    header.set_cksum();

    if !pax.is_empty() {
        extensions.push(pax_header(&path, pax.into_bytes(), spec.modified));
    }

    Ok(BuiltHeader { extensions, header })
}

fn tar_entry_type(entry_type: EntryType, dialect: Dialect) -> Result<TarType> {
    let tar_type = match entry_type {
        EntryType::File => TarType::Regular,
        EntryType::Directory => TarType::Directory,
        EntryType::Symlink => TarType::Symlink,
        EntryType::Hardlink => TarType::Link,
        EntryType::CharDevice => TarType::Char,
        EntryType::BlockDevice => TarType::Block,
        EntryType::Fifo => TarType::Fifo,
        EntryType::Socket | EntryType::Unknown => {
            return Err(Error::InvalidFormat(format!(
                "tar cannot store {} entries",
                entry_type
            )));
        }
    };
    if dialect == Dialect::V7 && matches!(tar_type, TarType::Char | TarType::Block | TarType::Fifo) {
        return Err(Error::InvalidFormat(format!(
            "v7 headers cannot store {} entries",
            entry_type
        )));
    }
    Ok(tar_type)
}

/// Copies `src` into a fixed-width field. Returns false, leaving a truncated
/// copy behind, when it does not fit.
fn copy_field(dst: &mut [u8], src: &[u8]) -> bool {
    let n = src.len().min(dst.len());
    dst[..n].copy_from_slice(&src[..n]);
    dst[n..].fill(0);
    src.len() <= dst.len()
}

fn place_path(header: &mut Header, path: &[u8], dialect: Dialect) -> bool {
    if path.len() > NAME_LEN && matches!(dialect, Dialect::Ustar | Dialect::Pax) {
        if let Some((prefix, name)) = split_ustar(path) {
            if let Some(ustar) = header.as_ustar_mut() {
                copy_field(&mut ustar.prefix, prefix);
            }
            return copy_field(&mut header.as_old_mut().name, name);
        }
    }
    copy_field(&mut header.as_old_mut().name, path)
}

/// Splits a long path at the earliest `/` that leaves at most 100 bytes
/// for the name field and at most 155 for the prefix.
fn split_ustar(path: &[u8]) -> Option<(&[u8], &[u8])> {
    if path.len() > PREFIX_LEN + 1 + NAME_LEN {
        return None;
    }
    let first = path.len().saturating_sub(NAME_LEN + 1).max(1);
    (first..path.len().saturating_sub(1))
        .take_while(|&i| i <= PREFIX_LEN)
        .find(|&i| path[i] == b'/')
        .map(|i| (&path[..i], &path[i + 1..]))
}

fn owner_field(header: &mut Header, user: bool) -> Option<&mut [u8; 32]> {
    if header.as_ustar().is_some() {
        header
            .as_ustar_mut()
            .map(|h| if user { &mut h.uname } else { &mut h.gname })
    } else {
        header
            .as_gnu_mut()
            .map(|h| if user { &mut h.uname } else { &mut h.gname })
    }
}

fn gnu_long(kind: TarType, value: &[u8]) -> (Header, Vec<u8>) {
    let mut data = Vec::with_capacity(value.len() + 1);
    data.extend_from_slice(value);
    data.push(0);

    let mut header = Header::new_gnu();
    copy_field(&mut header.as_old_mut().name, b"././@LongLink");
    header.set_mode(0o644);
    header.set_uid(0);
    header.set_gid(0);
    header.set_mtime(0);
    header.set_size(data.len() as u64);
    header.set_entry_type(kind);
    header.set_cksum();
    (header, data)
}

fn pax_header(path: &[u8], records: Vec<u8>, modified: Timestamp) -> (Header, Vec<u8>) {
    let base = path
        .split(|&b| b == b'/')
        .filter(|part| !part.is_empty())
        .next_back()
        .unwrap_or_default();
    let mut name = b"PaxHeaders/".to_vec();
    name.extend_from_slice(base);

    let mut header = Header::new_ustar();
    copy_field(&mut header.as_old_mut().name, &name);
    header.set_mode(0o644);
    header.set_uid(0);
    header.set_gid(0);
    header.set_mtime(modified.header_secs());
    header.set_size(records.len() as u64);
    header.set_entry_type(TarType::XHeader);
    header.set_cksum();
    (header, records)
}

fn too_long(field: &str, value: &str, dialect: Dialect) -> Error {
    Error::InvalidFormat(format!(
        "{} too long for {} header: {}",
        field, dialect, value
    ))
}
