//! GNU sparse files stored through pax records.
//!
//! The tar crate expands the old GNU `S` header itself. The pax variants
//! reach us as a regular entry with a placeholder name, the stored (packed)
//! size, and `GNU.sparse.*` records saying where the data segments belong:
//!
//! | Format | Segment map |
//! |--------|-------------|
//! | 0.0 | repeated `GNU.sparse.offset` / `GNU.sparse.numbytes` records |
//! | 0.1 | one `GNU.sparse.map` record, `offset,len,offset,len,...` |
//! | 1.0 | newline separated decimals at the start of the payload, padded to a block |
//!
//! Everything between segments is a hole that reads back as zeros.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};

/// Prefix shared by every sparse pax key.
pub(crate) const SPARSE_PREFIX: &str = "GNU.sparse.";

/// Directory GNU tar inserts into the header name of pax sparse entries.
const PLACEHOLDER_DIR: &str = "GNUSparseFile.";

const BLOCK_SIZE: usize = 512;

/// One stored run of data inside the expanded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Segment {
    offset: u64,
    len: u64,
}

impl Segment {
    fn end(&self) -> u64 {
        self.offset + self.len
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum SegmentMap {
    /// Map taken from pax records (formats 0.0 and 0.1).
    Records(Vec<Segment>),
    /// Map stored in front of the data (format 1.0).
    Payload,
}

/// How a pax sparse entry's payload expands into the original file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SparseLayout {
    real_size: u64,
    map: SegmentMap,
}

impl SparseLayout {
    /// Size of the expanded file.
    pub(crate) fn real_size(&self) -> u64 {
        self.real_size
    }

    /// Resolves the segment list. For format 1.0 this consumes the map
    /// blocks at the front of `data`, leaving it at the first segment.
    fn segments<R: Read>(&self, data: &mut R) -> io::Result<Vec<Segment>> {
        let segments = match &self.map {
            SegmentMap::Records(segments) => segments.clone(),
            SegmentMap::Payload => read_payload_map(data)?,
        };
        check_segments(&segments, self.real_size)?;
        Ok(segments)
    }

    /// Wraps the stored payload in a reader yielding the expanded file.
    pub(crate) fn reader<R: Read>(&self, mut data: R) -> io::Result<SparseReader<R>> {
        let segments = self.segments(&mut data)?;
        Ok(SparseReader {
            inner: data,
            segments,
            next: 0,
            position: 0,
            size: self.real_size,
        })
    }

    /// Writes the segments of `data` into `file` at their offsets and sizes
    /// the file, so holes are never written.
    pub(crate) fn unpack<R: Read>(&self, data: &mut R, file: &mut File) -> io::Result<()> {
        for segment in self.segments(data)? {
            file.seek(SeekFrom::Start(segment.offset))?;
            let copied = io::copy(&mut data.by_ref().take(segment.len), file)?;
            if copied < segment.len {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "sparse segment is shorter than its map entry",
                ));
            }
        }
        file.set_len(self.real_size)
    }
}

/// Collects the `GNU.sparse.*` records of one entry.
#[derive(Debug, Default)]
pub(crate) struct SparseRecords {
    major: Option<u64>,
    minor: Option<u64>,
    real_size: Option<u64>,
    map: Option<String>,
    offsets: Vec<u64>,
    lengths: Vec<u64>,
}

impl SparseRecords {
    /// Takes one record; `field` is the key without [`SPARSE_PREFIX`].
    pub(crate) fn record(&mut self, field: &str, value: &str) -> io::Result<()> {
        let number = || {
            value
                .trim()
                .parse::<u64>()
                .map_err(|_| invalid(format!("bad {}{} value '{}'", SPARSE_PREFIX, field, value)))
        };
        match field {
            "major" => self.major = Some(number()?),
            "minor" => self.minor = Some(number()?),
            // `size` in 0.x, `realsize` in 1.0
            "size" | "realsize" => self.real_size = Some(number()?),
            "map" => self.map = Some(value.to_string()),
            "offset" => self.offsets.push(number()?),
            "numbytes" => self.lengths.push(number()?),
            _ => {}
        }
        Ok(())
    }

    /// The layout the records describe, or `None` if the entry is not sparse.
    pub(crate) fn finish(self) -> io::Result<Option<SparseLayout>> {
        let Self {
            major,
            minor,
            real_size,
            map,
            offsets,
            lengths,
        } = self;
        let map = match (major, minor) {
            (Some(1), Some(0)) => SegmentMap::Payload,
            (None | Some(0), _) => match map {
                Some(map) => SegmentMap::Records(parse_map_record(&map)?),
                None if !offsets.is_empty() || !lengths.is_empty() => {
                    if offsets.len() != lengths.len() {
                        return Err(invalid("unpaired sparse offset and numbytes records"));
                    }
                    SegmentMap::Records(
                        offsets
                            .into_iter()
                            .zip(lengths)
                            .map(|(offset, len)| Segment { offset, len })
                            .collect(),
                    )
                }
                None => return Ok(None),
            },
            (Some(major), minor) => {
                return Err(invalid(format!(
                    "unsupported sparse format {}.{}",
                    major,
                    minor.unwrap_or(0)
                )));
            }
        };
        let real_size = real_size.ok_or_else(|| invalid("sparse entry without a real size"))?;
        Ok(Some(SparseLayout { real_size, map }))
    }
}

/// Removes the `GNUSparseFile.<pid>` component GNU tar puts into the
/// header name of a sparse entry whose real name was not recorded.
pub(crate) fn strip_placeholder(name: &str) -> Option<String> {
    let mut parts: Vec<&str> = name.split('/').collect();
    let index = parts.iter().position(|part| {
        part.strip_prefix(PLACEHOLDER_DIR)
            .is_some_and(|pid| !pid.is_empty() && pid.bytes().all(|b| b.is_ascii_digit()))
    })?;
    if index + 1 >= parts.len() {
        return None;
    }
    parts.remove(index);
    Some(parts.join("/"))
}

/// Reader over the expanded contents of a sparse entry.
pub(crate) struct SparseReader<R> {
    inner: R,
    segments: Vec<Segment>,
    /// First segment not yet fully delivered.
    next: usize,
    position: u64,
    size: u64,
}

impl<R: Read> Read for SparseReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() || self.position >= self.size {
            return Ok(0);
        }
        while self
            .segments
            .get(self.next)
            .is_some_and(|s| self.position >= s.end())
        {
            self.next += 1;
        }

        let n = match self.segments.get(self.next) {
            Some(segment) if self.position >= segment.offset => {
                let want = (segment.end() - self.position).min(buf.len() as u64) as usize;
                let n = self.inner.read(&mut buf[..want])?;
                if n == 0 {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "sparse segment is shorter than its map entry",
                    ));
                }
                n
            }
            upcoming => {
                let hole_end = upcoming.map_or(self.size, |s| s.offset);
                let n = (hole_end - self.position).min(buf.len() as u64) as usize;
                buf[..n].fill(0);
                n
            }
        };
        self.position += n as u64;
        Ok(n)
    }
}

fn parse_map_record(map: &str) -> io::Result<Vec<Segment>> {
    if map.trim().is_empty() {
        return Ok(Vec::new());
    }
    let numbers = map
        .split(',')
        .map(|n| n.trim().parse::<u64>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|_| invalid(format!("bad sparse map '{}'", map)))?;
    if numbers.len() % 2 != 0 {
        return Err(invalid("sparse map has an odd number of values"));
    }
    Ok(numbers
        .chunks_exact(2)
        .map(|pair| Segment {
            offset: pair[0],
            len: pair[1],
        })
        .collect())
}

/// Reads a format 1.0 map: a segment count, then an offset and a length per
/// segment, one decimal per line, padded with NULs to a block boundary.
fn read_payload_map<R: Read>(data: &mut R) -> io::Result<Vec<Segment>> {
    let mut buf = Vec::new();
    let mut block = [0u8; BLOCK_SIZE];
    let mut numbers: Vec<u64> = Vec::new();
    let mut expected: Option<usize> = None;
    let mut cursor = 0;
    loop {
        while let Some(newline) = buf[cursor..].iter().position(|&b| b == b'\n') {
            let line = &buf[cursor..cursor + newline];
            cursor += newline + 1;
            let number = std::str::from_utf8(line)
                .ok()
                .and_then(|l| l.parse::<u64>().ok())
                .ok_or_else(|| invalid("bad number in sparse map"))?;
            numbers.push(number);

            let wanted = match expected {
                Some(wanted) => wanted,
                None => {
                    let wanted = usize::try_from(number)
                        .ok()
                        .and_then(|count| count.checked_mul(2))
                        .and_then(|values| values.checked_add(1))
                        .ok_or_else(|| invalid("sparse map segment count overflows"))?;
                    *expected.insert(wanted)
                }
            };
            if numbers.len() == wanted {
                return Ok(numbers[1..]
                    .chunks_exact(2)
                    .map(|pair| Segment {
                        offset: pair[0],
                        len: pair[1],
                    })
                    .collect());
            }
        }
        data.read_exact(&mut block)?;
        buf.extend_from_slice(&block);
    }
}

/// Segments must be ordered, must not overlap, and must fit the real size.
fn check_segments(segments: &[Segment], real_size: u64) -> io::Result<()> {
    let mut previous_end = 0;
    for segment in segments {
        let end = segment
            .offset
            .checked_add(segment.len)
            .ok_or_else(|| invalid("sparse segment overflows"))?;
        if segment.offset < previous_end || end > real_size {
            return Err(invalid(format!(
                "sparse segment {}+{} is out of order or past the end of the file",
                segment.offset, segment.len
            )));
        }
        previous_end = end;
    }
    Ok(())
}

fn invalid(message: impl Into<String>) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message.into())
}
