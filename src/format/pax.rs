//! pax extended header records.
//!
//! A record is `"<len> <key>=<value>\n"` where `<len>` is the decimal length
//! of the whole record, its own digits included.

/// Accumulates records for one `x` extended header.
#[derive(Debug, Default)]
pub(crate) struct PaxRecords {
    buf: Vec<u8>,
}

impl PaxRecords {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, key: &str, value: &[u8]) {
        let len = record_len(key.len(), value.len());
        self.buf.extend_from_slice(len.to_string().as_bytes());
        self.buf.push(b' ');
        self.buf.extend_from_slice(key.as_bytes());
        self.buf.push(b'=');
        self.buf.extend_from_slice(value);
        self.buf.push(b'\n');
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub(crate) fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

fn record_len(key_len: usize, value_len: usize) -> usize {
    // ' ' + '=' + '\n'
    let base = key_len + value_len + 3;
    let mut digits = 1;
    loop {
        let total = base + digits;
        let width = total.to_string().len();
        if width == digits {
            return total;
        }
        digits = width;
    }
}
