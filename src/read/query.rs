use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::ops::ControlFlow;
use std::path::Path;

use super::{Entry, Payload, ReadCoder, ReadStream, is_metadata_header};
use crate::archive::TarArchive;
use crate::config::PathEncoding;
use crate::{Error, Result};

impl TarArchive {
    /// Walks every entry from the start of the archive.
    ///
    /// `visit` sees the raw coder entry (positioned before its payload) and
    /// its parsed metadata, and can stop the walk early with a value.
    pub(crate) fn scan<T>(
        &mut self,
        visit: impl FnMut(&mut tar::Entry<'_, ReadStream>, Entry) -> Result<ControlFlow<T>>,
    ) -> Result<Option<T>> {
        self.scan_with(|_| {}, visit)
    }

    /// [`scan`](Self::scan) with a hook that sets coder flags before the
    /// first header is read.
    pub(crate) fn scan_with<T>(
        &mut self,
        configure: impl FnOnce(&mut ReadCoder),
        mut visit: impl FnMut(&mut tar::Entry<'_, ReadStream>, Entry) -> Result<ControlFlow<T>>,
    ) -> Result<Option<T>> {
        let config = self.config.clone();
        let coder = self.rewind()?;
        configure(coder);
        let entries = coder
            .entries()
            .map_err(|e| Error::provider("failed to read archive", e))?;
        for raw in entries {
            let mut raw = raw.map_err(|e| Error::provider("failed to read next header", e))?;
            if is_metadata_header(raw.header().entry_type()) {
                continue;
            }
            let entry = Entry::from_tar(&mut raw, &config)?;
            if let ControlFlow::Break(value) = visit(&mut raw, entry)? {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    /// Visits the first entry whose name matches `name`.
    fn find<T>(
        &mut self,
        name: &str,
        mut visit: impl FnMut(&mut tar::Entry<'_, ReadStream>, Entry) -> Result<T>,
    ) -> Result<Option<T>> {
        let config = self.config.clone();
        self.scan(|raw, entry| {
            if config.names_match(name, &entry.name) {
                visit(raw, entry).map(ControlFlow::Break)
            } else {
                Ok(ControlFlow::Continue(()))
            }
        })
    }

    /// Lists every entry in archive order.
    ///
    /// Payloads are skipped, not read. Each call walks the whole archive.
    pub fn entries(&mut self) -> Result<Vec<Entry>> {
        let mut entries = Vec::new();
        self.scan(|_, entry| {
            entries.push(entry);
            Ok(ControlFlow::<()>::Continue(()))
        })?;
        Ok(entries)
    }

    /// Number of entries in the archive.
    pub fn count(&mut self) -> Result<usize> {
        let mut count = 0;
        self.scan(|_, _| {
            count += 1;
            Ok(ControlFlow::<()>::Continue(()))
        })?;
        Ok(count)
    }

    /// Returns true if an entry named `name` exists.
    pub fn has_entry(&mut self, name: &str) -> Result<bool> {
        Ok(self.entry(name)?.is_some())
    }

    /// Metadata of the first entry named `name`, if any.
    ///
    /// Names are compared with the session's
    /// [`NameMatching`](crate::NameMatching) strategy.
    pub fn entry(&mut self, name: &str) -> Result<Option<Entry>> {
        self.find(name, |_, entry| Ok(entry))
    }

    /// Reads the whole payload of the first entry named `name`.
    ///
    /// Entries without payload (directories, links, empty files) yield an
    /// empty buffer, and sparse files come back with their holes filled
    /// with zeros. Fails with [`Error::EntryNotFound`] if nothing matches.
    pub fn read(&mut self, name: &str) -> Result<Vec<u8>> {
        self.find(name, |raw, entry| {
            let failed = |e| Error::provider(format!("failed to read entry '{}'", entry.name), e);
            let mut data = Vec::with_capacity(usize::try_from(entry.size).unwrap_or(0));
            Payload::new(raw, &entry)
                .and_then(|mut payload| payload.read_to_end(&mut data))
                .map_err(failed)?;
            Ok(data)
        })?
        .ok_or_else(|| Error::entry_not_found(name))
    }

    /// Reads the payload of `name` as text.
    ///
    /// The bytes are decoded like header names: UTF-8 with invalid sequences
    /// replaced, or Latin-1 when the session is configured for it.
    pub fn read_text(&mut self, name: &str) -> Result<String> {
        let encoding: PathEncoding = self.config.encoding;
        let data = self.read(name)?;
        Ok(encoding.decode(&data).into_owned())
    }

    /// Streams the payload of `name` into the file `dest`, creating or
    /// truncating it.
    ///
    /// `dest` is used as given; the entry's stored path plays no part, so no
    /// path safety check applies.
    pub fn extract_to(&mut self, name: &str, dest: impl AsRef<Path>) -> Result<()> {
        let dest = dest.as_ref();
        let buffer_size = self.config.transfer_buffer_size();
        self.find(name, |raw, entry| {
            let file = File::create(dest)?;
            let mut out = BufWriter::with_capacity(buffer_size, file);
            Payload::new(raw, &entry)
                .and_then(|mut payload| io::copy(&mut payload, &mut out))
                .map_err(|e| Error::provider(format!("failed to extract entry '{}'", entry.name), e))?;
            out.flush()?;
            Ok(())
        })?
        .ok_or_else(|| Error::entry_not_found(name))
    }

    /// Alias of [`extract_to`](Self::extract_to).
    pub fn extract_entry(&mut self, name: &str, dest: impl AsRef<Path>) -> Result<()> {
        self.extract_to(name, dest)
    }
}
