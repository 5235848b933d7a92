//! Streaming reads.
//!
//! A read handle keeps one forward-only download open across sequential
//! reads. A read at any other offset drops it and opens a new ranged
//! download anchored at the requested offset.

use crate::error::Result;
use parking_lot::RwLock;
use putiofs_remote::{ByteStream, Entry, RemoteStore};
use std::io::{self, Read};
use std::sync::Arc;
use tracing::debug;

/// A handle opened for reading.
pub struct ReadHandle {
    entry: Arc<RwLock<Entry>>,
    store: Arc<dyn RemoteStore>,
    /// Position of `stream` within the file.
    offset: u64,
    stream: Option<ByteStream>,
}

impl ReadHandle {
    /// A handle with no download open yet.
    pub fn new(entry: Arc<RwLock<Entry>>, store: Arc<dyn RemoteStore>) -> Self {
        Self {
            entry,
            store,
            offset: 0,
            stream: None,
        }
    }

    /// File position the open download has reached.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Whether a download is open.
    pub fn is_streaming(&self) -> bool {
        self.stream.is_some()
    }

    /// Reads up to `size` bytes at `offset`. Fewer bytes are returned only at
    /// the end of the file; reading at or past the end yields nothing.
    pub fn read(&mut self, offset: u64, size: u32) -> Result<Vec<u8>> {
        let (id, file_size) = {
            let entry = self.entry.read();
            (entry.id, entry.size)
        };
        if offset >= file_size {
            return Ok(Vec::new());
        }

        let mut stream = match self.stream.take() {
            Some(stream) if self.offset == offset => stream,
            previous => {
                if previous.is_some() {
                    debug!(id, from = self.offset, to = offset, "seek, reopening download");
                }
                let stream = self.store.download_range(id, offset, None)?;
                self.offset = offset;
                stream
            }
        };

        let mut buf = vec![0u8; size as usize];
        let filled = fill(&mut stream, &mut buf)?;
        buf.truncate(filled);
        self.offset += filled as u64;

        // An exhausted stream cannot serve the next sequential read.
        if filled == size as usize {
            self.stream = Some(stream);
        }
        Ok(buf)
    }

    /// Closes the download, if any.
    pub fn release(&mut self) {
        self.stream = None;
        self.offset = 0;
    }
}

/// Reads until `buf` is full or the stream ends.
fn fill(stream: &mut dyn Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match stream.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
