//! Buffered writes.
//!
//! The store cannot patch an object, so writes accumulate in an anonymous
//! local staging file and a flush replaces the remote object wholesale:
//! delete the old object, then upload the staging file as a new one.

use crate::error::Result;
use parking_lot::RwLock;
use putiofs_remote::{Entry, RemoteStore};
use std::fs::File;
use std::io::{Seek, SeekFrom};
use std::os::unix::fs::FileExt;
use std::sync::Arc;
use tracing::{debug, warn};

/// A handle opened for writing. Owns one staging file.
pub struct WriteHandle {
    entry: Arc<RwLock<Entry>>,
    store: Arc<dyn RemoteStore>,
    staging: File,
    dirty: bool,
}

impl WriteHandle {
    /// Opens a handle with an empty staging file for `entry`.
    pub fn new(entry: Arc<RwLock<Entry>>, store: Arc<dyn RemoteStore>) -> Result<Self> {
        let staging = tempfile::tempfile()?;
        debug!(id = entry.read().id, "staging file created");
        Ok(Self {
            entry,
            store,
            staging,
            dirty: false,
        })
    }

    /// Whether writes were staged since the last successful flush.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Stages `data` at `offset`; later writes win over overlapping ranges.
    pub fn write(&mut self, offset: u64, data: &[u8]) -> Result<usize> {
        self.staging.write_all_at(data, offset)?;
        self.dirty = true;
        Ok(data.len())
    }

    /// Pushes the staged content to the store. A clean handle does nothing.
    ///
    /// On success the shared snapshot describes the newly uploaded object,
    /// whose id differs from the one it replaced.
    pub fn flush(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        let (id, name, parent_id) = {
            let entry = self.entry.read();
            (entry.id, entry.name.clone(), entry.parent_id)
        };

        self.staging.seek(SeekFrom::Start(0))?;
        self.store.delete(id)?;
        let uploaded = self.store.upload(self.staging.try_clone()?, &name, parent_id)?;
        debug!(old_id = id, new_id = uploaded.id, size = uploaded.size, "flushed");

        *self.entry.write() = uploaded;
        self.dirty = false;
        Ok(())
    }

    /// Drops the staging file. Content not flushed before this is lost.
    pub fn release(&mut self) {
        if self.dirty {
            warn!(
                id = self.entry.read().id,
                "write handle released with unflushed data, discarding"
            );
            self.dirty = false;
        }
    }
}
