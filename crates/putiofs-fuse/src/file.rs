//! Regular file nodes.

use crate::attr::entry_attr;
use crate::error::{FsError, Result};
use crate::inode::{ino_for_id, InodeId};
use crate::node::NodeKey;
use crate::openfile::{Handle, OpenIntent};
use crate::read_handle::ReadHandle;
use crate::root::FileSystemRoot;
use crate::write_handle::WriteHandle;
use fuser::FileAttr;
use parking_lot::RwLock;
use putiofs_remote::Entry;
use std::sync::Arc;
use tracing::debug;

/// A regular file on the store.
///
/// The snapshot is shared with every handle opened from this node, so a
/// flush that replaces the remote object is visible to later `getattr` calls.
#[derive(Clone)]
pub struct FileNode {
    ino: InodeId,
    key: NodeKey,
    entry: Arc<RwLock<Entry>>,
    root: Arc<FileSystemRoot>,
}

impl FileNode {
    /// A node with a snapshot of its own.
    pub fn new(entry: Entry, root: Arc<FileSystemRoot>) -> Self {
        Self {
            ino: ino_for_id(entry.id),
            key: NodeKey::of(&entry),
            entry: Arc::new(RwLock::new(entry)),
            root,
        }
    }

    /// Kernel inode number.
    pub fn ino(&self) -> InodeId {
        self.ino
    }

    /// Remote identity.
    pub fn key(&self) -> NodeKey {
        self.key
    }

    /// Mount-scoped state.
    pub fn root(&self) -> &Arc<FileSystemRoot> {
        &self.root
    }

    /// Copy of the current snapshot.
    pub fn snapshot(&self) -> Entry {
        self.entry.read().clone()
    }

    /// The snapshot handles opened from this node share.
    pub fn shared_snapshot(&self) -> Arc<RwLock<Entry>> {
        self.entry.clone()
    }

    /// Overwrites the shared snapshot.
    pub fn replace_snapshot(&self, entry: Entry) {
        *self.entry.write() = entry;
    }

    /// Kernel attributes from the snapshot.
    pub fn attr(&self) -> FileAttr {
        entry_attr(self.ino, &self.entry.read(), self.root.config())
    }

    /// Opens a read or write handle over this file's snapshot.
    pub fn open(&self, intent: OpenIntent) -> Result<Handle> {
        debug!(ino = self.ino, ?intent, "open");
        let store = self.root.store().clone();
        match intent {
            OpenIntent::Read => Ok(Handle::Read(ReadHandle::new(self.shared_snapshot(), store))),
            OpenIntent::Write { append } => {
                // Uploads replace the whole object, so appending would need the
                // existing content staged first.
                if append && self.entry.read().size > 0 {
                    return Err(FsError::not_supported("append"));
                }
                Ok(Handle::Write(WriteHandle::new(self.shared_snapshot(), store)?))
            }
        }
    }

    /// Always `NotSupported`: content only reaches the store on flush.
    pub fn fsync(&self) -> Result<()> {
        Err(FsError::not_supported("fsync"))
    }

    /// Records a new size locally. Nothing is sent to the store.
    pub fn set_size(&self, size: u64) {
        self.entry.write().size = size;
    }
}
