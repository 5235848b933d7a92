//! Inode numbering and the table of nodes the kernel holds references to.

use crate::node::Node;
use putiofs_remote::EntryId;
use std::collections::HashMap;
use tracing::debug;

/// Kernel inode number.
pub type InodeId = u64;

/// Inode of the mount root.
pub const ROOT_INO: InodeId = 1;

/// Start of the range handed out to synthesized nodes. Remote ids map below it.
pub const DIAGNOSTIC_INO_BASE: InodeId = 1 << 62;

/// Inode number of a remote entry; the store root (id 0) maps to [`ROOT_INO`].
pub fn ino_for_id(id: EntryId) -> InodeId {
    id.max(0) as InodeId + 1
}

struct InodeEntry {
    node: Node,
    lookup_count: u64,
}

/// Nodes the kernel currently holds references to, keyed by inode number.
pub struct InodeTable {
    entries: HashMap<InodeId, InodeEntry>,
}

impl InodeTable {
    /// A table holding only `root`, which is never evicted.
    pub fn new(root: Node) -> Self {
        let mut entries = HashMap::new();
        entries.insert(
            root.ino(),
            InodeEntry {
                node: root,
                lookup_count: 1,
            },
        );
        Self { entries }
    }

    /// Records a kernel reference to `node`.
    ///
    /// When a node with the same inode and identity is already known its
    /// snapshot is refreshed in place and the known node is returned, so open
    /// handles keep observing the same snapshot.
    pub fn remember(&mut self, node: Node) -> Node {
        let ino = node.ino();
        if let Some(existing) = self.entries.get_mut(&ino) {
            if existing.node.key() == node.key() {
                existing.node.refresh_from(&node);
                existing.lookup_count += 1;
                return existing.node.clone();
            }
            debug!(ino, "inode changed identity, replacing");
        }
        self.entries.insert(
            ino,
            InodeEntry {
                node: node.clone(),
                lookup_count: 1,
            },
        );
        node
    }

    /// The node registered under `ino`.
    pub fn get(&self, ino: InodeId) -> Option<&Node> {
        self.entries.get(&ino).map(|e| &e.node)
    }

    /// Outstanding kernel references to `ino`.
    pub fn lookup_count(&self, ino: InodeId) -> u64 {
        self.entries.get(&ino).map(|e| e.lookup_count).unwrap_or(0)
    }

    /// Drops `n` kernel references. The root is never evicted.
    pub fn forget(&mut self, ino: InodeId, n: u64) {
        if ino == ROOT_INO {
            return;
        }
        let should_remove = match self.entries.get_mut(&ino) {
            Some(entry) => {
                entry.lookup_count = entry.lookup_count.saturating_sub(n);
                entry.lookup_count == 0
            }
            None => false,
        };
        if should_remove {
            self.entries.remove(&ino);
        }
    }

    /// Number of registered inodes, the root included.
    pub fn count(&self) -> usize {
        self.entries.len()
    }
}
