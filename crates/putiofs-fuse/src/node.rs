//! The closed set of node variants the kernel can hold a reference to.

use crate::diag::DiagnosticNode;
use crate::dir::DirectoryNode;
use crate::error::{FsError, Result};
use crate::file::FileNode;
use crate::inode::InodeId;
use crate::root::FileSystemRoot;
use fuser::FileAttr;
use putiofs_remote::{Entry, EntryId};
use std::sync::Arc;
use std::time::Duration;

/// Stable identity of a remote node. Name, size and parent are snapshot data
/// and deliberately excluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeKey {
    /// Store id.
    pub id: EntryId,
    /// Folder or file.
    pub is_dir: bool,
}

impl NodeKey {
    /// Identity of `entry`.
    pub fn of(entry: &Entry) -> Self {
        Self {
            id: entry.id,
            is_dir: entry.is_dir,
        }
    }
}

/// A node the kernel can hold an inode for.
#[derive(Clone)]
pub enum Node {
    /// A remote folder.
    Directory(DirectoryNode),
    /// A remote file.
    File(FileNode),
    /// A synthesized read-only file.
    Diagnostic(DiagnosticNode),
}

impl Node {
    /// Wraps a remote entry in the variant its type flag calls for.
    pub fn from_entry(entry: Entry, root: &Arc<FileSystemRoot>) -> Self {
        if entry.is_dir {
            Self::directory(entry, root)
        } else {
            Self::file(entry, root)
        }
    }

    /// A directory node for `entry`.
    pub fn directory(entry: Entry, root: &Arc<FileSystemRoot>) -> Self {
        Node::Directory(DirectoryNode::new(entry, root.clone()))
    }

    /// A file node for `entry`.
    pub fn file(entry: Entry, root: &Arc<FileSystemRoot>) -> Self {
        Node::File(FileNode::new(entry, root.clone()))
    }

    /// Kernel inode number.
    pub fn ino(&self) -> InodeId {
        match self {
            Node::Directory(d) => d.ino(),
            Node::File(f) => f.ino(),
            Node::Diagnostic(d) => d.ino(),
        }
    }

    /// Remote identity; synthesized nodes have none.
    pub fn key(&self) -> Option<NodeKey> {
        match self {
            Node::Directory(d) => Some(d.key()),
            Node::File(f) => Some(f.key()),
            Node::Diagnostic(_) => None,
        }
    }

    /// Kernel attributes from the current snapshot.
    pub fn attr(&self) -> FileAttr {
        match self {
            Node::Directory(d) => d.attr(),
            Node::File(f) => f.attr(),
            Node::Diagnostic(d) => d.attr(),
        }
    }

    /// How long the kernel may cache the name lookup that produced this node.
    /// Synthesized content must be recomputed on every lookup.
    pub fn entry_ttl(&self) -> Duration {
        match self {
            Node::Directory(d) => d.root().config().entry_ttl,
            Node::File(f) => f.root().config().entry_ttl,
            Node::Diagnostic(_) => Duration::ZERO,
        }
    }

    /// Replaces this node's snapshot with the one held by `other`.
    pub fn refresh_from(&self, other: &Node) {
        match (self, other) {
            (Node::Directory(a), Node::Directory(b)) => a.replace_snapshot(b.snapshot()),
            (Node::File(a), Node::File(b)) => a.replace_snapshot(b.snapshot()),
            _ => {}
        }
    }

    /// The directory variant, or `NotDirectory`.
    pub fn as_directory(&self) -> Result<&DirectoryNode> {
        match self {
            Node::Directory(d) => Ok(d),
            _ => Err(FsError::NotDirectory { ino: self.ino() }),
        }
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Node::Directory(d) => write!(f, "<Dir ino: {} name: {:?}>", d.ino(), d.snapshot().name),
            Node::File(n) => {
                let entry = n.snapshot();
                write!(f, "<File ino: {} name: {:?} size: {}>", n.ino(), entry.name, entry.size)
            }
            Node::Diagnostic(d) => write!(f, "<Diagnostic ino: {} name: {:?}>", d.ino(), d.name()),
        }
    }
}
