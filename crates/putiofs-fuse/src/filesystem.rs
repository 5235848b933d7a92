//! Filesystem operations keyed by inode and file handle.
//!
//! [`PutioFs`] resolves inodes and handles, runs the node operation (which
//! may block on the remote store) and returns plain results. The kernel
//! callbacks in [`crate::dispatch`] only convert those into replies.
//!
//! Every method takes `&self`. The inode table lock is never held across a
//! remote call and each open handle has its own lock, so operations on
//! different nodes or handles can run at the same time.

use std::os::raw::c_int;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use fuser::consts::FOPEN_DIRECT_IO;
use fuser::{FileAttr, FileType};
use tracing::{debug, warn};

use crate::dir::DirectoryNode;
use crate::error::{FsError, Result};
use crate::inode::{ino_for_id, InodeId, InodeTable, ROOT_INO};
use crate::node::Node;
use crate::openfile::{DirRow, FileHandle, Handle, HandleTable, OpenIntent};
use crate::root::{FileSystemRoot, StatfsInfo};

/// The mounted filesystem, independent of the kernel session.
pub struct PutioFs {
    root: Arc<FileSystemRoot>,
    inodes: Mutex<InodeTable>,
    handles: HandleTable,
}

impl PutioFs {
    /// Starts with only the root directory in the inode table.
    pub fn new(root: Arc<FileSystemRoot>) -> Self {
        let inodes = InodeTable::new(Node::Directory(root.root_node()));
        Self {
            root,
            inodes: Mutex::new(inodes),
            handles: HandleTable::new(),
        }
    }

    /// Mount-scoped state.
    pub fn root(&self) -> &Arc<FileSystemRoot> {
        &self.root
    }

    /// Number of file and directory handles currently open.
    pub fn open_handles(&self) -> usize {
        self.handles.len()
    }

    /// Number of inodes the kernel currently holds, the root included.
    pub fn known_inodes(&self) -> usize {
        self.inodes().map(|table| table.count()).unwrap_or(0)
    }

    fn inodes(&self) -> Result<MutexGuard<'_, InodeTable>> {
        self.inodes
            .lock()
            .map_err(|_| FsError::Io(std::io::Error::other("inode table lock poisoned")))
    }

    fn node(&self, ino: InodeId) -> Result<Node> {
        self.inodes()?
            .get(ino)
            .cloned()
            .ok_or(FsError::UnknownInode { ino })
    }

    fn directory(&self, ino: InodeId) -> Result<DirectoryNode> {
        Ok(self.node(ino)?.as_directory()?.clone())
    }

    fn remember(&self, node: Node) -> Result<Node> {
        Ok(self.inodes()?.remember(node))
    }

    /// Resolves `name` under `parent` and registers the child's inode.
    pub fn lookup_entry(&self, parent: InodeId, name: &str) -> Result<(FileAttr, Duration)> {
        let node = self.directory(parent)?.lookup(name)?;
        let node = self.remember(node)?;
        Ok((node.attr(), node.entry_ttl()))
    }

    /// Drops `nlookup` kernel references to `ino`.
    pub fn forget_entry(&self, ino: InodeId, nlookup: u64) -> Result<()> {
        self.inodes()?.forget(ino, nlookup);
        Ok(())
    }

    /// Attributes of a known inode.
    pub fn get_attr(&self, ino: InodeId) -> Result<FileAttr> {
        Ok(self.node(ino)?.attr())
    }

    /// Applies a size change to a file; other attributes are ignored.
    pub fn set_size(&self, ino: InodeId, size: Option<u64>) -> Result<FileAttr> {
        let node = self.node(ino)?;
        if let (Node::File(file), Some(size)) = (&node, size) {
            file.set_size(size);
        }
        Ok(node.attr())
    }

    /// Creates a folder under `parent`.
    pub fn make_dir(&self, parent: InodeId, name: &str) -> Result<FileAttr> {
        let created = self.directory(parent)?.mkdir(name)?;
        Ok(self.remember(Node::Directory(created))?.attr())
    }

    /// Creates an empty file under `parent` and opens it for writing.
    pub fn create_file(&self, parent: InodeId, name: &str) -> Result<(FileAttr, FileHandle)> {
        let (file, handle) = self.directory(parent)?.create(name)?;
        let node = self.remember(Node::File(file))?;
        let fh = self.handles.insert(Handle::Write(handle));
        Ok((node.attr(), fh))
    }

    /// Removes a file or folder under `parent`.
    pub fn remove_entry(&self, parent: InodeId, name: &str) -> Result<()> {
        self.directory(parent)?.remove(name)
    }

    /// Moves and renames `name` under `parent` to `new_name` under `new_parent`.
    pub fn rename_entry(
        &self,
        parent: InodeId,
        name: &str,
        new_parent: InodeId,
        new_name: &str,
    ) -> Result<()> {
        let source = self.directory(parent)?;
        let target = self.node(new_parent)?;
        let target = match &target {
            Node::Directory(dir) => dir,
            other => {
                return Err(FsError::InvalidRequest {
                    msg: format!("rename target {} is not a directory", other.ino()),
                })
            }
        };
        source.rename(name, target, new_name)
    }

    /// Symbolic links are not supported by the store.
    pub fn symlink_entry(&self, parent: InodeId, name: &str, target: &Path) -> Result<FileAttr> {
        Ok(self.directory(parent)?.symlink(name, target)?.attr())
    }

    /// Opens a node and returns the file handle plus the `FOPEN_*` flags.
    pub fn open_file(&self, ino: InodeId, flags: i32) -> Result<(FileHandle, u32)> {
        let (handle, open_flags) = match self.node(ino)? {
            Node::File(file) => (file.open(OpenIntent::from_libc(flags))?, 0),
            Node::Diagnostic(diag) => match OpenIntent::from_libc(flags) {
                OpenIntent::Read => (Handle::Static(diag.content()), FOPEN_DIRECT_IO),
                OpenIntent::Write { .. } => {
                    return Err(FsError::InvalidRequest {
                        msg: format!("{} is read-only", diag.name()),
                    })
                }
            },
            Node::Directory(_) => {
                return Err(FsError::InvalidRequest {
                    msg: "cannot open a directory as a file".to_string(),
                })
            }
        };
        Ok((self.handles.insert(handle), open_flags))
    }

    /// Reads through an open handle.
    pub fn read_file(&self, fh: FileHandle, offset: i64, size: u32) -> Result<Vec<u8>> {
        let offset = non_negative_offset(offset)?;
        let handle = self.handles.get(fh)?;
        let mut handle = handle.lock();
        handle.read(offset, size)
    }

    /// Stages a write through an open handle.
    pub fn write_file(&self, fh: FileHandle, offset: i64, data: &[u8]) -> Result<u32> {
        let offset = non_negative_offset(offset)?;
        let handle = self.handles.get(fh)?;
        let written = handle.lock().write(offset, data)?;
        Ok(written as u32)
    }

    /// Uploads pending writes of a handle.
    pub fn flush_file(&self, fh: FileHandle) -> Result<()> {
        let handle = self.handles.get(fh)?;
        let mut handle = handle.lock();
        handle.flush()
    }

    /// Closes a file or directory handle. Unknown handles are ignored.
    pub fn release_file(&self, fh: FileHandle) {
        if let Some(handle) = self.handles.remove(fh) {
            handle.lock().release();
        }
    }

    /// Refused for files; see [`crate::file::FileNode::fsync`].
    pub fn fsync_file(&self, ino: InodeId) -> Result<()> {
        match self.node(ino)? {
            Node::File(file) => file.fsync(),
            _ => Err(FsError::not_supported("fsync")),
        }
    }

    /// Lists the directory once and keeps the rows for the `readdir` calls
    /// that page through it.
    pub fn open_dir(&self, ino: InodeId) -> Result<FileHandle> {
        let dir = self.directory(ino)?;
        let snapshot = dir.snapshot();
        let parent_ino = if snapshot.is_root() {
            ROOT_INO
        } else {
            ino_for_id(snapshot.parent_id)
        };

        let mut rows = vec![
            DirRow {
                ino,
                kind: FileType::Directory,
                name: ".".to_string(),
            },
            DirRow {
                ino: parent_ino,
                kind: FileType::Directory,
                name: "..".to_string(),
            },
        ];
        rows.extend(dir.read_dir_all()?.iter().map(DirRow::from));
        Ok(self.handles.insert(Handle::Dir(rows)))
    }

    /// Rows captured by [`PutioFs::open_dir`] for a directory handle.
    pub fn dir_rows(&self, fh: FileHandle) -> Result<Vec<DirRow>> {
        let handle = self.handles.get(fh)?;
        let handle = handle.lock();
        match &*handle {
            Handle::Dir(rows) => Ok(rows.clone()),
            _ => Err(FsError::UnknownHandle { fh }),
        }
    }

    /// Capacity numbers from the cached account snapshot.
    pub fn statfs_info(&self) -> StatfsInfo {
        self.root.statfs()
    }
}

/// Logs a failed operation and returns the errno to reply with.
pub(crate) fn fail(op: &str, err: FsError) -> c_int {
    if err.is_io_failure() {
        warn!(op, error = %err, "operation failed");
    } else {
        debug!(op, error = %err, "operation rejected");
    }
    err.to_errno()
}

fn non_negative_offset(offset: i64) -> Result<u64> {
    u64::try_from(offset).map_err(|_| FsError::InvalidRequest {
        msg: format!("negative offset {}", offset),
    })
}
