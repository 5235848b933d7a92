//! Open handles and the table the kernel's `fh` numbers index into.
//!
//! Each handle sits behind its own mutex. The table lock is only held long
//! enough to clone the handle out, so a slow remote call on one handle never
//! blocks opening, reading or releasing another.

use crate::dir::DirEntry;
use crate::diag::slice_at;
use crate::error::{FsError, Result};
use crate::inode::InodeId;
use crate::read_handle::ReadHandle;
use crate::write_handle::WriteHandle;
use dashmap::DashMap;
use fuser::FileType;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Handle number handed to the kernel.
pub type FileHandle = u64;

/// A handle shared between the table and in-flight operations.
pub type SharedHandle = Arc<Mutex<Handle>>;

/// What an `open` asks for. A handle serves exactly one of the two roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenIntent {
    /// Read-only access.
    Read,
    /// Write or read-write access.
    Write {
        /// `O_APPEND` was requested.
        append: bool,
    },
}

impl OpenIntent {
    /// Decodes the access mode of `open(2)` flags.
    pub fn from_libc(flags: i32) -> Self {
        match flags & libc::O_ACCMODE {
            libc::O_RDONLY => OpenIntent::Read,
            _ => OpenIntent::Write {
                append: flags & libc::O_APPEND != 0,
            },
        }
    }
}

/// A `readdir` row captured at `opendir` time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirRow {
    /// Inode of the child.
    pub ino: InodeId,
    /// File type reported to the kernel.
    pub kind: FileType,
    /// Child name.
    pub name: String,
}

impl From<&DirEntry> for DirRow {
    fn from(entry: &DirEntry) -> Self {
        Self {
            ino: entry.ino(),
            kind: entry.file_type(),
            name: entry.name.clone(),
        }
    }
}

/// Everything a kernel file handle can refer to.
pub enum Handle {
    /// A streaming reader over remote content.
    Read(ReadHandle),
    /// A staging writer.
    Write(WriteHandle),
    /// Synthesized content fixed at lookup.
    Static(Arc<[u8]>),
    /// Directory rows listed at `opendir`.
    Dir(Vec<DirRow>),
}

impl Handle {
    /// Reads up to `size` bytes at `offset`.
    pub fn read(&mut self, offset: u64, size: u32) -> Result<Vec<u8>> {
        match self {
            Handle::Read(h) => h.read(offset, size),
            Handle::Static(data) => Ok(slice_at(data, offset, size).to_vec()),
            Handle::Write(_) => Err(FsError::not_supported("read on a write handle")),
            Handle::Dir(_) => Err(FsError::InvalidRequest {
                msg: "read on a directory handle".to_string(),
            }),
        }
    }

    /// Writes `data` at `offset`; only write handles accept this.
    pub fn write(&mut self, offset: u64, data: &[u8]) -> Result<usize> {
        match self {
            Handle::Write(h) => h.write(offset, data),
            _ => Err(FsError::InvalidRequest {
                msg: "handle is not open for writing".to_string(),
            }),
        }
    }

    /// Pushes pending writes to the store.
    pub fn flush(&mut self) -> Result<()> {
        match self {
            Handle::Write(h) => h.flush(),
            _ => Ok(()),
        }
    }

    /// Drops streams and staged data held by the handle.
    pub fn release(&mut self) {
        match self {
            Handle::Read(h) => h.release(),
            Handle::Write(h) => h.release(),
            Handle::Static(_) | Handle::Dir(_) => {}
        }
    }
}

/// Open handles keyed by the file handle number given to the kernel.
pub struct HandleTable {
    next_fh: AtomicU64,
    handles: DashMap<FileHandle, SharedHandle>,
}

impl HandleTable {
    /// An empty table; handle numbers start at 1.
    pub fn new() -> Self {
        Self {
            next_fh: AtomicU64::new(1),
            handles: DashMap::new(),
        }
    }

    /// Stores `handle` under a fresh number.
    pub fn insert(&self, handle: Handle) -> FileHandle {
        let fh = self.next_fh.fetch_add(1, Ordering::Relaxed);
        self.handles.insert(fh, Arc::new(Mutex::new(handle)));
        fh
    }

    /// Clones the handle out of the table. Lock it to operate on it.
    pub fn get(&self, fh: FileHandle) -> Result<SharedHandle> {
        self.handles
            .get(&fh)
            .map(|handle| handle.value().clone())
            .ok_or(FsError::UnknownHandle { fh })
    }

    /// Takes the handle out of the table.
    pub fn remove(&self, fh: FileHandle) -> Option<SharedHandle> {
        self.handles.remove(&fh).map(|(_, handle)| handle)
    }

    /// Number of open handles.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Whether no handle is open.
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

impl Default for HandleTable {
    fn default() -> Self {
        Self::new()
    }
}
