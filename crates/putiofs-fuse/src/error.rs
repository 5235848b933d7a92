//! Filesystem errors and their errno mapping.

use putiofs_remote::RemoteError;
use thiserror::Error;

/// Every failure a filesystem operation can report.
#[derive(Debug, Error)]
pub enum FsError {
    /// The name does not exist in the directory.
    #[error("No such entry: {name}")]
    NotFound {
        /// Name that was looked for.
        name: String,
    },

    /// A create or mkdir collided with an existing name.
    #[error("Name already exists: {name}")]
    AlreadyExists {
        /// The colliding name.
        name: String,
    },

    /// The store call failed.
    #[error("Remote store error: {0}")]
    Remote(#[from] RemoteError),

    /// Local staging I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A pseudo-file could not be rendered.
    #[error("Failed to render content: {0}")]
    Encode(#[from] serde_json::Error),

    /// The store has no way to do this.
    #[error("Operation not supported: {op}")]
    NotSupported {
        /// Operation name.
        op: String,
    },

    /// The request itself is not acceptable.
    #[error("Invalid request: {msg}")]
    InvalidRequest {
        /// What was wrong.
        msg: String,
    },

    /// A directory operation named a non-directory inode.
    #[error("Not a directory: {ino}")]
    NotDirectory {
        /// The inode.
        ino: u64,
    },

    /// The kernel named an inode that is not registered.
    #[error("Unknown inode: {ino}")]
    UnknownInode {
        /// The inode.
        ino: u64,
    },

    /// The kernel named a handle that is not open.
    #[error("Unknown file handle: {fh}")]
    UnknownHandle {
        /// The handle number.
        fh: u64,
    },
}

/// Result alias for filesystem operations.
pub type Result<T> = std::result::Result<T, FsError>;

impl FsError {
    /// `name` does not exist.
    pub fn not_found(name: &str) -> Self {
        FsError::NotFound {
            name: name.to_string(),
        }
    }

    /// The store or filesystem cannot do `op`.
    pub fn not_supported(op: &str) -> Self {
        FsError::NotSupported { op: op.to_string() }
    }

    /// Wraps a store error, turning "no such object" into `NotFound` for
    /// `name`.
    pub fn from_remote(err: RemoteError, name: &str) -> Self {
        if err.is_not_found() {
            FsError::not_found(name)
        } else {
            FsError::Remote(err)
        }
    }

    /// The errno reported to the kernel.
    pub fn to_errno(&self) -> i32 {
        use libc::*;
        match self {
            FsError::NotFound { .. } => ENOENT,
            FsError::AlreadyExists { .. } => EEXIST,
            FsError::Remote(_) => EIO,
            FsError::Io(_) => EIO,
            FsError::Encode(_) => EIO,
            FsError::NotSupported { .. } => ENOTSUP,
            FsError::InvalidRequest { .. } => EINVAL,
            FsError::NotDirectory { .. } => ENOTDIR,
            FsError::UnknownInode { .. } => ENOENT,
            FsError::UnknownHandle { .. } => EBADF,
        }
    }

    /// Whether the failure came from the remote store or local staging,
    /// rather than from the request itself.
    pub fn is_io_failure(&self) -> bool {
        matches!(self, FsError::Remote(_) | FsError::Io(_) | FsError::Encode(_))
    }
}
