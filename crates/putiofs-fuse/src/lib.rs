//! putiofs FUSE subsystem.
//!
//! Presents a put.io account as a mountable filesystem. Directories and
//! files are nodes backed by remote entries; opened files are read or
//! write handles that stream from, or stage uploads to, the store.

#![warn(missing_docs)]

pub mod attr;
pub mod config;
pub mod diag;
pub mod dir;
pub mod dispatch;
pub mod error;
pub mod file;
pub mod filesystem;
pub mod inode;
pub mod junk;
pub mod mount;
pub mod node;
pub mod openfile;
pub mod read_handle;
pub mod root;
pub mod session;
pub mod write_handle;

pub use config::FsConfig;
pub use dispatch::PutioFuse;
pub use error::{FsError, Result};
pub use filesystem::PutioFs;
pub use mount::{MountError, MountOptions};
pub use root::FileSystemRoot;
pub use session::{Session, SessionConfig};
