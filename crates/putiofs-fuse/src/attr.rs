//! Kernel attribute construction.
//!
//! The store keeps a single creation timestamp per object, so it stands in for
//! access, modification, change and birth time alike.

use crate::config::FsConfig;
use chrono::{DateTime, Utc};
use fuser::{FileAttr, FileType};
use putiofs_remote::Entry;
use std::time::SystemTime;

/// Mode bits of every directory.
pub const DIR_PERM: u16 = 0o755;
/// Mode bits of every regular file.
pub const FILE_PERM: u16 = 0o644;
/// Mode bits of the synthesized read-only files.
pub const DIAGNOSTIC_PERM: u16 = 0o400;

/// 512-byte blocks needed to hold `size` bytes.
pub fn blocks_for_size(size: u64) -> u64 {
    size.div_ceil(512)
}

/// Converts a store timestamp, falling back to the epoch when absent.
pub fn timestamp(created_at: Option<DateTime<Utc>>) -> SystemTime {
    created_at.map(SystemTime::from).unwrap_or(SystemTime::UNIX_EPOCH)
}

/// Attributes for a node backed by a remote entry.
pub fn entry_attr(ino: u64, entry: &Entry, config: &FsConfig) -> FileAttr {
    let time = timestamp(entry.created_at);
    let (kind, perm, nlink) = if entry.is_dir {
        (FileType::Directory, DIR_PERM, 2)
    } else {
        (FileType::RegularFile, FILE_PERM, 1)
    };
    FileAttr {
        ino,
        size: entry.size,
        blocks: blocks_for_size(entry.size),
        atime: time,
        mtime: time,
        ctime: time,
        crtime: time,
        kind,
        perm,
        nlink,
        uid: config.uid,
        gid: config.gid,
        rdev: 0,
        blksize: config.block_size,
        flags: 0,
    }
}

/// Attributes for a synthesized read-only file of `len` bytes.
pub fn diagnostic_attr(ino: u64, len: u64, config: &FsConfig) -> FileAttr {
    let now = SystemTime::now();
    FileAttr {
        ino,
        size: len,
        blocks: blocks_for_size(len),
        atime: now,
        mtime: now,
        ctime: now,
        crtime: now,
        kind: FileType::RegularFile,
        perm: DIAGNOSTIC_PERM,
        nlink: 1,
        uid: config.uid,
        gid: config.gid,
        rdev: 0,
        blksize: config.block_size,
        flags: 0,
    }
}
