//! Mount-scoped state shared by every node.

use crate::config::FsConfig;
use crate::dir::DirectoryNode;
use crate::error::Result;
use crate::inode::{DIAGNOSTIC_INO_BASE, ROOT_INO};
use parking_lot::RwLock;
use putiofs_remote::{AccountInfo, Entry, RemoteStore, ROOT_ID};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// Values reported to `statfs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatfsInfo {
    /// Total blocks.
    pub blocks: u64,
    /// Free blocks.
    pub bfree: u64,
    /// Blocks available to unprivileged users.
    pub bavail: u64,
    /// Total inodes; not tracked.
    pub files: u64,
    /// Free inodes; not tracked.
    pub ffree: u64,
    /// Block size.
    pub bsize: u32,
    /// Longest name accepted.
    pub namelen: u32,
    /// Fragment size.
    pub frsize: u32,
}

/// Reported name length limit.
pub const MAX_NAME_LEN: u32 = 255;

/// State shared by every node of one mount.
pub struct FileSystemRoot {
    store: Arc<dyn RemoteStore>,
    config: FsConfig,
    root_entry: Arc<RwLock<Entry>>,
    /// Refreshed eagerly at mount and lazily when `.account` is looked up.
    account: RwLock<AccountInfo>,
    next_diagnostic: AtomicU64,
}

impl FileSystemRoot {
    /// Resolves the store root and the account snapshot. Either failing
    /// aborts the mount.
    pub fn mount(store: Arc<dyn RemoteStore>, config: FsConfig) -> Result<Arc<Self>> {
        let root_entry = store.get(ROOT_ID)?;
        let account = store.account_info()?;
        info!(
            root = %root_entry.name,
            user = %account.username,
            "resolved store root"
        );
        Ok(Arc::new(Self {
            store,
            config,
            root_entry: Arc::new(RwLock::new(root_entry)),
            account: RwLock::new(account),
            next_diagnostic: AtomicU64::new(DIAGNOSTIC_INO_BASE),
        }))
    }

    /// The backing store.
    pub fn store(&self) -> &Arc<dyn RemoteStore> {
        &self.store
    }

    /// Filesystem settings.
    pub fn config(&self) -> &FsConfig {
        &self.config
    }

    /// The mount root directory.
    pub fn root_node(self: &Arc<Self>) -> DirectoryNode {
        DirectoryNode::with_snapshot(ROOT_INO, self.root_entry.clone(), self.clone())
    }

    /// Cached account snapshot.
    pub fn account(&self) -> AccountInfo {
        self.account.read().clone()
    }

    /// Fetches a fresh account snapshot, keeping the cached one if the store
    /// cannot be reached.
    pub fn refresh_account(&self) -> AccountInfo {
        match self.store.account_info() {
            Ok(fresh) => {
                *self.account.write() = fresh.clone();
                fresh
            }
            Err(e) => {
                warn!(error = %e, "could not refresh account information, serving cached copy");
                self.account()
            }
        }
    }

    /// Fresh inode number for a synthesized node.
    pub fn next_diagnostic_ino(&self) -> u64 {
        self.next_diagnostic.fetch_add(1, Ordering::Relaxed)
    }

    /// Capacity from the cached account snapshot.
    pub fn statfs(&self) -> StatfsInfo {
        let account = self.account.read();
        let unit = u64::from(self.config.block_size.max(1));
        let size = account.disk.size.max(0) as u64;
        let avail = account.disk.avail.max(0) as u64;
        StatfsInfo {
            blocks: size / unit,
            bfree: avail / unit,
            bavail: avail / unit,
            files: 0,
            ffree: 0,
            bsize: self.config.block_size,
            namelen: MAX_NAME_LEN,
            frsize: self.config.block_size,
        }
    }
}
