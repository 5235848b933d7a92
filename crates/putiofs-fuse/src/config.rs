//! Mount-scoped filesystem settings.

use nix::unistd::{getgid, getuid};
use std::time::Duration;

/// Store root name as the store reports it.
pub const SENTINEL_NAME: &str = "Your Files";

/// Mount-scoped filesystem settings.
#[derive(Debug, Clone)]
pub struct FsConfig {
    /// How long the kernel may cache node attributes.
    pub attr_ttl: Duration,
    /// How long the kernel may cache a name lookup.
    pub entry_ttl: Duration,
    /// Owner reported for every node.
    pub uid: u32,
    /// Group reported for every node.
    pub gid: u32,
    /// Block size reported by `statfs` and in attributes.
    pub block_size: u32,
    /// Names that `unlink`/`rmdir` refuse to remove.
    pub protected_names: Vec<String>,
}

impl Default for FsConfig {
    fn default() -> Self {
        Self {
            attr_ttl: Duration::from_secs(60 * 60),
            entry_ttl: Duration::from_secs(60 * 60),
            uid: 0,
            gid: 0,
            block_size: 4096,
            protected_names: vec!["/".to_string(), SENTINEL_NAME.to_string()],
        }
    }
}

impl FsConfig {
    /// Default settings owned by the calling process's user and group.
    pub fn for_current_user() -> Self {
        Self {
            uid: getuid().as_raw(),
            gid: getgid().as_raw(),
            ..Default::default()
        }
    }

    /// Whether `name` may never be removed.
    pub fn is_protected(&self, name: &str) -> bool {
        self.protected_names.iter().any(|p| p == name)
    }
}
