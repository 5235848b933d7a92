//! Pseudo-files resolvable under any directory.
//!
//! Content is rendered once, when the name is looked up, and then served
//! unchanged to every read through that lookup. These names never appear
//! in listings.

use crate::attr::diagnostic_attr;
use crate::error::{FsError, Result};
use crate::inode::InodeId;
use crate::root::FileSystemRoot;
use comfy_table::presets::NOTHING;
use comfy_table::Table;
use fuser::FileAttr;
use putiofs_remote::{EntryId, Transfer};
use std::sync::Arc;
use tracing::debug;

/// Account snapshot as JSON.
pub const ACCOUNT_FILE: &str = ".account";
/// Transfer queue as a table.
pub const TRANSFERS_FILE: &str = ".transfers";
/// Store record of the containing directory as JSON.
pub const STAT_FILE: &str = ".stat";

/// Content of the transfers file when the queue is empty.
pub const NO_TRANSFERS: &str = "No transfers found\n";

/// Whether `name` is reserved for a pseudo-file.
pub fn is_diagnostic_name(name: &str) -> bool {
    matches!(name, ACCOUNT_FILE | TRANSFERS_FILE | STAT_FILE)
}

/// A pseudo-file with content fixed at lookup.
#[derive(Clone)]
pub struct DiagnosticNode {
    ino: InodeId,
    name: &'static str,
    content: Arc<[u8]>,
    root: Arc<FileSystemRoot>,
}

impl DiagnosticNode {
    /// Renders the pseudo-file called `name` as seen from directory `dir_id`,
    /// or returns `None` when `name` is not reserved.
    pub fn build(name: &str, dir_id: EntryId, root: &Arc<FileSystemRoot>) -> Result<Option<Self>> {
        let (name, content) = match name {
            ACCOUNT_FILE => (ACCOUNT_FILE, serde_json::to_vec_pretty(&root.refresh_account())?),
            TRANSFERS_FILE => {
                let transfers = root.store().list_transfers()?;
                (TRANSFERS_FILE, format_transfers(&transfers).into_bytes())
            }
            STAT_FILE => {
                let entry = root
                    .store()
                    .get(dir_id)
                    .map_err(|e| FsError::from_remote(e, STAT_FILE))?;
                (STAT_FILE, serde_json::to_vec_pretty(&entry)?)
            }
            _ => return Ok(None),
        };
        debug!(name, dir_id, bytes = content.len(), "rendered pseudo-file");
        Ok(Some(Self {
            ino: root.next_diagnostic_ino(),
            name,
            content: content.into(),
            root: root.clone(),
        }))
    }

    /// Inode handed out for this lookup.
    pub fn ino(&self) -> InodeId {
        self.ino
    }

    /// Reserved name.
    pub fn name(&self) -> &str {
        self.name
    }

    /// Rendered bytes.
    pub fn content(&self) -> Arc<[u8]> {
        self.content.clone()
    }

    /// Read-only attributes sized to the content.
    pub fn attr(&self) -> FileAttr {
        diagnostic_attr(self.ino, self.content.len() as u64, self.root.config())
    }
}

/// Returns the part of `data` a read of `size` bytes at `offset` covers.
pub fn slice_at(data: &[u8], offset: u64, size: u32) -> &[u8] {
    let start = usize::try_from(offset).unwrap_or(usize::MAX).min(data.len());
    let end = start.saturating_add(size as usize).min(data.len());
    &data[start..end]
}

/// Renders the transfer queue as a borderless table.
pub fn format_transfers(transfers: &[Transfer]) -> String {
    if transfers.is_empty() {
        return NO_TRANSFERS.to_string();
    }

    let mut table = Table::new();
    table.load_preset(NOTHING);
    table.set_header(vec!["Name", "Status", "▼", "▲"]);
    for transfer in transfers {
        let (status, down, up) = if transfer.is_completed() {
            ("✓".to_string(), String::new(), String::new())
        } else {
            (
                format!(
                    "{}/{}",
                    humanize_bytes(non_negative(transfer.downloaded)),
                    humanize_bytes(non_negative(transfer.size))
                ),
                format!("{}/s", humanize_bytes(non_negative(transfer.download_speed))),
                format!("{}/s", humanize_bytes(non_negative(transfer.upload_speed))),
            )
        };
        table.add_row(vec![transfer.name.clone(), status, down, up]);
    }
    format!("{table}\n")
}

fn non_negative(value: i64) -> u64 {
    value.max(0) as u64
}

/// SI (base 1000) rendering of a byte count: `1.5kB`, `12kB`, `7B`.
pub fn humanize_bytes(bytes: u64) -> String {
    const SUFFIXES: [&str; 7] = ["B", "kB", "MB", "GB", "TB", "PB", "EB"];
    if bytes < 10 {
        return format!("{}B", bytes);
    }
    let mut exp = 0;
    let mut scaled = bytes as f64;
    while scaled >= 1000.0 && exp < SUFFIXES.len() - 1 {
        scaled /= 1000.0;
        exp += 1;
    }
    let value = (scaled * 10.0 + 0.5).floor() / 10.0;
    if value < 10.0 {
        format!("{:.1}{}", value, SUFFIXES[exp])
    } else {
        format!("{:.0}{}", value, SUFFIXES[exp])
    }
}
