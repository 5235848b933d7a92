//! The remote store interface consumed by the filesystem.
//!
//! Every call is synchronous and blocks the caller until the store answers.
//! There is no partial update: content only reaches the store through
//! [`RemoteStore::upload`], which always creates a new object.

use crate::account::AccountInfo;
use crate::entry::{Entry, EntryId};
use crate::error::Result;
use crate::transfer::Transfer;
use std::fs::File;
use std::io::Read;

/// Forward-only byte stream returned by ranged downloads.
pub type ByteStream = Box<dyn Read + Send>;

pub trait RemoteStore: Send + Sync {
    /// List the direct children of a folder.
    fn list(&self, parent_id: EntryId) -> Result<Vec<Entry>>;
    /// Fetch one entry by id.
    fn get(&self, id: EntryId) -> Result<Entry>;
    /// Delete an entry (folders are removed with their contents).
    fn delete(&self, id: EntryId) -> Result<()>;
    /// Change the name of an entry in place.
    fn rename(&self, id: EntryId, new_name: &str) -> Result<()>;
    /// Re-parent an entry, keeping its name.
    fn move_entry(&self, new_parent_id: EntryId, id: EntryId) -> Result<()>;
    /// Create a folder and return its record.
    fn create_folder(&self, name: &str, parent_id: EntryId) -> Result<Entry>;
    /// Upload `source` from its current position to the end as a new object.
    ///
    /// The file is streamed, so its content never has to fit in memory.
    fn upload(&self, source: File, name: &str, parent_id: EntryId) -> Result<Entry>;
    /// Open a stream starting at `offset`; `None` length reads to the end.
    fn download_range(&self, id: EntryId, offset: u64, length: Option<u64>) -> Result<ByteStream>;
    /// Fetch the account snapshot.
    fn account_info(&self) -> Result<AccountInfo>;
    /// List the transfer queue.
    fn list_transfers(&self) -> Result<Vec<Transfer>>;
}

/// Builds the HTTP `Range` header value for a download request.
pub fn range_header(offset: u64, length: Option<u64>) -> String {
    match length {
        Some(len) if len > 0 => format!("bytes={}-{}", offset, offset + len - 1),
        _ => format!("bytes={}-", offset),
    }
}
