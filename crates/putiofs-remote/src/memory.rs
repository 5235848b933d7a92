//! In-process [`RemoteStore`] used by tests and local development.
//!
//! Mirrors the store semantics the filesystem depends on: upload always
//! creates a new object, delete of a folder removes its subtree, and every
//! call is counted so tests can assert how many remote round trips an
//! operation made.

use crate::account::AccountInfo;
use crate::entry::{Entry, EntryId, ROOT_ID};
use crate::error::{RemoteError, Result};
use crate::store::{ByteStream, RemoteStore};
use crate::transfer::Transfer;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Cursor, Read};

pub const ROOT_NAME: &str = "Your Files";

/// Number of calls made per [`RemoteStore`] operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub list: usize,
    pub get: usize,
    pub delete: usize,
    pub rename: usize,
    pub moves: usize,
    pub create_folder: usize,
    pub upload: usize,
    pub download: usize,
    pub account_info: usize,
    pub list_transfers: usize,
}

impl CallCounts {
    pub fn total(&self) -> usize {
        self.list
            + self.get
            + self.delete
            + self.rename
            + self.moves
            + self.create_folder
            + self.upload
            + self.download
            + self.account_info
            + self.list_transfers
    }
}

struct Object {
    entry: Entry,
    data: Vec<u8>,
}

struct Inner {
    objects: BTreeMap<EntryId, Object>,
    next_id: EntryId,
    calls: CallCounts,
    ops: Vec<&'static str>,
    account: AccountInfo,
    transfers: Vec<Transfer>,
    failing: bool,
}

impl Inner {
    fn insert(&mut self, mut entry: Entry, data: Vec<u8>) -> Entry {
        entry.id = self.next_id;
        self.next_id += 1;
        if entry.created_at.is_none() {
            entry.created_at = Some(Utc::now());
        }
        self.objects.insert(
            entry.id,
            Object {
                entry: entry.clone(),
                data,
            },
        );
        entry
    }

    /// Logs `op` and fails it if the store is switched into failing mode.
    fn record(&mut self, op: &'static str) -> Result<()> {
        self.ops.push(op);
        if self.failing {
            return Err(RemoteError::Status {
                status: 503,
                body: "memory store is failing".to_string(),
            });
        }
        Ok(())
    }

    fn directory(&self, id: EntryId) -> Result<&Entry> {
        let object = self.objects.get(&id).ok_or(RemoteError::NotFound { id })?;
        if !object.entry.is_dir {
            return Err(RemoteError::NotDirectory { id });
        }
        Ok(&object.entry)
    }

    fn descendants(&self, id: EntryId) -> Vec<EntryId> {
        let mut out = vec![id];
        let mut i = 0;
        while i < out.len() {
            let current = out[i];
            out.extend(
                self.objects
                    .values()
                    .filter(|o| o.entry.parent_id == current && o.entry.id != current)
                    .map(|o| o.entry.id),
            );
            i += 1;
        }
        out
    }
}

pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let mut objects = BTreeMap::new();
        objects.insert(
            ROOT_ID,
            Object {
                entry: Entry::directory(ROOT_ID, ROOT_NAME, ROOT_ID),
                data: Vec::new(),
            },
        );
        Self {
            inner: Mutex::new(Inner {
                objects,
                next_id: 1,
                calls: CallCounts::default(),
                ops: Vec::new(),
                account: AccountInfo::default(),
                transfers: Vec::new(),
                failing: false,
            }),
        }
    }

    /// Seed a folder without counting a remote call.
    pub fn add_dir(&self, parent_id: EntryId, name: &str) -> Entry {
        self.inner
            .lock()
            .insert(Entry::directory(0, name, parent_id), Vec::new())
    }

    /// Seed a file without counting a remote call.
    pub fn add_file(&self, parent_id: EntryId, name: &str, data: &[u8]) -> Entry {
        self.inner.lock().insert(
            Entry::file(0, name, data.len() as u64, parent_id),
            data.to_vec(),
        )
    }

    pub fn contents(&self, id: EntryId) -> Option<Vec<u8>> {
        self.inner.lock().objects.get(&id).map(|o| o.data.clone())
    }

    pub fn entry(&self, id: EntryId) -> Option<Entry> {
        self.inner.lock().objects.get(&id).map(|o| o.entry.clone())
    }

    /// First child of `parent_id` named `name`, uncounted.
    pub fn find(&self, parent_id: EntryId, name: &str) -> Option<Entry> {
        self.inner
            .lock()
            .objects
            .values()
            .find(|o| o.entry.parent_id == parent_id && o.entry.id != parent_id && o.entry.name == name)
            .map(|o| o.entry.clone())
    }

    pub fn calls(&self) -> CallCounts {
        self.inner.lock().calls.clone()
    }

    /// Operations in the order they were called, seeding excluded.
    pub fn ops(&self) -> Vec<&'static str> {
        self.inner.lock().ops.clone()
    }

    /// Zeroes the counters and clears the operation log.
    pub fn reset_calls(&self) {
        let mut inner = self.inner.lock();
        inner.calls = CallCounts::default();
        inner.ops.clear();
    }

    pub fn set_account(&self, account: AccountInfo) {
        self.inner.lock().account = account;
    }

    pub fn set_transfers(&self, transfers: Vec<Transfer>) {
        self.inner.lock().transfers = transfers;
    }

    /// Make every subsequent call fail with a 503 until reset.
    pub fn set_failing(&self, failing: bool) {
        self.inner.lock().failing = failing;
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteStore for MemoryStore {
    fn list(&self, parent_id: EntryId) -> Result<Vec<Entry>> {
        let mut inner = self.inner.lock();
        inner.calls.list += 1;
        inner.record("list")?;
        inner.directory(parent_id)?;
        Ok(inner
            .objects
            .values()
            .filter(|o| o.entry.parent_id == parent_id && o.entry.id != parent_id)
            .map(|o| o.entry.clone())
            .collect())
    }

    fn get(&self, id: EntryId) -> Result<Entry> {
        let mut inner = self.inner.lock();
        inner.calls.get += 1;
        inner.record("get")?;
        inner
            .objects
            .get(&id)
            .map(|o| o.entry.clone())
            .ok_or(RemoteError::NotFound { id })
    }

    fn delete(&self, id: EntryId) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.calls.delete += 1;
        inner.record("delete")?;
        if !inner.objects.contains_key(&id) {
            return Err(RemoteError::NotFound { id });
        }
        for victim in inner.descendants(id) {
            inner.objects.remove(&victim);
        }
        Ok(())
    }

    fn rename(&self, id: EntryId, new_name: &str) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.calls.rename += 1;
        inner.record("rename")?;
        let object = inner
            .objects
            .get_mut(&id)
            .ok_or(RemoteError::NotFound { id })?;
        object.entry.name = new_name.to_string();
        Ok(())
    }

    fn move_entry(&self, new_parent_id: EntryId, id: EntryId) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.calls.moves += 1;
        inner.record("move")?;
        inner.directory(new_parent_id)?;
        let object = inner
            .objects
            .get_mut(&id)
            .ok_or(RemoteError::NotFound { id })?;
        object.entry.parent_id = new_parent_id;
        Ok(())
    }

    fn create_folder(&self, name: &str, parent_id: EntryId) -> Result<Entry> {
        let mut inner = self.inner.lock();
        inner.calls.create_folder += 1;
        inner.record("create_folder")?;
        inner.directory(parent_id)?;
        Ok(inner.insert(Entry::directory(0, name, parent_id), Vec::new()))
    }

    fn upload(&self, mut source: File, name: &str, parent_id: EntryId) -> Result<Entry> {
        let mut data = Vec::new();
        source.read_to_end(&mut data)?;
        let mut inner = self.inner.lock();
        inner.calls.upload += 1;
        inner.record("upload")?;
        inner.directory(parent_id)?;
        Ok(inner.insert(Entry::file(0, name, data.len() as u64, parent_id), data))
    }

    fn download_range(&self, id: EntryId, offset: u64, length: Option<u64>) -> Result<ByteStream> {
        let mut inner = self.inner.lock();
        inner.calls.download += 1;
        inner.record("download")?;
        let object = inner.objects.get(&id).ok_or(RemoteError::NotFound { id })?;
        let start = (offset as usize).min(object.data.len());
        let end = match length {
            Some(len) => start.saturating_add(len as usize).min(object.data.len()),
            None => object.data.len(),
        };
        Ok(Box::new(Cursor::new(object.data[start..end].to_vec())))
    }

    fn account_info(&self) -> Result<AccountInfo> {
        let mut inner = self.inner.lock();
        inner.calls.account_info += 1;
        inner.record("account_info")?;
        Ok(inner.account.clone())
    }

    fn list_transfers(&self) -> Result<Vec<Transfer>> {
        let mut inner = self.inner.lock();
        inner.calls.list_transfers += 1;
        inner.record("list_transfers")?;
        Ok(inner.transfers.clone())
    }
}
