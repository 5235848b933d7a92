//! Common fixtures for filesystem integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use putiofs_fuse::{FsConfig, PutioFs};
use putiofs_fuse::session::build_filesystem;
use putiofs_remote::{Entry, MemoryStore, ROOT_ID};

pub const ROOT_INO: u64 = putiofs_fuse::inode::ROOT_INO;

/// A mounted filesystem over an in-memory store, not attached to a kernel.
pub struct Fixture {
    pub store: Arc<MemoryStore>,
    pub fs: PutioFs,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_store(MemoryStore::new())
    }

    /// Mounts over a pre-seeded store and zeroes the call counters so tests
    /// only see the calls they cause.
    pub fn with_store(store: MemoryStore) -> Self {
        let store = Arc::new(store);
        let fs = build_filesystem(store.clone(), FsConfig::default()).expect("mount");
        store.reset_calls();
        Self { store, fs }
    }

    pub fn seed_file(&self, name: &str, data: &[u8]) -> Entry {
        self.store.add_file(ROOT_ID, name, data)
    }

    pub fn seed_dir(&self, name: &str) -> Entry {
        self.store.add_dir(ROOT_ID, name)
    }

    /// Looks `name` up under `parent` and returns its inode number.
    pub fn lookup(&self, parent: u64, name: &str) -> u64 {
        self.fs.lookup_entry(parent, name).expect("lookup").0.ino
    }

    pub fn open_read(&self, ino: u64) -> u64 {
        self.fs.open_file(ino, libc::O_RDONLY).expect("open").0
    }

    /// Reads the whole file through one handle in `chunk`-sized requests.
    pub fn read_all(&self, ino: u64, chunk: u32) -> Vec<u8> {
        let fh = self.open_read(ino);
        let mut out = Vec::new();
        loop {
            let data = self
                .fs
                .read_file(fh, out.len() as i64, chunk)
                .expect("read");
            if data.is_empty() {
                break;
            }
            out.extend_from_slice(&data);
        }
        self.fs.release_file(fh);
        out
    }

    pub fn names(&self, ino: u64) -> Vec<String> {
        let fh = self.fs.open_dir(ino).expect("opendir");
        let rows = self.fs.dir_rows(fh).expect("rows");
        self.fs.release_file(fh);
        rows.into_iter().map(|r| r.name).collect()
    }
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Deterministic content of `len` bytes.
pub fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}
