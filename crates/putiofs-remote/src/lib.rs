//! putiofs remote layer: put.io v2 REST client and the store abstraction
//!
//! The filesystem talks to the cloud only through [`RemoteStore`]. The
//! production implementation is [`PutioClient`]; [`MemoryStore`] keeps the
//! same semantics in process and counts calls for tests.

pub mod account;
pub mod body;
pub mod client;
pub mod entry;
pub mod error;
pub mod memory;
pub mod store;
pub mod transfer;

pub use account::{AccountInfo, DiskUsage};
pub use client::{ClientConfig, PutioClient};
pub use entry::{Entry, EntryId, ROOT_ID};
pub use error::{RemoteError, Result};
pub use memory::{CallCounts, MemoryStore};
pub use store::{ByteStream, RemoteStore};
pub use transfer::Transfer;
