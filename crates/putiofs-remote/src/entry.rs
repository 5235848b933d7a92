//! Remote file and folder records.
//!
//! An [`Entry`] is an immutable snapshot of one object as the remote store
//! reported it at fetch time. The wire form differs from the in-memory form:
//! the store tags folders through their content type and sends zone-less UTC
//! timestamps, both of which are normalized while decoding.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

pub type EntryId = i64;

/// Identifier of the store root ("Your Files").
pub const ROOT_ID: EntryId = 0;

/// Content type the store assigns to folders.
pub const DIRECTORY_CONTENT_TYPE: &str = "application/x-directory";

const CREATED_AT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "FileRecord")]
pub struct Entry {
    pub id: EntryId,
    pub name: String,
    pub size: u64,
    pub is_dir: bool,
    pub parent_id: EntryId,
    pub created_at: Option<DateTime<Utc>>,
}

impl Entry {
    pub fn directory(id: EntryId, name: &str, parent_id: EntryId) -> Self {
        Self {
            id,
            name: name.to_string(),
            size: 0,
            is_dir: true,
            parent_id,
            created_at: None,
        }
    }

    pub fn file(id: EntryId, name: &str, size: u64, parent_id: EntryId) -> Self {
        Self {
            id,
            name: name.to_string(),
            size,
            is_dir: false,
            parent_id,
            created_at: None,
        }
    }

    pub fn is_root(&self) -> bool {
        self.id == ROOT_ID
    }
}

#[derive(Deserialize)]
struct FileRecord {
    id: EntryId,
    #[serde(default)]
    name: String,
    #[serde(default)]
    size: Option<i64>,
    #[serde(default)]
    content_type: Option<String>,
    #[serde(default)]
    is_dir: Option<bool>,
    #[serde(default)]
    parent_id: Option<EntryId>,
    #[serde(default, deserialize_with = "deserialize_created_at")]
    created_at: Option<DateTime<Utc>>,
}

impl From<FileRecord> for Entry {
    fn from(record: FileRecord) -> Self {
        let is_dir = record
            .is_dir
            .unwrap_or_else(|| record.content_type.as_deref() == Some(DIRECTORY_CONTENT_TYPE));
        Entry {
            id: record.id,
            name: record.name,
            size: record.size.unwrap_or(0).max(0) as u64,
            is_dir,
            parent_id: record.parent_id.unwrap_or(ROOT_ID),
            created_at: record.created_at,
        }
    }
}

/// Parses a creation timestamp as sent by the store.
///
/// The store omits the zone designator; values are UTC. RFC 3339 input (as
/// produced when an [`Entry`] is serialized back out) is accepted as well.
pub fn parse_created_at(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, CREATED_AT_FORMAT) {
        return Some(naive.and_utc());
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn deserialize_created_at<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_created_at))
}
