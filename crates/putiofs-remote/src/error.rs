use crate::entry::EntryId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Remote returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to decode remote response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Entry not found: {id}")]
    NotFound { id: EntryId },

    #[error("Entry is not a directory: {id}")]
    NotDirectory { id: EntryId },

    #[error("Upload response did not describe a file")]
    MissingFile,
}

pub type Result<T> = std::result::Result<T, RemoteError>;

impl RemoteError {
    /// Whether the remote reported that the addressed object does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            RemoteError::NotFound { .. } => true,
            RemoteError::Status { status, .. } => *status == 404,
            _ => false,
        }
    }
}
