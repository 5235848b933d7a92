use serde::{Deserialize, Serialize};

pub const STATUS_COMPLETED: &str = "COMPLETED";

/// One entry of the store's transfer queue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Transfer {
    pub id: i64,
    pub name: String,
    pub status: String,
    pub downloaded: i64,
    pub size: i64,
    #[serde(rename = "down_speed")]
    pub download_speed: i64,
    #[serde(rename = "up_speed")]
    pub upload_speed: i64,
    pub percent_done: i64,
}

impl Transfer {
    pub fn is_completed(&self) -> bool {
        self.status == STATUS_COMPLETED
    }
}
