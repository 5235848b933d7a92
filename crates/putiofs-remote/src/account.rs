use serde::{Deserialize, Serialize};

/// Storage quota as reported by the store, in bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiskUsage {
    pub avail: i64,
    pub size: i64,
    pub used: i64,
}

/// Account snapshot. Only the fields the filesystem displays or uses for
/// `statfs` are modelled; unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountInfo {
    pub username: String,
    pub mail: String,
    pub user_id: i64,
    pub account_active: bool,
    pub plan_expiration_date: Option<String>,
    pub days_until_files_deletion: i64,
    pub simultaneous_download_limit: i64,
    pub disk: DiskUsage,
}
