//! Version index entries

use crate::EditMode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One immutable snapshot recorded in an app's `.versions/index.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionEntry {
    pub version: u32,
    pub file_name: String,
    #[serde(default)]
    pub message: Option<String>,
    pub edit_mode: EditMode,
    pub created_time: DateTime<Utc>,
}

impl VersionEntry {
    /// Archive file name for a version, e.g. `v0003_incremental.zip`
    pub fn archive_name(version: u32, edit_mode: EditMode) -> String {
        format!("v{:04}_{}.zip", version, edit_mode)
    }
}
