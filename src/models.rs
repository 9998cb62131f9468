use serde::{Deserialize, Serialize};

use crate::view::{Filter, SortOrder};

pub type TaskId = i64;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub text: String,
    // Older entries may predate the flag.
    #[serde(default)]
    pub completed: bool,
    /// RFC 3339 UTC timestamp, e.g. `2024-01-01T09:30:00.000Z`.
    pub created_at: String,
}

impl Task {
    pub fn is_active(&self) -> bool {
        !self.completed
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct TaskStats {
    pub total: usize,
    pub active: usize,
    pub completed: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub struct Settings {
    #[serde(default)]
    pub filter: Filter,
    #[serde(default)]
    pub sort: SortOrder,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SettingsFile {
    pub schema_version: u32,
    pub settings: Settings,
}
