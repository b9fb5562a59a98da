use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::{ReportStatus, ReportTarget};

/// A moderation report filed by any account.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Report {
    pub id: String,
    pub reporter_id: String,
    pub target: ReportTarget,
    pub target_id: String,
    pub reason: String,
    pub status: ReportStatus,
    pub resolver_id: Option<String>,
    pub resolution_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
