use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A validated report that has not been persisted yet.
///
/// Built from an inbound payload by `NewReport::try_from(&serde_json::Value)`;
/// the identity and `created_at` are assigned by the store on insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReport {
    pub full_name: String,
    pub order_id: i64,
    pub issue: String,
    pub report_problem: Option<String>,
}

impl NewReport {
    /// Attaches the store-assigned identity and creation time.
    pub fn into_report(self, id: String, created_at: DateTime<Utc>) -> Report {
        Report {
            id,
            full_name: self.full_name,
            order_id: self.order_id,
            issue: self.issue,
            report_problem: self.report_problem,
            created_at,
        }
    }
}

/// A report as stored, serialized with the same field names the client submits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    /// Opaque store-assigned identifier (hex ObjectId).
    #[serde(rename = "_id")]
    pub id: String,
    pub full_name: String,
    pub order_id: i64,
    pub issue: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_problem: Option<String>,
    /// Set once at creation, never updated.
    pub created_at: DateTime<Utc>,
}
