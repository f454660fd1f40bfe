use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// The backend's rotating QR token for one company.
///
/// Issued and owned exclusively by the backend; this client only ever holds a
/// read-only, possibly-stale copy. `updated_at` is reported by the `version`
/// endpoint but not by `current`, so it is optional here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QrTokenRecord {
    pub token: String,
    pub token_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}
