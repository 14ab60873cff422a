//! # Alert Records
//!
//! The JSON shapes exchanged by the Quick Shield endpoint. Field names are
//! camelCase on the wire (`userId`) because the browser front end sends
//! and reads them that way.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Status written on every alert. Never taken from the request.
pub const QUICK_SHIELD_STATUS: &str = "Quick Shield Activated";

/// User id recorded when the request does not name one.
pub const GUEST_USER_ID: &str = "Guest";

/// Body accepted by `POST /quick-shield`.
///
/// Every field is optional and unknown fields are ignored, so `{}` and
/// `{"userId": null}` are both valid requests.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickShieldRequest {
    #[serde(default)]
    pub user_id: Option<String>,
}

/// One persisted Quick Shield activation.
///
/// The same value is written to disk and returned in the response, so the
/// two always deep-equal each other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertRecord {
    pub user_id: String,
    pub timestamp: String,
    pub status: String,
}

impl AlertRecord {
    /// Build an alert stamped at `at`.
    ///
    /// A missing or empty user id falls back to [`GUEST_USER_ID`].
    pub fn new(user_id: Option<String>, at: DateTime<Utc>) -> Self {
        let user_id = user_id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| GUEST_USER_ID.to_string());

        Self {
            user_id,
            timestamp: iso_timestamp(at),
            status: QUICK_SHIELD_STATUS.to_string(),
        }
    }

    pub fn from_request(request: QuickShieldRequest, at: DateTime<Utc>) -> Self {
        Self::new(request.user_id, at)
    }
}

/// ISO-8601 in UTC with millisecond precision, e.g. `2025-01-01T12:00:00.000Z`.
pub fn iso_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}
