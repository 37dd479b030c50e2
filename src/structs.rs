pub use serde::{Deserialize, Serialize};

use chrono::{DateTime, Utc};

/// One stored shortcode → URL mapping.
///
/// `code`, `target`, `created_at` and `expires_at` are immutable after
/// creation; only `click` advances, together with the visit log kept by the
/// storage backend.
#[derive(Debug, Clone)]
pub struct UrlRecord {
    pub code: String,
    pub target: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub click: usize,
}

impl UrlRecord {
    /// A record with `expires_at` strictly in the past no longer redirects.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_at, Some(expires_at) if expires_at < now)
    }
}

/// One resolved redirect, as appended to a record's visit log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitEvent {
    pub visited_at: DateTime<Utc>,
    pub ip: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
}

/// Caller-side context for a redirect, extracted at the HTTP edge.
#[derive(Debug, Clone, Default)]
pub struct VisitContext {
    pub ip: Option<String>,
}

/// Atomically consistent view of a record plus its full visit log.
///
/// Backends produce this under a single transaction or lock, so
/// `click == visits.len()` holds in every snapshot handed out.
#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    #[serde(rename = "shortcode")]
    pub code: String,
    #[serde(rename = "url")]
    pub target: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    pub clicks: usize,
    pub visits: Vec<SerializableVisit>,
}

/// Wire/storage form of a visit event (RFC3339 timestamp).
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct SerializableVisit {
    pub visited_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
}

impl From<&VisitEvent> for SerializableVisit {
    fn from(visit: &VisitEvent) -> Self {
        SerializableVisit {
            visited_at: visit.visited_at.to_rfc3339(),
            ip: visit.ip.clone(),
            country: visit.country.clone(),
            city: visit.city.clone(),
        }
    }
}

/// Storage form of a record for the JSON file backend.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct StoredRecord {
    pub short_code: String,
    pub target_url: String,
    pub created_at: String,
    pub expires_at: Option<String>,

    #[serde(default)]
    pub click: usize,
    #[serde(default)]
    pub visits: Vec<SerializableVisit>,
}

// ============ API DTOs ============

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ApiResponse<T> {
    pub code: i32,
    pub data: T,
}

#[derive(Serialize, Clone, Debug)]
pub struct ErrorResponse {
    pub code: &'static str,
    pub error: String,
}

/// Body of `POST /api/shorten`.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ShortenPayload {
    pub url: String,
    pub code: Option<String>,
    pub expires_at: Option<String>,
}

/// Successful shorten response.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ShortenData {
    #[serde(rename = "shortcode")]
    pub code: String,
    #[serde(rename = "url")]
    pub target: String,
    pub short_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}
