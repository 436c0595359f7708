//! Wire types for the layers service and its error taxonomy.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

use crate::curve::CurveParams;
use crate::geo::{Bbox, PointGeometry, PolygonGeometry};

/// Server-assigned collection id.
pub type CollectionId = u64;

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced by layers service calls.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// The request never produced a response.
    #[error("request failed: {0}")]
    Request(String),

    /// Non-2xx response carrying a field-keyed error map.
    #[error("request rejected with status {status}")]
    Rejected { status: u16, fields: BTreeMap<String, Vec<String>> },

    /// Non-2xx response without a structured body.
    #[error("unexpected response status {status}")]
    Status { status: u16, body: String },

    /// A 2xx body that does not match the expected shape.
    #[error("response parse failed: {0}")]
    Parse(String),

    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// Classify a non-2xx response.
    #[must_use]
    pub fn from_response(status: u16, body: &str) -> Self {
        match serde_json::from_str::<BTreeMap<String, Value>>(body) {
            Ok(map) if !map.is_empty() => {
                let fields = map
                    .into_iter()
                    .map(|(field, value)| (field, messages_of(value)))
                    .collect();
                Self::Rejected { status, fields }
            }
            _ => Self::Status { status, body: body.to_owned() },
        }
    }

    /// Human-readable multi-line message, one `field: msg1,msg2` line per
    /// rejected field.
    #[must_use]
    pub fn flatten(&self) -> String {
        match self {
            Self::Rejected { fields, .. } => fields
                .iter()
                .map(|(field, messages)| format!("{field}: {}", messages.join(",")))
                .collect::<Vec<_>>()
                .join("\n"),
            other => other.to_string(),
        }
    }
}

fn messages_of(value: Value) -> Vec<String> {
    match value {
        Value::String(s) => vec![s],
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => s,
                other => other.to_string(),
            })
            .collect(),
        other => vec![other.to_string()],
    }
}

impl crate::error::ErrorCode for ApiError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Request(_) => "E_API_REQUEST",
            Self::Rejected { .. } => "E_API_REJECTED",
            Self::Status { .. } => "E_API_STATUS",
            Self::Parse(_) => "E_API_PARSE",
            Self::HttpClientBuild(_) => "E_HTTP_CLIENT_BUILD",
            Self::InvalidUrl(_) => "E_INVALID_URL",
        }
    }

    fn retryable(&self) -> bool {
        matches!(
            self,
            Self::Request(_) | Self::Status { status: 500..=599, .. } | Self::Rejected { status: 500..=599, .. }
        )
    }
}

// =============================================================================
// RHODONEA RECORD
// =============================================================================

/// One curve as the service stores it: snake-case stroke fields and a
/// `GeoJSON` point instead of flat `lat`/`lng`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RhodoneaRecord {
    pub name: String,
    pub r: f64,
    pub n: f64,
    pub d: f64,
    pub rotation: f64,
    pub nodes_count: u32,
    pub stroke_weight: f64,
    pub stroke_color: String,
    pub point: PointGeometry,
}

impl From<&CurveParams> for RhodoneaRecord {
    fn from(params: &CurveParams) -> Self {
        Self {
            name: params.name.clone(),
            r: params.r,
            n: params.n,
            d: params.d,
            rotation: params.rotation,
            nodes_count: params.nodes_count,
            stroke_weight: params.stroke_weight,
            stroke_color: params.stroke_color.clone(),
            point: PointGeometry::new(params.center),
        }
    }
}

impl From<&RhodoneaRecord> for CurveParams {
    fn from(record: &RhodoneaRecord) -> Self {
        Self {
            name: record.name.clone(),
            center: record.point.lat_lng(),
            r: record.r,
            n: record.n,
            d: record.d,
            rotation: record.rotation,
            nodes_count: record.nodes_count,
            stroke_weight: record.stroke_weight,
            stroke_color: record.stroke_color.clone(),
        }
    }
}

// =============================================================================
// COLLECTIONS
// =============================================================================

/// `POST layers/` body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionPayload {
    pub title: String,
    pub rhodoneas: Vec<RhodoneaRecord>,
}

/// `POST layers/` response; only the id is relied on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedCollection {
    pub id: CollectionId,
    #[serde(default)]
    pub title: String,
}

/// One row of the `GET layers/` listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionSummary {
    pub id: CollectionId,
    #[serde(default)]
    pub title: String,
    #[serde(default, with = "created_at")]
    pub created: Option<OffsetDateTime>,
    #[serde(default)]
    pub overlays_count: u64,
    #[serde(default)]
    pub envelope: Option<PolygonGeometry>,
}

impl CollectionSummary {
    #[must_use]
    pub fn bbox(&self) -> Option<Bbox> {
        self.envelope.as_ref().and_then(Bbox::from_envelope)
    }
}

/// `created` as the service sends it: RFC 3339, or a naive ISO 8601 time
/// read as UTC. Anything else is treated as unknown rather than failing the
/// whole page.
mod created_at {
    use serde::{Deserialize, Deserializer, Serializer};
    use time::format_description::well_known::{Iso8601, Rfc3339};
    use time::{OffsetDateTime, PrimitiveDateTime};
    use tracing::debug;

    #[allow(clippy::ref_option)]
    pub fn serialize<S: Serializer>(value: &Option<OffsetDateTime>, serializer: S) -> Result<S::Ok, S::Error> {
        time::serde::rfc3339::option::serialize(value, serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<OffsetDateTime>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().and_then(parse))
    }

    pub(super) fn parse(raw: &str) -> Option<OffsetDateTime> {
        if let Ok(at) = OffsetDateTime::parse(raw, &Rfc3339) {
            return Some(at);
        }
        match PrimitiveDateTime::parse(raw, &Iso8601::DEFAULT) {
            Ok(naive) => Some(naive.assume_utc()),
            Err(e) => {
                debug!(created = %raw, error = %e, "unreadable creation time ignored");
                None
            }
        }
    }
}

/// `GET layers/` response.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CollectionPage {
    pub results: Vec<CollectionSummary>,
    /// Absolute URL of the next page, absent on the last one.
    #[serde(default)]
    pub next: Option<String>,
}

/// `GET layers/{id}/` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionDetail {
    pub id: CollectionId,
    #[serde(default)]
    pub title: String,
    pub rhodoneas: Vec<RhodoneaRecord>,
}

// =============================================================================
// FILTERS
// =============================================================================

/// Query for one timeline page.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineFilters {
    pub search: String,
    /// `None` before the map has reported its bounds.
    pub in_bbox: Option<Bbox>,
    pub offset: u32,
    pub limit: u32,
}

impl TimelineFilters {
    #[must_use]
    pub fn new(limit: u32) -> Self {
        Self { search: String::new(), in_bbox: None, offset: 0, limit }
    }

    #[must_use]
    pub fn is_first_page(&self) -> bool {
        self.offset == 0
    }

    /// Query string pairs in the order the service documents them.
    #[must_use]
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("search", self.search.clone()),
            ("in_bbox", self.in_bbox.map(|b| b.to_query()).unwrap_or_default()),
            ("offset", self.offset.to_string()),
            ("limit", self.limit.to_string()),
        ]
    }
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;
