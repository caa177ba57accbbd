use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

/// Exception severity levels reported by the audio node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Severity {
    Common,
    Suspicious,
    Fault,
}

/// JSON error body returned by every failing route.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorBody {
    pub error: String,
    /// RFC 3339 timestamp of the request.
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<&'static str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_endpoints: Option<Vec<&'static str>>,
}

impl ApiErrorBody {
    pub fn new(error: impl Into<String>, timestamp: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            timestamp: timestamp.into(),
            user_id: None,
            required: None,
            available_endpoints: None,
        }
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_required(mut self, required: Vec<&'static str>) -> Self {
        self.required = Some(required);
        self
    }

    pub fn with_endpoints(mut self, endpoints: Vec<&'static str>) -> Self {
        self.available_endpoints = Some(endpoints);
        self
    }
}

/// Current UTC time as an RFC 3339 string.
pub fn iso_timestamp() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}
