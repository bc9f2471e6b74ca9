use std::time::Duration;

use crate::backend::{BackendError, ValueType};

/// Reasons a remote_read query could not be translated or answered
#[derive(Debug, thiserror::Error)]
pub enum TranslationError {
    #[error("Unsupported label matcher: {0}")]
    UnsupportedMatcher(String),
    #[error("Invalid time range [{start}, {end}]: {reason}")]
    InvalidTimeRange { start: i64, end: i64, reason: String },
    #[error("Backend request failed: {0}")]
    Backend(#[from] BackendError),
    #[error("Backend returned more than {0} pages")]
    PageLimitExceeded(usize),
    #[error("Failed to parse point timestamp '{value}': {source}")]
    TimestampParse {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
    #[error("Unsupported value type: {0}")]
    UnsupportedValueType(ValueType),
    #[error("Malformed point: {0}")]
    MalformedPoint(String),
    #[error("Query timed out after {0:?}")]
    Timeout(Duration),
}

impl TranslationError {
    /// Stable tag used in log records
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnsupportedMatcher(_) => "unsupported_matcher",
            Self::InvalidTimeRange { .. } => "invalid_time_range",
            Self::Backend(_) => "backend",
            Self::PageLimitExceeded(_) => "page_limit",
            Self::TimestampParse { .. } => "timestamp_parse",
            Self::UnsupportedValueType(_) => "unsupported_value_type",
            Self::MalformedPoint(_) => "malformed_point",
            Self::Timeout(_) => "timeout",
        }
    }
}
