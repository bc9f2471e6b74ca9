use axum::{http::StatusCode, response::IntoResponse};
use common::prompb::CodecError;
use translator::TranslationError;

/// Errors surfaced by the remote_read endpoint
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    /// Body could not be decompressed or decoded
    #[error("Invalid remote_read request: {0}")]
    Decode(#[source] CodecError),
    /// Request carried zero or several queries
    #[error("Can only handle one query.")]
    QueryCount(usize),
    #[error(transparent)]
    Translation(#[from] TranslationError),
    /// Response could not be encoded
    #[error("Failed to encode response: {0}")]
    Encode(#[source] CodecError),
}

impl AdapterError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Decode(_) | Self::QueryCount(_) => StatusCode::BAD_REQUEST,
            Self::Translation(e) => match e {
                TranslationError::UnsupportedMatcher(_)
                | TranslationError::InvalidTimeRange { .. } => StatusCode::BAD_REQUEST,
                TranslationError::Backend(_) => StatusCode::BAD_GATEWAY,
                TranslationError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Encode(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AdapterError {
    fn into_response(self) -> axum::response::Response {
        (self.status(), self.to_string()).into_response()
    }
}
