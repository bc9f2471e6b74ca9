//! Prometheus remote_read handler
//!
//! - Content-Type: `application/x-protobuf`
//! - Content-Encoding: `snappy` (block format, not framed)
//! - Endpoint: `POST /read`, exactly one query per request

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};
use common::prompb::{
    self, PROTOBUF_CONTENT_TYPE, QueryResult, ReadResponse, SNAPPY_CONTENT_ENCODING,
    decode_read_request, encode_read_response,
};
use serde::Serialize;
use translator::{Query, TranslationError};

use crate::AdapterState;
use crate::error::AdapterError;

/// Axum handler for POST /read
pub async fn handle_read(
    State(state): State<AdapterState>,
    body: Bytes,
) -> Result<Response, AdapterError> {
    let request = decode_read_request(&body).map_err(|e| {
        tracing::warn!(error = %e, "Rejecting undecodable remote_read request");
        AdapterError::Decode(e)
    })?;

    if request.queries.len() != 1 {
        return Err(AdapterError::QueryCount(request.queries.len()));
    }

    let timeseries = match run(&state, &request.queries[0]).await {
        Ok(series) => series,
        // already logged with its kind by the translator
        Err(_) if state.empty_on_error => Vec::new(),
        Err(e) => return Err(e.into()),
    };

    let response = ReadResponse {
        results: vec![QueryResult { timeseries }],
    };
    let encoded = encode_read_response(&response).map_err(AdapterError::Encode)?;

    Ok((
        [
            (header::CONTENT_TYPE, PROTOBUF_CONTENT_TYPE),
            (header::CONTENT_ENCODING, SNAPPY_CONTENT_ENCODING),
        ],
        encoded,
    )
        .into_response())
}

async fn run(
    state: &AdapterState,
    query: &prompb::Query,
) -> Result<Vec<prompb::TimeSeries>, TranslationError> {
    let query = Query::try_from(query).inspect_err(|e| {
        tracing::error!(kind = e.kind(), error = %e, "Query rejected");
    })?;

    state
        .translator
        .run_query_with_deadline(&query, state.query_timeout)
        .await
}

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_seconds: u64,
}

/// Axum handler for GET /health
pub async fn health(State(state): State<AdapterState>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.started_at.elapsed().as_secs(),
    })
}
