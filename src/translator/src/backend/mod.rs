//! Cloud Monitoring backend seam
//!
//! [`MonitoringBackend`] is the only thing the translation core knows about
//! the backend. The request and response types model the subset of
//! `projects.timeSeries.list` (v3) the adapter consumes.

mod auth;
mod client;

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer};

pub use auth::{MONITORING_READ_SCOPE, TokenSource};
pub use client::HttpMonitoringClient;

/// Errors from the backend client
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    /// API returned an error response
    #[error("API error ({status}): {message}")]
    Status { status: u16, message: String },
    /// Access token could not be obtained
    #[error("Authentication failed: {0}")]
    Auth(String),
    /// JSON deserialization error
    #[error("Deserialization error: {0}")]
    Decode(#[from] serde_json::Error),
}

/// One `timeSeries.list` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListTimeSeriesRequest {
    /// Project scope, `projects/<project-id>`
    pub name: String,
    pub filter: String,
    pub interval_start: String,
    pub interval_end: String,
    pub page_size: Option<u32>,
    pub page_token: Option<String>,
}

impl ListTimeSeriesRequest {
    /// Query string parameters for the REST call
    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("filter", self.filter.clone()),
            ("interval.startTime", self.interval_start.clone()),
            ("interval.endTime", self.interval_end.clone()),
        ];
        if let Some(size) = self.page_size {
            params.push(("pageSize", size.to_string()));
        }
        if let Some(token) = self.page_token.as_deref().filter(|t| !t.is_empty()) {
            params.push(("pageToken", token.to_string()));
        }
        params
    }
}

/// One page of `timeSeries.list` results
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListTimeSeriesPage {
    #[serde(default)]
    pub time_series: Vec<TimeSeries>,
    /// Continuation token, empty on the last page
    #[serde(default)]
    pub next_page_token: String,
}

/// A raw backend time series
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSeries {
    #[serde(default)]
    pub metric: Metric,
    #[serde(default)]
    pub resource: MonitoredResource,
    #[serde(default)]
    pub metric_kind: String,
    #[serde(default)]
    pub value_type: ValueType,
    #[serde(default)]
    pub points: Vec<Point>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Metric {
    #[serde(rename = "type", default)]
    pub metric_type: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MonitoredResource {
    #[serde(rename = "type", default)]
    pub resource_type: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Point {
    #[serde(default)]
    pub interval: TimeInterval,
    #[serde(default)]
    pub value: TypedValue,
}

/// Point interval, RFC 3339 strings as sent by the API
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeInterval {
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: String,
}

/// Typed point value. Exactly one field is set for well-formed points.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedValue {
    #[serde(default)]
    pub bool_value: Option<bool>,
    #[serde(default, deserialize_with = "deserialize_int64")]
    pub int64_value: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_double")]
    pub double_value: Option<f64>,
    #[serde(default)]
    pub string_value: Option<String>,
    #[serde(default)]
    pub distribution_value: Option<serde_json::Value>,
}

impl TypedValue {
    pub fn bool(value: bool) -> Self {
        Self {
            bool_value: Some(value),
            ..Default::default()
        }
    }

    pub fn int64(value: i64) -> Self {
        Self {
            int64_value: Some(value),
            ..Default::default()
        }
    }

    pub fn double(value: f64) -> Self {
        Self {
            double_value: Some(value),
            ..Default::default()
        }
    }
}

/// The JSON mapping encodes int64 as a string, but accept plain numbers too
fn deserialize_int64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Int64Repr {
        Number(i64),
        Text(String),
    }

    match Option::<Int64Repr>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Int64Repr::Number(n)) => Ok(Some(n)),
        Some(Int64Repr::Text(s)) => s.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

/// Non-finite doubles arrive as `"NaN"`, `"Infinity"` or `"-Infinity"`
fn deserialize_double<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum DoubleRepr {
        Number(f64),
        Text(String),
    }

    match Option::<DoubleRepr>::deserialize(deserializer)? {
        None => Ok(None),
        Some(DoubleRepr::Number(n)) => Ok(Some(n)),
        Some(DoubleRepr::Text(s)) => match s.as_str() {
            "NaN" => Ok(Some(f64::NAN)),
            "Infinity" => Ok(Some(f64::INFINITY)),
            "-Infinity" => Ok(Some(f64::NEG_INFINITY)),
            other => other.parse().map(Some).map_err(serde::de::Error::custom),
        },
    }
}

/// Declared value type of a backend series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValueType {
    #[default]
    ValueTypeUnspecified,
    Bool,
    Int64,
    Double,
    String,
    Distribution,
    Money,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ValueTypeUnspecified => "VALUE_TYPE_UNSPECIFIED",
            Self::Bool => "BOOL",
            Self::Int64 => "INT64",
            Self::Double => "DOUBLE",
            Self::String => "STRING",
            Self::Distribution => "DISTRIBUTION",
            Self::Money => "MONEY",
        };
        f.write_str(name)
    }
}

/// Read access to the backend's time series list API
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MonitoringBackend: Send + Sync {
    /// Fetch a single page of time series
    async fn list_time_series(
        &self,
        request: &ListTimeSeriesRequest,
    ) -> Result<ListTimeSeriesPage, BackendError>;
}
