//! Backend filter assembly
//!
//! Clauses are joined with `AND` in matcher order. The query interval is bound
//! separately as RFC 3339 timestamps truncated to whole seconds.

use std::fmt;

use chrono::{DateTime, SecondsFormat};

use crate::error::TranslationError;
use crate::matcher::compile_matchers;
use crate::types::Query;

/// One matcher expressed in backend filter syntax
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterClause(String);

impl FilterClause {
    pub fn new(clause: impl Into<String>) -> Self {
        Self(clause.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FilterClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Filter expression plus interval bounds for one backend list call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendFilter {
    pub filter: String,
    pub interval_start: String,
    pub interval_end: String,
}

/// Join compiled clauses into a single filter expression
pub fn assemble_filter(clauses: &[FilterClause]) -> String {
    clauses
        .iter()
        .map(FilterClause::as_str)
        .collect::<Vec<_>>()
        .join(" AND ")
}

/// Format a millisecond epoch timestamp as an interval bound.
///
/// Sub-second precision is dropped: `1_999` ms becomes `1970-01-01T00:00:01Z`.
pub fn format_interval_bound(timestamp_ms: i64) -> Option<String> {
    DateTime::from_timestamp(timestamp_ms / 1000, 0)
        .map(|t| t.to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

/// Compile a query's matchers and bind its interval
pub fn build_filter(query: &Query) -> Result<BackendFilter, TranslationError> {
    let invalid_range = |reason: &str| TranslationError::InvalidTimeRange {
        start: query.start_time_ms,
        end: query.end_time_ms,
        reason: reason.to_string(),
    };

    if query.start_time_ms > query.end_time_ms {
        return Err(invalid_range("start is after end"));
    }

    let interval_start = format_interval_bound(query.start_time_ms)
        .ok_or_else(|| invalid_range("start is out of range"))?;
    let interval_end = format_interval_bound(query.end_time_ms)
        .ok_or_else(|| invalid_range("end is out of range"))?;

    Ok(BackendFilter {
        filter: assemble_filter(&compile_matchers(&query.matchers)),
        interval_start,
        interval_end,
    })
}
