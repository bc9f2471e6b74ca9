//! Backend series to remote_read series
//!
//! Labels are emitted `__name__` first, then metric labels, then resource
//! labels. Points are sorted by end time before samples are built.

use std::collections::HashSet;

use chrono::{DateTime, FixedOffset};
use common::prompb;
use tracing::debug;

use crate::backend::{Point, TimeSeries, ValueType};
use crate::error::TranslationError;
use crate::matcher::METRIC_NAME_LABEL;
use crate::sanitize::sanitize_metric_name;

/// Convert every backend series. One unconvertible series fails the batch.
pub fn reassemble_series(
    series: Vec<TimeSeries>,
) -> Result<Vec<prompb::TimeSeries>, TranslationError> {
    series.into_iter().map(reassemble_one).collect()
}

/// Convert a single backend series
pub fn reassemble_one(series: TimeSeries) -> Result<prompb::TimeSeries, TranslationError> {
    ensure_supported(series.value_type)?;

    let labels = build_labels(&series);

    let mut points = series
        .points
        .iter()
        .map(|point| parse_end_time(point).map(|at| (at, point)))
        .collect::<Result<Vec<_>, _>>()?;
    // stable: equal instants keep backend order
    points.sort_by_key(|(at, _)| *at);

    let samples = points
        .into_iter()
        .map(|(at, point)| {
            Ok(prompb::Sample {
                value: coerce_value(series.value_type, point)?,
                timestamp: at.timestamp() * 1000,
            })
        })
        .collect::<Result<Vec<_>, TranslationError>>()?;

    Ok(prompb::TimeSeries { labels, samples })
}

fn ensure_supported(value_type: ValueType) -> Result<(), TranslationError> {
    match value_type {
        ValueType::Bool | ValueType::Int64 | ValueType::Double => Ok(()),
        other => Err(TranslationError::UnsupportedValueType(other)),
    }
}

fn build_labels(series: &TimeSeries) -> Vec<prompb::Label> {
    let mut seen = HashSet::new();
    let mut labels =
        Vec::with_capacity(1 + series.metric.labels.len() + series.resource.labels.len());

    let name = (
        METRIC_NAME_LABEL,
        sanitize_metric_name(&series.metric.metric_type),
    );
    let rest = series
        .metric
        .labels
        .iter()
        .chain(series.resource.labels.iter())
        .map(|(k, v)| (k.as_str(), v.clone()));

    for (name, value) in std::iter::once(name).chain(rest) {
        if !seen.insert(name) {
            debug!(
                label = name,
                metric = %series.metric.metric_type,
                "Skipping duplicate label"
            );
            continue;
        }
        labels.push(prompb::Label {
            name: name.to_string(),
            value,
        });
    }

    labels
}

fn parse_end_time(point: &Point) -> Result<DateTime<FixedOffset>, TranslationError> {
    let value = &point.interval.end_time;
    DateTime::parse_from_rfc3339(value).map_err(|source| TranslationError::TimestampParse {
        value: value.clone(),
        source,
    })
}

fn coerce_value(value_type: ValueType, point: &Point) -> Result<f64, TranslationError> {
    let value = &point.value;
    let coerced = match value_type {
        ValueType::Bool => value.bool_value.map(|b| if b { 1.0 } else { 0.0 }),
        ValueType::Int64 => value.int64_value.map(|i| i as f64),
        ValueType::Double => value.double_value,
        other => return Err(TranslationError::UnsupportedValueType(other)),
    };

    coerced.ok_or_else(|| {
        TranslationError::MalformedPoint(format!(
            "point at {} has no {value_type} value",
            point.interval.end_time
        ))
    })
}
