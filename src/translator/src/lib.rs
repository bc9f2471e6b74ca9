//! Prometheus remote_read to Cloud Monitoring query translation
//!
//! # Architecture
//!
//! ```text
//! Query → Matcher Compiler → Filter Assembler → Backend Query Runner → Series Reassembler → TimeSeries
//! ```
//!
//! - [`matcher`] - compiles one label matcher into a backend filter clause
//! - [`filter`] - joins clauses and binds the query interval
//! - [`runner`] - drains `projects.timeSeries.list` pagination
//! - [`reassemble`] - turns backend series into remote_read time series
//! - [`sanitize`] - Prometheus-safe metric names
//! - [`backend`] - the backend seam, its wire types and the HTTP client
//!
//! # Label Mapping
//!
//! - `__name__` → `metric.type`
//! - `metric_labels_<key>` → `metric.labels.<key>`
//! - `resource_labels_<key>` → `resource.labels.<key>`
//! - Other labels are passed through unchanged

pub mod backend;
pub mod error;
pub mod filter;
pub mod matcher;
pub mod reassemble;
pub mod runner;
pub mod sanitize;
pub mod translate;
pub mod types;

pub use backend::{HttpMonitoringClient, MonitoringBackend};
pub use error::TranslationError;
pub use sanitize::sanitize_metric_name;
pub use translate::Translator;
pub use types::{LabelMatcher, MatcherOp, Query};
