use std::sync::Arc;
use std::time::Duration;

use common::config::Configuration;
use common::prompb;
use tracing::{error, info};

use crate::backend::MonitoringBackend;
use crate::error::TranslationError;
use crate::filter::build_filter;
use crate::reassemble::reassemble_series;
use crate::runner::{PageOptions, fetch_all_series};
use crate::types::Query;

/// Runs remote_read queries against a monitoring backend
pub struct Translator {
    backend: Arc<dyn MonitoringBackend>,
    project_resource: String,
    page_options: PageOptions,
}

impl Translator {
    pub fn new(
        backend: Arc<dyn MonitoringBackend>,
        project_resource: impl Into<String>,
        page_options: PageOptions,
    ) -> Self {
        Self {
            backend,
            project_resource: project_resource.into(),
            page_options,
        }
    }

    pub fn from_config(backend: Arc<dyn MonitoringBackend>, config: &Configuration) -> Self {
        Self::new(
            backend,
            config.backend.project_resource(),
            PageOptions {
                page_size: config.backend.page_size,
                max_pages: config.query.max_pages,
            },
        )
    }

    pub fn project_resource(&self) -> &str {
        &self.project_resource
    }

    /// Translate `query`, drain the backend and reassemble the result
    pub async fn run_query(
        &self,
        query: &Query,
    ) -> Result<Vec<prompb::TimeSeries>, TranslationError> {
        let result = self.execute(query).await;

        match &result {
            Ok(series) => info!(series = series.len(), "Returned {} time series.", series.len()),
            Err(e) => log_failure(e),
        }

        result
    }

    /// Like [`Translator::run_query`] but gives up after `deadline`
    pub async fn run_query_with_deadline(
        &self,
        query: &Query,
        deadline: Duration,
    ) -> Result<Vec<prompb::TimeSeries>, TranslationError> {
        match tokio::time::timeout(deadline, self.run_query(query)).await {
            Ok(result) => result,
            Err(_) => {
                let err = TranslationError::Timeout(deadline);
                log_failure(&err);
                Err(err)
            }
        }
    }

    async fn execute(&self, query: &Query) -> Result<Vec<prompb::TimeSeries>, TranslationError> {
        let filter = build_filter(query)?;
        tracing::debug!(
            filter = %filter.filter,
            start = %filter.interval_start,
            end = %filter.interval_end,
            "Listing time series"
        );

        let series = fetch_all_series(
            self.backend.as_ref(),
            &self.project_resource,
            &filter,
            &self.page_options,
        )
        .await?;

        reassemble_series(series)
    }
}

fn log_failure(e: &TranslationError) {
    match e {
        TranslationError::Backend(source) => {
            error!(kind = e.kind(), error = %source, "Backend request failed")
        }
        TranslationError::TimestampParse { value, .. } => {
            error!(kind = e.kind(), value = %value, error = %e, "Could not parse point time")
        }
        TranslationError::UnsupportedValueType(value_type) => {
            error!(kind = e.kind(), value_type = %value_type, "Value type not supported")
        }
        _ => error!(kind = e.kind(), error = %e, "Query failed"),
    }
}
