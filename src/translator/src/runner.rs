//! Drains `timeSeries.list` pagination for one query

use tracing::debug;

use crate::backend::{ListTimeSeriesRequest, MonitoringBackend, TimeSeries};
use crate::error::TranslationError;
use crate::filter::BackendFilter;

/// Pagination knobs for the list call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageOptions {
    /// Page size hint, backend default when unset
    pub page_size: Option<u32>,
    /// Abort once this many pages have been fetched and more remain
    pub max_pages: Option<usize>,
}

/// Fetch every page for `filter` and concatenate the series in page order.
///
/// Any page error fails the whole fetch. Nothing fetched so far is returned.
pub async fn fetch_all_series(
    backend: &dyn MonitoringBackend,
    project_resource: &str,
    filter: &BackendFilter,
    options: &PageOptions,
) -> Result<Vec<TimeSeries>, TranslationError> {
    let mut request = ListTimeSeriesRequest {
        name: project_resource.to_string(),
        filter: filter.filter.clone(),
        interval_start: filter.interval_start.clone(),
        interval_end: filter.interval_end.clone(),
        page_size: options.page_size,
        page_token: None,
    };

    let mut series = Vec::new();
    let mut pages = 0usize;

    loop {
        if let Some(max) = options.max_pages {
            if pages >= max {
                return Err(TranslationError::PageLimitExceeded(max));
            }
        }

        let page = backend.list_time_series(&request).await?;
        pages += 1;
        debug!(
            page = pages,
            series = page.time_series.len(),
            "Fetched time series page"
        );
        series.extend(page.time_series);

        if page.next_page_token.is_empty() {
            break;
        }
        request.page_token = Some(page.next_page_token);
    }

    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendError, ListTimeSeriesPage, Metric, MockMonitoringBackend};
    use mockall::Sequence;

    fn filter() -> BackendFilter {
        BackendFilter {
            filter: r#"metric.type="up""#.to_string(),
            interval_start: "1970-01-01T00:16:40Z".to_string(),
            interval_end: "1970-01-01T00:33:20Z".to_string(),
        }
    }

    fn series(metric_type: &str) -> TimeSeries {
        TimeSeries {
            metric: Metric {
                metric_type: metric_type.to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn page(types: &[&str], next: &str) -> ListTimeSeriesPage {
        ListTimeSeriesPage {
            time_series: types.iter().map(|t| series(t)).collect(),
            next_page_token: next.to_string(),
        }
    }

    #[tokio::test]
    async fn test_single_page() {
        let mut backend = MockMonitoringBackend::new();
        backend
            .expect_list_time_series()
            .withf(|req| {
                req.name == "projects/acme"
                    && req.filter == r#"metric.type="up""#
                    && req.page_token.is_none()
                    && req.page_size == Some(100)
            })
            .times(1)
            .returning(|_| Ok(page(&["up"], "")));

        let options = PageOptions {
            page_size: Some(100),
            max_pages: None,
        };
        let result = fetch_all_series(&backend, "projects/acme", &filter(), &options)
            .await
            .unwrap();

        assert_eq!(result.len(), 1);
    }

    #[tokio::test]
    async fn test_follows_page_tokens_in_order() {
        let mut backend = MockMonitoringBackend::new();
        let mut seq = Sequence::new();
        backend
            .expect_list_time_series()
            .withf(|req| req.page_token.is_none())
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(page(&["a", "b"], "t1")));
        backend
            .expect_list_time_series()
            .withf(|req| req.page_token.as_deref() == Some("t1"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(page(&["c"], "t2")));
        backend
            .expect_list_time_series()
            .withf(|req| req.page_token.as_deref() == Some("t2"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(page(&["d"], "")));

        let result = fetch_all_series(&backend, "projects/acme", &filter(), &PageOptions::default())
            .await
            .unwrap();

        let types: Vec<_> = result.iter().map(|s| s.metric.metric_type.as_str()).collect();
        assert_eq!(types, vec!["a", "b", "c", "d"]);
    }

    #[tokio::test]
    async fn test_page_error_discards_partial_results() {
        let mut backend = MockMonitoringBackend::new();
        let mut seq = Sequence::new();
        backend
            .expect_list_time_series()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(page(&["a"], "t1")));
        backend
            .expect_list_time_series()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| {
                Err(BackendError::Status {
                    status: 500,
                    message: "internal".to_string(),
                })
            });

        let err = fetch_all_series(&backend, "projects/acme", &filter(), &PageOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            TranslationError::Backend(BackendError::Status { status: 500, .. })
        ));
    }

    #[tokio::test]
    async fn test_empty_first_page() {
        let mut backend = MockMonitoringBackend::new();
        backend
            .expect_list_time_series()
            .times(1)
            .returning(|_| Ok(ListTimeSeriesPage::default()));

        let result = fetch_all_series(&backend, "projects/acme", &filter(), &PageOptions::default())
            .await
            .unwrap();

        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_page_limit() {
        let mut backend = MockMonitoringBackend::new();
        backend
            .expect_list_time_series()
            .times(2)
            .returning(|_| Ok(page(&["a"], "more")));

        let options = PageOptions {
            page_size: None,
            max_pages: Some(2),
        };
        let err = fetch_all_series(&backend, "projects/acme", &filter(), &options)
            .await
            .unwrap_err();

        assert!(matches!(err, TranslationError::PageLimitExceeded(2)));
    }
}
