use async_trait::async_trait;
use common::config::BackendConfig;
use serde::Deserialize;

use super::{
    BackendError, ListTimeSeriesPage, ListTimeSeriesRequest, MonitoringBackend, TokenSource,
};

/// HTTP client for the Cloud Monitoring v3 REST API
pub struct HttpMonitoringClient {
    endpoint: String,
    http: reqwest::Client,
    tokens: TokenSource,
}

impl HttpMonitoringClient {
    /// Create a client from backend configuration
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        let tokens = TokenSource::from_config(config);

        Ok(Self::with_token_source(&config.endpoint, http, tokens))
    }

    pub fn with_token_source(endpoint: &str, http: reqwest::Client, tokens: TokenSource) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            http,
            tokens,
        }
    }

    fn list_url(&self, name: &str) -> String {
        format!("{}/v3/{name}/timeSeries", self.endpoint)
    }
}

#[async_trait]
impl MonitoringBackend for HttpMonitoringClient {
    async fn list_time_series(
        &self,
        request: &ListTimeSeriesRequest,
    ) -> Result<ListTimeSeriesPage, BackendError> {
        let token = self.tokens.token(&self.http).await?;

        let resp = self
            .http
            .get(self.list_url(&request.name))
            .bearer_auth(token)
            .query(&request.query_params())
            .send()
            .await?;

        handle_response(resp).await
    }
}

/// Google API error envelope, `{"error": {"code": 403, "message": "..."}}`
#[derive(Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    message: String,
}

async fn handle_response(resp: reqwest::Response) -> Result<ListTimeSeriesPage, BackendError> {
    if resp.status().is_success() {
        let body = resp.text().await?;
        Ok(serde_json::from_str(&body)?)
    } else {
        let status = resp.status().as_u16();
        let text = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorEnvelope>(&text)
            .map(|e| e.error.message)
            .unwrap_or(text);
        Err(BackendError::Status { status, message })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Json, Router,
        extract::Query,
        http::{HeaderMap, StatusCode},
        response::IntoResponse,
        routing::get,
    };
    use std::collections::HashMap;

    async fn spawn(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn request(page_token: Option<&str>) -> ListTimeSeriesRequest {
        ListTimeSeriesRequest {
            name: "projects/acme".to_string(),
            filter: r#"metric.type="up" AND resource.labels.zone=starts_with("us-")"#.to_string(),
            interval_start: "1970-01-01T00:16:40Z".to_string(),
            interval_end: "1970-01-01T00:33:20Z".to_string(),
            page_size: Some(2),
            page_token: page_token.map(str::to_string),
        }
    }

    fn client(endpoint: &str) -> HttpMonitoringClient {
        HttpMonitoringClient::with_token_source(
            endpoint,
            reqwest::Client::new(),
            TokenSource::fixed("test-token"),
        )
    }

    async fn list_handler(
        headers: HeaderMap,
        Query(params): Query<HashMap<String, String>>,
    ) -> impl IntoResponse {
        if headers.get("authorization").map(|v| v.as_bytes()) != Some(b"Bearer test-token") {
            return (
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({"error": {"code": 401, "message": "bad token"}})),
            );
        }

        let next_page_token = params
            .get("pageToken")
            .map(|t| format!("after-{t}"))
            .unwrap_or_default();
        let echoed = serde_json::json!({
            "timeSeries": [{
                "metric": {"type": "custom.googleapis.com/echo", "labels": {
                    "filter": params.get("filter").cloned().unwrap_or_default(),
                    "start": params.get("interval.startTime").cloned().unwrap_or_default(),
                    "end": params.get("interval.endTime").cloned().unwrap_or_default(),
                    "page_size": params.get("pageSize").cloned().unwrap_or_default(),
                }},
                "valueType": "DOUBLE",
                "points": []
            }],
            "nextPageToken": next_page_token,
        });
        (StatusCode::OK, Json(echoed))
    }

    #[tokio::test]
    async fn test_list_time_series_sends_filter_and_interval() {
        let endpoint = spawn(Router::new().route(
            "/v3/projects/acme/timeSeries",
            get(list_handler),
        ))
        .await;

        let page = client(&endpoint)
            .list_time_series(&request(None))
            .await
            .unwrap();

        let labels = &page.time_series[0].metric.labels;
        assert_eq!(
            labels["filter"],
            r#"metric.type="up" AND resource.labels.zone=starts_with("us-")"#
        );
        assert_eq!(labels["start"], "1970-01-01T00:16:40Z");
        assert_eq!(labels["end"], "1970-01-01T00:33:20Z");
        assert_eq!(labels["page_size"], "2");
        assert!(page.next_page_token.is_empty());
    }

    #[tokio::test]
    async fn test_list_time_series_forwards_page_token() {
        let endpoint = spawn(Router::new().route(
            "/v3/projects/acme/timeSeries",
            get(list_handler),
        ))
        .await;

        let page = client(&format!("{endpoint}/"))
            .list_time_series(&request(Some("p2")))
            .await
            .unwrap();

        assert_eq!(page.next_page_token, "after-p2");
    }

    #[tokio::test]
    async fn test_api_error_message_is_extracted() {
        let endpoint = spawn(Router::new().route(
            "/v3/projects/acme/timeSeries",
            get(list_handler),
        ))
        .await;
        let unauthorized = HttpMonitoringClient::with_token_source(
            &endpoint,
            reqwest::Client::new(),
            TokenSource::fixed("wrong"),
        );

        let err = unauthorized
            .list_time_series(&request(None))
            .await
            .unwrap_err();

        match err {
            BackendError::Status { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "bad token");
            }
            other => panic!("Expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_plain_text_error_body() {
        let endpoint = spawn(Router::new().route(
            "/v3/projects/acme/timeSeries",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "try later") }),
        ))
        .await;

        let err = client(&endpoint)
            .list_time_series(&request(None))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            BackendError::Status { status: 503, ref message } if message == "try later"
        ));
    }

    #[test]
    fn test_new_from_config() {
        let config = BackendConfig {
            endpoint: "https://monitoring.example.com/".to_string(),
            access_token: Some("abc".to_string()),
            ..Default::default()
        };

        let client = HttpMonitoringClient::new(&config).unwrap();
        assert_eq!(
            client.list_url("projects/acme"),
            "https://monitoring.example.com/v3/projects/acme/timeSeries"
        );
        assert!(matches!(client.tokens, TokenSource::Static(ref t) if t == "abc"));
    }
}
