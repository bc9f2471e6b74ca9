use std::sync::Arc;
use std::time::{Duration, Instant};

use common::config::{BackendConfig, CredentialSource};
use serde::Deserialize;
use tokio::sync::{OnceCell, RwLock};

use super::BackendError;

/// OAuth2 scope for read access to Cloud Monitoring
pub const MONITORING_READ_SCOPE: &str = "https://www.googleapis.com/auth/monitoring.read";

/// Refresh metadata tokens this long before they expire
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Where bearer tokens for backend calls come from
pub enum TokenSource {
    /// A fixed token from configuration
    Static(String),
    /// Tokens minted by the GCE metadata server, cached until shortly before expiry
    Metadata {
        url: String,
        cache: RwLock<Option<CachedToken>>,
    },
    /// Application Default Credentials. The provider is discovered on first
    /// use and refreshes its own tokens.
    ApplicationDefault {
        provider: OnceCell<Arc<dyn gcp_auth::TokenProvider>>,
    },
}

pub struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

impl CachedToken {
    fn is_fresh(&self) -> bool {
        Instant::now() + EXPIRY_MARGIN < self.expires_at
    }
}

#[derive(Deserialize)]
struct MetadataToken {
    access_token: String,
    expires_in: u64,
}

impl TokenSource {
    pub fn fixed(token: impl Into<String>) -> Self {
        Self::Static(token.into())
    }

    pub fn metadata(url: impl Into<String>) -> Self {
        Self::Metadata {
            url: url.into(),
            cache: RwLock::new(None),
        }
    }

    pub fn application_default() -> Self {
        Self::ApplicationDefault {
            provider: OnceCell::new(),
        }
    }

    /// Pick the token source for a backend configuration. A static token wins.
    pub fn from_config(config: &BackendConfig) -> Self {
        match (&config.access_token, config.credentials) {
            (Some(token), _) => Self::fixed(token.clone()),
            (None, CredentialSource::ApplicationDefault) => Self::application_default(),
            (None, CredentialSource::Metadata) => {
                Self::metadata(config.metadata_token_url.clone())
            }
        }
    }

    /// Current bearer token, fetching a new one when the cached token is stale
    pub async fn token(&self, http: &reqwest::Client) -> Result<String, BackendError> {
        let (url, cache) = match self {
            Self::Static(token) => return Ok(token.clone()),
            Self::Metadata { url, cache } => (url, cache),
            Self::ApplicationDefault { provider } => {
                return application_default_token(provider).await;
            }
        };

        if let Some(cached) = cache.read().await.as_ref() {
            if cached.is_fresh() {
                return Ok(cached.access_token.clone());
            }
        }

        let fetched = fetch_metadata_token(http, url).await?;
        let token = fetched.access_token.clone();
        *cache.write().await = Some(CachedToken {
            access_token: fetched.access_token,
            expires_at: Instant::now() + Duration::from_secs(fetched.expires_in),
        });

        tracing::debug!(expires_in = fetched.expires_in, "Refreshed metadata access token");
        Ok(token)
    }
}

async fn application_default_token(
    provider: &OnceCell<Arc<dyn gcp_auth::TokenProvider>>,
) -> Result<String, BackendError> {
    let provider = provider
        .get_or_try_init(|| async {
            let provider = gcp_auth::provider().await?;
            tracing::info!("Using application default credentials");
            Ok::<_, gcp_auth::Error>(provider)
        })
        .await
        .map_err(|e| BackendError::Auth(format!("no application default credentials: {e}")))?;

    let token = provider
        .token(&[MONITORING_READ_SCOPE])
        .await
        .map_err(|e| BackendError::Auth(format!("token request failed: {e}")))?;

    Ok(token.as_str().to_string())
}

async fn fetch_metadata_token(
    http: &reqwest::Client,
    url: &str,
) -> Result<MetadataToken, BackendError> {
    let resp = http
        .get(url)
        .header("Metadata-Flavor", "Google")
        .send()
        .await
        .map_err(|e| BackendError::Auth(format!("metadata server unreachable: {e}")))?;

    let status = resp.status();
    if !status.is_success() {
        let text = resp.text().await.unwrap_or_default();
        return Err(BackendError::Auth(format!(
            "metadata server returned {}: {text}",
            status.as_u16()
        )));
    }

    let body = resp.text().await?;
    serde_json::from_str(&body)
        .map_err(|e| BackendError::Auth(format!("invalid metadata token response: {e}")))
}
