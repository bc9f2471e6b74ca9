use std::net::{SocketAddr, ToSocketAddrs};
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

/// Default configuration file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "stackdriver-adapter.toml";

/// Prefix for environment overrides, e.g. `ADAPTER__BACKEND__PROJECT_ID`
pub const ENV_PREFIX: &str = "ADAPTER__";

pub const DEFAULT_METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the remote-read endpoint listens on. A bare `:port` binds all interfaces.
    pub listen_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: String::from(":9201"),
        }
    }
}

impl ServerConfig {
    /// Resolve the listen address into a socket address
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr = if self.listen_addr.starts_with(':') {
            format!("0.0.0.0{}", self.listen_addr)
        } else {
            self.listen_addr.clone()
        };

        addr.to_socket_addrs()
            .map_err(|e| anyhow::anyhow!("Invalid listen address '{}': {e}", self.listen_addr))?
            .next()
            .ok_or_else(|| anyhow::anyhow!("Listen address '{}' did not resolve", self.listen_addr))
    }
}

/// Where access tokens come from when no static token is configured
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialSource {
    /// Application Default Credentials: `GOOGLE_APPLICATION_CREDENTIALS`,
    /// gcloud user credentials, then the metadata server
    #[default]
    ApplicationDefault,
    /// Only the metadata server at `metadata_token_url`
    Metadata,
}

/// Configuration for the Cloud Monitoring backend
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BackendConfig {
    /// GCP project whose time series are queried
    pub project_id: String,
    /// Base URL of the monitoring API
    pub endpoint: String,
    /// Timeout applied to every backend HTTP request
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// Page size hint passed to the list call
    pub page_size: Option<u32>,
    /// Static OAuth2 bearer token. Takes precedence over `credentials`.
    pub access_token: Option<String>,
    pub credentials: CredentialSource,
    /// Metadata server endpoint used to mint access tokens
    pub metadata_token_url: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            project_id: String::new(),
            endpoint: String::from("https://monitoring.googleapis.com"),
            request_timeout: Duration::from_secs(30),
            page_size: None,
            access_token: None,
            credentials: CredentialSource::default(),
            metadata_token_url: String::from(DEFAULT_METADATA_TOKEN_URL),
        }
    }
}

impl BackendConfig {
    /// Resource name of the project scope, `projects/<project-id>`
    pub fn project_resource(&self) -> String {
        format!("projects/{}", self.project_id)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Deadline for translating and answering a single read query
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    /// Answer failed translations with an empty result instead of an error status
    pub empty_on_error: bool,
    /// Upper bound on backend pages fetched for one query
    pub max_pages: Option<usize>,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(120),
            empty_on_error: true,
            max_pages: None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Configuration {
    pub server: ServerConfig,
    pub backend: BackendConfig,
    pub query: QueryConfig,
}

impl Configuration {
    pub fn load() -> Result<Self, Box<figment::Error>> {
        Self::load_from_path(DEFAULT_CONFIG_FILE)
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        let config = Self::figment(path.as_ref()).extract().map_err(Box::new)?;

        Ok(config)
    }

    fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(Configuration::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_default_configuration() {
        let config = Configuration::default();

        assert_eq!(config.server.listen_addr, ":9201");
        assert_eq!(config.backend.endpoint, "https://monitoring.googleapis.com");
        assert_eq!(config.backend.request_timeout, Duration::from_secs(30));
        assert!(config.backend.project_id.is_empty());
        assert!(config.backend.access_token.is_none());
        assert_eq!(config.backend.credentials, CredentialSource::ApplicationDefault);
        assert_eq!(config.query.timeout, Duration::from_secs(120));
        assert!(config.query.empty_on_error);
        assert!(config.query.max_pages.is_none());
    }

    #[test]
    fn test_configless_operation() {
        Jail::expect_with(|_jail| {
            let config = Configuration::load().expect("defaults should load");
            assert_eq!(config.server.listen_addr, ":9201");
            assert!(config.query.empty_on_error);
            Ok(())
        });
    }

    #[test]
    fn test_toml_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                DEFAULT_CONFIG_FILE,
                r#"
                [server]
                listen_addr = "127.0.0.1:19201"

                [backend]
                project_id = "my-project"
                request_timeout = "5s"
                page_size = 500
                credentials = "metadata"

                [query]
                timeout = "45s"
                empty_on_error = false
                max_pages = 10
                "#,
            )?;

            let config = Configuration::load().map_err(|e| *e)?;
            assert_eq!(config.server.listen_addr, "127.0.0.1:19201");
            assert_eq!(config.backend.project_id, "my-project");
            assert_eq!(config.backend.request_timeout, Duration::from_secs(5));
            assert_eq!(config.backend.page_size, Some(500));
            assert_eq!(config.backend.credentials, CredentialSource::Metadata);
            assert_eq!(config.query.timeout, Duration::from_secs(45));
            assert!(!config.query.empty_on_error);
            assert_eq!(config.query.max_pages, Some(10));
            // untouched keys keep their defaults
            assert_eq!(config.backend.metadata_token_url, DEFAULT_METADATA_TOKEN_URL);
            Ok(())
        });
    }

    #[test]
    fn test_env_var_override() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "custom.toml",
                r#"
                [backend]
                project_id = "from-file"
                "#,
            )?;
            jail.set_env("ADAPTER__BACKEND__PROJECT_ID", "from-env");
            jail.set_env("ADAPTER__QUERY__EMPTY_ON_ERROR", "false");

            let config = Configuration::load_from_path("custom.toml").map_err(|e| *e)?;
            assert_eq!(config.backend.project_id, "from-env");
            assert!(!config.query.empty_on_error);
            Ok(())
        });
    }

    #[test]
    fn test_socket_addr_go_style_port() {
        let server = ServerConfig {
            listen_addr: ":9201".to_string(),
        };
        let addr = server.socket_addr().unwrap();
        assert_eq!(addr.port(), 9201);
        assert!(addr.ip().is_unspecified());
    }

    #[test]
    fn test_socket_addr_invalid() {
        let server = ServerConfig {
            listen_addr: "not an address".to_string(),
        };
        assert!(server.socket_addr().is_err());
    }

    #[test]
    fn test_project_resource() {
        let backend = BackendConfig {
            project_id: "acme-prod".to_string(),
            ..Default::default()
        };
        assert_eq!(backend.project_resource(), "projects/acme-prod");
    }
}
