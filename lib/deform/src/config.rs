//! Client configuration types.

use std::time::Duration;

use url::Url;

use crate::{Error, Result};

/// Configuration for the HTTP client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Read timeout, used when a call carries none.
    pub timeout: Duration,
    /// Connection timeout duration.
    pub connect_timeout: Duration,
    /// Maximum idle connections per host.
    pub pool_idle_per_host: usize,
    /// Idle connection timeout.
    pub pool_idle_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            pool_idle_per_host: 32,
            pool_idle_timeout: Duration::from_secs(90),
        }
    }
}

impl ClientConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug, Clone, Default)]
pub struct ClientConfigBuilder {
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    pool_idle_per_host: Option<usize>,
    pool_idle_timeout: Option<Duration>,
}

impl ClientConfigBuilder {
    /// Set the read timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the connection timeout.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set the maximum idle connections per host.
    #[must_use]
    pub const fn pool_idle_per_host(mut self, count: usize) -> Self {
        self.pool_idle_per_host = Some(count);
        self
    }

    /// Set the idle connection timeout.
    #[must_use]
    pub const fn pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.pool_idle_timeout = Some(timeout);
        self
    }

    /// Build the configuration.
    #[must_use]
    pub fn build(self) -> ClientConfig {
        let defaults = ClientConfig::default();
        ClientConfig {
            timeout: self.timeout.unwrap_or(defaults.timeout),
            connect_timeout: self.connect_timeout.unwrap_or(defaults.connect_timeout),
            pool_idle_per_host: self
                .pool_idle_per_host
                .unwrap_or(defaults.pool_idle_per_host),
            pool_idle_timeout: self.pool_idle_timeout.unwrap_or(defaults.pool_idle_timeout),
        }
    }
}

/// Where the document API is served.
///
/// Project-scoped calls go to `<project>.<host>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Host name, without scheme.
    pub host: String,
    /// Explicit port, if not the scheme default.
    pub port: Option<u16>,
    /// Use `https`.
    pub secure: bool,
    /// Path prefix of the API.
    pub api_base_path: String,
}

impl Endpoint {
    /// Endpoint on `host` with the default settings.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self::builder(host).build()
    }

    /// Create a new endpoint builder.
    #[must_use]
    pub fn builder(host: impl Into<String>) -> EndpointBuilder {
        EndpointBuilder {
            host: host.into(),
            port: None,
            secure: None,
            api_base_path: None,
        }
    }

    /// Base URL of the API, optionally scoped to `project`.
    ///
    /// ```
    /// use deform::Endpoint;
    ///
    /// let endpoint = Endpoint::new("deform.io");
    /// let url = endpoint.base_url(Some("venues")).expect("valid url");
    /// assert_eq!(url.as_str(), "https://venues.deform.io/api/");
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`] when the parts do not form a URL.
    pub fn base_url(&self, project: Option<&str>) -> Result<Url> {
        let scheme = if self.secure { "https" } else { "http" };
        let host = match project {
            Some(project) => format!("{project}.{}", self.host),
            None => self.host.clone(),
        };
        let port = self.port.map(|port| format!(":{port}")).unwrap_or_default();
        let path = self.api_base_path.trim_matches('/');
        let path = if path.is_empty() {
            "/".to_string()
        } else {
            format!("/{path}/")
        };

        Url::parse(&format!("{scheme}://{host}{port}{path}")).map_err(Error::InvalidUrl)
    }
}

/// Builder for [`Endpoint`].
#[derive(Debug, Clone)]
pub struct EndpointBuilder {
    host: String,
    port: Option<u16>,
    secure: Option<bool>,
    api_base_path: Option<String>,
}

impl EndpointBuilder {
    /// Set the port.
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Choose between `https` and `http`.
    #[must_use]
    pub const fn secure(mut self, secure: bool) -> Self {
        self.secure = Some(secure);
        self
    }

    /// Set the API path prefix.
    #[must_use]
    pub fn api_base_path(mut self, path: impl Into<String>) -> Self {
        self.api_base_path = Some(path.into());
        self
    }

    /// Build the endpoint.
    #[must_use]
    pub fn build(self) -> Endpoint {
        Endpoint {
            host: self.host,
            port: self.port,
            secure: self.secure.unwrap_or(true),
            api_base_path: self.api_base_path.unwrap_or_else(|| "/api/".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.pool_idle_per_host, 32);
        assert_eq!(config.pool_idle_timeout, Duration::from_secs(90));
    }

    #[test]
    fn builder_overrides() {
        let config = ClientConfig::builder()
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(5))
            .pool_idle_per_host(16)
            .build();

        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.pool_idle_per_host, 16);
    }

    #[test]
    fn endpoint_defaults() {
        let endpoint = Endpoint::new("deform.io");
        assert!(endpoint.secure);
        assert_eq!(endpoint.port, None);
        assert_eq!(endpoint.api_base_path, "/api/");

        let url = endpoint.base_url(None).expect("url");
        assert_eq!(url.as_str(), "https://deform.io/api/");
    }

    #[test]
    fn endpoint_with_project_and_port() {
        let endpoint = Endpoint::builder("localhost")
            .port(8080)
            .secure(false)
            .api_base_path("api/v2")
            .build();

        let url = endpoint.base_url(Some("venues")).expect("url");
        assert_eq!(url.as_str(), "http://venues.localhost:8080/api/v2/");
    }

    #[test]
    fn endpoint_root_path() {
        let endpoint = Endpoint::builder("deform.io").api_base_path("/").build();
        let url = endpoint.base_url(None).expect("url");
        assert_eq!(url.as_str(), "https://deform.io/");
    }

    #[test]
    fn endpoint_invalid_host() {
        let endpoint = Endpoint::new("bad host");
        assert!(matches!(endpoint.base_url(None), Err(Error::InvalidUrl(_))));
    }
}
