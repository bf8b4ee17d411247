//! Generic API client wrapper.
//!
//! [`ApiClient`] combines any [`HttpClient`] with a base URL and optional
//! credentials to make a [`DeformClient`].

use std::future::Future;

use bytes::Bytes;
use url::Url;

use crate::{
    Auth, ByteStream, DeformClient, Error, HttpClient, Request, Response, Result, TransportError,
};

/// Generic API client wrapper.
///
/// Sharing one [`HttpClient`] (and its connection pool) between several
/// wrappers is cheap: they differ only by URL and credentials.
///
/// # Example
///
/// ```no_run
/// use deform::{ApiClient, Auth, HyperClient};
///
/// let http = HyperClient::builder().with_logging().build();
/// let anonymous = ApiClient::new(http, "https://deform.io/api/")?;
/// let project = anonymous
///     .clone()
///     .with_auth(Auth::Token("secret".to_string()));
/// # Ok::<(), deform::Error>(())
/// ```
pub struct ApiClient<C> {
    client: C,
    base_url: Url,
    auth: Option<Auth>,
    auth_header: Option<String>,
}

// The cached header holds the raw credential.
impl<C: std::fmt::Debug> std::fmt::Debug for ApiClient<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("client", &self.client)
            .field("base_url", &self.base_url.as_str())
            .field("auth", &self.auth)
            .finish_non_exhaustive()
    }
}

impl<C: Clone> Clone for ApiClient<C> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            auth: self.auth.clone(),
            auth_header: self.auth_header.clone(),
        }
    }
}

impl<C> ApiClient<C> {
    /// Create a new API client with the given base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be parsed.
    pub fn new(client: C, base_url: impl AsRef<str>) -> Result<Self> {
        let base_url = Url::parse(base_url.as_ref()).map_err(Error::InvalidUrl)?;
        Ok(Self::with_url(client, base_url))
    }

    /// Create a new API client with a pre-parsed URL.
    #[must_use]
    pub fn with_url(client: C, base_url: Url) -> Self {
        Self {
            client,
            base_url,
            auth: None,
            auth_header: None,
        }
    }

    /// Send `auth` with every request.
    #[must_use]
    pub fn with_auth(mut self, auth: Auth) -> Self {
        self.auth_header = Some(auth.header_value());
        self.auth = Some(auth);
        self
    }

    /// Same transport and credentials against another base URL.
    #[must_use]
    pub fn rebase(&self, base_url: Url) -> Self
    where
        C: Clone,
    {
        Self {
            base_url,
            ..self.clone()
        }
    }

    /// Credentials, if any.
    #[must_use]
    pub const fn auth(&self) -> Option<&Auth> {
        self.auth.as_ref()
    }

    /// Get a reference to the inner HTTP client.
    #[must_use]
    pub fn inner(&self) -> &C {
        &self.client
    }

    /// Consume the wrapper and return the inner HTTP client.
    #[must_use]
    pub fn into_inner(self) -> C {
        self.client
    }
}

impl<C> DeformClient for ApiClient<C>
where
    C: HttpClient + Clone + 'static,
{
    fn execute(
        &self,
        request: Request<Bytes>,
    ) -> impl Future<Output = std::result::Result<Response<Bytes>, TransportError>> + Send {
        self.client.execute(request)
    }

    fn execute_streaming(
        &self,
        request: Request<Bytes>,
    ) -> impl Future<Output = std::result::Result<Response<ByteStream>, TransportError>> + Send {
        self.client.execute_streaming(request)
    }

    fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn auth_header(&self) -> Option<&str> {
        self.auth_header.as_deref()
    }
}
