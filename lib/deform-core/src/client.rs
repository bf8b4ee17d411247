//! Client traits.
//!
//! - [`HttpClient`] - low-level HTTP execution
//! - [`DeformClient`] - what method descriptors call: execution plus base URL
//!   and auth header
//!
//! Implement [`DeformClient`] directly for custom auth or testing.
//!
//! Both traits have a streaming variant of `execute` for file downloads. The
//! default implementation buffers, then yields the body as one chunk.

use std::future::Future;

use bytes::Bytes;
use url::Url;

use crate::classify::{TransportError, classify_response, classify_transport};
use crate::download::{self, ByteStream};
use crate::{Request, Response, Result};

/// Core HTTP client trait.
///
/// Implementations report failures without a usable response as
/// [`TransportError`]; any response, whatever its status, is returned as-is.
pub trait HttpClient: Send + Sync {
    /// Execute an HTTP request and return the response.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] on connection failures, TLS errors and
    /// timeouts.
    fn execute(
        &self,
        request: Request<Bytes>,
    ) -> impl Future<Output = std::result::Result<Response<Bytes>, TransportError>> + Send;

    /// Execute an HTTP request, returning as soon as the response head is in.
    ///
    /// # Errors
    ///
    /// Same as [`execute`](Self::execute).
    fn execute_streaming(
        &self,
        request: Request<Bytes>,
    ) -> impl Future<Output = std::result::Result<Response<ByteStream>, TransportError>> + Send
    {
        let buffered = self.execute(request);
        async move { Ok(buffered.await?.map_body(download::once)) }
    }
}

/// A client method descriptors can be invoked against.
///
/// # Example
///
/// ```
/// use bytes::Bytes;
/// use deform_core::{DeformClient, Request, Response, TransportError};
/// use url::Url;
///
/// #[derive(Clone)]
/// struct Offline {
///     base_url: Url,
/// }
///
/// impl DeformClient for Offline {
///     async fn execute(&self, _: Request<Bytes>) -> Result<Response<Bytes>, TransportError> {
///         Err(TransportError::connect("offline"))
///     }
///
///     fn base_url(&self) -> &Url {
///         &self.base_url
///     }
/// }
/// ```
pub trait DeformClient: Clone + Send + Sync + 'static {
    /// Execute an HTTP request and return the response.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] when no response was received.
    fn execute(
        &self,
        request: Request<Bytes>,
    ) -> impl Future<Output = std::result::Result<Response<Bytes>, TransportError>> + Send;

    /// Execute an HTTP request, returning as soon as the response head is in.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] when no response was received.
    fn execute_streaming(
        &self,
        request: Request<Bytes>,
    ) -> impl Future<Output = std::result::Result<Response<ByteStream>, TransportError>> + Send
    {
        let buffered = self.execute(request);
        async move { Ok(buffered.await?.map_body(download::once)) }
    }

    /// Base URL all method paths are resolved against.
    fn base_url(&self) -> &Url;

    /// Value of the `Authorization` header, if authenticated.
    fn auth_header(&self) -> Option<&str> {
        None
    }
}

/// Execute a request and classify any failure.
///
/// Non-2xx responses and transport failures both come back as
/// [`Error::Api`](crate::Error::Api).
///
/// # Errors
///
/// Returns the classified failure.
pub async fn dispatch<C: DeformClient>(client: &C, request: Request<Bytes>) -> Result<Response<Bytes>> {
    match client.execute(request).await {
        Ok(response) if response.is_success() => Ok(response),
        Ok(response) => Err(classify_response(response.status(), response.body()).into()),
        Err(error) => Err(classify_transport(&error).into()),
    }
}

/// Like [`dispatch`], leaving a successful body unread.
///
/// The body of a failed call is read in full for classification.
///
/// # Errors
///
/// Returns the classified failure.
pub async fn dispatch_streaming<C: DeformClient>(
    client: &C,
    request: Request<Bytes>,
) -> Result<Response<ByteStream>> {
    match client.execute_streaming(request).await {
        Ok(response) if response.is_success() => Ok(response),
        Ok(response) => {
            let status = response.status();
            let body = download::collect(response.into_body())
                .await
                .unwrap_or_default();
            Err(classify_response(status, &body).into())
        }
        Err(error) => Err(classify_transport(&error).into()),
    }
}
