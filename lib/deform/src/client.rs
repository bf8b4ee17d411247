//! HTTP client implementation using hyper-util.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::Bytes;
use futures_util::stream::{self, StreamExt};
use http_body_util::{BodyDataStream, BodyExt, Full};
use hyper_util::{client::legacy::Client, rt::TokioExecutor};
use tower::Layer;
use tower::util::BoxCloneService;
use tower_service::Service;

use crate::middleware::LoggingLayer;
use crate::{
    ByteStream, Request, Response, TransportError,
    config::{ClientConfig, ClientConfigBuilder},
    connector::{ConnectPhase, TimedConnector},
};

type TransportResult<T> = std::result::Result<T, TransportError>;

// ============================================================================
// Type-Erased Service for Middleware Composition
// ============================================================================

/// Type-erased service for middleware composition.
///
/// Lets the builder stack arbitrary Tower layers without exposing their
/// generic types.
pub type BoxedService = BoxCloneService<Request<Bytes>, Response<Bytes>, TransportError>;

/// Future type for Tower Service implementation.
pub type ServiceFuture =
    Pin<Box<dyn Future<Output = TransportResult<Response<Bytes>>> + Send + 'static>>;

/// Thread-safe wrapper for `BoxedService`.
///
/// The Mutex makes the service Sync, which [`deform_core::HttpClient`]
/// requires.
#[derive(Clone)]
struct SyncService {
    inner: Arc<Mutex<BoxedService>>,
}

impl SyncService {
    fn new(service: BoxedService) -> Self {
        Self {
            inner: Arc::new(Mutex::new(service)),
        }
    }

    fn call(&self, request: Request<Bytes>) -> ServiceFuture {
        // Lock, clone the service, and release the lock immediately
        let mut service = self
            .inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone();

        Box::pin(async move { service.call(request).await })
    }
}

// ============================================================================
// Raw Client (internal, used for direct hyper access)
// ============================================================================

/// Raw HTTP client using hyper-util (internal implementation).
#[derive(Clone)]
struct RawHyperClient {
    inner: Client<TimedConnector, Full<Bytes>>,
    config: ClientConfig,
}

impl RawHyperClient {
    fn new(config: ClientConfig) -> Self {
        let connector = TimedConnector::new(config.connect_timeout);

        let inner = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_idle_per_host)
            .build(connector);

        Self { inner, config }
    }

    /// Build a hyper request from a deform request.
    fn build_hyper_request(request: Request<Bytes>) -> TransportResult<http::Request<Full<Bytes>>> {
        let (method, url, headers, body) = request.into_parts();

        let mut builder = http::Request::builder()
            .method(http::Method::from(method))
            .uri(url.as_str());

        for (name, value) in &headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let body = body.map_or_else(Full::default, Full::new);
        builder
            .body(body)
            .map_err(|e| TransportError::other(e.to_string()))
    }

    /// Extract response headers as a `HashMap`.
    fn extract_headers(headers: &http::HeaderMap) -> HashMap<String, String> {
        headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.to_string(), v.to_string()))
            })
            .collect()
    }

    /// Connect and read limits of one call: the per-call values, else the
    /// configured ones.
    fn limits(&self, request: &Request<Bytes>) -> (Duration, Duration) {
        let timeout = request.timeout();
        let connect = timeout
            .and_then(|timeout| timeout.connect)
            .unwrap_or(self.config.connect_timeout);
        let read = timeout
            .and_then(|timeout| timeout.read)
            .unwrap_or(self.config.timeout);
        (connect, read)
    }

    async fn execute(&self, request: Request<Bytes>) -> TransportResult<Response<Bytes>> {
        let (connect_timeout, read_timeout) = self.limits(&request);
        let hyper_request = Self::build_hyper_request(request)?;

        let exchange = async {
            let response = self
                .inner
                .request(hyper_request)
                .await
                .map_err(Self::map_hyper_error)?;

            let status = response.status().as_u16();
            let response_headers = Self::extract_headers(response.headers());

            let body = response
                .into_body()
                .collect()
                .await
                .map_err(|e| TransportError::other(e.to_string()))?
                .to_bytes();

            Ok(Response::new(status, response_headers, body))
        };

        Self::within_limits(ConnectPhase::new(connect_timeout), read_timeout, exchange).await
    }

    /// Like [`execute`](Self::execute), returning once the head is in.
    ///
    /// The read limit bounds the head, then each body chunk.
    async fn execute_streaming(
        &self,
        request: Request<Bytes>,
    ) -> TransportResult<Response<ByteStream>> {
        let (connect_timeout, read_timeout) = self.limits(&request);
        let hyper_request = Self::build_hyper_request(request)?;

        let head = async {
            self.inner
                .request(hyper_request)
                .await
                .map_err(Self::map_hyper_error)
        };
        let response =
            Self::within_limits(ConnectPhase::new(connect_timeout), read_timeout, head).await?;

        let status = response.status().as_u16();
        let response_headers = Self::extract_headers(response.headers());

        let chunks = BodyDataStream::new(response.into_body());
        let body = stream::try_unfold(chunks, move |mut chunks| async move {
            match tokio::time::timeout(read_timeout, chunks.next()).await {
                Err(_) => Err(TransportError::ReadTimeout),
                Ok(None) => Ok(None),
                Ok(Some(Ok(chunk))) => Ok(Some((chunk, chunks))),
                Ok(Some(Err(e))) => Err(TransportError::other(e.to_string())),
            }
        })
        .boxed();

        Ok(Response::new(status, response_headers, body))
    }

    /// Drive `exchange` with `phase` in scope; the read limit starts once
    /// the connection exists.
    async fn within_limits<T>(
        phase: ConnectPhase,
        read_timeout: Duration,
        exchange: impl Future<Output = TransportResult<T>>,
    ) -> TransportResult<T> {
        let mut exchange = std::pin::pin!(phase.scope(exchange));

        tokio::select! {
            biased;
            result = &mut exchange => return result,
            () = phase.settled() => {}
        }

        tokio::time::timeout(read_timeout, exchange)
            .await
            .map_err(|_| TransportError::ReadTimeout)?
    }

    #[allow(clippy::needless_pass_by_value)]
    fn map_hyper_error(err: hyper_util::client::legacy::Error) -> TransportError {
        let msg = err.to_string();

        if err.is_connect() && Self::timed_out(&err) {
            return TransportError::ConnectTimeout;
        }

        let details = Self::describe(&err);
        if details.contains("certificate") || details.contains("tls") {
            return TransportError::tls(details);
        }

        if err.is_connect() {
            return TransportError::connect(details);
        }

        TransportError::other(msg)
    }

    /// Returns `true` when an I/O timeout sits in the source chain.
    fn timed_out(err: &(dyn std::error::Error + 'static)) -> bool {
        let mut source = Some(err);
        while let Some(current) = source {
            if let Some(io) = current.downcast_ref::<std::io::Error>()
                && io.kind() == std::io::ErrorKind::TimedOut
            {
                return true;
            }
            source = current.source();
        }
        false
    }

    /// The error and its sources, joined.
    fn describe(err: &(dyn std::error::Error + 'static)) -> String {
        let mut parts = vec![err.to_string()];
        let mut source = err.source();
        while let Some(current) = source {
            parts.push(current.to_string());
            source = current.source();
        }
        parts.join(": ").to_lowercase()
    }
}

impl Service<Request<Bytes>> for RawHyperClient {
    type Response = Response<Bytes>;
    type Error = TransportError;
    type Future = ServiceFuture;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<TransportResult<()>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request<Bytes>) -> Self::Future {
        let client = self.clone();
        Box::pin(async move { client.execute(request).await })
    }
}

// ============================================================================
// Public Client
// ============================================================================

/// HTTP client using hyper-util with connection pooling, TLS, and middleware support.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
///
/// use deform::HyperClient;
///
/// let client = HyperClient::new();
///
/// let client = HyperClient::builder()
///     .timeout(Duration::from_secs(10))
///     .with_logging()
///     .build();
/// ```
#[derive(Clone)]
pub struct HyperClient {
    service: SyncService,
    raw: RawHyperClient,
    config: ClientConfig,
}

impl std::fmt::Debug for HyperClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl HyperClient {
    /// Create a new client with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ClientConfig::default())
    }

    /// Create a new client with custom configuration (no middleware).
    #[must_use]
    pub fn with_config(config: ClientConfig) -> Self {
        let raw = RawHyperClient::new(config.clone());
        Self::with_service(BoxCloneService::new(raw.clone()), raw, config)
    }

    fn with_service(service: BoxedService, raw: RawHyperClient, config: ClientConfig) -> Self {
        Self {
            service: SyncService::new(service),
            raw,
            config,
        }
    }

    /// Create a new client builder.
    #[must_use]
    pub fn builder() -> HyperClientBuilder {
        HyperClientBuilder::default()
    }

    /// Get the client configuration.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }
}

impl Default for HyperClient {
    fn default() -> Self {
        Self::new()
    }
}

impl deform_core::HttpClient for HyperClient {
    async fn execute(&self, request: Request<Bytes>) -> TransportResult<Response<Bytes>> {
        self.service.call(request).await
    }

    /// Streams on the shared connection pool. Tower layers are not applied.
    async fn execute_streaming(
        &self,
        request: Request<Bytes>,
    ) -> TransportResult<Response<ByteStream>> {
        let method = request.method();
        let url = request.url().clone();
        tracing::debug!(%method, %url, "streaming request");

        let result = self.raw.execute_streaming(request).await;
        match &result {
            Ok(response) => {
                tracing::debug!(%method, %url, status = response.status(), "streaming response head");
            }
            Err(error) => tracing::warn!(%method, %url, %error, "streaming request failed"),
        }
        result
    }
}

// ============================================================================
// Tower Service Implementation
// ============================================================================

impl Service<Request<Bytes>> for HyperClient {
    type Response = Response<Bytes>;
    type Error = TransportError;
    type Future = ServiceFuture;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<TransportResult<()>> {
        // SyncService is always ready (the underlying service is polled when called)
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request<Bytes>) -> Self::Future {
        self.service.call(request)
    }
}

/// Builder for [`HyperClient`].
///
/// # Example
///
/// ```no_run
/// use deform::HyperClient;
/// use deform::middleware::LoggingLayer;
///
/// let client = HyperClient::builder()
///     .layer(LoggingLayer::debug())
///     .build();
/// ```
#[derive(Default)]
pub struct HyperClientBuilder {
    config: ClientConfigBuilder,
    layers: Vec<Arc<dyn Fn(BoxedService) -> BoxedService + Send + Sync>>,
    use_defaults: bool,
}

impl std::fmt::Debug for HyperClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperClientBuilder")
            .field("config", &self.config)
            .field("layers_count", &self.layers.len())
            .field("use_defaults", &self.use_defaults)
            .finish()
    }
}

impl HyperClientBuilder {
    // ========================================================================
    // Core Configuration
    // ========================================================================

    /// Set the default read timeout, used when a call carries none.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.timeout(timeout);
        self
    }

    /// Set the connection timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.connect_timeout(timeout);
        self
    }

    /// Set the maximum idle connections per host.
    #[must_use]
    pub fn pool_idle_per_host(mut self, count: usize) -> Self {
        self.config = self.config.pool_idle_per_host(count);
        self
    }

    /// Set the idle connection timeout.
    #[must_use]
    pub fn pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.pool_idle_timeout(timeout);
        self
    }

    // ========================================================================
    // Generic Middleware API
    // ========================================================================

    /// Add a Tower layer to the client.
    ///
    /// Each layer wraps the ones added before it: the last added sees
    /// requests first.
    #[must_use]
    pub fn layer<L>(mut self, layer: L) -> Self
    where
        L: Layer<BoxedService> + Send + Sync + 'static,
        L::Service: Service<Request<Bytes>, Response = Response<Bytes>, Error = TransportError>
            + Clone
            + Send
            + 'static,
        <L::Service as Service<Request<Bytes>>>::Future: Send,
    {
        self.layers.push(Arc::new(move |service| {
            BoxCloneService::new(layer.layer(service))
        }));
        self
    }

    /// Alias for [`layer`](Self::layer).
    #[must_use]
    pub fn with<L>(self, layer: L) -> Self
    where
        L: Layer<BoxedService> + Send + Sync + 'static,
        L::Service: Service<Request<Bytes>, Response = Response<Bytes>, Error = TransportError>
            + Clone
            + Send
            + 'static,
        <L::Service as Service<Request<Bytes>>>::Future: Send,
    {
        self.layer(layer)
    }

    // ========================================================================
    // Defaults Control
    // ========================================================================

    /// Enable the default middleware (info-level logging).
    ///
    /// Defaults are applied before any layers added via `.layer()`.
    #[must_use]
    pub fn with_defaults(mut self) -> Self {
        self.use_defaults = true;
        self
    }

    /// Disable all default middleware.
    #[must_use]
    pub fn without_defaults(mut self) -> Self {
        self.use_defaults = false;
        self
    }

    // ========================================================================
    // Helper Methods
    // ========================================================================

    /// Add request/response logging.
    #[must_use]
    pub fn with_logging(self) -> Self {
        self.layer(LoggingLayer::new())
    }

    /// Add debug-level logging (includes headers).
    #[must_use]
    pub fn with_debug_logging(self) -> Self {
        self.layer(LoggingLayer::debug())
    }

    // ========================================================================
    // Build
    // ========================================================================

    /// Build the client with all configured middleware.
    #[must_use]
    pub fn build(self) -> HyperClient {
        let config = self.config.build();
        let base_client = RawHyperClient::new(config.clone());

        let mut service: BoxedService = BoxCloneService::new(base_client.clone());

        if self.use_defaults {
            service = BoxCloneService::new(LoggingLayer::new().layer(service));
        }

        for layer_fn in self.layers {
            service = layer_fn(service);
        }

        HyperClient::with_service(service, base_client, config)
    }
}
