//! HTTPS connector using rustls, with a per-call connect limit.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};
use std::time::Duration;

use http::Uri;
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::connect::HttpConnector;
use tokio::sync::Notify;
use tower_service::Service;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

tokio::task_local! {
    static CONNECT_PHASE: ConnectPhase;
}

/// Create an HTTPS connector with rustls.
///
/// Plain `http` URLs are still accepted.
#[must_use]
fn https_connector() -> HttpsConnector<HttpConnector> {
    let root_store: rustls::RootCertStore =
        webpki_roots::TLS_SERVER_ROOTS.iter().cloned().collect();

    let tls_config = rustls::ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    let mut http = HttpConnector::new();
    http.enforce_http(false);

    HttpsConnectorBuilder::new()
        .with_tls_config(tls_config)
        .https_or_http()
        .enable_http1()
        .enable_http2()
        .wrap_connector(http)
}

/// Connect limit and progress of the call being sent.
///
/// Installed as a task-local around one exchange, so the connector can
/// read the limit of the call that triggered it.
#[derive(Clone)]
pub struct ConnectPhase {
    limit: Duration,
    state: Arc<PhaseState>,
}

#[derive(Default)]
struct PhaseState {
    started: AtomicBool,
    finished: Notify,
}

impl ConnectPhase {
    #[must_use]
    pub fn new(limit: Duration) -> Self {
        Self {
            limit,
            state: Arc::default(),
        }
    }

    /// Run `future` with this phase visible to the connector.
    pub fn scope<F: Future>(&self, future: F) -> impl Future<Output = F::Output> {
        CONNECT_PHASE.scope(self.clone(), future)
    }

    /// Resolves once no connection is being opened for this call.
    ///
    /// Must be polled after the exchange's first poll, which is when a
    /// fresh connection would be started.
    pub async fn settled(&self) {
        if self.state.started.load(Ordering::Acquire) {
            self.state.finished.notified().await;
        }
    }

    fn start(&self) {
        self.state.started.store(true, Ordering::Release);
    }

    fn finish(&self) {
        self.state.finished.notify_one();
    }
}

/// Connector that bounds TCP and TLS setup by the connect limit.
///
/// The limit comes from the [`ConnectPhase`] in scope, else the default
/// given at construction. An overrun fails with an I/O `TimedOut` error.
#[derive(Clone)]
pub struct TimedConnector {
    inner: HttpsConnector<HttpConnector>,
    default_limit: Duration,
}

impl TimedConnector {
    #[must_use]
    pub fn new(default_limit: Duration) -> Self {
        Self {
            inner: https_connector(),
            default_limit,
        }
    }
}

impl Service<Uri> for TimedConnector {
    type Response = <HttpsConnector<HttpConnector> as Service<Uri>>::Response;
    type Error = BoxError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, BoxError>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), BoxError>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, dst: Uri) -> Self::Future {
        let phase = CONNECT_PHASE.try_with(Clone::clone).ok();
        let limit = phase.as_ref().map_or(self.default_limit, |phase| phase.limit);
        if let Some(phase) = &phase {
            phase.start();
        }

        let connecting = self.inner.call(dst);
        Box::pin(async move {
            let result = tokio::time::timeout(limit, connecting)
                .await
                .unwrap_or_else(|_| {
                    Err(Box::new(std::io::Error::new(
                        std::io::ErrorKind::TimedOut,
                        format!("connect timed out after {limit:?}"),
                    )) as BoxError)
                });
            if let Some(phase) = phase {
                phase.finish();
            }
            result
        })
    }
}

#[cfg(test)]
mod tests {
    use assert2::check;

    use super::*;

    #[test]
    fn creates_connector() {
        let _connector = TimedConnector::new(Duration::from_secs(1));
    }

    #[tokio::test]
    async fn settled_without_connect_is_immediate() {
        let phase = ConnectPhase::new(Duration::from_secs(1));
        phase.settled().await;
    }

    #[tokio::test]
    async fn settled_waits_for_finish() {
        let phase = ConnectPhase::new(Duration::from_secs(1));
        phase.start();
        phase.finish();
        phase.settled().await;
        check!(phase.state.started.load(Ordering::Acquire));
    }

    #[tokio::test]
    async fn scope_exposes_the_limit() {
        let phase = ConnectPhase::new(Duration::from_millis(250));
        let limit = phase
            .scope(async { CONNECT_PHASE.try_with(|phase| phase.limit) })
            .await;
        check!(limit.ok() == Some(Duration::from_millis(250)));
    }
}
