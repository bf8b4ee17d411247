//! Tower middleware layers for the deform HTTP client.
//!
//! Layers wrap the transport through [`HyperClientBuilder::layer`]; the last
//! layer added is the first to see a request.
//!
//! - [`LoggingLayer`] - logs requests/responses using `tracing`
//!
//! Any other Tower layer whose service speaks `Request<Bytes>` /
//! `Response<Bytes>` / [`TransportError`] plugs in the same way.
//!
//! [`HyperClientBuilder::layer`]: crate::HyperClientBuilder::layer
//! [`TransportError`]: crate::TransportError

mod logging;

pub use logging::{LogLevel, Logging, LoggingLayer};

// Re-export tower types for convenience
pub use tower::{Layer, ServiceBuilder};
