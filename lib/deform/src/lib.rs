//! Async client for the Deform document database.
//!
//! Operations are described once as [`MethodDescriptor`]s (see
//! [`deform_core`]) and grouped into [`Resource`] tables. This crate adds:
//! - [`HyperClient`] - a hyper-util/rustls transport with Tower middleware
//! - [`Endpoint`] and [`ClientConfig`] - where and how to connect
//! - [`Auth`] and [`ApiClient`] - credentials bound to a base URL
//! - [`Client`], [`SessionClient`], [`ProjectClient`] - the client hierarchy
//!
//! # Example
//!
//! ```no_run
//! use deform::prelude::*;
//!
//! # async fn run() -> deform::Result<()> {
//! let client = Client::new(Endpoint::new("deform.io"))?;
//! let project = client.project_with_token("venues", "my-token")?;
//!
//! let saved = project
//!     .document()
//!     .call(
//!         "save",
//!         Args::new()
//!             .arg("collection", "venues")
//!             .arg("identity", "subway")
//!             .arg("data", serde_json::json!({"name": "Subway"})),
//!     )
//!     .await?
//!     .into_saved()?;
//! let _newly_created = saved.created;
//! # Ok(())
//! # }
//! ```

mod api_client;
mod auth;
mod client;
mod config;
mod connector;
pub mod middleware;
pub mod prelude;
pub mod resources;
mod session;

pub use api_client::ApiClient;
pub use auth::Auth;
pub use client::{BoxedService, HyperClient, HyperClientBuilder, ServiceFuture};
pub use config::{ClientConfig, ClientConfigBuilder, Endpoint, EndpointBuilder};
pub use resources::{BoundResource, Resource, ResourceBuilder};
pub use session::{Client, ProjectClient, SessionClient};

// Re-export tower for middleware composition
pub use tower;

// Re-export the engine
pub use deform_core::{
    ApiError, Args, Body, ByteStream, Cursor, DeformClient, DescriptorBuilder, Dispatch, Download,
    Error, ErrorKind, FieldError, FileUpload, Form, HttpClient, Method, MethodDescriptor, Outcome,
    Page, ParamDef, Part, PathTemplate, Request, RequestBuilder, RequestContext, Response, Result,
    Saved, Shape, Timeout, TransportError, Value,
};
pub use deform_core::{StatusCode, header};

pub use url;
