//! Resource/method descriptor engine for the deform document-database client.
//!
//! This crate turns static operation descriptions into HTTP requests and
//! reads the responses back:
//! - [`Value`] and [`Args`] - invocation arguments
//! - [`param`] - parameter definitions and routing by destination
//! - [`PathTemplate`] - URL building from path templates
//! - [`payload`] - JSON or multipart body encoding
//! - [`RequestContext`] - the assembled request of one call
//! - [`pagination`] - single pages and lazy cursors
//! - [`classify`] - mapping of failures to [`ErrorKind`]
//! - [`MethodDescriptor`] - the composition root, see [`templates`]
//! - [`HttpClient`] and [`DeformClient`] - the transport seam
//!
//! The transport itself lives in the `deform` crate.

pub mod classify;
mod client;
pub mod context;
pub mod descriptor;
pub mod download;
mod error;
mod method;
mod multipart;
pub mod pagination;
pub mod param;
mod path_template;
pub mod payload;
pub mod prelude;
mod request;
mod response;
pub mod templates;
mod value;

pub use classify::TransportError;
pub use client::{DeformClient, HttpClient, dispatch, dispatch_streaming};
pub use context::RequestContext;
pub use descriptor::{DescriptorBuilder, Dispatch, MethodDescriptor, Outcome, Saved, Shape};
pub use download::{ByteStream, Download};
pub use error::{ApiError, Error, ErrorKind, FieldError, Result};
pub use method::Method;
pub use multipart::{Form, Part};
pub use pagination::{Cursor, Page};
pub use param::{Destination, ParamDef};
pub use path_template::{PathTemplate, Segment};
pub use payload::{Body, FormField, flatten, from_json, to_json};
pub use request::{Request, RequestBuilder, Timeout};
pub use response::Response;
pub use value::{Args, FileUpload, Value};

// Re-export http crate types for status codes and headers
pub use http::{StatusCode, header};
