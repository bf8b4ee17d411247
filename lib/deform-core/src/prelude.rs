//! Prelude module for convenient imports.
//!
//! ```
//! use deform_core::prelude::*;
//! ```

pub use futures_util::{StreamExt, TryStreamExt};

pub use crate::{
    ApiError, Args, DeformClient, Download, Error, ErrorKind, FileUpload, HttpClient, Method,
    MethodDescriptor, Outcome, Page, Request, Response, Result, Timeout, TransportError, Value,
};
