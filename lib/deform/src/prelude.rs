//! Prelude module for convenient imports.
//!
//! ```
//! use deform::prelude::*;
//! ```

pub use deform_core::prelude::*;

pub use crate::{
    ApiClient, Auth, BoundResource, Client, ClientConfig, Endpoint, HyperClient, ProjectClient,
    Resource, SessionClient,
};
