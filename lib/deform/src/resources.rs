//! Resource tables of the document API.
//!
//! A [`Resource`] names a set of operations; [`BoundResource`] pairs it with
//! a client so operations can be called by name:
//!
//! ```no_run
//! use deform::prelude::*;
//!
//! # async fn run(project: deform::ProjectClient) -> deform::Result<()> {
//! let venues = project
//!     .documents()
//!     .call("find", Args::new().arg("collection", "venues"))
//!     .await?
//!     .into_cursor()?
//!     .try_collect::<Vec<_>>()
//!     .await?;
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use deform_core::param::catalog::{
    CODE, COLLECTION, EMAIL, FIELDS, FIELDS_EXCLUDE, PASSWORD,
};
use deform_core::templates;
use tracing::debug;

use crate::{
    Args, DeformClient, DescriptorBuilder, Dispatch, Error, Method, MethodDescriptor, Outcome,
    PathTemplate, RequestContext, Result,
};

/// A named table of operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    name: &'static str,
    methods: BTreeMap<&'static str, Arc<MethodDescriptor>>,
}

impl Resource {
    /// Start a table.
    #[must_use]
    pub fn builder(name: &'static str) -> ResourceBuilder {
        ResourceBuilder {
            name,
            methods: Vec::new(),
        }
    }

    /// Resource name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Operation names, sorted.
    pub fn operations(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.methods.keys().copied()
    }

    /// Descriptor of one operation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] when the table has no such operation.
    pub fn method(&self, operation: &str) -> Result<&Arc<MethodDescriptor>> {
        self.methods.get(operation).ok_or_else(|| {
            Error::invalid_request(format!("{} has no operation '{operation}'", self.name))
        })
    }
}

/// Builder for [`Resource`].
#[derive(Debug, Clone)]
pub struct ResourceBuilder {
    name: &'static str,
    methods: Vec<DescriptorBuilder>,
}

impl ResourceBuilder {
    /// Add an operation.
    #[must_use]
    pub fn method(mut self, method: DescriptorBuilder) -> Self {
        self.methods.push(method);
        self
    }

    /// Build every descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDescriptor`] for an inconsistent descriptor or
    /// two operations with the same name.
    pub fn build(self) -> Result<Resource> {
        let mut methods = BTreeMap::new();
        for builder in self.methods {
            let descriptor = builder.build()?;
            let name = descriptor.name();
            if methods.insert(name, Arc::new(descriptor)).is_some() {
                return Err(Error::invalid_descriptor(format!(
                    "{} declares '{name}' twice",
                    self.name
                )));
            }
        }
        Ok(Resource {
            name: self.name,
            methods,
        })
    }
}

/// A resource bound to a client.
#[derive(Debug, Clone)]
pub struct BoundResource<C> {
    resource: Arc<Resource>,
    client: C,
}

impl<C: DeformClient> BoundResource<C> {
    /// Bind `resource` to `client`.
    #[must_use]
    pub const fn new(resource: Arc<Resource>, client: C) -> Self {
        Self { resource, client }
    }

    /// The operation table.
    #[must_use]
    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    /// The client calls go through.
    #[must_use]
    pub const fn client(&self) -> &C {
        &self.client
    }

    /// Request context `operation` would send, without sending it.
    ///
    /// # Errors
    ///
    /// Same local errors as [`call`](Self::call).
    pub fn context(&self, operation: &str, args: Args) -> Result<RequestContext> {
        self.resource.method(operation)?.context(&self.client, args)
    }

    /// Invoke `operation`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] for an unknown operation, then
    /// whatever the descriptor reports.
    pub async fn call(&self, operation: &str, args: Args) -> Result<Outcome> {
        let method = self.resource.method(operation)?;
        debug!(resource = self.resource.name, operation, "calling");
        method.invoke(&self.client, args).await
    }
}

// ============================================================================
// Tables
// ============================================================================

fn path(segments: impl IntoIterator<Item = &'static str>) -> PathTemplate {
    PathTemplate::new(segments)
}

/// The current user: login, registration and profile.
///
/// # Errors
///
/// Returns [`Error::InvalidDescriptor`] if a descriptor is inconsistent.
pub fn user() -> Result<Resource> {
    let user = || path(["user"]);
    Resource::builder("user")
        .method(
            MethodDescriptor::builder("login", Dispatch::Action("login"))
                .path(user())
                .params([EMAIL, PASSWORD])
                .require(["email", "password"])
                .result_key("sessionId"),
        )
        .method(MethodDescriptor::builder("logout", Dispatch::Action("logout")).path(user()))
        .method(
            MethodDescriptor::builder("create", Dispatch::Verb(Method::Post))
                .path(user())
                .params([EMAIL, PASSWORD])
                .require(["email", "password"]),
        )
        .method(
            MethodDescriptor::builder("confirm", Dispatch::Action("confirm"))
                .path(user())
                .param(CODE)
                .require(["code"]),
        )
        .method(templates::get("get", user()))
        .build()
}

/// Projects visible to the session.
///
/// # Errors
///
/// Returns [`Error::InvalidDescriptor`] if a descriptor is inconsistent.
pub fn projects() -> Result<Resource> {
    list("projects", || path(["projects"]), &[])
}

/// One project.
///
/// # Errors
///
/// Returns [`Error::InvalidDescriptor`] if a descriptor is inconsistent.
pub fn project() -> Result<Resource> {
    one(
        "project",
        || path(["projects"]),
        || path(["projects", "{identity}", "{property}"]),
        &[],
    )
}

/// Project information.
///
/// # Errors
///
/// Returns [`Error::InvalidDescriptor`] if a descriptor is inconsistent.
pub fn info() -> Result<Resource> {
    Resource::builder("info")
        .method(templates::get("get", path(["info"])))
        .build()
}

/// Collections of a project.
///
/// # Errors
///
/// Returns [`Error::InvalidDescriptor`] if a descriptor is inconsistent.
pub fn collections() -> Result<Resource> {
    let collections = || path(["collections"]);
    bulk(list("collections", collections, &[])?, collections, &[])
}

/// One collection.
///
/// # Errors
///
/// Returns [`Error::InvalidDescriptor`] if a descriptor is inconsistent.
pub fn collection() -> Result<Resource> {
    one(
        "collection",
        || path(["collections"]),
        || path(["collections", "{identity}", "{property}"]),
        &[],
    )
}

/// Documents of a collection.
///
/// # Errors
///
/// Returns [`Error::InvalidDescriptor`] if a descriptor is inconsistent.
pub fn documents() -> Result<Resource> {
    let documents = || path(["collections", "{collection}", "documents"]);
    bulk(
        list("documents", documents, &["collection"])?,
        documents,
        &["collection"],
    )
}

/// One document.
///
/// # Errors
///
/// Returns [`Error::InvalidDescriptor`] if a descriptor is inconsistent.
pub fn document() -> Result<Resource> {
    let document = || {
        path([
            "collections",
            "{collection}",
            "documents",
            "{identity}",
            "{property}",
        ])
    };
    let mut resource = one(
        "document",
        || path(["collections", "{collection}", "documents"]),
        document,
        &["collection"],
    )?;
    let get_file = scoped(templates::get_file("get_file", document()), &["collection"]).build()?;
    resource.methods.insert(get_file.name(), Arc::new(get_file));
    Ok(resource)
}

/// Adds the `collection` parameter when the path is scoped to one.
fn scoped(builder: DescriptorBuilder, scope: &[&'static str]) -> DescriptorBuilder {
    if scope.is_empty() {
        builder
    } else {
        builder.param(COLLECTION).require(scope.iter().copied())
    }
}

fn list(
    name: &'static str,
    path: impl Fn() -> PathTemplate,
    scope: &[&'static str],
) -> Result<Resource> {
    Resource::builder(name)
        .method(scoped(templates::get_list("get", path()), scope))
        .method(scoped(
            templates::find("find", path()).params([FIELDS, FIELDS_EXCLUDE]),
            scope,
        ))
        .method(scoped(templates::count("count", path()), scope))
        .build()
}

/// Adds the filter-driven bulk operations to a list table.
fn bulk(
    mut resource: Resource,
    path: impl Fn() -> PathTemplate,
    scope: &[&'static str],
) -> Result<Resource> {
    for builder in [
        templates::update_list("update", path()),
        templates::upsert("upsert", path()),
        templates::remove_list("remove", path()),
    ] {
        let descriptor = scoped(builder, scope).build()?;
        resource.methods.insert(descriptor.name(), Arc::new(descriptor));
    }
    Ok(resource)
}

fn one(
    name: &'static str,
    list: impl Fn() -> PathTemplate,
    item: impl Fn() -> PathTemplate,
    scope: &[&'static str],
) -> Result<Resource> {
    Resource::builder(name)
        .method(scoped(templates::get_one("get", item()), scope))
        .method(scoped(templates::create_one("create", list()), scope))
        .method(scoped(templates::save_one("save", item()), scope))
        .method(scoped(templates::update_one("update", item()), scope))
        .method(scoped(templates::remove_one("remove", item()), scope))
        .build()
}

/// Every table, built once per client.
#[derive(Debug, Clone)]
pub(crate) struct Tables {
    pub(crate) user: Arc<Resource>,
    pub(crate) projects: Arc<Resource>,
    pub(crate) project: Arc<Resource>,
    pub(crate) info: Arc<Resource>,
    pub(crate) collections: Arc<Resource>,
    pub(crate) collection: Arc<Resource>,
    pub(crate) documents: Arc<Resource>,
    pub(crate) document: Arc<Resource>,
}

impl Tables {
    pub(crate) fn build() -> Result<Self> {
        Ok(Self {
            user: Arc::new(user()?),
            projects: Arc::new(projects()?),
            project: Arc::new(project()?),
            info: Arc::new(info()?),
            collections: Arc::new(collections()?),
            collection: Arc::new(collection()?),
            documents: Arc::new(documents()?),
            document: Arc::new(document()?),
        })
    }
}
