//! Standard operation templates.
//!
//! Each function returns a [`DescriptorBuilder`] preloaded with the dispatch,
//! parameters and requirements of a common operation. Resource tables extend
//! them with [`DescriptorBuilder::params`] and [`DescriptorBuilder::require`].
//!
//! ```
//! use deform_core::PathTemplate;
//! use deform_core::param::catalog;
//! use deform_core::templates;
//!
//! let find = templates::find(
//!     "find",
//!     PathTemplate::new(["collections", "{collection}", "documents"]),
//! )
//! .param(catalog::COLLECTION)
//! .require(["collection"])
//! .build()
//! .expect("valid descriptor");
//! assert!(find.is_paginated());
//! ```

use crate::descriptor::{DescriptorBuilder, Dispatch};
use crate::param::catalog::{
    DATA, FIELDS, FIELDS_EXCLUDE, FILTER, IDENTITY, OPERATION, PROPERTY, SORT, TEXT,
};
use crate::{Method, MethodDescriptor, PathTemplate};

/// Plain `GET`.
#[must_use]
pub fn get(name: &'static str, path: PathTemplate) -> DescriptorBuilder {
    MethodDescriptor::builder(name, Dispatch::Verb(Method::Get)).path(path)
}

/// Paginated `GET` of a list.
#[must_use]
pub fn get_list(name: &'static str, path: PathTemplate) -> DescriptorBuilder {
    get(name, path)
        .params([FIELDS, FIELDS_EXCLUDE, SORT])
        .paginated()
}

/// Paginated search.
#[must_use]
pub fn find(name: &'static str, path: PathTemplate) -> DescriptorBuilder {
    MethodDescriptor::builder(name, Dispatch::Action("find"))
        .path(path)
        .params([FILTER, TEXT, SORT])
        .paginated()
}

/// Number of items matching a search.
#[must_use]
pub fn count(name: &'static str, path: PathTemplate) -> DescriptorBuilder {
    MethodDescriptor::builder(name, Dispatch::Action("find"))
        .path(path)
        .params([FILTER, TEXT])
        .count()
}

/// Update every item matching a filter.
#[must_use]
pub fn update_list(name: &'static str, path: PathTemplate) -> DescriptorBuilder {
    MethodDescriptor::builder(name, Dispatch::Action("update"))
        .path(path)
        .params([FILTER, OPERATION])
        .require(["operation"])
}

/// Update matching items or insert one.
#[must_use]
pub fn upsert(name: &'static str, path: PathTemplate) -> DescriptorBuilder {
    MethodDescriptor::builder(name, Dispatch::Action("upsert"))
        .path(path)
        .params([FILTER, OPERATION])
        .require(["operation"])
}

/// Remove every item matching a filter.
#[must_use]
pub fn remove_list(name: &'static str, path: PathTemplate) -> DescriptorBuilder {
    MethodDescriptor::builder(name, Dispatch::Action("delete"))
        .path(path)
        .param(FILTER)
}

/// `GET` one resource or one of its properties.
#[must_use]
pub fn get_one(name: &'static str, path: PathTemplate) -> DescriptorBuilder {
    get(name, path)
        .params([IDENTITY, PROPERTY, FIELDS, FIELDS_EXCLUDE])
        .require(["identity"])
}

/// Raw content of a stored file.
///
/// The path gets a trailing `content` segment.
#[must_use]
pub fn get_file(name: &'static str, path: PathTemplate) -> DescriptorBuilder {
    get(name, path.join("content"))
        .params([IDENTITY, PROPERTY])
        .require(["identity"])
        .content()
}

/// `POST` a new resource.
#[must_use]
pub fn create_one(name: &'static str, path: PathTemplate) -> DescriptorBuilder {
    MethodDescriptor::builder(name, Dispatch::Verb(Method::Post))
        .path(path)
        .param(DATA)
        .require(["data"])
}

/// `PUT` a resource, reporting whether it was created.
#[must_use]
pub fn save_one(name: &'static str, path: PathTemplate) -> DescriptorBuilder {
    MethodDescriptor::builder(name, Dispatch::Verb(Method::Put))
        .path(path)
        .params([IDENTITY, PROPERTY, DATA])
        .require(["data"])
        .create_status()
}

/// `PATCH` a singleton resource.
#[must_use]
pub fn update(name: &'static str, path: PathTemplate) -> DescriptorBuilder {
    MethodDescriptor::builder(name, Dispatch::Verb(Method::Patch))
        .path(path)
        .param(DATA)
        .require(["data"])
}

/// `PATCH` one resource or one of its properties.
#[must_use]
pub fn update_one(name: &'static str, path: PathTemplate) -> DescriptorBuilder {
    MethodDescriptor::builder(name, Dispatch::Verb(Method::Patch))
        .path(path)
        .params([IDENTITY, PROPERTY, DATA])
        .require(["identity", "data"])
}

/// `DELETE` one resource or one of its properties.
#[must_use]
pub fn remove_one(name: &'static str, path: PathTemplate) -> DescriptorBuilder {
    MethodDescriptor::builder(name, Dispatch::Verb(Method::Delete))
        .path(path)
        .params([IDENTITY, PROPERTY])
        .require(["identity"])
}
