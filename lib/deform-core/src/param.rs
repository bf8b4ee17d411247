//! Parameter definitions and routing.
//!
//! A [`ParamDef`] says where an argument goes in the HTTP request. [`route`]
//! splits an invocation's arguments by [`Destination`] before the URL
//! builder, the query/header renderers and the payload encoder pick up their
//! share.

use std::collections::BTreeMap;
use std::fmt;

use crate::{Args, Error, Result, Value};

/// Where an argument is sent in the HTTP request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Destination {
    /// Path segment (e.g., `collections/{identity}`).
    Uri,
    /// Query parameter (e.g., `?fields=name`).
    Query,
    /// Request header.
    Header,
    /// Request body (JSON or multipart).
    Payload,
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uri => write!(f, "uri"),
            Self::Query => write!(f, "query"),
            Self::Header => write!(f, "header"),
            Self::Payload => write!(f, "payload"),
        }
    }
}

/// Metadata about a single named parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamDef {
    /// The argument name.
    pub name: &'static str,
    /// Where the argument is sent.
    pub destination: Destination,
    /// Key of the argument inside the merged payload object.
    ///
    /// Only meaningful for [`Destination::Payload`].
    pub payload_key: Option<&'static str>,
    /// Human readable description.
    pub description: &'static str,
}

impl ParamDef {
    /// Create a definition.
    #[must_use]
    pub const fn new(name: &'static str, destination: Destination) -> Self {
        Self {
            name,
            destination,
            payload_key: None,
            description: "",
        }
    }

    /// A path segment parameter.
    #[must_use]
    pub const fn uri(name: &'static str) -> Self {
        Self::new(name, Destination::Uri)
    }

    /// A query string parameter.
    #[must_use]
    pub const fn query(name: &'static str) -> Self {
        Self::new(name, Destination::Query)
    }

    /// A header parameter.
    #[must_use]
    pub const fn header(name: &'static str) -> Self {
        Self::new(name, Destination::Header)
    }

    /// A body parameter.
    #[must_use]
    pub const fn payload(name: &'static str) -> Self {
        Self::new(name, Destination::Payload)
    }

    /// Place the argument under `key` in the merged payload object.
    #[must_use]
    pub const fn with_payload_key(mut self, key: &'static str) -> Self {
        self.payload_key = Some(key);
        self
    }

    /// Attach a description.
    #[must_use]
    pub const fn with_description(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }
}

/// Look up a definition by name.
#[must_use]
pub fn find<'a>(definitions: &'a [ParamDef], name: &str) -> Option<&'a ParamDef> {
    definitions.iter().find(|definition| definition.name == name)
}

/// Arguments grouped by destination.
///
/// Only destinations that received at least one argument are present.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Routed {
    groups: BTreeMap<Destination, BTreeMap<String, Value>>,
}

impl Routed {
    /// Arguments routed to `destination`, if any.
    #[must_use]
    pub fn get(&self, destination: Destination) -> Option<&BTreeMap<String, Value>> {
        self.groups.get(&destination)
    }

    /// Remove and return the arguments routed to `destination`.
    pub fn take(&mut self, destination: Destination) -> BTreeMap<String, Value> {
        self.groups.remove(&destination).unwrap_or_default()
    }

    /// Destinations that received arguments.
    pub fn destinations(&self) -> impl Iterator<Item = Destination> + '_ {
        self.groups.keys().copied()
    }
}

/// Group arguments by their declared destination.
///
/// # Errors
///
/// Returns [`Error::UnknownParameter`] for an argument without definition.
pub fn route(args: BTreeMap<String, Value>, definitions: &[ParamDef]) -> Result<Routed> {
    let mut routed = Routed::default();
    for (name, value) in args {
        let definition = find(definitions, &name).ok_or_else(|| Error::unknown_parameter(&name))?;
        routed
            .groups
            .entry(definition.destination)
            .or_default()
            .insert(name, value);
    }
    Ok(routed)
}

/// Returns the first name of `required` missing from `args`.
#[must_use]
pub fn first_missing<'a>(required: &[&'a str], args: &Args) -> Option<&'a str> {
    required.iter().copied().find(|name| !args.contains(name))
}

/// Standard parameters of the document API.
pub mod catalog {
    use super::ParamDef;

    /// Identity of a single resource.
    pub const IDENTITY: ParamDef = ParamDef::uri("identity").with_description("Identity");
    /// Collection a document belongs to.
    pub const COLLECTION: ParamDef = ParamDef::uri("collection").with_description("Collection");
    /// Nested property path inside a resource.
    pub const PROPERTY: ParamDef =
        ParamDef::uri("property").with_description("Work with specified property");
    /// Field projection.
    pub const FIELDS: ParamDef =
        ParamDef::query("fields").with_description("Return specified fields only");
    /// Negative field projection.
    pub const FIELDS_EXCLUDE: ParamDef =
        ParamDef::query("fields_exclude").with_description("Return all but the excluded field");
    /// Sort order.
    pub const SORT: ParamDef = ParamDef::query("sort").with_description("Sort by property");
    /// Page number.
    pub const PAGE: ParamDef = ParamDef::query("page").with_description("Page number");
    /// Page size.
    pub const PER_PAGE: ParamDef = ParamDef::query("per_page").with_description("Items per page");
    /// Resource body.
    pub const DATA: ParamDef = ParamDef::payload("data").with_description("Data");
    /// Filter query.
    pub const FILTER: ParamDef = ParamDef::payload("filter")
        .with_payload_key("filter")
        .with_description("Filter query");
    /// Full text search.
    pub const TEXT: ParamDef = ParamDef::payload("text")
        .with_payload_key("text")
        .with_description("Full text search value");
    /// Update operation.
    pub const OPERATION: ParamDef = ParamDef::payload("operation")
        .with_payload_key("operation")
        .with_description("Update operation");
    /// User email.
    pub const EMAIL: ParamDef = ParamDef::payload("email")
        .with_payload_key("email")
        .with_description("User email");
    /// User password.
    pub const PASSWORD: ParamDef = ParamDef::payload("password")
        .with_payload_key("password")
        .with_description("User password");
    /// Email confirmation code.
    pub const CODE: ParamDef = ParamDef::payload("code")
        .with_payload_key("code")
        .with_description("Email confirmation code");
}
