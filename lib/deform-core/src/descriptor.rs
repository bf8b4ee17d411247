//! Method descriptors.
//!
//! A [`MethodDescriptor`] is the static description of one operation: wire
//! method or custom action, path template, parameter definitions, required
//! parameters and how the response is read. It is immutable once built and
//! shared by every invocation.
//!
//! # Example
//!
//! ```
//! use deform_core::{Args, Dispatch, Method, MethodDescriptor, PathTemplate};
//! use deform_core::param::catalog;
//!
//! let get = MethodDescriptor::builder("get", Dispatch::Verb(Method::Get))
//!     .path(PathTemplate::new(["collections", "{identity}"]))
//!     .param(catalog::IDENTITY)
//!     .require(["identity"])
//!     .build()
//!     .expect("valid descriptor");
//!
//! assert_eq!(get.name(), "get");
//! assert_eq!(get.required(), ["identity"]);
//! ```

use std::fmt;

use bytes::Bytes;
use tracing::debug;

use crate::client::{dispatch, dispatch_streaming};
use crate::download::Download;
use crate::context::{ACTION_HEADER, RequestContext};
use crate::pagination::{self, Cursor, Page};
use crate::param::{Destination, ParamDef, catalog, find, first_missing, route};
use crate::{Args, DeformClient, Error, Method, PathTemplate, Response, Result, payload};

/// How an operation is put on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dispatch {
    /// Plain HTTP verb.
    Verb(Method),
    /// Custom action: `POST` with an `X-Action` header.
    Action(&'static str),
}

impl Dispatch {
    /// The wire method.
    #[must_use]
    pub const fn method(self) -> Method {
        match self {
            Self::Verb(method) => method,
            Self::Action(_) => Method::Post,
        }
    }

    /// The action name, if any.
    #[must_use]
    pub const fn action(self) -> Option<&'static str> {
        match self {
            Self::Verb(_) => None,
            Self::Action(action) => Some(action),
        }
    }
}

impl fmt::Display for Dispatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Verb(method) => write!(f, "{method}"),
            Self::Action(action) => write!(f, "POST ({action})"),
        }
    }
}

/// How a successful response is read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Shape {
    /// The `result` document.
    #[default]
    Value,
    /// The `total` of a one-item page.
    Count,
    /// The raw body, streamed.
    Content,
}

/// Result of a call acknowledged with a create-or-update status.
#[derive(Debug, Clone, PartialEq)]
pub struct Saved {
    /// The service answered `201 Created`.
    pub created: bool,
    /// The `result` document.
    pub result: serde_json::Value,
}

/// Outcome of an invocation.
pub enum Outcome {
    /// No body.
    Empty,
    /// The `result` document.
    Value(serde_json::Value),
    /// Raw body of a response that was not JSON.
    Content(Bytes),
    /// File download, body not read yet.
    Download(Download),
    /// Create-or-update result.
    Saved(Saved),
    /// One explicit page.
    Page(Page),
    /// Lazy sequence over all pages.
    Cursor(Cursor),
    /// Number of matching items.
    Count(u64),
}

impl Outcome {
    /// Name of the variant, for error messages.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Value(_) => "value",
            Self::Content(_) => "content",
            Self::Download(_) => "download",
            Self::Saved(_) => "saved",
            Self::Page(_) => "page",
            Self::Cursor(_) => "cursor",
            Self::Count(_) => "count",
        }
    }

    fn unexpected(self, expected: &'static str) -> Error {
        Error::UnexpectedOutcome {
            expected,
            actual: self.kind_name(),
        }
    }

    /// The `result` document. An empty outcome is `null`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnexpectedOutcome`] for other shapes.
    pub fn into_value(self) -> Result<serde_json::Value> {
        match self {
            Self::Value(value) => Ok(value),
            Self::Saved(saved) => Ok(saved.result),
            Self::Empty => Ok(serde_json::Value::Null),
            other => Err(other.unexpected("value")),
        }
    }

    /// Deserialize the `result` document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnexpectedOutcome`] for other shapes, or a
    /// path-aware [`Error::JsonDeserialization`].
    pub fn deserialize<T: serde::de::DeserializeOwned>(self) -> Result<T> {
        let value = self.into_value()?;
        serde_path_to_error::deserialize(value).map_err(|e| {
            Error::json_deserialization(e.path().to_string(), e.inner().to_string())
        })
    }

    /// The raw body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnexpectedOutcome`] for other shapes.
    pub fn into_content(self) -> Result<Bytes> {
        match self {
            Self::Content(content) => Ok(content),
            Self::Empty => Ok(Bytes::new()),
            other => Err(other.unexpected("content")),
        }
    }

    /// The pending file download.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnexpectedOutcome`] for other shapes.
    pub fn into_download(self) -> Result<Download> {
        match self {
            Self::Download(download) => Ok(download),
            other => Err(other.unexpected("download")),
        }
    }

    /// The create-or-update result.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnexpectedOutcome`] for other shapes.
    pub fn into_saved(self) -> Result<Saved> {
        match self {
            Self::Saved(saved) => Ok(saved),
            other => Err(other.unexpected("saved")),
        }
    }

    /// The explicit page.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnexpectedOutcome`] for other shapes.
    pub fn into_page(self) -> Result<Page> {
        match self {
            Self::Page(page) => Ok(page),
            other => Err(other.unexpected("page")),
        }
    }

    /// The lazy cursor.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnexpectedOutcome`] for other shapes.
    pub fn into_cursor(self) -> Result<Cursor> {
        match self {
            Self::Cursor(cursor) => Ok(cursor),
            other => Err(other.unexpected("cursor")),
        }
    }

    /// The count.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnexpectedOutcome`] for other shapes.
    pub fn into_count(self) -> Result<u64> {
        match self {
            Self::Count(count) => Ok(count),
            other => Err(other.unexpected("count")),
        }
    }
}

impl fmt::Debug for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("Empty"),
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Content(content) => f.debug_tuple("Content").field(&content.len()).finish(),
            Self::Download(download) => f.debug_tuple("Download").field(download).finish(),
            Self::Saved(saved) => f.debug_tuple("Saved").field(saved).finish(),
            Self::Page(page) => f.debug_tuple("Page").field(page).finish(),
            Self::Cursor(_) => f.write_str("Cursor(..)"),
            Self::Count(count) => f.debug_tuple("Count").field(count).finish(),
        }
    }
}

/// Static description of one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDescriptor {
    name: &'static str,
    dispatch: Dispatch,
    path: PathTemplate,
    params: Vec<ParamDef>,
    required: Vec<&'static str>,
    paginated: bool,
    result_key: Option<&'static str>,
    create_status: bool,
    shape: Shape,
}

impl MethodDescriptor {
    /// Start describing an operation.
    #[must_use]
    pub fn builder(name: &'static str, dispatch: Dispatch) -> DescriptorBuilder {
        DescriptorBuilder::new(name, dispatch)
    }

    /// Operation name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Wire method or action.
    #[must_use]
    pub const fn dispatch(&self) -> Dispatch {
        self.dispatch
    }

    /// Path template.
    #[must_use]
    pub const fn path(&self) -> &PathTemplate {
        &self.path
    }

    /// Parameter definitions.
    #[must_use]
    pub fn params(&self) -> &[ParamDef] {
        &self.params
    }

    /// Required parameter names, in checking order.
    #[must_use]
    pub fn required(&self) -> &[&'static str] {
        &self.required
    }

    /// Whether the operation walks pages.
    #[must_use]
    pub const fn is_paginated(&self) -> bool {
        self.paginated
    }

    /// Key unwrapped from `result`.
    #[must_use]
    pub const fn result_key(&self) -> Option<&'static str> {
        self.result_key
    }

    /// Whether `201` vs `200` is reported.
    #[must_use]
    pub const fn reports_create_status(&self) -> bool {
        self.create_status
    }

    /// How the response is read.
    #[must_use]
    pub const fn shape(&self) -> Shape {
        self.shape
    }

    /// Build the request context of one invocation.
    ///
    /// No request is sent.
    ///
    /// # Errors
    ///
    /// - [`Error::MissingParameter`] for the first absent required parameter
    /// - [`Error::UnknownParameter`] for an argument without definition
    /// - [`Error::InvalidRequest`] for arguments that cannot be encoded
    pub fn context<C: DeformClient>(&self, client: &C, args: Args) -> Result<RequestContext> {
        if let Some(name) = first_missing(&self.required, &args) {
            return Err(Error::missing_parameter(name));
        }

        let (values, timeout) = args.into_parts();
        let mut routed = route(values, &self.params)?;

        let url = self
            .path
            .build_url(client.base_url(), &routed.take(Destination::Uri))?;
        let mut context = RequestContext::new(self.dispatch.method(), url);
        context.timeout = timeout;

        context.extend_headers(routed.take(Destination::Header))?;
        if let Some(auth) = client.auth_header() {
            context.set_header("Authorization", auth);
        }
        if let Some(action) = self.dispatch.action() {
            context.set_header(ACTION_HEADER, action);
        }

        context.extend_query(routed.take(Destination::Query))?;
        if self.shape == Shape::Count {
            context.set_query(catalog::PER_PAGE.name, "1");
            context.set_query(catalog::FIELDS.name, "_id");
        }

        context.body = payload::encode(routed.take(Destination::Payload), &self.params)?;
        Ok(context)
    }

    /// Invoke the operation.
    ///
    /// Paginated operations return [`Outcome::Page`] when `page` or `per_page`
    /// is given and a lazy [`Outcome::Cursor`] otherwise.
    ///
    /// # Errors
    ///
    /// Returns local validation errors before any request is sent, then the
    /// classified failure of the call.
    pub async fn invoke<C: DeformClient>(&self, client: &C, args: Args) -> Result<Outcome> {
        let single_page = pagination::wants_single_page(&args);
        let context = self.context(client, args)?;

        if self.paginated && !single_page {
            debug!(operation = self.name, url = %context.url, "opening cursor");
            return Ok(Outcome::Cursor(pagination::cursor(
                client.clone(),
                context,
                self.name,
            )));
        }

        debug!(
            operation = self.name,
            method = %context.method,
            url = %context.url,
            "dispatching request"
        );

        match self.shape {
            Shape::Count => {
                let page = pagination::fetch_page(client, &context).await?;
                Ok(Outcome::Count(page.total))
            }
            Shape::Value if self.paginated => {
                Ok(Outcome::Page(pagination::fetch_page(client, &context).await?))
            }
            Shape::Content => {
                let response = dispatch_streaming(client, context.to_request()?).await?;
                Ok(Outcome::Download(Download::new(response)))
            }
            Shape::Value => {
                let response = dispatch(client, context.to_request()?).await?;
                self.read_result(response)
            }
        }
    }

    fn read_result(&self, response: Response<Bytes>) -> Result<Outcome> {
        let created = response.is_created();

        if response.body().is_empty() {
            return Ok(if self.create_status {
                Outcome::Saved(Saved {
                    created,
                    result: serde_json::Value::Null,
                })
            } else {
                Outcome::Empty
            });
        }

        let Ok(document) = serde_json::from_slice::<serde_json::Value>(response.body()) else {
            return Ok(Outcome::Content(response.into_body()));
        };
        let result = extract_result(document, self.result_key)?;

        Ok(if self.create_status {
            Outcome::Saved(Saved { created, result })
        } else {
            Outcome::Value(result)
        })
    }
}

/// Unwrap `result`, then `result.<key>`.
///
/// # Errors
///
/// Returns [`Error::JsonDeserialization`] naming the missing path.
pub fn extract_result(
    mut document: serde_json::Value,
    key: Option<&str>,
) -> Result<serde_json::Value> {
    let mut result = document
        .get_mut("result")
        .map(serde_json::Value::take)
        .ok_or_else(|| Error::json_deserialization("result", "missing field `result`"))?;

    match key {
        None => Ok(result),
        Some(key) => result.get_mut(key).map(serde_json::Value::take).ok_or_else(|| {
            Error::json_deserialization(format!("result.{key}"), format!("missing field `{key}`"))
        }),
    }
}

/// Builder for [`MethodDescriptor`].
///
/// Parameters added later replace earlier ones with the same name, so a
/// template can be extended or adjusted with [`params`](Self::params).
#[derive(Debug, Clone)]
pub struct DescriptorBuilder {
    descriptor: MethodDescriptor,
}

impl DescriptorBuilder {
    /// Start describing an operation.
    #[must_use]
    pub fn new(name: &'static str, dispatch: Dispatch) -> Self {
        Self {
            descriptor: MethodDescriptor {
                name,
                dispatch,
                path: PathTemplate::default(),
                params: Vec::new(),
                required: Vec::new(),
                paginated: false,
                result_key: None,
                create_status: false,
                shape: Shape::Value,
            },
        }
    }

    /// Set the path template.
    #[must_use]
    pub fn path(mut self, path: PathTemplate) -> Self {
        self.descriptor.path = path;
        self
    }

    /// Add or replace one parameter.
    #[must_use]
    pub fn param(mut self, param: ParamDef) -> Self {
        let params = &mut self.descriptor.params;
        match params.iter_mut().find(|existing| existing.name == param.name) {
            Some(existing) => *existing = param,
            None => params.push(param),
        }
        self
    }

    /// Add or replace several parameters.
    #[must_use]
    pub fn params(self, params: impl IntoIterator<Item = ParamDef>) -> Self {
        params.into_iter().fold(self, Self::param)
    }

    /// Append required parameter names, keeping the first occurrence.
    #[must_use]
    pub fn require(mut self, names: impl IntoIterator<Item = &'static str>) -> Self {
        for name in names {
            if !self.descriptor.required.contains(&name) {
                self.descriptor.required.push(name);
            }
        }
        self
    }

    /// Walk pages; adds the `page` and `per_page` parameters.
    #[must_use]
    pub fn paginated(mut self) -> Self {
        self.descriptor.paginated = true;
        self.params([catalog::PAGE, catalog::PER_PAGE])
    }

    /// Unwrap `result.<key>` instead of `result`.
    #[must_use]
    pub fn result_key(mut self, key: &'static str) -> Self {
        self.descriptor.result_key = Some(key);
        self
    }

    /// Report whether the service created the resource.
    #[must_use]
    pub fn create_status(mut self) -> Self {
        self.descriptor.create_status = true;
        self
    }

    /// Return only the total of matching items.
    #[must_use]
    pub fn count(mut self) -> Self {
        self.descriptor.shape = Shape::Count;
        self
    }

    /// Return the raw body.
    #[must_use]
    pub fn content(mut self) -> Self {
        self.descriptor.shape = Shape::Content;
        self
    }

    /// Validate and build.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDescriptor`] when a placeholder or required
    /// name has no definition, a URI parameter is not in the path, a payload
    /// key is set outside the payload, or incompatible response handling is
    /// combined.
    pub fn build(self) -> Result<MethodDescriptor> {
        let descriptor = self.descriptor;
        let name = descriptor.name;
        let invalid = |reason: String| Err(Error::invalid_descriptor(format!("{name}: {reason}")));

        for placeholder in descriptor.path.placeholders() {
            match find(&descriptor.params, placeholder) {
                Some(param) if param.destination == Destination::Uri => {}
                Some(param) => {
                    return invalid(format!(
                        "placeholder {placeholder} is a {} parameter",
                        param.destination
                    ));
                }
                None => return invalid(format!("placeholder {placeholder} has no parameter")),
            }
        }

        for param in &descriptor.params {
            if param.destination == Destination::Uri
                && !descriptor.path.placeholders().any(|p| p == param.name)
            {
                return invalid(format!("{} is not a placeholder of {}", param.name, descriptor.path));
            }
            if param.payload_key.is_some() && param.destination != Destination::Payload {
                return invalid(format!("{} has a payload key outside the payload", param.name));
            }
        }

        if let Some(missing) = descriptor
            .required
            .iter()
            .find(|required| find(&descriptor.params, required).is_none())
        {
            return invalid(format!("required {missing} has no parameter"));
        }

        if descriptor.paginated && descriptor.shape != Shape::Value {
            return invalid("pagination needs a value shape".to_string());
        }
        if descriptor.create_status && descriptor.shape != Shape::Value {
            return invalid("create status needs a value shape".to_string());
        }

        Ok(descriptor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get_one() -> DescriptorBuilder {
        MethodDescriptor::builder("get", Dispatch::Verb(Method::Get))
            .path(PathTemplate::new(["collections", "{identity}", "{property}"]))
            .params([catalog::IDENTITY, catalog::PROPERTY])
            .require(["identity"])
    }

    #[test]
    fn dispatch_method_and_action() {
        assert_eq!(Dispatch::Verb(Method::Patch).method(), Method::Patch);
        assert_eq!(Dispatch::Action("find").method(), Method::Post);
        assert_eq!(Dispatch::Action("find").action(), Some("find"));
        assert_eq!(Dispatch::Verb(Method::Get).action(), None);
        assert_eq!(Dispatch::Action("login").to_string(), "POST (login)");
    }

    #[test]
    fn builder_valid() {
        let descriptor = get_one().result_key("name").build().expect("descriptor");
        assert_eq!(descriptor.params().len(), 2);
        assert_eq!(descriptor.required(), ["identity"]);
        assert_eq!(descriptor.result_key(), Some("name"));
        assert!(!descriptor.is_paginated());
        assert_eq!(descriptor.shape(), Shape::Value);
    }

    #[test]
    fn params_replace_same_name() {
        let descriptor = get_one()
            .param(catalog::IDENTITY.with_description("Collection identity"))
            .require(["identity"])
            .build()
            .expect("descriptor");
        assert_eq!(descriptor.params().len(), 2);
        assert_eq!(descriptor.required().len(), 1);
        assert_eq!(
            find(descriptor.params(), "identity").map(|p| p.description),
            Some("Collection identity")
        );
    }

    #[test]
    fn paginated_adds_page_params() {
        let descriptor = MethodDescriptor::builder("get", Dispatch::Verb(Method::Get))
            .path(PathTemplate::new(["collections"]))
            .paginated()
            .build()
            .expect("descriptor");
        assert!(descriptor.is_paginated());
        assert!(find(descriptor.params(), "page").is_some());
        assert!(find(descriptor.params(), "per_page").is_some());
    }

    #[test]
    fn undefined_placeholder_is_invalid() {
        let err = MethodDescriptor::builder("get", Dispatch::Verb(Method::Get))
            .path(PathTemplate::new(["collections", "{identity}"]))
            .build()
            .expect_err("invalid");
        assert!(matches!(err, Error::InvalidDescriptor(_)));
    }

    #[test]
    fn unused_uri_param_is_invalid() {
        let err = MethodDescriptor::builder("get", Dispatch::Verb(Method::Get))
            .path(PathTemplate::new(["collections"]))
            .param(catalog::IDENTITY)
            .build()
            .expect_err("invalid");
        assert!(err.to_string().contains("identity is not a placeholder"));
    }

    #[test]
    fn undefined_required_is_invalid() {
        let err = MethodDescriptor::builder("create", Dispatch::Verb(Method::Post))
            .require(["data"])
            .build()
            .expect_err("invalid");
        assert!(err.to_string().contains("required data"));
    }

    #[test]
    fn count_cannot_paginate() {
        let err = MethodDescriptor::builder("count", Dispatch::Action("find"))
            .paginated()
            .count()
            .build()
            .expect_err("invalid");
        assert!(matches!(err, Error::InvalidDescriptor(_)));
    }

    #[test]
    fn extract_result_paths() {
        let document = serde_json::json!({"result": {"sessionId": "abc"}});
        assert_eq!(
            extract_result(document.clone(), Some("sessionId")).expect("key"),
            serde_json::json!("abc")
        );
        assert_eq!(
            extract_result(document.clone(), None).expect("result"),
            serde_json::json!({"sessionId": "abc"})
        );

        let err = extract_result(document, Some("token")).expect_err("missing key");
        assert!(matches!(err, Error::JsonDeserialization { ref path, .. } if path == "result.token"));

        let err = extract_result(serde_json::json!({}), None).expect_err("missing result");
        assert!(matches!(err, Error::JsonDeserialization { ref path, .. } if path == "result"));
    }

    #[test]
    fn outcome_accessors() {
        let outcome = Outcome::Value(serde_json::json!({"name": "venues"}));
        assert_eq!(outcome.kind_name(), "value");

        #[derive(Debug, PartialEq, serde::Deserialize)]
        struct Collection {
            name: String,
        }
        let collection: Collection = outcome.deserialize().expect("deserialize");
        assert_eq!(collection.name, "venues");

        let err = Outcome::Count(3).into_page().expect_err("shape");
        assert!(matches!(
            err,
            Error::UnexpectedOutcome {
                expected: "page",
                actual: "count"
            }
        ));
        assert_eq!(Outcome::Empty.into_value().expect("null"), serde_json::Value::Null);
        assert_eq!(format!("{:?}", Outcome::Content(Bytes::from("abc"))), "Content(3)");
    }
}
