//! Request context assembly.
//!
//! A [`RequestContext`] is everything one invocation sends: final URL,
//! headers, query parameters, encoded body and timeout. It is built fresh for
//! every call and turned into a transport [`Request`] right before dispatch.

use std::collections::BTreeMap;

use bytes::Bytes;
use url::Url;

use crate::payload::Body;
use crate::{Error, Method, Request, Result, Timeout, Value};

/// Header carrying the name of a custom action.
pub const ACTION_HEADER: &str = "X-Action";

/// Transport-ready description of one call.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestContext {
    /// Wire method.
    pub method: Method,
    /// Final URL, without query string.
    pub url: Url,
    /// Headers, empty entries dropped.
    pub headers: BTreeMap<String, String>,
    /// Query parameters, already rendered.
    pub query: BTreeMap<String, String>,
    /// Encoded body.
    pub body: Option<Body>,
    /// Per-call timeout.
    pub timeout: Option<Timeout>,
}

impl RequestContext {
    /// Context without headers, query or body.
    #[must_use]
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: BTreeMap::new(),
            query: BTreeMap::new(),
            body: None,
            timeout: None,
        }
    }

    /// Set a header, replacing any previous value under the same name in
    /// any case. Empty values are ignored.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let value = value.into();
        if value.is_empty() {
            return;
        }
        let name = name.into();
        self.headers
            .retain(|existing, _| !existing.eq_ignore_ascii_case(&name));
        self.headers.insert(name, value);
    }

    /// Set a query parameter, replacing any previous value.
    pub fn set_query(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.query.insert(name.into(), value.into());
    }

    /// Add rendered query parameters.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] for maps and files.
    pub fn extend_query(&mut self, params: BTreeMap<String, Value>) -> Result<()> {
        for (name, value) in params {
            let rendered = render_param(&name, &value)?;
            self.query.insert(name, rendered);
        }
        Ok(())
    }

    /// Add rendered header parameters.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] for maps and files.
    pub fn extend_headers(&mut self, params: BTreeMap<String, Value>) -> Result<()> {
        for (name, value) in params {
            let rendered = render_param(&name, &value)?;
            self.set_header(name, rendered);
        }
        Ok(())
    }

    /// Build the transport request.
    ///
    /// JSON bodies set `Content-Type: application/json`, multipart bodies
    /// carry their boundary in the content type.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON body cannot be serialized.
    pub fn to_request(&self) -> Result<Request<Bytes>> {
        let builder = Request::builder(self.method, self.url.clone())
            .headers(
                self.headers
                    .iter()
                    .map(|(name, value)| (name.clone(), value.clone())),
            )
            .query_pairs(
                self.query
                    .iter()
                    .map(|(name, value)| (name.as_str(), value.as_str())),
            )
            .timeout(self.timeout);

        let builder = match &self.body {
            None => builder,
            Some(Body::Json(value)) => builder.json(value)?,
            Some(body @ Body::Multipart(_)) => match body.to_form() {
                Some(form) => builder.multipart(form),
                None => builder,
            },
        };
        Ok(builder.build())
    }
}

/// Render a query or header value.
///
/// Lists are joined with `,`, dates use their UTC form, null is empty.
///
/// # Errors
///
/// Returns [`Error::InvalidRequest`] for maps, files and nested lists.
pub fn render_param(name: &str, value: &Value) -> Result<String> {
    match value {
        Value::List(items) => items
            .iter()
            .map(|item| {
                item.to_text().ok_or_else(|| {
                    Error::invalid_request(format!("{name} cannot hold a nested {}", item.kind_name()))
                })
            })
            .collect::<Result<Vec<_>>>()
            .map(|items| items.join(",")),
        other => other.to_text().ok_or_else(|| {
            Error::invalid_request(format!("{name} cannot be a {}", other.kind_name()))
        }),
    }
}
