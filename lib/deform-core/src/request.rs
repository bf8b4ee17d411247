//! HTTP request building.
//!
//! Use [`Request::builder`] to construct requests with headers, query parameters, and bodies.
//!
//! # Example
//!
//! ```
//! use deform_core::{Request, Method};
//! use bytes::Bytes;
//!
//! let request = Request::<Bytes>::builder(Method::Get, "https://deform.io/api/".parse().unwrap())
//!     .header("Authorization", "Token 123")
//!     .query("page", "1")
//!     .build();
//! ```

use std::collections::HashMap;
use std::time::Duration;

use bytes::Bytes;

use crate::{Form, Method};

/// Per-call timeouts handed to the transport.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timeout {
    /// Limit for establishing the connection.
    pub connect: Option<Duration>,
    /// Limit for receiving the response.
    pub read: Option<Duration>,
}

impl Timeout {
    /// Set both limits.
    #[must_use]
    pub const fn new(connect: Duration, read: Duration) -> Self {
        Self {
            connect: Some(connect),
            read: Some(read),
        }
    }

    /// Limit only the connect phase.
    #[must_use]
    pub const fn connect(connect: Duration) -> Self {
        Self {
            connect: Some(connect),
            read: None,
        }
    }

    /// Limit only the read phase.
    #[must_use]
    pub const fn read(read: Duration) -> Self {
        Self {
            connect: None,
            read: Some(read),
        }
    }
}

/// An HTTP request with method, URL, headers, optional body and timeout.
#[derive(Debug, Clone)]
pub struct Request<B = Bytes> {
    method: Method,
    url: url::Url,
    headers: HashMap<String, String>,
    body: Option<B>,
    timeout: Option<Timeout>,
}

impl<B> Request<B> {
    /// Creates a new [`RequestBuilder`].
    #[must_use]
    pub fn builder(method: Method, url: url::Url) -> RequestBuilder<B> {
        RequestBuilder::new(method, url)
    }

    /// HTTP method.
    #[must_use]
    pub const fn method(&self) -> Method {
        self.method
    }

    /// Request URL.
    #[must_use]
    pub fn url(&self) -> &url::Url {
        &self.url
    }

    /// Request headers.
    #[must_use]
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Mutable access to headers.
    #[must_use]
    pub fn headers_mut(&mut self) -> &mut HashMap<String, String> {
        &mut self.headers
    }

    /// Single header value by name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// Request body.
    #[must_use]
    pub const fn body(&self) -> Option<&B> {
        self.body.as_ref()
    }

    /// Per-call timeout.
    #[must_use]
    pub const fn timeout(&self) -> Option<Timeout> {
        self.timeout
    }

    /// Consume into (method, url, headers, body).
    #[must_use]
    pub fn into_parts(self) -> (Method, url::Url, HashMap<String, String>, Option<B>) {
        (self.method, self.url, self.headers, self.body)
    }
}

/// Builder for constructing [`Request`] instances.
#[derive(Debug, Clone)]
pub struct RequestBuilder<B = Bytes> {
    method: Method,
    url: url::Url,
    headers: HashMap<String, String>,
    body: Option<B>,
    timeout: Option<Timeout>,
}

impl<B> RequestBuilder<B> {
    /// Creates a new builder.
    #[must_use]
    pub fn new(method: Method, url: url::Url) -> Self {
        Self {
            method,
            url,
            headers: HashMap::new(),
            body: None,
            timeout: None,
        }
    }

    /// Sets a header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Sets multiple headers.
    #[must_use]
    pub fn headers(mut self, headers: impl IntoIterator<Item = (String, String)>) -> Self {
        self.headers.extend(headers);
        self
    }

    /// Appends a query parameter to the URL.
    #[must_use]
    pub fn query(mut self, name: &str, value: &str) -> Self {
        self.url.query_pairs_mut().append_pair(name, value);
        self
    }

    /// Appends multiple query parameters to the URL.
    #[must_use]
    pub fn query_pairs<'a>(mut self, pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut pairs = pairs.into_iter().peekable();
        if pairs.peek().is_some() {
            let mut query = self.url.query_pairs_mut();
            for (name, value) in pairs {
                query.append_pair(name, value);
            }
        }
        self
    }

    /// Sets the request body.
    #[must_use]
    pub fn body(mut self, body: B) -> Self {
        self.body = Some(body);
        self
    }

    /// Sets the per-call timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Option<Timeout>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builds the [`Request`].
    #[must_use]
    pub fn build(self) -> Request<B> {
        Request {
            method: self.method,
            url: self.url,
            headers: self.headers,
            body: self.body,
            timeout: self.timeout,
        }
    }
}

impl RequestBuilder<Bytes> {
    /// Set a JSON body.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn json<T: serde::Serialize>(self, value: &T) -> crate::Result<Self> {
        let body = crate::to_json(value)?;
        Ok(self.header("Content-Type", "application/json").body(body))
    }

    /// Set a multipart body.
    ///
    /// The content type, with its boundary, comes from the form.
    #[must_use]
    pub fn multipart(self, form: Form) -> Self {
        let (content_type, body) = form.into_body();
        self.header("Content-Type", content_type).body(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_builder_basic() {
        let url = url::Url::parse("https://deform.io/api/user/").expect("valid URL");
        let request = Request::<Bytes>::builder(Method::Get, url)
            .header("Authorization", "SessionId abc")
            .build();

        assert_eq!(request.method(), Method::Get);
        assert_eq!(request.url().as_str(), "https://deform.io/api/user/");
        assert_eq!(request.header("Authorization"), Some("SessionId abc"));
        assert!(request.body().is_none());
        assert!(request.timeout().is_none());
    }

    #[test]
    fn request_builder_with_query() {
        let url = url::Url::parse("https://deform.io/api/projects/").expect("valid URL");
        let request = Request::<Bytes>::builder(Method::Get, url)
            .query_pairs([("fields", "name,_id"), ("page", "1")])
            .build();

        assert_eq!(
            request.url().as_str(),
            "https://deform.io/api/projects/?fields=name%2C_id&page=1"
        );
    }

    #[test]
    fn request_builder_without_query_keeps_url() {
        let url = url::Url::parse("https://deform.io/api/").expect("valid URL");
        let request = Request::<Bytes>::builder(Method::Get, url)
            .query_pairs(std::iter::empty())
            .build();

        assert_eq!(request.url().as_str(), "https://deform.io/api/");
    }

    #[test]
    fn request_builder_json() {
        let url = url::Url::parse("https://deform.io/api/user/").expect("valid URL");
        let request = Request::builder(Method::Post, url)
            .json(&serde_json::json!({"payload": {"email": "a@b.c"}}))
            .expect("json")
            .timeout(Some(Timeout::read(Duration::from_secs(5))))
            .build();

        assert_eq!(request.header("Content-Type"), Some("application/json"));
        assert_eq!(
            request.body().map(Bytes::as_ref),
            Some(br#"{"payload":{"email":"a@b.c"}}"#.as_slice())
        );
        assert_eq!(
            request.timeout().and_then(|t| t.read),
            Some(Duration::from_secs(5))
        );
    }

    #[test]
    fn request_builder_multipart() {
        let url = url::Url::parse("https://deform.io/api/").expect("valid URL");
        let form = Form::with_boundary("b0undary").text("name", "gena");
        let request = Request::builder(Method::Post, url).multipart(form).build();

        assert_eq!(
            request.header("Content-Type"),
            Some("multipart/form-data; boundary=b0undary")
        );
        assert!(request.body().is_some());
    }
}
