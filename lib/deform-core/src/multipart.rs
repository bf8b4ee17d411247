//! Multipart form data for payloads carrying files.
//!
//! # Example
//!
//! ```
//! use deform_core::{FileUpload, Form, Part};
//!
//! let form = Form::new()
//!     .part(Part::text("name", "Subway"))
//!     .part(Part::upload("logo", &FileUpload::named("logo.png", vec![0x89, 0x50])));
//!
//! let (content_type, body) = form.into_body();
//! assert!(content_type.starts_with("multipart/form-data; boundary="));
//! assert!(!body.is_empty());
//! ```

use bytes::{BufMut, Bytes, BytesMut};

use crate::FileUpload;

const OCTET_STREAM: &str = "application/octet-stream";

/// A single part in a multipart form.
///
/// Plain fields carry neither filename nor content type, file parts carry both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    name: String,
    filename: Option<String>,
    content_type: Option<String>,
    data: Bytes,
}

impl Part {
    /// A plain form field.
    #[must_use]
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            filename: None,
            content_type: None,
            data: Bytes::from(value.into()),
        }
    }

    /// A file part.
    ///
    /// Without a filename on the upload, the field name is used.
    #[must_use]
    pub fn upload(name: impl Into<String>, file: &FileUpload) -> Self {
        let name = name.into();
        let filename = file.filename().unwrap_or(name.as_str()).to_string();
        Self {
            filename: Some(filename),
            content_type: Some(file.content_type().unwrap_or(OCTET_STREAM).to_string()),
            data: file.data().clone(),
            name,
        }
    }

    /// Field name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Filename, for file parts.
    #[must_use]
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    /// Content type, for file parts.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Raw content.
    #[must_use]
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Returns `true` for file parts.
    #[must_use]
    pub const fn is_file(&self) -> bool {
        self.filename.is_some()
    }
}

/// A multipart form.
#[derive(Debug, Clone)]
pub struct Form {
    parts: Vec<Part>,
    boundary: String,
}

impl Default for Form {
    fn default() -> Self {
        Self::new()
    }
}

impl Form {
    /// Empty form with a fresh boundary.
    #[must_use]
    pub fn new() -> Self {
        Self::with_boundary(generate_boundary())
    }

    /// Empty form with a fixed boundary.
    #[must_use]
    pub fn with_boundary(boundary: impl Into<String>) -> Self {
        Self {
            parts: Vec::new(),
            boundary: boundary.into(),
        }
    }

    /// Add a part.
    #[must_use]
    pub fn part(mut self, part: Part) -> Self {
        self.parts.push(part);
        self
    }

    /// Add a plain field.
    #[must_use]
    pub fn text(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.part(Part::text(name, value))
    }

    /// Boundary string.
    #[must_use]
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Parts in insertion order.
    #[must_use]
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// `multipart/form-data; boundary=<boundary>`
    #[must_use]
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Returns (content-type header value, body bytes).
    #[must_use]
    pub fn into_body(self) -> (String, Bytes) {
        let content_type = self.content_type();
        let body = self.encode();
        (content_type, body)
    }

    fn encode(&self) -> Bytes {
        let mut buf = BytesMut::new();

        for part in &self.parts {
            buf.put_slice(b"--");
            buf.put_slice(self.boundary.as_bytes());
            buf.put_slice(b"\r\n");

            buf.put_slice(b"Content-Disposition: form-data; name=\"");
            buf.put_slice(escape_quoted(&part.name).as_bytes());
            buf.put_slice(b"\"");
            if let Some(filename) = &part.filename {
                buf.put_slice(b"; filename=\"");
                buf.put_slice(escape_quoted(filename).as_bytes());
                buf.put_slice(b"\"");
            }
            buf.put_slice(b"\r\n");

            if let Some(content_type) = &part.content_type {
                buf.put_slice(b"Content-Type: ");
                buf.put_slice(content_type.as_bytes());
                buf.put_slice(b"\r\n");
            }

            buf.put_slice(b"\r\n");
            buf.put_slice(&part.data);
            buf.put_slice(b"\r\n");
        }

        buf.put_slice(b"--");
        buf.put_slice(self.boundary.as_bytes());
        buf.put_slice(b"--\r\n");

        buf.freeze()
    }
}

// Quoted-string parameters cannot carry raw quotes or line breaks.
fn escape_quoted(value: &str) -> String {
    value
        .replace('"', "%22")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

fn generate_boundary() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);

    format!("deform-{timestamp:x}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_part_has_no_file_metadata() {
        let part = Part::text("user.name", "gena");
        assert_eq!(part.name(), "user.name");
        assert_eq!(part.data().as_ref(), b"gena");
        assert!(part.filename().is_none());
        assert!(part.content_type().is_none());
        assert!(!part.is_file());
    }

    #[test]
    fn upload_part_defaults() {
        let part = Part::upload("user.avatar", &FileUpload::new(vec![1, 2, 3]));
        assert_eq!(part.filename(), Some("user.avatar"));
        assert_eq!(part.content_type(), Some(OCTET_STREAM));
        assert!(part.is_file());

        let file = FileUpload::named("1.png", vec![0x89]).with_content_type("image/png");
        let part = Part::upload("file", &file);
        assert_eq!(part.filename(), Some("1.png"));
        assert_eq!(part.content_type(), Some("image/png"));
    }

    #[test]
    fn fresh_boundary() {
        let form = Form::new();
        assert!(form.parts().is_empty());
        assert!(form.boundary().starts_with("deform-"));
    }

    #[test]
    fn encode_fields_and_files() {
        let form = Form::with_boundary("b0undary")
            .text("name", "Subway")
            .part(Part::upload("logo", &FileUpload::named("logo.txt", "file content")));

        let (content_type, body) = form.into_body();
        assert_eq!(content_type, "multipart/form-data; boundary=b0undary");

        let body = String::from_utf8_lossy(&body);
        assert!(body.starts_with("--b0undary\r\n"));
        assert!(body.contains("Content-Disposition: form-data; name=\"name\"\r\n\r\nSubway\r\n"));
        assert!(body.contains("name=\"logo\"; filename=\"logo.txt\"\r\n"));
        assert!(body.contains("Content-Type: application/octet-stream\r\n\r\nfile content\r\n"));
        assert!(body.ends_with("--b0undary--\r\n"));
    }

    #[test]
    fn quotes_in_names_are_escaped() {
        let (_, body) = Form::with_boundary("b").text("a\"b", "x").into_body();
        assert!(String::from_utf8_lossy(&body).contains("name=\"a%22b\""));
    }
}
