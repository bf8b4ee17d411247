//! Path templates and URL building.
//!
//! A [`PathTemplate`] is an ordered list of literal segments and `{name}`
//! placeholders, e.g. `["collections", "{collection}", "documents", "{identity}"]`.
//! [`PathTemplate::build_url`] substitutes the routed URI arguments:
//!
//! - an absent, null or empty placeholder drops its segment,
//! - a list contributes one segment per element, in order,
//! - a scalar contributes one segment.
//!
//! Every segment is percent-encoded on its own and the path always ends with
//! exactly one slash.

use std::collections::BTreeMap;
use std::fmt;

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use url::Url;

use crate::{Error, Result, Value};

/// Characters escaped inside a single path segment.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// One element of a [`PathTemplate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Appended as-is.
    Literal(&'static str),
    /// Replaced by the URI argument of that name.
    Placeholder(&'static str),
}

impl Segment {
    /// Parse `{name}` as a placeholder, anything else as a literal.
    #[must_use]
    pub fn parse(raw: &'static str) -> Self {
        raw.strip_prefix('{')
            .and_then(|rest| rest.strip_suffix('}'))
            .map_or(Self::Literal(raw), Self::Placeholder)
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(literal) => write!(f, "{literal}"),
            Self::Placeholder(name) => write!(f, "{{{name}}}"),
        }
    }
}

/// Ordered path segments of a method.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct PathTemplate(Vec<Segment>);

impl PathTemplate {
    /// Build a template from raw segments.
    ///
    /// ```
    /// use deform_core::{PathTemplate, Segment};
    ///
    /// let template = PathTemplate::new(["projects", "{identity}"]);
    /// assert_eq!(template.segments()[1], Segment::Placeholder("identity"));
    /// assert_eq!(template.to_string(), "projects/{identity}");
    /// ```
    #[must_use]
    pub fn new(segments: impl IntoIterator<Item = &'static str>) -> Self {
        Self(segments.into_iter().map(Segment::parse).collect())
    }

    /// The segments in order.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    /// Names of the placeholders in order.
    pub fn placeholders(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.0.iter().filter_map(|segment| match segment {
            Segment::Placeholder(name) => Some(*name),
            Segment::Literal(_) => None,
        })
    }

    /// Append a literal segment.
    #[must_use]
    pub fn join(mut self, literal: &'static str) -> Self {
        self.0.push(Segment::Literal(literal));
        self
    }

    /// Resolve the template against `base`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] when a placeholder value is a map,
    /// a file, or a list holding one of those.
    pub fn build_url(&self, base: &Url, params: &BTreeMap<String, Value>) -> Result<Url> {
        let mut path = base.path().trim_end_matches('/').to_string();

        for segment in &self.0 {
            match segment {
                Segment::Literal(literal) => push_segment(&mut path, literal),
                Segment::Placeholder(name) => match params.get(*name) {
                    None => {}
                    Some(Value::List(items)) => {
                        for item in items {
                            if let Some(text) = segment_text(name, item)? {
                                push_segment(&mut path, &text);
                            }
                        }
                    }
                    Some(value) => {
                        if let Some(text) = segment_text(name, value)? {
                            push_segment(&mut path, &text);
                        }
                    }
                },
            }
        }
        path.push('/');

        let mut url = base.clone();
        url.set_path(&path);
        Ok(url)
    }
}

impl fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, segment) in self.0.iter().enumerate() {
            if index > 0 {
                write!(f, "/")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

fn push_segment(path: &mut String, raw: &str) {
    path.push('/');
    path.extend(utf8_percent_encode(raw, SEGMENT));
}

fn segment_text(name: &str, value: &Value) -> Result<Option<String>> {
    match value {
        Value::Null => Ok(None),
        Value::List(_) | Value::Map(_) | Value::File(_) => Err(Error::invalid_request(format!(
            "{name} cannot be a {} path segment",
            value.kind_name()
        ))),
        scalar => Ok(scalar.to_text().filter(|text| !text.is_empty())),
    }
}
