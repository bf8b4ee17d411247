//! Argument values.
//!
//! [`Value`] is what a method invocation carries for each named argument. It
//! is a JSON-like tree that also knows about dates and binary files, so the
//! payload encoder can convert the former and switch to multipart for the
//! latter.

use std::collections::BTreeMap;
use std::io::Read;

use bytes::Bytes;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, Utc};

use crate::{Result, Timeout};

/// An argument value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Explicit null.
    Null,
    /// Boolean.
    Bool(bool),
    /// Number.
    Number(serde_json::Number),
    /// String.
    String(String),
    /// Calendar date, sent as midnight UTC.
    Date(NaiveDate),
    /// Offset-aware date and time, sent converted to UTC.
    DateTime(DateTime<FixedOffset>),
    /// Date and time without offset, sent as if already UTC.
    NaiveDateTime(NaiveDateTime),
    /// Ordered sequence.
    List(Vec<Value>),
    /// Mapping with unique keys.
    Map(BTreeMap<String, Value>),
    /// Binary file content.
    File(FileUpload),
}

impl Value {
    /// Convert any serializable value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be represented as JSON.
    pub fn from_serialize<T: serde::Serialize + ?Sized>(value: &T) -> Result<Self> {
        Ok(Self::from(serde_json::to_value(value)?))
    }

    /// Short name of the variant, for error messages.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Date(_) => "date",
            Self::DateTime(_) | Self::NaiveDateTime(_) => "datetime",
            Self::List(_) => "list",
            Self::Map(_) => "map",
            Self::File(_) => "file",
        }
    }

    /// Returns `true` for [`Value::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns `true` for [`Value::File`].
    #[must_use]
    pub const fn is_file(&self) -> bool {
        matches!(self, Self::File(_))
    }

    /// The string, if this is a [`Value::String`].
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value),
            _ => None,
        }
    }

    /// Render a scalar as plain text.
    ///
    /// Strings are returned as-is, dates in their UTC wire form, other
    /// scalars as their JSON text. Returns `None` for lists, maps and files.
    #[must_use]
    pub fn to_text(&self) -> Option<String> {
        match self {
            Self::Null => Some(String::new()),
            Self::Bool(value) => Some(value.to_string()),
            Self::Number(value) => Some(value.to_string()),
            Self::String(value) => Some(value.clone()),
            Self::Date(_) | Self::DateTime(_) | Self::NaiveDateTime(_) => self.utc_string(),
            Self::List(_) | Self::Map(_) | Self::File(_) => None,
        }
    }

    /// ISO-8601 UTC form of a date or datetime, with a trailing `Z`.
    #[must_use]
    pub fn utc_string(&self) -> Option<String> {
        let utc = match self {
            Self::Date(date) => date.and_time(NaiveTime::MIN).and_utc(),
            Self::DateTime(value) => value.with_timezone(&Utc),
            Self::NaiveDateTime(value) => value.and_utc(),
            _ => return None,
        };
        Some(utc.to_rfc3339_opts(SecondsFormat::AutoSi, true))
    }
}

/// Dates become their UTC strings; files have no JSON form and become null.
impl From<Value> for serde_json::Value {
    fn from(value: Value) -> Self {
        match value {
            Value::Null | Value::File(_) => Self::Null,
            Value::Bool(value) => Self::Bool(value),
            Value::Number(value) => Self::Number(value),
            Value::String(value) => Self::String(value),
            date @ (Value::Date(_) | Value::DateTime(_) | Value::NaiveDateTime(_)) => {
                date.utc_string().map_or(Self::Null, Self::String)
            }
            Value::List(items) => Self::Array(items.into_iter().map(Self::from).collect()),
            Value::Map(entries) => Self::Object(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, Self::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(value) => Self::Bool(value),
            serde_json::Value::Number(value) => Self::Number(value),
            serde_json::Value::String(value) => Self::String(value),
            serde_json::Value::Array(items) => Self::List(items.into_iter().map(Self::from).collect()),
            serde_json::Value::Object(entries) => Self::Map(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, Self::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

macro_rules! impl_from_integer {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Self::Number(serde_json::Number::from(value))
                }
            }
        )*
    };
}

impl_from_integer!(i32, i64, u32, u64, usize);

/// Non-finite floats have no JSON form and become null.
impl From<f64> for Value {
    fn from(value: f64) -> Self {
        serde_json::Number::from_f64(value).map_or(Self::Null, Self::Number)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<NaiveDate> for Value {
    fn from(value: NaiveDate) -> Self {
        Self::Date(value)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(value: NaiveDateTime) -> Self {
        Self::NaiveDateTime(value)
    }
}

impl From<DateTime<FixedOffset>> for Value {
    fn from(value: DateTime<FixedOffset>) -> Self {
        Self::DateTime(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Self::DateTime(value.fixed_offset())
    }
}

impl From<FileUpload> for Value {
    fn from(value: FileUpload) -> Self {
        Self::File(value)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(value: BTreeMap<String, Value>) -> Self {
        Self::Map(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(value: Vec<T>) -> Self {
        Self::List(value.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>, const N: usize> From<[T; N]> for Value {
    fn from(value: [T; N]) -> Self {
        Self::List(value.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

// ============================================================================
// Files
// ============================================================================

/// Binary content to upload.
///
/// The bytes are read once when the upload is created; the payload encoder
/// only ever sees the buffered content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    filename: Option<String>,
    content_type: Option<String>,
    data: Bytes,
}

impl FileUpload {
    /// Create an upload without a filename.
    #[must_use]
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            filename: None,
            content_type: None,
            data: data.into(),
        }
    }

    /// Create an upload with a filename.
    #[must_use]
    pub fn named(filename: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            filename: Some(filename.into()),
            content_type: None,
            data: data.into(),
        }
    }

    /// Drain a reader into an upload.
    ///
    /// # Errors
    ///
    /// Returns the reader's I/O error.
    pub fn from_reader(filename: impl Into<String>, mut reader: impl Read) -> std::io::Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Ok(Self::named(filename, data))
    }

    /// Set an explicit content type.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// The filename, if any.
    #[must_use]
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    /// The explicit content type, if any.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// The file content.
    #[must_use]
    pub const fn data(&self) -> &Bytes {
        &self.data
    }
}

// ============================================================================
// Invocation arguments
// ============================================================================

/// Named arguments of one method invocation, plus its optional timeout.
///
/// # Example
///
/// ```
/// use deform_core::Args;
///
/// let args = Args::new()
///     .arg("collection", "venues")
///     .arg("identity", "subway")
///     .arg("property", ["comment", "user"]);
/// assert!(args.contains("identity"));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
    values: BTreeMap<String, Value>,
    timeout: Option<Timeout>,
}

impl Args {
    /// Empty arguments.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an argument.
    #[must_use]
    pub fn arg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Set the per-call timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Timeout) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Insert or replace an argument.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
    }

    /// Argument by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Returns `true` if an argument with this name was supplied.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Returns `true` if no argument was supplied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The per-call timeout.
    #[must_use]
    pub const fn timeout(&self) -> Option<Timeout> {
        self.timeout
    }

    /// Iterate over the arguments in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Consume into (values, timeout).
    #[must_use]
    pub fn into_parts(self) -> (BTreeMap<String, Value>, Option<Timeout>) {
        (self.values, self.timeout)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Args {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
            timeout: None,
        }
    }
}

impl<K: Into<String>, V: Into<Value>, const N: usize> From<[(K, V); N]> for Args {
    fn from(value: [(K, V); N]) -> Self {
        value.into_iter().collect()
    }
}
