//! Payload encoding.
//!
//! Payload-destined arguments are merged into one value, dates are converted
//! to their UTC strings, and the encoding is chosen by the presence of files:
//!
//! - no file anywhere: `{"payload": <merged>}` as JSON,
//! - otherwise: a flattened multipart field set where map keys are joined by
//!   `.` and list indices rendered as `[i]`.

use std::collections::BTreeMap;

use bytes::Bytes;

use crate::param::{ParamDef, find};
use crate::{Error, FileUpload, Form, Part, Result, Value};

/// Outcome of [`prepare`].
#[derive(Debug, Clone, PartialEq)]
pub struct Prepared {
    /// A file leaf exists somewhere in the tree.
    pub contains_file: bool,
    /// The tree with dates replaced by their UTC strings.
    pub value: Value,
}

/// Walk a value, converting dates and detecting files.
///
/// Containers keep their kind, order and keys. Empty containers and null are
/// leaves and come back unchanged.
#[must_use]
pub fn prepare(value: Value) -> Prepared {
    match value {
        Value::Date(_) | Value::DateTime(_) | Value::NaiveDateTime(_) => Prepared {
            contains_file: false,
            value: value.utc_string().map_or(Value::Null, Value::String),
        },
        Value::List(items) => {
            let mut contains_file = false;
            let items = items
                .into_iter()
                .map(|item| {
                    let prepared = prepare(item);
                    contains_file |= prepared.contains_file;
                    prepared.value
                })
                .collect();
            Prepared {
                contains_file,
                value: Value::List(items),
            }
        }
        Value::Map(entries) => {
            let mut contains_file = false;
            let entries = entries
                .into_iter()
                .map(|(key, value)| {
                    let prepared = prepare(value);
                    contains_file |= prepared.contains_file;
                    (key, prepared.value)
                })
                .collect();
            Prepared {
                contains_file,
                value: Value::Map(entries),
            }
        }
        Value::File(_) => Prepared {
            contains_file: true,
            value,
        },
        scalar => Prepared {
            contains_file: false,
            value: scalar,
        },
    }
}

/// Flatten a tree into `(path, leaf)` pairs.
///
/// ```
/// use deform_core::{Value, flatten};
///
/// let value = Value::from(serde_json::json!({"user": {"tags": ["a", "b"]}}));
/// let keys: Vec<_> = flatten(value).into_iter().map(|(key, _)| key).collect();
/// assert_eq!(keys, ["user.tags[0]", "user.tags[1]"]);
/// ```
#[must_use]
pub fn flatten(value: Value) -> Vec<(String, Value)> {
    let mut out = Vec::new();
    flatten_into(String::new(), value, &mut out);
    out
}

fn flatten_into(prefix: String, value: Value, out: &mut Vec<(String, Value)>) {
    match value {
        Value::Map(entries) if !entries.is_empty() => {
            for (key, value) in entries {
                let path = if prefix.is_empty() {
                    key
                } else {
                    format!("{prefix}.{key}")
                };
                flatten_into(path, value, out);
            }
        }
        Value::List(items) if !items.is_empty() => {
            for (index, item) in items.into_iter().enumerate() {
                flatten_into(format!("{prefix}[{index}]"), item, out);
            }
        }
        leaf => out.push((prefix, leaf)),
    }
}

/// A multipart field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FormField {
    /// Plain form field.
    Text(String),
    /// File part.
    File(FileUpload),
}

impl FormField {
    fn from_leaf(leaf: Value) -> Self {
        match leaf {
            Value::File(file) => Self::File(file),
            Value::String(text) => Self::Text(text),
            Value::Null => Self::Text(String::new()),
            other => Self::Text(serde_json::Value::from(other).to_string()),
        }
    }
}

/// An encoded request body.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// JSON document.
    Json(serde_json::Value),
    /// Flattened multipart fields, in path order.
    Multipart(Vec<(String, FormField)>),
}

impl Body {
    /// Build the multipart form for [`Body::Multipart`].
    ///
    /// Returns `None` for JSON bodies.
    #[must_use]
    pub fn to_form(&self) -> Option<Form> {
        let Self::Multipart(fields) = self else {
            return None;
        };
        let form = fields
            .iter()
            .fold(Form::new(), |form, (name, field)| match field {
                FormField::Text(text) => form.text(name.as_str(), text.as_str()),
                FormField::File(file) => form.part(Part::upload(name.as_str(), file)),
            });
        Some(form)
    }

    /// Returns `true` for multipart bodies.
    #[must_use]
    pub const fn is_multipart(&self) -> bool {
        matches!(self, Self::Multipart(_))
    }
}

/// Encode the payload-destined arguments of one invocation.
///
/// Returns `None` when no argument was routed to the payload.
///
/// # Errors
///
/// Returns [`Error::InvalidRequest`] when the arguments cannot be merged into
/// one value: several arguments without payload key, or keyed arguments next
/// to an argument that is not a map.
pub fn encode(params: BTreeMap<String, Value>, definitions: &[ParamDef]) -> Result<Option<Body>> {
    if params.is_empty() {
        return Ok(None);
    }

    let mut contains_file = false;
    let mut keyed = BTreeMap::new();
    let mut unkeyed: Option<(String, Value)> = None;

    for (name, value) in params {
        let prepared = prepare(value);
        contains_file |= prepared.contains_file;
        match find(definitions, &name).and_then(|definition| definition.payload_key) {
            Some(key) => {
                keyed.insert(key.to_string(), prepared.value);
            }
            None => {
                if let Some((previous, _)) = &unkeyed {
                    return Err(Error::invalid_request(format!(
                        "{previous} and {name} both claim the whole payload"
                    )));
                }
                unkeyed = Some((name, prepared.value));
            }
        }
    }

    let merged = match unkeyed {
        None => Value::Map(keyed),
        Some((_, value)) if keyed.is_empty() => value,
        Some((_, Value::Map(mut entries))) => {
            entries.extend(keyed);
            Value::Map(entries)
        }
        Some((name, value)) => {
            return Err(Error::invalid_request(format!(
                "{name} is a {} and cannot be merged with keyed payload arguments",
                value.kind_name()
            )));
        }
    };

    let body = if contains_file {
        let leaves = match merged {
            file @ Value::File(_) => vec![("file".to_string(), file)],
            tree => flatten(tree),
        };
        Body::Multipart(
            leaves
                .into_iter()
                .map(|(path, leaf)| (path, FormField::from_leaf(leaf)))
                .collect(),
        )
    } else {
        Body::Json(serde_json::json!({ "payload": serde_json::Value::from(merged) }))
    };
    Ok(Some(body))
}

/// Serialize a value to JSON bytes.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn to_json<T: serde::Serialize>(value: &T) -> Result<Bytes> {
    serde_json::to_vec(value)
        .map(Bytes::from)
        .map_err(Into::into)
}

/// Deserialize JSON bytes with path-aware error messages.
///
/// # Errors
///
/// Returns [`Error::JsonDeserialization`] naming the failing path
/// (e.g. `result.items[0].name`).
///
/// ```
/// use deform_core::from_json;
///
/// let value: serde_json::Value = from_json(br#"{"result":{"total":3}}"#).expect("json");
/// assert_eq!(value["result"]["total"], 3);
/// ```
pub fn from_json<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let mut deserializer = serde_json::Deserializer::from_slice(bytes);
    serde_path_to_error::deserialize(&mut deserializer).map_err(|e| {
        Error::json_deserialization(e.path().to_string(), e.inner().to_string())
    })
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use serde_json::json;

    use super::*;
    use crate::param::catalog;

    fn single(name: &str, value: impl Into<Value>) -> BTreeMap<String, Value> {
        BTreeMap::from([(name.to_string(), value.into())])
    }

    #[test]
    fn prepare_converts_nested_dates() {
        let date = NaiveDate::from_ymd_opt(2015, 1, 2).expect("date");
        let value = Value::from(vec![Value::from(date), Value::from("x")]);

        let prepared = prepare(value);
        assert!(!prepared.contains_file);
        assert_eq!(
            prepared.value,
            Value::from(vec!["2015-01-02T00:00:00Z", "x"])
        );
    }

    #[test]
    fn prepare_keeps_empty_containers() {
        let value = Value::from(json!({"a": {}, "b": [], "c": null}));
        let prepared = prepare(value.clone());
        assert_eq!(prepared.value, value);
        assert!(!prepared.contains_file);
    }

    #[test]
    fn prepare_detects_deep_file() {
        let mut user = BTreeMap::new();
        user.insert("avatar".to_string(), Value::from(FileUpload::new("png")));
        let value = Value::from(vec![Value::Map(user)]);
        assert!(prepare(value).contains_file);
    }

    #[test]
    fn json_payload_is_wrapped() {
        let data = json!({"name": "Subway", "tags": ["a", "b"], "nothing": null, "empty": {}});
        let body = encode(single("data", data.clone()), &[catalog::DATA])
            .expect("encode")
            .expect("body");
        assert_eq!(body, Body::Json(json!({ "payload": data })));
    }

    #[test]
    fn keyed_payloads_are_merged() {
        let mut params = single("filter", json!({"name": "Subway"}));
        params.insert("operation".to_string(), json!({"$set": {"x": 1}}).into());

        let body = encode(params, &[catalog::FILTER, catalog::OPERATION])
            .expect("encode")
            .expect("body");
        assert_eq!(
            body,
            Body::Json(json!({"payload": {
                "filter": {"name": "Subway"},
                "operation": {"$set": {"x": 1}}
            }}))
        );
    }

    #[test]
    fn keyed_entries_join_unkeyed_map() {
        let mut params = single("data", json!({"name": "Subway"}));
        params.insert("text".to_string(), Value::from("sub"));

        let body = encode(params, &[catalog::DATA, catalog::TEXT])
            .expect("encode")
            .expect("body");
        assert_eq!(
            body,
            Body::Json(json!({"payload": {"name": "Subway", "text": "sub"}}))
        );
    }

    #[test]
    fn conflicting_payloads_are_rejected() {
        let mut params = single("data", Value::from("a"));
        params.insert("text".to_string(), Value::from("b"));
        let err = encode(params, &[catalog::DATA, catalog::TEXT]).expect_err("conflict");
        assert!(matches!(err, Error::InvalidRequest(_)));

        let mut params = single("one", Value::from("a"));
        params.insert("two".to_string(), Value::from("b"));
        let definitions = [ParamDef::payload("one"), ParamDef::payload("two")];
        assert!(encode(params, &definitions).is_err());
    }

    #[test]
    fn no_payload_no_body() {
        assert_eq!(encode(BTreeMap::new(), &[]).expect("encode"), None);
    }

    #[test]
    fn file_flips_to_multipart() {
        let avatar = FileUpload::named("1.png", "png-bytes");
        let mut user = BTreeMap::new();
        user.insert("avatar".to_string(), Value::from(avatar.clone()));
        user.insert("name".to_string(), Value::from("gena"));
        user.insert("age".to_string(), Value::from(30));
        let mut data = BTreeMap::new();
        data.insert("user".to_string(), Value::Map(user));
        data.insert("joined".to_string(), Value::from(NaiveDate::from_ymd_opt(2015, 1, 2).expect("date")));

        let body = encode(single("data", Value::Map(data)), &[catalog::DATA])
            .expect("encode")
            .expect("body");
        assert_eq!(
            body,
            Body::Multipart(vec![
                ("joined".to_string(), FormField::Text("2015-01-02T00:00:00Z".to_string())),
                ("user.age".to_string(), FormField::Text("30".to_string())),
                ("user.avatar".to_string(), FormField::File(avatar)),
                ("user.name".to_string(), FormField::Text("gena".to_string())),
            ])
        );
    }

    #[test]
    fn bare_file_becomes_file_field() {
        let file = FileUpload::named("logo.png", "png");
        let body = encode(single("data", file.clone()), &[catalog::DATA])
            .expect("encode")
            .expect("body");
        assert_eq!(
            body,
            Body::Multipart(vec![("file".to_string(), FormField::File(file))])
        );
        assert!(body.is_multipart());
        let form = body.to_form().expect("form");
        assert_eq!(form.parts().first().map(Part::name), Some("file"));
    }

    #[test]
    fn flatten_lists_and_empty_leaves() {
        let value = Value::from(json!({"a": [{"b": 1}, []], "c": {}}));
        assert_eq!(
            flatten(value),
            vec![
                ("a[0].b".to_string(), Value::from(1)),
                ("a[1]".to_string(), Value::List(vec![])),
                ("c".to_string(), Value::Map(BTreeMap::new())),
            ]
        );
    }

    #[test]
    fn from_json_reports_path() {
        #[derive(Debug, serde::Deserialize)]
        struct Page {
            #[allow(dead_code)]
            total: u64,
        }

        let err = from_json::<Page>(br#"{"total":"many"}"#).expect_err("type error");
        assert!(matches!(err, Error::JsonDeserialization { ref path, .. } if path == "total"));
    }
}
