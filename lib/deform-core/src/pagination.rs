//! Pagination.
//!
//! A paginated method runs in one of two modes, chosen per invocation:
//!
//! - **single page**: the caller passed `page` or `per_page`; one request, the
//!   envelope comes back as a [`Page`].
//! - **cursor**: otherwise; a lazy [`Cursor`] that requests `page=1`, `2`, ...
//!   as it is pulled. It stops after a page without `links.next`, on an empty
//!   page, or when a page request answers 404. Any other error is yielded
//!   once and ends the stream.
//!
//! Two envelope layouts are understood:
//!
//! ```text
//! {"links": {"next": ..}, "result": {"page", "pages", "per_page", "total", "items"}}
//! {"links": {"next": ..}, "page", "pages", "per_page", "total", "result": [..]}
//! ```
//!
//! `links` may also sit inside the `result` object.

use std::collections::VecDeque;

use futures_util::stream::{self, BoxStream, StreamExt};
use serde::Deserialize;
use tracing::debug;

use crate::client::dispatch;
use crate::context::RequestContext;
use crate::{Args, DeformClient, Error, Result};

/// Lazy sequence of items, fetched page by page.
///
/// Not restartable: invoke the method again for a fresh cursor.
pub type Cursor = BoxStream<'static, Result<serde_json::Value>>;

/// One page of results.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// Page number, starting at 1.
    pub page: u64,
    /// Number of pages.
    pub pages: u64,
    /// Page size.
    pub per_page: u64,
    /// Number of items across all pages.
    pub total: u64,
    /// Items of this page.
    pub items: Vec<serde_json::Value>,
    /// Continuation link, when more pages follow.
    pub next: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Links {
    #[serde(default)]
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Paging {
    #[serde(default)]
    page: Option<u64>,
    #[serde(default)]
    pages: Option<u64>,
    #[serde(default)]
    per_page: Option<u64>,
    #[serde(default)]
    total: Option<u64>,
    #[serde(default)]
    items: Vec<serde_json::Value>,
    #[serde(default)]
    links: Option<Links>,
}

impl Page {
    /// Parse a paginated response document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::JsonDeserialization`] when `result` is missing or the
    /// paging fields have the wrong type.
    pub fn from_envelope(mut envelope: serde_json::Value) -> Result<Self> {
        let result = envelope
            .get_mut("result")
            .map(serde_json::Value::take)
            .ok_or_else(|| Error::json_deserialization("result", "missing field `result`"))?;

        let (paging, outer) = match result {
            serde_json::Value::Array(items) => {
                let mut paging: Paging = decode(envelope, "")?;
                paging.items = items;
                (paging, None)
            }
            result => {
                let outer: Paging = decode(envelope, "")?;
                (decode(result, "result")?, Some(outer))
            }
        };

        let next = paging
            .links
            .and_then(|links| links.next)
            .or_else(|| outer.and_then(|outer| outer.links).and_then(|links| links.next))
            .filter(|next| !next.is_empty());
        let count = u64::try_from(paging.items.len()).unwrap_or(u64::MAX);

        Ok(Self {
            page: paging.page.unwrap_or(1),
            pages: paging.pages.unwrap_or(1),
            per_page: paging.per_page.unwrap_or(count),
            total: paging.total.unwrap_or(count),
            items: paging.items,
            next,
        })
    }

    /// Returns `true` when the envelope announced a next page.
    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.next.is_some()
    }
}

fn decode<T: serde::de::DeserializeOwned>(value: serde_json::Value, prefix: &str) -> Result<T> {
    serde_path_to_error::deserialize(value).map_err(|e| {
        let path = e.path().to_string();
        let path = match (prefix.is_empty(), path.as_str()) {
            (true, _) => path,
            (false, ".") => prefix.to_string(),
            (false, _) => format!("{prefix}.{path}"),
        };
        Error::json_deserialization(path, e.inner().to_string())
    })
}

/// Returns `true` when the caller asked for one explicit page.
#[must_use]
pub fn wants_single_page(args: &Args) -> bool {
    args.contains("page") || args.contains("per_page")
}

/// Fetch and parse one page.
///
/// # Errors
///
/// Returns the classified failure, or a decoding error for a malformed
/// envelope.
pub async fn fetch_page<C: DeformClient>(client: &C, context: &RequestContext) -> Result<Page> {
    let response = dispatch(client, context.to_request()?).await?;
    Page::from_envelope(response.json()?)
}

struct CursorState<C> {
    client: C,
    context: RequestContext,
    operation: &'static str,
    page: u64,
    exhausted: bool,
    buffer: VecDeque<serde_json::Value>,
}

/// Lazy cursor over every page of `context`.
///
/// Nothing is requested until the stream is polled.
#[must_use]
pub fn cursor<C: DeformClient>(client: C, context: RequestContext, operation: &'static str) -> Cursor {
    let state = CursorState {
        client,
        context,
        operation,
        page: 0,
        exhausted: false,
        buffer: VecDeque::new(),
    };

    stream::try_unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.buffer.pop_front() {
                return Ok(Some((item, state)));
            }
            if state.exhausted {
                return Ok(None);
            }

            state.page += 1;
            state.context.set_query("page", state.page.to_string());
            debug!(operation = state.operation, page = state.page, "fetching page");

            let page = match fetch_page(&state.client, &state.context).await {
                Ok(page) => page,
                Err(error) if error.is_not_found() => {
                    debug!(operation = state.operation, page = state.page, "page not found, cursor ends");
                    return Ok(None);
                }
                Err(error) => return Err(error),
            };

            state.exhausted = !page.has_next() || page.items.is_empty();
            state.buffer.extend(page.items);
        }
    })
    .boxed()
}
