//! # Pagination
//!
//! The page contract shared by every paginated list route: the inbound
//! `pageIndex`/`pageSize`/`query` filters, the outbound `page`/`limit`/`search`
//! query, and the `{data, meta}` result whose derived fields are always
//! present.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

pub const DEFAULT_PAGE_INDEX: u64 = 1;
pub const DEFAULT_PAGE_SIZE: u64 = 10;

/// Page filters read from the inbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageQuery {
    pub page_index: u64,
    pub page_size: u64,
    pub query: Option<String>,
}

impl Default for PageQuery {
    fn default() -> Self {
        Self {
            page_index: DEFAULT_PAGE_INDEX,
            page_size: DEFAULT_PAGE_SIZE,
            query: None,
        }
    }
}

impl PageQuery {
    /// Builds a page query from raw query pairs, coercing the numbers to positive integers.
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        let lookup = |key: &str| {
            pairs
                .iter()
                .rev()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
        };

        Self {
            page_index: coerce_positive(lookup("pageIndex"), DEFAULT_PAGE_INDEX),
            page_size: coerce_positive(lookup("pageSize"), DEFAULT_PAGE_SIZE),
            query: lookup("query")
                .filter(|q| !q.trim().is_empty())
                .map(str::to_string),
        }
    }

    /// Query pairs sent upstream; `search` is omitted when there is no search string.
    pub fn to_backend_query(&self) -> Vec<(String, String)> {
        let mut pairs = vec![
            ("page".to_string(), self.page_index.to_string()),
            ("limit".to_string(), self.page_size.to_string()),
        ];
        if let Some(search) = &self.query {
            pairs.push(("search".to_string(), search.clone()));
        }
        pairs
    }
}

/// Parses a positive integer, accepting integral decimals such as `"2.0"`.
fn coerce_positive(raw: Option<&str>, default: u64) -> u64 {
    let Some(raw) = raw.map(str::trim) else {
        return default;
    };

    if let Ok(value) = raw.parse::<u64>() {
        return if value > 0 { value } else { default };
    }

    match raw.parse::<f64>() {
        Ok(value)
            if value.is_finite()
                && value >= 1.0
                && value.fract() == 0.0
                && value <= f64::from(u32::MAX) =>
        {
            value as u64
        }
        _ => default,
    }
}

/// Pagination metadata as returned to the browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

/// One page of items plus derived navigation fields.
#[derive(Debug, Clone, PartialEq)]
pub struct PageResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page_index: u64,
    pub page_size: u64,
    pub total_pages: u64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl<T> PageResult<T> {
    /// Builds a page, deriving `total_pages` and the navigation flags.
    pub fn new(items: Vec<T>, total: u64, page_index: u64, page_size: u64) -> Self {
        let total_pages = if page_size > 0 {
            total.div_ceil(page_size)
        } else {
            0
        };

        Self {
            items,
            total,
            page_index,
            page_size,
            total_pages,
            has_next_page: page_index < total_pages,
            has_prev_page: page_index > 1,
        }
    }

    /// Fallback page used when the backend could not supply one.
    pub fn empty(query: &PageQuery) -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            page_index: query.page_index,
            page_size: query.page_size,
            total_pages: 0,
            has_next_page: false,
            has_prev_page: false,
        }
    }

    pub fn meta(&self) -> PageMeta {
        PageMeta {
            total: self.total,
            page: self.page_index,
            limit: self.page_size,
            total_pages: self.total_pages,
            has_next_page: self.has_next_page,
            has_prev_page: self.has_prev_page,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PageResult<U> {
        PageResult {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page_index: self.page_index,
            page_size: self.page_size,
            total_pages: self.total_pages,
            has_next_page: self.has_next_page,
            has_prev_page: self.has_prev_page,
        }
    }
}

impl PageResult<Value> {
    /// Maps a backend `{data, meta}` body into a page.
    ///
    /// Missing meta fields fall back to the requested page and the item count;
    /// the derived fields are always recomputed.
    pub fn from_backend(body: &Value, query: &PageQuery) -> Self {
        let items = match body.get("data") {
            Some(Value::Array(items)) => items.clone(),
            _ => {
                tracing::warn!("Backend list response carried no data array");
                Vec::new()
            }
        };

        let meta = body.get("meta");
        let meta_number = |key: &str| {
            meta.and_then(|m| m.get(key))
                .and_then(Value::as_u64)
                .filter(|n| *n > 0 || key == "total")
        };

        let total = meta_number("total").unwrap_or(items.len() as u64);
        let page_index = meta_number("page").unwrap_or(query.page_index);
        let page_size = meta_number("limit").unwrap_or(query.page_size);

        Self::new(items, total, page_index, page_size)
    }
}

/// Wire shape of a page: `{data, meta}`.
#[derive(Debug, Serialize)]
pub struct PageEnvelope<T> {
    pub data: Vec<T>,
    pub meta: PageMeta,
}

impl<T> From<PageResult<T>> for PageEnvelope<T> {
    fn from(page: PageResult<T>) -> Self {
        let meta = page.meta();
        Self {
            data: page.items,
            meta,
        }
    }
}
