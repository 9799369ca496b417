//! Paginated fetcher.
//!
//! Reassembles a complete collection from a page-at-a-time endpoint. A first
//! request of size one learns the total; the loop then advances the cursor by
//! a fixed step and stops once the cursor passes that total. A failing page
//! fails the whole fetch; nothing partial is returned.

use crate::error::{Error, Result};
use crate::gateway::{Gateway, with_query};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashSet;

/// Default number of records requested per page.
pub const DEFAULT_STEP: usize = 50;

/// Cursor convention of an endpoint family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageStyle {
    /// `per_page=<n>&page=<k>`, pages numbered from 1 (inventory).
    Page,
    /// `limit=<n>&offset=<k>`, offsets counted in records (edge views).
    Offset,
}

impl PageStyle {
    fn params(self, size: usize, offset: usize) -> [(&'static str, String); 2] {
        match self {
            Self::Page => [
                ("per_page", size.to_string()),
                ("page", (offset / size + 1).to_string()),
            ],
            Self::Offset => [("limit", size.to_string()), ("offset", offset.to_string())],
        }
    }
}

/// Where a paginated endpoint keeps its total and its records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageQuery {
    /// Base path including any fixed filters.
    pub path: String,
    /// Cursor style.
    pub style: PageStyle,
    /// JSON pointer to the total count (e.g. `/total`).
    pub total: String,
    /// JSON pointer to the record array (e.g. `/data/devices`).
    pub records: String,
    /// JSON pointer, relative to a record, of its stable identity. Records
    /// seen twice (the server shifted between pages) are kept once.
    pub identity: Option<String>,
}

impl PageQuery {
    /// Query with the common `{count, data: [...]}` layout.
    pub fn new(path: impl Into<String>, style: PageStyle) -> Self {
        Self {
            path: path.into(),
            style,
            total: "/count".to_string(),
            records: "/data".to_string(),
            identity: None,
        }
    }

    /// Set the total pointer.
    pub fn total_at(mut self, pointer: impl Into<String>) -> Self {
        self.total = pointer.into();
        self
    }

    /// Set the records pointer.
    pub fn records_at(mut self, pointer: impl Into<String>) -> Self {
        self.records = pointer.into();
        self
    }

    /// Deduplicate records by the value at `pointer`.
    pub fn identity_at(mut self, pointer: impl Into<String>) -> Self {
        self.identity = Some(pointer.into());
        self
    }

    fn page_path(&self, size: usize, offset: usize) -> String {
        with_query(&self.path, &self.style.params(size, offset))
    }

    fn total_of(&self, path: &str, page: &Value) -> Result<usize> {
        let total = page
            .pointer(&self.total)
            .and_then(Value::as_u64)
            .ok_or_else(|| Error::invalid(path, format!("missing total at '{}'", self.total)))?;
        usize::try_from(total).map_err(|_| Error::invalid(path, "total out of range"))
    }

    fn records_of(&self, path: &str, page: Value) -> Result<Vec<Value>> {
        match pointer_owned(page, &self.records) {
            Some(Value::Array(records)) => Ok(records),
            Some(Value::Null) | None => Ok(Vec::new()),
            Some(_) => Err(Error::invalid(
                path,
                format!("records at '{}' are not an array", self.records),
            )),
        }
    }
}

fn pointer_owned(mut value: Value, pointer: &str) -> Option<Value> {
    value.pointer_mut(pointer).map(Value::take)
}

type ProgressFn<'a> = Box<dyn Fn(usize, usize) + 'a>;

/// Fetches complete collections through a [`Gateway`].
pub struct Paginator<'a> {
    gateway: &'a dyn Gateway,
    step: usize,
    progress: Option<ProgressFn<'a>>,
}

impl<'a> Paginator<'a> {
    /// Create a paginator with the given page size (clamped to at least 1).
    pub fn new(gateway: &'a dyn Gateway, step: usize) -> Self {
        Self {
            gateway,
            step: step.max(1),
            progress: None,
        }
    }

    /// Report `(fetched, total)` after every page.
    pub fn with_progress(mut self, progress: impl Fn(usize, usize) + 'a) -> Self {
        self.progress = Some(Box::new(progress));
        self
    }

    /// The page size.
    pub fn step(&self) -> usize {
        self.step
    }

    /// Fetch every record, in server order.
    pub fn fetch_all(&self, query: &PageQuery) -> Result<Vec<Value>> {
        let probe_path = query.page_path(1, 0);
        let probe = self.gateway.get(&probe_path)?;
        let total = query.total_of(&probe_path, &probe)?;
        log::debug!("{}: {total} records, step {}", query.path, self.step);

        let mut records = Vec::with_capacity(total);
        let mut seen = HashSet::new();
        let mut offset = 0;

        while offset < total {
            let path = query.page_path(self.step, offset);
            let page = self.gateway.get(&path)?;
            let batch = query.records_of(&path, page)?;
            if batch.is_empty() {
                log::warn!(
                    "{}: empty page at offset {offset}, expected {total} records",
                    query.path
                );
                break;
            }

            for record in batch {
                if let Some(pointer) = &query.identity {
                    let key = record.pointer(pointer).map(Value::to_string);
                    if let Some(key) = key
                        && !seen.insert(key)
                    {
                        continue;
                    }
                }
                records.push(record);
            }
            records.truncate(total);

            offset += self.step;
            if let Some(progress) = &self.progress {
                progress(records.len(), total);
            }
        }

        Ok(records)
    }

    /// Fetch every record and decode each into `T`.
    pub fn fetch_all_as<T: DeserializeOwned>(&self, query: &PageQuery) -> Result<Vec<T>> {
        self.fetch_all(query)?
            .into_iter()
            .map(|record| {
                serde_json::from_value(record).map_err(|e| Error::invalid(&query.path, e.to_string()))
            })
            .collect()
    }
}
