//! Offset-batched bulk fetches
//!
//! Drives the dispatcher in a loop of fixed-size pages until the upstream
//! returns a short page. Pages are fetched strictly sequentially in
//! increasing-offset order so accumulation stays deterministic and the
//! server's pagination cursor semantics are respected.
//!
//! Known boundary condition, inherited from the upstream API contract: the
//! loop terminates only on a page shorter than the batch size, so a server
//! that always returns exactly full pages would never terminate. This is
//! documented rather than "fixed" — the upstream defines end-of-data as a
//! short page.

use reqwest::Method;
use serde_json::{Map, Value};
use tracing::debug;

use crate::dispatch::Dispatcher;
use crate::errors::{ClientError, Result};

/// Rows requested per page.
pub(crate) const PAGE_SIZE: usize = 50;

/// Fetch every record matching `filters`, sorted by `sort_field`.
///
/// Caller filters are merged into each page request; the driver always
/// controls `rows`, `offset` and `sort_by`, overriding any collision on
/// those keys.
pub(crate) async fn query_all(
    dispatcher: &Dispatcher,
    path: &str,
    filters: &Value,
    sort_field: &str,
) -> Result<Vec<Value>> {
    let mut records = Vec::new();
    let mut offset = 0usize;

    loop {
        let params = page_params(filters, sort_field, offset);
        let body = dispatcher.dispatch(Method::GET, path, Some(&params)).await?;

        let page = match body {
            Value::Array(items) => items,
            other => {
                return Err(ClientError::Internal(format!(
                    "expected a JSON array page from {path}, got {other}"
                )))
            }
        };

        let fetched = page.len();
        debug!(path, offset, fetched, "fetched page");
        records.extend(page);

        if fetched < PAGE_SIZE {
            debug!(path, total = records.len(), "pagination complete");
            return Ok(records);
        }
        offset += PAGE_SIZE;
    }
}

fn page_params(filters: &Value, sort_field: &str, offset: usize) -> Value {
    let mut params = filters.as_object().cloned().unwrap_or_else(Map::new);
    params.insert("rows".into(), Value::from(PAGE_SIZE));
    params.insert("offset".into(), Value::from(offset));
    params.insert("sort_by".into(), Value::from(sort_field));
    Value::Object(params)
}
