mod http;
mod snapshot;

pub use http::HttpSource;
pub use snapshot::SnapshotSource;

use serde_json::Value;
use std::path::Path;
use std::time::Duration;

use crate::config::ApiSettings;
use crate::error::{PodashError, Result};
use crate::model::{
    parse_change_records, parse_purchase_orders, ChangeRecord, InwardStatus, PurchaseOrder,
};

/// The three endpoints the dashboard reads from.
///
/// Listing and history return raw JSON rows; typed parsing happens in
/// [`load_purchase_orders`] and [`load_history`].
pub trait PoSource: Send + Sync {
    fn fetch_purchase_orders(&self) -> Result<Vec<Value>>;

    fn fetch_inward_status(&self, po_number: &str) -> Result<InwardStatus>;

    fn fetch_history(&self, batch_id: &str) -> Result<Vec<Value>>;
}

/// Pick the snapshot file when given, otherwise the configured REST API
pub fn build_source(
    settings: &ApiSettings,
    from_file: Option<&Path>,
) -> Result<Box<dyn PoSource>> {
    if let Some(path) = from_file {
        tracing::info!(path = %path.display(), "reading snapshot");
        return Ok(Box::new(SnapshotSource::from_file(path)?));
    }
    match settings.base_url.as_deref().filter(|url| !url.trim().is_empty()) {
        Some(base_url) => Ok(Box::new(HttpSource::new(base_url, settings))),
        None => Err(PodashError::NoApiSource),
    }
}

/// Run a batch fetch, retrying `retries` more times on failure
pub fn with_retries<T, F>(what: &str, retries: u32, mut fetch: F) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    let attempts = retries.saturating_add(1);
    let mut last_error = None;

    for attempt in 1..=attempts {
        match fetch() {
            Ok(value) => return Ok(value),
            Err(e) => {
                tracing::warn!(attempt, attempts, "fetching {what} failed: {e}");
                last_error = Some(e);
                if attempt < attempts {
                    std::thread::sleep(Duration::from_millis(200 * u64::from(attempt)));
                }
            }
        }
    }

    Err(PodashError::FetchFailed {
        what: what.to_string(),
        attempts,
        reason: last_error.map(|e| e.to_string()).unwrap_or_default(),
    })
}

pub fn fetch_listing(source: &dyn PoSource, retries: u32) -> Result<Vec<Value>> {
    with_retries("purchase orders", retries, || source.fetch_purchase_orders())
}

pub fn load_purchase_orders(
    source: &dyn PoSource,
    retries: u32,
) -> Result<Vec<PurchaseOrder>> {
    let rows = fetch_listing(source, retries)?;
    let orders = parse_purchase_orders(&rows);
    tracing::info!(rows = rows.len(), valid = orders.len(), "loaded purchase orders");
    Ok(orders)
}

pub fn load_history(
    source: &dyn PoSource,
    batch_id: &str,
    retries: u32,
) -> Result<Vec<ChangeRecord>> {
    let rows = with_retries("revision history", retries, || source.fetch_history(batch_id))?;
    Ok(parse_change_records(&rows))
}
