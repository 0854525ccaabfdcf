use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use super::PoSource;
use crate::error::{PodashError, Result};
use crate::model::{value_as_string, InwardStatus};

/// Offline source read from a JSON export of the three endpoints:
///
/// ```json
/// {
///   "purchase_orders": [ { "po_number": "PO-1", ... } ],
///   "inward_status": { "PO-1": "completed" },
///   "history": [ { "batch_id": "B-1", "changed_by": "...", ... } ]
/// }
/// ```
///
/// A PO missing from `inward_status` behaves like a failed lookup.
#[derive(Debug, Clone, Default)]
pub struct SnapshotSource {
    purchase_orders: Vec<Value>,
    inward_status: HashMap<String, InwardStatus>,
    history: Vec<Value>,
}

#[derive(Deserialize)]
struct SnapshotFile {
    #[serde(default)]
    purchase_orders: Vec<Value>,
    #[serde(default)]
    inward_status: HashMap<String, String>,
    #[serde(default)]
    history: Vec<Value>,
}

impl SnapshotSource {
    pub fn new(
        purchase_orders: Vec<Value>,
        inward_status: HashMap<String, InwardStatus>,
        history: Vec<Value>,
    ) -> Self {
        Self {
            purchase_orders,
            inward_status,
            history,
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content).map_err(|e| match e {
            PodashError::Decode { reason, .. } => PodashError::Decode {
                what: format!("snapshot {}", path.display()),
                reason,
            },
            other => other,
        })
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let file: SnapshotFile = serde_json::from_str(content).map_err(|e| PodashError::Decode {
            what: "snapshot".to_string(),
            reason: e.to_string(),
        })?;

        let inward_status = file
            .inward_status
            .into_iter()
            .filter_map(|(po_number, status)| match status.parse() {
                Ok(status) => Some((po_number, status)),
                Err(e) => {
                    tracing::warn!(%po_number, "ignoring snapshot inward status: {e}");
                    None
                }
            })
            .collect();

        Ok(Self::new(file.purchase_orders, inward_status, file.history))
    }
}

impl PoSource for SnapshotSource {
    fn fetch_purchase_orders(&self) -> Result<Vec<Value>> {
        Ok(self.purchase_orders.clone())
    }

    fn fetch_inward_status(&self, po_number: &str) -> Result<InwardStatus> {
        self.inward_status
            .get(po_number)
            .copied()
            .ok_or_else(|| PodashError::Http {
                url: format!("snapshot://inward_status/{po_number}"),
                reason: "no inward status recorded".to_string(),
            })
    }

    fn fetch_history(&self, batch_id: &str) -> Result<Vec<Value>> {
        Ok(self
            .history
            .iter()
            .filter(|row| {
                row.get("batch_id")
                    .and_then(value_as_string)
                    .is_some_and(|id| id == batch_id)
            })
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SNAPSHOT: &str = r#"{
        "purchase_orders": [{"po_number": "PO-1", "po_date": "2024-01-01"}],
        "inward_status": {"PO-1": "completed", "PO-9": "lost"},
        "history": [
            {"batch_id": "B-1", "changed_at": "2024-01-01T10:00:00Z"},
            {"batch_id": "B-2", "changed_at": "2024-01-01T10:00:00Z"},
            {"batch_id": 7, "changed_at": "2024-01-01T10:00:00Z"}
        ]
    }"#;

    #[test]
    fn serves_snapshot_contents() {
        let source = SnapshotSource::from_json(SNAPSHOT).unwrap();
        assert_eq!(source.fetch_purchase_orders().unwrap().len(), 1);
        assert_eq!(source.fetch_inward_status("PO-1").unwrap(), InwardStatus::Completed);
        assert!(source.fetch_inward_status("PO-9").is_err());
        assert!(source.fetch_inward_status("PO-2").is_err());
        assert_eq!(source.fetch_history("B-1").unwrap().len(), 1);
        assert_eq!(source.fetch_history("7").unwrap().len(), 1);
        assert!(source.fetch_history("B-3").unwrap().is_empty());
    }

    #[test]
    fn rejects_malformed_json() {
        let err = SnapshotSource::from_json("[1, 2").unwrap_err();
        assert!(err.to_string().contains("snapshot"));
    }
}
