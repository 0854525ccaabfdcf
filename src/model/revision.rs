use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{lenient, parse_timestamp};
use crate::error::{PodashError, Result};

/// A single field-level edit from the requisition audit log
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeRecord {
    pub batch_id: String,
    pub field_name: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub changed_by: String,
    pub changed_at: DateTime<Utc>,
}

/// History row as the API sends it, before validation
#[derive(Deserialize)]
struct RawChangeRecord {
    #[serde(default, deserialize_with = "lenient::string")]
    batch_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::non_blank")]
    field_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::display")]
    old_value: Option<String>,
    #[serde(default, deserialize_with = "lenient::display")]
    new_value: Option<String>,
    #[serde(default, deserialize_with = "lenient::non_blank")]
    changed_by: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    changed_at: Option<String>,
}

impl ChangeRecord {
    pub fn from_value(index: usize, value: &Value) -> Result<Self> {
        let invalid = |reason: String| PodashError::InvalidRecord { index, reason };

        if !value.is_object() {
            return Err(invalid("expected a JSON object".to_string()));
        }
        let raw = RawChangeRecord::deserialize(value).map_err(|e| invalid(e.to_string()))?;

        let changed_at = raw
            .changed_at
            .as_deref()
            .and_then(parse_timestamp)
            .ok_or_else(|| invalid("missing or malformed changed_at".to_string()))?;

        Ok(Self {
            batch_id: raw.batch_id.unwrap_or_default(),
            field_name: raw
                .field_name
                .unwrap_or_else(|| "(unknown field)".to_string()),
            old_value: raw.old_value,
            new_value: raw.new_value,
            changed_by: raw.changed_by.unwrap_or_else(|| "unknown".to_string()),
            changed_at,
        })
    }
}

pub fn parse_change_records(values: &[Value]) -> Vec<ChangeRecord> {
    values
        .iter()
        .enumerate()
        .filter_map(|(index, value)| match ChangeRecord::from_value(index, value) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!("skipping history record: {e}");
                None
            }
        })
        .collect()
}
