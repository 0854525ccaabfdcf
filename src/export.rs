//! CSV export of raw API rows

use serde_json::Value;

use crate::error::{PodashError, Result};
use crate::filter::PoFilter;
use crate::model::PurchaseOrder;

/// Keep the raw rows whose validated order matches `filter`.
///
/// Rows that fail validation never match and are logged with their listing position.
pub fn filter_rows(rows: Vec<Value>, filter: &PoFilter) -> Vec<Value> {
    rows.into_iter()
        .enumerate()
        .filter(|(index, row)| match PurchaseOrder::from_value(*index, row) {
            Ok(po) => filter.matches(&po),
            Err(e) => {
                tracing::warn!("skipping purchase order: {e}");
                false
            }
        })
        .map(|(_, row)| row)
        .collect()
}

/// Flatten JSON objects into CSV text.
///
/// Columns are the union of object keys in first-seen order, minus `exclude`.
/// Non-object rows are skipped. Nested arrays and objects are written as
/// compact JSON. Fields containing commas, quotes or newlines are quoted.
pub fn to_csv(rows: &[Value], exclude: &[String]) -> Result<String> {
    let objects: Vec<&serde_json::Map<String, Value>> =
        rows.iter().filter_map(Value::as_object).collect();

    let mut columns: Vec<&str> = Vec::new();
    for object in &objects {
        for key in object.keys() {
            if !exclude.iter().any(|e| e == key) && !columns.contains(&key.as_str()) {
                columns.push(key);
            }
        }
    }

    if columns.is_empty() {
        return Ok(String::new());
    }

    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Necessary)
        .from_writer(Vec::new());

    writer.write_record(&columns)?;
    for object in &objects {
        let record: Vec<String> = columns
            .iter()
            .map(|column| object.get(*column).map(cell).unwrap_or_default())
            .collect();
        writer.write_record(&record)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| PodashError::Io(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| PodashError::Decode {
        what: "CSV output".to_string(),
        reason: e.to_string(),
    })
}

fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}
