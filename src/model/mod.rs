mod purchase_order;
mod revision;

pub use purchase_order::{
    parse_purchase_orders, EnrichedOrder, InwardStatus, LineItem, PoStatus, PurchaseOrder,
    UNASSIGNED_PROJECT, UNKNOWN_VENDOR,
};
pub use revision::{parse_change_records, ChangeRecord};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

/// Accepts `YYYY-MM-DD`, RFC 3339, or a naive `YYYY-MM-DDTHH:MM:SS` timestamp
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date);
    }
    parse_timestamp(s).map(|ts| ts.date_naive())
}

/// Naive timestamps and bare dates are taken as UTC
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

pub(crate) fn value_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// `deserialize_with` helpers for API fields whose scalar type varies between deployments
pub(crate) mod lenient {
    use serde::{de, Deserialize, Deserializer};
    use serde_json::Value;

    use super::{value_as_string, LineItem};

    /// Strings, numbers and bools as text; anything else is absent
    pub fn string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(value.as_ref().and_then(value_as_string))
    }

    /// Like [`string`], trimmed, with blank text treated as absent
    pub fn non_blank<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(string(deserializer)?
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()))
    }

    /// Numbers or numeric strings; null is absent, anything else is an error
    pub fn number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<Value>::deserialize(deserializer)? {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => Ok(n.as_f64()),
            Some(Value::String(s)) => s
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| de::Error::custom(format!("'{s}' is not a number"))),
            Some(other) => Err(de::Error::custom(format!("expected a number, found {other}"))),
        }
    }

    /// Booleans, 0/1 and "true"/"yes"/"no" style strings
    pub fn flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<Value>::deserialize(deserializer)? {
            Some(Value::Bool(b)) => Some(b),
            Some(Value::Number(n)) => n.as_i64().map(|n| n != 0),
            Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => Some(true),
                "false" | "0" | "no" => Some(false),
                _ => None,
            },
            _ => None,
        })
    }

    /// Audit values for display: null is absent, nested values become JSON
    pub fn display<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<Value>::deserialize(deserializer)? {
            None | Some(Value::Null) => None,
            Some(nested @ (Value::Array(_) | Value::Object(_))) => Some(nested.to_string()),
            Some(scalar) => value_as_string(&scalar),
        })
    }

    /// Line items that do not parse are dropped
    pub fn line_items<'de, D>(deserializer: D) -> Result<Vec<LineItem>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<Value>::deserialize(deserializer)? {
            Some(Value::Array(items)) => items
                .into_iter()
                .filter_map(|item| serde_json::from_value(item).ok())
                .collect(),
            _ => Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn parses_date_forms() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        assert_eq!(parse_date("2024-01-31"), Some(expected));
        assert_eq!(parse_date("2024-01-31T23:10:00Z"), Some(expected));
        assert_eq!(parse_date("2024-01-31T23:10:00"), Some(expected));
        assert_eq!(parse_date("31/01/2024"), None);
    }

    #[test]
    fn offsets_are_normalized_to_utc() {
        let ts = parse_timestamp("2024-01-01T10:00:30+02:00").unwrap();
        assert_eq!(ts.hour(), 8);
    }
}
