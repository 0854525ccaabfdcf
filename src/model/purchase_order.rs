use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use super::{lenient, parse_date, parse_timestamp};
use crate::error::{PodashError, Result};

/// Lifecycle status of a purchase order as reported by the API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoStatus {
    PendingApproval,
    Approved,
    Rejected,
    Ordered,
    Delivered,
    Cancelled,
}

impl PoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PoStatus::PendingApproval => "pending_approval",
            PoStatus::Approved => "approved",
            PoStatus::Rejected => "rejected",
            PoStatus::Ordered => "ordered",
            PoStatus::Delivered => "delivered",
            PoStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for PoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PoStatus {
    type Err = PodashError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace([' ', '-'], "_").as_str() {
            "pending_approval" | "pending" => Ok(PoStatus::PendingApproval),
            "approved" => Ok(PoStatus::Approved),
            "rejected" => Ok(PoStatus::Rejected),
            "ordered" => Ok(PoStatus::Ordered),
            "delivered" => Ok(PoStatus::Delivered),
            "cancelled" | "canceled" => Ok(PoStatus::Cancelled),
            _ => Err(PodashError::InvalidStatus(s.to_string())),
        }
    }
}

/// Fulfillment state of a PO's line items on physical receipt
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum InwardStatus {
    #[default]
    Open,
    PartiallyInwarded,
    Completed,
}

impl InwardStatus {
    pub const ALL: [InwardStatus; 3] = [
        InwardStatus::Open,
        InwardStatus::PartiallyInwarded,
        InwardStatus::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InwardStatus::Open => "open",
            InwardStatus::PartiallyInwarded => "partially_inwarded",
            InwardStatus::Completed => "completed",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            InwardStatus::Open => "Open",
            InwardStatus::PartiallyInwarded => "Partially Inwarded",
            InwardStatus::Completed => "Completed",
        }
    }
}

impl fmt::Display for InwardStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InwardStatus {
    type Err = PodashError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace([' ', '-'], "_").as_str() {
            "open" => Ok(InwardStatus::Open),
            "partially_inwarded" | "partial" => Ok(InwardStatus::PartiallyInwarded),
            "completed" | "complete" => Ok(InwardStatus::Completed),
            _ => Err(PodashError::InvalidStatus(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct LineItem {
    #[serde(default)]
    pub item_name: String,
    #[serde(default)]
    pub quantity: f64,
    #[serde(default)]
    pub unit_price: f64,
}

/// A validated purchase order. Optional API fields are defaulted at parse time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PurchaseOrder {
    pub po_number: String,
    pub po_date: NaiveDate,
    pub vendor_name: String,
    pub project_code: String,
    pub total_amount: f64,
    pub status: PoStatus,
    pub approval_status: bool,
    pub approval_date: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub line_items: Vec<LineItem>,
}

pub const UNKNOWN_VENDOR: &str = "Unknown";
pub const UNASSIGNED_PROJECT: &str = "Unassigned";

/// Listing row as the API sends it, before validation
#[derive(Deserialize)]
struct RawPurchaseOrder {
    #[serde(default, deserialize_with = "lenient::non_blank")]
    po_number: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    po_date: Option<String>,
    #[serde(default, deserialize_with = "lenient::non_blank")]
    vendor_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::non_blank")]
    project_code: Option<String>,
    #[serde(default, deserialize_with = "lenient::number")]
    total_amount: Option<f64>,
    #[serde(default, deserialize_with = "lenient::string")]
    status: Option<String>,
    #[serde(default, deserialize_with = "lenient::flag")]
    approval_status: Option<bool>,
    #[serde(default, deserialize_with = "lenient::string")]
    approval_date: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    created_at: Option<String>,
    #[serde(default, deserialize_with = "lenient::line_items")]
    line_items: Vec<LineItem>,
}

impl RawPurchaseOrder {
    fn validate(self) -> std::result::Result<PurchaseOrder, String> {
        let po_number = self
            .po_number
            .ok_or_else(|| "missing po_number".to_string())?;

        let po_date = self
            .po_date
            .as_deref()
            .and_then(parse_date)
            .ok_or_else(|| format!("{po_number}: missing or malformed po_date"))?;

        let total_amount = self.total_amount.unwrap_or(0.0);
        if !total_amount.is_finite() || total_amount < 0.0 {
            return Err(format!(
                "{po_number}: total_amount must be a non-negative number"
            ));
        }

        let status = match self.status {
            Some(s) => s
                .parse()
                .map_err(|_| format!("{po_number}: unknown status '{s}'"))?,
            None => PoStatus::PendingApproval,
        };

        Ok(PurchaseOrder {
            po_number,
            po_date,
            vendor_name: self
                .vendor_name
                .unwrap_or_else(|| UNKNOWN_VENDOR.to_string()),
            project_code: self
                .project_code
                .unwrap_or_else(|| UNASSIGNED_PROJECT.to_string()),
            total_amount,
            status,
            approval_status: self.approval_status.unwrap_or(false),
            approval_date: self.approval_date.as_deref().and_then(parse_timestamp),
            created_at: self.created_at.as_deref().and_then(parse_timestamp),
            line_items: self.line_items,
        })
    }
}

impl PurchaseOrder {
    /// Validate one JSON record from the listing endpoint.
    /// `index` is only used to point at the record in error messages.
    pub fn from_value(index: usize, value: &Value) -> Result<Self> {
        let invalid = |reason: String| PodashError::InvalidRecord { index, reason };

        if !value.is_object() {
            return Err(invalid("expected a JSON object".to_string()));
        }
        let raw = RawPurchaseOrder::deserialize(value).map_err(|e| invalid(e.to_string()))?;
        raw.validate().map_err(invalid)
    }
}

/// Parse a listing response, skipping records that fail validation
pub fn parse_purchase_orders(values: &[Value]) -> Vec<PurchaseOrder> {
    values
        .iter()
        .enumerate()
        .filter_map(|(index, value)| match PurchaseOrder::from_value(index, value) {
            Ok(order) => Some(order),
            Err(e) => {
                tracing::warn!("skipping purchase order: {e}");
                None
            }
        })
        .collect()
}

/// A purchase order merged with its inward status
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedOrder {
    #[serde(flatten)]
    pub order: PurchaseOrder,
    pub inward_status: InwardStatus,
}

impl EnrichedOrder {
    pub fn new(order: PurchaseOrder, inward_status: InwardStatus) -> Self {
        Self {
            order,
            inward_status,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.inward_status == InwardStatus::Completed
    }
}
