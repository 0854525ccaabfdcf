use crate::model::{InwardStatus, PoStatus, PurchaseOrder};

/// Listing filter. Empty fields match everything.
#[derive(Debug, Clone, Default)]
pub struct PoFilter {
    /// Case-insensitive substring over PO number, vendor and project
    pub search: Option<String>,
    pub status: Option<PoStatus>,
    pub vendor: Option<String>,
    pub project: Option<String>,
    pub approved_only: bool,
}

impl PoFilter {
    pub fn matches(&self, po: &PurchaseOrder) -> bool {
        if self.approved_only && !po.approval_status {
            return false;
        }
        if self.status.is_some_and(|status| po.status != status) {
            return false;
        }
        if let Some(vendor) = &self.vendor {
            if !po.vendor_name.eq_ignore_ascii_case(vendor) {
                return false;
            }
        }
        if let Some(project) = &self.project {
            if !po.project_code.eq_ignore_ascii_case(project) {
                return false;
            }
        }
        match self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(needle) => {
                let needle = needle.to_lowercase();
                [&po.po_number, &po.vendor_name, &po.project_code]
                    .iter()
                    .any(|field| field.to_lowercase().contains(&needle))
            }
            None => true,
        }
    }

    pub fn apply<'a>(&self, orders: &'a [PurchaseOrder]) -> Vec<&'a PurchaseOrder> {
        orders.iter().filter(|po| self.matches(po)).collect()
    }
}

/// Equality filter on inward status, for already-enriched listings
pub fn has_inward_status(status: Option<InwardStatus>, actual: InwardStatus) -> bool {
    status.map_or(true, |wanted| wanted == actual)
}
