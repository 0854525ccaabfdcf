use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiSettings,
    #[serde(default)]
    pub dashboard: DashboardSettings,
    #[serde(default)]
    pub history: HistorySettings,
    #[serde(default)]
    pub export: ExportSettings,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ApiSettings {
    /// Base URL of the procurement REST API, e.g. "https://erp.example.com/api"
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Extra attempts for listing/history fetches after the first failure
    #[serde(default = "default_retries")]
    pub retries: u32,
    /// Worker threads for the per-order inward status lookups
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_purchase_orders_path")]
    pub purchase_orders_path: String,
    /// `{po_number}` is replaced with the URL-encoded PO number
    #[serde(default = "default_inward_status_path")]
    pub inward_status_path: String,
    #[serde(default = "default_history_path")]
    pub history_path: String,
    #[serde(default)]
    pub token: Option<String>,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: default_timeout_secs(),
            retries: default_retries(),
            concurrency: default_concurrency(),
            purchase_orders_path: default_purchase_orders_path(),
            inward_status_path: default_inward_status_path(),
            history_path: default_history_path(),
            token: None,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DashboardSettings {
    #[serde(default = "default_timeframe")]
    pub timeframe: String,
    #[serde(default = "default_top_vendors")]
    pub top_vendors: Option<usize>,
    #[serde(default)]
    pub top_projects: Option<usize>,
    #[serde(default = "default_trend_months")]
    pub trend_months: usize,
    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            timeframe: default_timeframe(),
            top_vendors: default_top_vendors(),
            top_projects: None,
            trend_months: default_trend_months(),
            currency_symbol: default_currency_symbol(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HistorySettings {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ExportSettings {
    /// Fields never written to exported CSV files
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            exclude: default_exclude(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_concurrency() -> usize {
    16
}

fn default_retries() -> u32 {
    2
}

fn default_purchase_orders_path() -> String {
    "/purchase-orders".to_string()
}

fn default_inward_status_path() -> String {
    "/purchase-orders/{po_number}/inward-status".to_string()
}

fn default_history_path() -> String {
    "/requisitions/history".to_string()
}

fn default_timeframe() -> String {
    "all".to_string()
}

fn default_top_vendors() -> Option<usize> {
    Some(10)
}

fn default_trend_months() -> usize {
    12
}

fn default_currency_symbol() -> String {
    "$".to_string()
}

fn default_page_size() -> usize {
    10
}

fn default_exclude() -> Vec<String> {
    ["id", "line_items", "created_at", "updated_at"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
