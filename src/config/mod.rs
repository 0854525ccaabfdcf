mod settings;

pub use settings::{ApiSettings, Config, DashboardSettings, ExportSettings, HistorySettings};

use crate::error::{PodashError, Result};
use directories::ProjectDirs;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Overrides the default config directory when `-C` is not given
pub const CONFIG_DIR_ENV: &str = "PODASH_CONFIG_DIR";

/// Default config directory: `$PODASH_CONFIG_DIR`, the platform config dir, or `~/.podash`
pub fn config_dir() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV).filter(|dir| !dir.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    ProjectDirs::from("", "", "podash")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .or_else(|| home_dir().map(|home| home.join(".podash")))
        .ok_or_else(|| {
            PodashError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                "no home directory to place the podash config in",
            ))
        })
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

/// `~` and `~/...` resolve against `$HOME`; anything else is taken as is
pub fn expand_path(path: &str) -> PathBuf {
    let Some(home) = home_dir() else {
        return PathBuf::from(path);
    };
    match path.strip_prefix('~') {
        Some("") => home,
        Some(rest) if rest.starts_with('/') => home.join(&rest[1..]),
        _ => PathBuf::from(path),
    }
}

/// Load config.toml from an existing config directory
pub fn load_config(config_dir: &Path) -> Result<Config> {
    if !config_dir.exists() {
        return Err(PodashError::ConfigNotFound(config_dir.to_path_buf()));
    }
    let path = config_dir.join("config.toml");
    if !path.exists() {
        return Err(PodashError::ConfigFileNotFound(path));
    }
    let content = fs::read_to_string(&path)?;
    parse_config(&content).map_err(|e| PodashError::ConfigParse { path, source: e })
}

pub fn parse_config(content: &str) -> std::result::Result<Config, toml::de::Error> {
    toml::from_str(content)
}

/// Create the config directory and write the template
pub fn init_config(config_dir: &Path) -> Result<PathBuf> {
    if config_dir.exists() {
        return Err(PodashError::AlreadyInitialized(config_dir.to_path_buf()));
    }
    fs::create_dir_all(config_dir)?;
    let path = config_dir.join("config.toml");
    fs::write(&path, CONFIG_TEMPLATE)?;
    Ok(path)
}

/// Template content for config.toml
pub const CONFIG_TEMPLATE: &str = r#"[api]
# base_url = "https://erp.example.com/api"
timeout_secs = 10
retries = 2                      # extra attempts for listing/history fetches
concurrency = 16                 # parallel inward status lookups
purchase_orders_path = "/purchase-orders"
inward_status_path = "/purchase-orders/{po_number}/inward-status"
history_path = "/requisitions/history"
# token = "..."                  # optional bearer token

[dashboard]
timeframe = "all"                # all, 3months, 6months, 1year
top_vendors = 10
# top_projects = 10              # optional, default shows every project
trend_months = 12
currency_symbol = "$"

[history]
page_size = 10

[export]
exclude = ["id", "line_items", "created_at", "updated_at"]
"#;
