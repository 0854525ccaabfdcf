use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use ureq::Agent;

use super::PoSource;
use crate::config::ApiSettings;
use crate::error::{PodashError, Result};
use crate::model::InwardStatus;

/// REST source backed by a blocking ureq agent with a global timeout
pub struct HttpSource {
    agent: Agent,
    base_url: String,
    settings: ApiSettings,
}

#[derive(Deserialize)]
struct InwardStatusResponse {
    status: String,
}

/// Some deployments wrap listings as `{ "data": [...] }`
#[derive(Deserialize)]
#[serde(untagged)]
enum Listing {
    Bare(Vec<Value>),
    Wrapped { data: Vec<Value> },
}

impl HttpSource {
    pub fn new(base_url: &str, settings: &ApiSettings) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(settings.timeout_secs)))
            .build()
            .into();

        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
            settings: settings.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn get(&self, url: &str, query: Option<(&str, &str)>) -> Result<String> {
        let mut request = self.agent.get(url);
        if let Some(token) = &self.settings.token {
            request = request.header("Authorization", format!("Bearer {token}"));
        }
        if let Some((key, value)) = query {
            request = request.query(key, value);
        }

        tracing::debug!(%url, "GET");
        request
            .call()
            .map_err(|e| PodashError::Http {
                url: url.to_string(),
                reason: e.to_string(),
            })?
            .body_mut()
            .read_to_string()
            .map_err(|e| PodashError::Http {
                url: url.to_string(),
                reason: e.to_string(),
            })
    }

    fn get_listing(
        &self,
        url: &str,
        what: &str,
        query: Option<(&str, &str)>,
    ) -> Result<Vec<Value>> {
        let body = self.get(url, query)?;
        let listing: Listing = serde_json::from_str(&body).map_err(|e| PodashError::Decode {
            what: what.to_string(),
            reason: e.to_string(),
        })?;
        Ok(match listing {
            Listing::Bare(rows) | Listing::Wrapped { data: rows } => rows,
        })
    }
}

impl PoSource for HttpSource {
    fn fetch_purchase_orders(&self) -> Result<Vec<Value>> {
        let url = self.url(&self.settings.purchase_orders_path);
        self.get_listing(&url, "purchase order listing", None)
    }

    fn fetch_inward_status(&self, po_number: &str) -> Result<InwardStatus> {
        let path = self
            .settings
            .inward_status_path
            .replace("{po_number}", &urlencoding::encode(po_number));
        let body = self.get(&self.url(&path), None)?;
        let response: InwardStatusResponse =
            serde_json::from_str(&body).map_err(|e| PodashError::Decode {
                what: format!("inward status of {po_number}"),
                reason: e.to_string(),
            })?;
        response.status.parse()
    }

    fn fetch_history(&self, batch_id: &str) -> Result<Vec<Value>> {
        let url = self.url(&self.settings.history_path);
        self.get_listing(&url, "revision history", Some(("batch_id", batch_id)))
    }
}
