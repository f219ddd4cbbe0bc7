use crate::error::{ProviderError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use vpsmon_common::types::RawMetrics;

pub const DEFAULT_API_BASE_URL: &str = "https://developers.hostinger.com/api/vps/v1";

/// Static detail record for one VM, as the provider reports it. Memory and
/// disk are both in MB here; unit conversion happens in the spec cache.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VmDetail {
    #[serde(default)]
    pub memory: u64,
    #[serde(default)]
    pub disk: u64,
    #[serde(default)]
    pub cpus: u32,
    #[serde(default)]
    pub hostname: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub plan: String,
    #[serde(default)]
    pub bandwidth: u64,
}

/// The provider endpoints the engine consumes, behind a trait so tests can
/// substitute a mock without a network.
#[async_trait]
pub trait VpsApi: Send + Sync {
    /// Inventory of VM ids visible to one account token.
    async fn list_virtual_machines(&self, token: &str) -> Result<Vec<u64>>;

    /// Detail record for one VM.
    async fn get_virtual_machine(&self, token: &str, vm_id: u64) -> Result<VmDetail>;

    /// Raw five-series metrics for `[date_from, date_to]` (ISO-8601, second
    /// precision, UTC `Z` suffix).
    async fn get_metrics(
        &self,
        token: &str,
        vm_id: u64,
        date_from: &str,
        date_to: &str,
    ) -> Result<RawMetrics>;
}

/// Bearer-token HTTP client for the provider API with a bounded per-request
/// timeout, so a hanging provider call cannot stall a run indefinitely.
pub struct ProviderClient {
    http: Client,
    base_url: String,
}

impl ProviderClient {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self> {
        let http = Client::builder()
            .use_rustls_tls()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_json(&self, token: &str, path: &str, query: &[(&str, &str)]) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .get(&url)
            .bearer_auth(token)
            .query(query)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ProviderError::Http {
                status: status.as_u16(),
                body,
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl VpsApi for ProviderClient {
    async fn list_virtual_machines(&self, token: &str) -> Result<Vec<u64>> {
        let json = self.get_json(token, "/virtual-machines", &[]).await?;

        // The list endpoint answers either wrapped `{data: [...]}` or a bare
        // array depending on the API revision; both must be accepted.
        let items = if let Some(data) = json.get("data").and_then(|v| v.as_array()) {
            data
        } else if let Some(array) = json.as_array() {
            array
        } else {
            return Err(ProviderError::Shape(
                "expected a VM array or {data: [...]}".to_string(),
            ));
        };

        Ok(items
            .iter()
            .filter_map(|vm| vm.get("id").and_then(|id| id.as_u64()))
            .collect())
    }

    async fn get_virtual_machine(&self, token: &str, vm_id: u64) -> Result<VmDetail> {
        let json = self
            .get_json(token, &format!("/virtual-machines/{vm_id}"), &[])
            .await?;
        Ok(serde_json::from_value(json)?)
    }

    async fn get_metrics(
        &self,
        token: &str,
        vm_id: u64,
        date_from: &str,
        date_to: &str,
    ) -> Result<RawMetrics> {
        let json = self
            .get_json(
                token,
                &format!("/virtual-machines/{vm_id}/metrics"),
                &[("date_from", date_from), ("date_to", date_to)],
            )
            .await?;
        Ok(serde_json::from_value(json)?)
    }
}
