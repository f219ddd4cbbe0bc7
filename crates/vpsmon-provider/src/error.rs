/// Transport-level errors raised while talking to the provider API.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Non-2xx status from the provider; `body` carries the error payload.
    #[error("provider API HTTP error: status={status}, body={body}")]
    Http { status: u16, body: String },

    /// Underlying HTTP transport failure from `reqwest`, including timeouts.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON deserialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A 2xx response whose payload does not match any accepted shape.
    #[error("unexpected response shape: {0}")]
    Shape(String),

    /// No account token is available for the request (empty registry and no
    /// recorded ownership).
    #[error("no API token available")]
    MissingToken,
}

/// Inventory listing failed for one account. Discovery logs it and continues
/// with the remaining accounts.
#[derive(Debug, thiserror::Error)]
#[error("discovery failed for account [{account}]: {source}")]
pub struct DiscoveryError {
    pub account: String,
    #[source]
    pub source: ProviderError,
}

/// Spec lookup failed for one VM. Fatal for a single-VM request; aggregate
/// listings substitute a stub instead.
#[derive(Debug, thiserror::Error)]
#[error("spec fetch failed for VM {vm_id}: {source}")]
pub struct SpecFetchError {
    pub vm_id: u64,
    #[source]
    pub source: ProviderError,
}

/// Metrics retrieval failed for one VM. Fatal for that VM's check this run;
/// the scheduled caller continues with other VMs.
#[derive(Debug, thiserror::Error)]
#[error("metrics fetch failed for VM {vm_id}: {source}")]
pub struct MetricsFetchError {
    pub vm_id: u64,
    #[source]
    pub source: ProviderError,
}

pub type Result<T> = std::result::Result<T, ProviderError>;
