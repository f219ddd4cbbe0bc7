use crate::client::VpsApi;
use crate::error::{MetricsFetchError, ProviderError};
use crate::ownership::OwnershipIndex;
use vpsmon_common::types::RawMetrics;

/// Resolves the owning token and fetches the raw five-series payload for
/// `[date_from, date_to]`. Never retried: the next scheduled run is the
/// retry boundary.
pub async fn fetch_metrics(
    api: &dyn VpsApi,
    index: &OwnershipIndex,
    vm_id: u64,
    date_from: &str,
    date_to: &str,
) -> Result<RawMetrics, MetricsFetchError> {
    let token = index.token_for(vm_id).ok_or(MetricsFetchError {
        vm_id,
        source: ProviderError::MissingToken,
    })?;

    api.get_metrics(&token, vm_id, date_from, date_to)
        .await
        .map_err(|source| MetricsFetchError { vm_id, source })
}
