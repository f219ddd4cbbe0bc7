use crate::client::VpsApi;
use crate::error::DiscoveryError;
use crate::ownership::OwnershipIndex;
use std::collections::HashSet;
use std::sync::Arc;
use vpsmon_common::types::Account;

/// Queries every account for its VM inventory, records ownership for each
/// discovered id, and returns the deduplicated union in discovery order.
///
/// One account failing is logged and skipped; the remaining accounts still
/// contribute. Runs at process start and at the top of every scheduled
/// check, so a VM created after startup is picked up without a restart.
pub async fn discover(
    api: &dyn VpsApi,
    index: &OwnershipIndex,
    accounts: &[Account],
) -> Vec<u64> {
    index.set_fallback(accounts.first().cloned());

    tracing::info!(accounts = accounts.len(), "Checking accounts for VM inventory");

    let mut seen = HashSet::new();
    let mut discovered = Vec::new();

    for account in accounts {
        match api.list_virtual_machines(&account.token).await {
            Ok(ids) => {
                tracing::info!(
                    account = %account.name,
                    count = ids.len(),
                    "Account inventory listed"
                );
                let owner = Arc::new(account.clone());
                for id in ids {
                    index.record(id, owner.clone());
                    if seen.insert(id) {
                        discovered.push(id);
                    }
                }
            }
            Err(source) => {
                let error = DiscoveryError {
                    account: account.name.clone(),
                    source,
                };
                tracing::warn!(error = %error, "Skipping account after inventory failure");
            }
        }
    }

    discovered
}
