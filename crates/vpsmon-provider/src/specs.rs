use crate::client::VpsApi;
use crate::discovery::discover;
use crate::error::{ProviderError, SpecFetchError};
use crate::ownership::OwnershipIndex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};
use vpsmon_common::types::{Account, VmSpecs};

/// Fetch-once, cache-forever store for static VM specifications.
///
/// Entries are never refreshed or evicted: a capacity change on the provider
/// side is not visible until restart. That contract is isolated behind this
/// type so an eviction policy can be added later without touching call
/// sites. Failed fetches are not cached; the next request retries.
#[derive(Default)]
pub struct SpecCache {
    slots: Mutex<HashMap<u64, Arc<OnceCell<Arc<VmSpecs>>>>>,
}

impl SpecCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached specs for one VM, fetching on first request. Concurrent
    /// callers for the same uncached id share a single provider fetch.
    pub async fn get_specs(
        &self,
        api: &dyn VpsApi,
        index: &OwnershipIndex,
        vm_id: u64,
    ) -> Result<Arc<VmSpecs>, SpecFetchError> {
        let slot = {
            let mut slots = self.slots.lock().await;
            slots
                .entry(vm_id)
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };

        let specs = slot
            .get_or_try_init(|| async {
                let specs = fetch_specs(api, index, vm_id).await?;
                tracing::info!(
                    vm_id,
                    hostname = %specs.hostname,
                    ram_mb = specs.ram_mb,
                    disk_gb = specs.disk_gb,
                    "Cached VM specs"
                );
                Ok::<_, SpecFetchError>(Arc::new(specs))
            })
            .await?;

        Ok(specs.clone())
    }

    /// Fresh discovery followed by a spec lookup for every VM. A VM whose
    /// fetch fails contributes a stub instead of aborting the whole list.
    pub async fn get_all_specs(
        &self,
        api: &dyn VpsApi,
        index: &OwnershipIndex,
        accounts: &[Account],
    ) -> Vec<Arc<VmSpecs>> {
        let vm_ids = discover(api, index, accounts).await;
        let mut all = Vec::with_capacity(vm_ids.len());

        for vm_id in vm_ids {
            match self.get_specs(api, index, vm_id).await {
                Ok(specs) => all.push(specs),
                Err(error) => {
                    tracing::warn!(vm_id, error = %error, "Substituting stub specs after fetch failure");
                    all.push(Arc::new(VmSpecs::stub(vm_id)));
                }
            }
        }

        all
    }
}

async fn fetch_specs(
    api: &dyn VpsApi,
    index: &OwnershipIndex,
    vm_id: u64,
) -> Result<VmSpecs, SpecFetchError> {
    let token = index.token_for(vm_id).ok_or(SpecFetchError {
        vm_id,
        source: ProviderError::MissingToken,
    })?;

    let detail = api
        .get_virtual_machine(&token, vm_id)
        .await
        .map_err(|source| SpecFetchError { vm_id, source })?;

    let account_name = index
        .owner_of(vm_id)
        .map(|account| account.name.clone())
        .unwrap_or_else(|| "Default".to_string());

    Ok(VmSpecs {
        id: vm_id,
        account_name,
        ram_mb: detail.memory,
        // The provider reports disk in MB.
        disk_gb: (detail.disk as f64 / 1024.0).round() as u64,
        cpu_cores: detail.cpus,
        hostname: unknown_if_empty(detail.hostname),
        state: unknown_if_empty(detail.state),
        plan: unknown_if_empty(detail.plan),
        bandwidth: detail.bandwidth,
    })
}

fn unknown_if_empty(value: String) -> String {
    if value.is_empty() {
        "Unknown".to_string()
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::VmDetail;
    use crate::error::Result;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use vpsmon_common::types::RawMetrics;

    struct MockApi {
        detail_calls: AtomicUsize,
        fail_detail: bool,
    }

    impl MockApi {
        fn new(fail_detail: bool) -> Self {
            Self {
                detail_calls: AtomicUsize::new(0),
                fail_detail,
            }
        }
    }

    #[async_trait]
    impl VpsApi for MockApi {
        async fn list_virtual_machines(&self, _token: &str) -> Result<Vec<u64>> {
            Ok(vec![100])
        }

        async fn get_virtual_machine(&self, _token: &str, vm_id: u64) -> Result<VmDetail> {
            self.detail_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_detail {
                return Err(crate::error::ProviderError::Http {
                    status: 500,
                    body: "boom".to_string(),
                });
            }
            Ok(VmDetail {
                memory: 2048,
                disk: 51200, // MB, maps to 50 GB
                cpus: 2,
                hostname: format!("vm-{vm_id}"),
                state: "running".to_string(),
                plan: "KVM 2".to_string(),
                bandwidth: 1000,
            })
        }

        async fn get_metrics(
            &self,
            _token: &str,
            _vm_id: u64,
            _date_from: &str,
            _date_to: &str,
        ) -> Result<RawMetrics> {
            unimplemented!("not used by spec tests")
        }
    }

    fn owned_index() -> OwnershipIndex {
        let index = OwnershipIndex::new();
        index.record(
            100,
            std::sync::Arc::new(Account {
                name: "A".to_string(),
                token: "tok1".to_string(),
            }),
        );
        index
    }

    #[tokio::test]
    async fn maps_provider_units_into_canonical_specs() {
        let api = MockApi::new(false);
        let index = owned_index();
        let cache = SpecCache::new();

        let specs = cache.get_specs(&api, &index, 100).await.unwrap();
        assert_eq!(specs.ram_mb, 2048);
        assert_eq!(specs.disk_gb, 50);
        assert_eq!(specs.account_name, "A");
        assert_eq!(specs.hostname, "vm-100");
    }

    #[tokio::test]
    async fn second_lookup_is_served_from_cache() {
        let api = MockApi::new(false);
        let index = owned_index();
        let cache = SpecCache::new();

        cache.get_specs(&api, &index, 100).await.unwrap();
        cache.get_specs(&api, &index, 100).await.unwrap();
        assert_eq!(api.detail_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn concurrent_lookups_share_one_fetch() {
        let api = MockApi::new(false);
        let index = owned_index();
        let cache = SpecCache::new();

        let (a, b) = tokio::join!(
            cache.get_specs(&api, &index, 100),
            cache.get_specs(&api, &index, 100),
        );
        assert!(a.is_ok() && b.is_ok());
        assert_eq!(api.detail_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_fetch_is_not_cached() {
        let api = MockApi::new(true);
        let index = owned_index();
        let cache = SpecCache::new();

        assert!(cache.get_specs(&api, &index, 100).await.is_err());
        assert!(cache.get_specs(&api, &index, 100).await.is_err());
        // Both attempts hit the provider: errors never populate the cache.
        assert_eq!(api.detail_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn aggregate_listing_substitutes_stub_on_failure() {
        let api = MockApi::new(true);
        let index = OwnershipIndex::new();
        let cache = SpecCache::new();

        let accounts = vec![Account {
            name: "A".to_string(),
            token: "tok1".to_string(),
        }];
        let all = cache.get_all_specs(&api, &index, &accounts).await;

        assert_eq!(all.len(), 1);
        assert_eq!(all[0].hostname, "VPS 100");
        assert_eq!(all[0].plan, "Unknown");
    }
}
