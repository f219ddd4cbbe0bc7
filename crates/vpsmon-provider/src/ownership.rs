use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use vpsmon_common::types::Account;

#[derive(Default)]
struct Inner {
    by_id: HashMap<u64, Arc<Account>>,
    by_key: HashMap<String, Arc<Account>>,
    fallback: Option<Arc<Account>>,
}

/// Maps each discovered VM to the account that owns it.
///
/// Populated by discovery (which records every id under both its numeric and
/// string form, so typed and string-keyed call sites both resolve), read by
/// the metrics fetcher and the spec cache. Shared between the scheduled
/// engine and dashboard-originated lookups; last discovery wins on conflict.
#[derive(Default)]
pub struct OwnershipIndex {
    inner: RwLock<Inner>,
}

impl OwnershipIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// First account of the current registry parse; used when a VM has no
    /// recorded owner.
    pub fn set_fallback(&self, account: Option<Account>) {
        let mut inner = self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        inner.fallback = account.map(Arc::new);
    }

    pub fn record(&self, vm_id: u64, account: Arc<Account>) {
        let mut inner = self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        inner.by_id.insert(vm_id, account.clone());
        inner.by_key.insert(vm_id.to_string(), account);
    }

    pub fn owner_of(&self, vm_id: u64) -> Option<Arc<Account>> {
        let inner = self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        inner.by_id.get(&vm_id).cloned()
    }

    pub fn owner_of_key(&self, key: &str) -> Option<Arc<Account>> {
        let inner = self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        inner.by_key.get(key).cloned()
    }

    /// Token of the owning account, falling back to the first known account
    /// when the VM is unowned.
    pub fn token_for(&self, vm_id: u64) -> Option<String> {
        let inner = self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        inner
            .by_id
            .get(&vm_id)
            .or(inner.fallback.as_ref())
            .map(|account| account.token.clone())
    }

    pub fn token_for_key(&self, key: &str) -> Option<String> {
        let inner = self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        inner
            .by_key
            .get(key)
            .or(inner.fallback.as_ref())
            .map(|account| account.token.clone())
    }
}
