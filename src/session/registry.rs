use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Arc, LazyLock};

use parking_lot::RwLock;

use super::Provider;

static PROVIDERS: LazyLock<ProviderRegistry> = LazyLock::new(ProviderRegistry::default);

/// Registers `provider` under `name` in the process-wide registry.
///
/// Meant to be called while the process starts, before any [`super::SessionManager`] asks for the
/// name. A second registration under the same name is logged and ignored so that startup ordering
/// mistakes do not take the process down. Returns whether the provider was stored.
pub fn register(name: &str, provider: Arc<dyn Provider>) -> bool {
    PROVIDERS.register(name, provider)
}

pub fn lookup(name: &str) -> Option<Arc<dyn Provider>> {
    PROVIDERS.get(name)
}

/// Name → provider map. Entries are never replaced or removed.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: RwLock<HashMap<String, Arc<dyn Provider>>>,
}

impl ProviderRegistry {
    pub fn register(&self, name: &str, provider: Arc<dyn Provider>) -> bool {
        match self.providers.write().entry(name.to_string()) {
            Entry::Occupied(_) => {
                tracing::warn!(provider = name, "session provider registered twice, ignoring");
                false
            }
            Entry::Vacant(slot) => {
                slot.insert(provider);
                tracing::info!(provider = name, "registered session provider");
                true
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.providers.read().get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::providers::memory::MemoryProvider;

    #[test]
    fn duplicate_registration_keeps_the_first_provider() {
        let registry = ProviderRegistry::default();
        let first: Arc<dyn Provider> = Arc::new(MemoryProvider::new());
        first.init("marker");

        assert!(registry.register("memory", Arc::clone(&first)));
        assert!(!registry.register("memory", Arc::new(MemoryProvider::new())));

        let stored = registry.get("memory").unwrap();
        assert!(stored.read("marker").is_some());
    }

    #[test]
    fn unknown_names_are_absent() {
        let registry = ProviderRegistry::default();
        assert!(registry.get("redis").is_none());
    }

    #[test]
    fn global_registry_round_trip() {
        let name = "registry-test-provider";
        assert!(register(name, Arc::new(MemoryProvider::new())));
        assert!(!register(name, Arc::new(MemoryProvider::new())));
        assert!(lookup(name).is_some());
    }
}
