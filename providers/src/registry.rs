//! Provider registry — resolves a platform to its provider.
//!
//! Lookup is pure and synchronous. A platform with no registered provider
//! resolves to `None`, which the aggregator treats as a permanent skip.

use std::collections::HashMap;
use std::sync::Arc;

use common::models::Platform;

use crate::bilibili::BilibiliProvider;
use crate::douyu::DouyuProvider;
use crate::huya::HuyaProvider;
use crate::{StreamProvider, Transport};

#[derive(Default, Clone)]
pub struct ProviderRegistry {
    providers: HashMap<Platform, Arc<dyn StreamProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in platform, all sharing `transport`.
    pub fn with_default_providers(transport: Arc<dyn Transport>) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(BilibiliProvider::new(Arc::clone(&transport))));
        registry.register(Arc::new(DouyuProvider::new(Arc::clone(&transport))));
        registry.register(Arc::new(HuyaProvider::new(transport)));
        registry
    }

    /// Register a provider under the platform it reports, replacing any
    /// previous one.
    pub fn register(&mut self, provider: Arc<dyn StreamProvider>) {
        self.providers.insert(provider.platform(), provider);
    }

    pub fn resolve(&self, platform: &Platform) -> Option<Arc<dyn StreamProvider>> {
        self.providers.get(platform).cloned()
    }
}
