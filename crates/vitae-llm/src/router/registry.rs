//! Provider registry keyed by [`ProviderId`]

use super::provider::LlmProvider;
use super::rules::RoutingTable;
use super::types::ProviderId;
use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Adapters the router may dispatch to
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: BTreeMap<ProviderId, Arc<dyn LlmProvider>>,
}

impl ProviderRegistry {
    /// Register an adapter under its own id, replacing any previous one
    pub fn register(&mut self, provider: Arc<dyn LlmProvider>) {
        let id = provider.id();
        debug!(provider = %id, available = provider.is_available(), "Registering provider");
        self.providers.insert(id, provider);
    }

    /// Adapter for an id
    #[must_use]
    pub fn get(&self, id: ProviderId) -> Option<&Arc<dyn LlmProvider>> {
        self.providers.get(&id)
    }

    /// Availability of every registered adapter
    #[must_use]
    pub fn availability(&self) -> BTreeMap<ProviderId, bool> {
        self.providers
            .iter()
            .map(|(id, provider)| (*id, provider.is_available()))
            .collect()
    }

    /// Fail unless every provider the table names is registered
    pub fn validate(&self, table: &RoutingTable) -> Result<()> {
        table.validate()?;

        let missing: Vec<&str> = table
            .providers()
            .into_iter()
            .filter(|id| !self.providers.contains_key(id))
            .map(|id| id.as_str())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::Config(format!(
                "routing table references unregistered providers: {}",
                missing.join(", ")
            )))
        }
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.providers.keys()).finish()
    }
}
