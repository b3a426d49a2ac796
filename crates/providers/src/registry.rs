//! Resolves the configured `providers.enabled[]` name list to live
//! `ProviderClient` trait objects, in the order they should fan out.

use std::sync::Arc;

use lexiscribe_core::ProviderClient;

use crate::apple::AppleDictionaryClient;
use crate::wiktionary::WiktionaryClient;

pub struct ProviderRegistry {
    clients: Vec<(String, Arc<dyn ProviderClient>)>,
}

impl ProviderRegistry {
    pub fn new(enabled: &[String], wiktionary_rps: f64) -> lexiscribe_core::Result<Self> {
        let mut clients: Vec<(String, Arc<dyn ProviderClient>)> = Vec::new();
        for name in enabled {
            match name.as_str() {
                "wiktionary" => {
                    clients.push(("wiktionary".to_string(), Arc::new(WiktionaryClient::new(wiktionary_rps)?)));
                }
                "apple" => {
                    clients.push(("apple".to_string(), Arc::new(AppleDictionaryClient::new())));
                }
                other => {
                    tracing::warn!(provider = other, "unknown provider name in configuration, skipping");
                }
            }
        }
        Ok(Self { clients })
    }

    /// Providers in configured order, filtered to those available in this
    /// deployment, so unavailability there is a capability flag, not an error.
    pub fn active_providers(&self) -> Vec<Arc<dyn ProviderClient>> {
        self.clients
            .iter()
            .map(|(_, client)| client.clone())
            .filter(|client| client.is_available())
            .collect()
    }
}
