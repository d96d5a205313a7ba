//! Readiness probe over the index and the configured providers.

use serde::Serialize;
use tracing::warn;

use crate::Coordinator;

#[derive(Debug, Clone, Serialize)]
pub struct ProviderHealth {
    pub id: String,
    pub reachable: bool,
}

/// Pipeline readiness: a loaded index plus at least one reachable
/// provider.
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub index_loaded: bool,
    pub rules: usize,
    pub providers: Vec<ProviderHealth>,
    pub healthy: bool,
}

impl Coordinator {
    pub async fn health(&self) -> HealthStatus {
        let index_loaded = !self.index.is_empty();
        let mut providers = Vec::with_capacity(self.providers.len());
        for provider in &self.providers {
            let reachable = provider.reachable().await;
            if !reachable {
                warn!(provider = provider.id(), "provider unreachable");
            }
            providers.push(ProviderHealth {
                id: provider.id().to_string(),
                reachable,
            });
        }
        let healthy = index_loaded && providers.iter().any(|p| p.reachable);
        HealthStatus {
            index_loaded,
            rules: self.index.len(),
            providers,
            healthy,
        }
    }
}
