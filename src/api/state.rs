//! API shared state holding every live system

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::warn;

use crate::config::SimulationConfig;
use crate::system::System;

use super::error::{ApiError, ApiResult};

/// All systems created through the API, keyed by id
#[derive(Debug, Default, Clone)]
pub struct SystemStore {
    systems: Arc<RwLock<HashMap<String, Arc<System>>>>,
}

impl SystemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, system: Arc<System>) {
        let mut systems = self.systems.write().await;
        systems.insert(system.id().to_string(), system);
    }

    pub async fn get(&self, id: &str) -> Option<Arc<System>> {
        let systems = self.systems.read().await;
        systems.get(id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.systems.read().await.len()
    }

    /// Stop every system and wait for its actors to drain
    pub async fn shutdown_all(&self) {
        let systems: Vec<_> = self.systems.read().await.values().cloned().collect();

        for system in systems {
            if let Err(e) = system.stop().await {
                warn!("failed to stop system {}: {e}", system.id());
            }
        }
    }
}

/// Shared state passed to all API handlers
#[derive(Debug, Clone)]
pub struct ApiState {
    pub systems: SystemStore,

    /// Settings every new system is created with
    pub simulation: SimulationConfig,
}

impl ApiState {
    pub fn new(simulation: SimulationConfig) -> Self {
        Self {
            systems: SystemStore::new(),
            simulation,
        }
    }

    /// Look up a system or fail with `404`
    pub async fn system(&self, id: &str) -> ApiResult<Arc<System>> {
        self.systems
            .get(id)
            .await
            .ok_or_else(|| ApiError::NotFound(format!("system {id} not found")))
    }
}
