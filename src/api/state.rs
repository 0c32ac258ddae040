//! Application state for shared services

use std::sync::Arc;

use crate::domain::{Clock, UsageEventRepository};
use crate::infrastructure::{ApiBindingService, Gateway, KeyService, StatsAggregator};

/// Services shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub keys: Arc<KeyService>,
    pub bindings: Arc<ApiBindingService>,
    pub gateway: Arc<Gateway>,
    pub stats: Arc<StatsAggregator>,
    pub usage: Arc<dyn UsageEventRepository>,
    pub clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("keys", &self.keys)
            .field("bindings", &self.bindings)
            .field("gateway", &self.gateway)
            .finish_non_exhaustive()
    }
}
