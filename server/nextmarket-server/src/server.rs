use std::sync::Arc;
use std::time::Instant;

use plugins_registry_api::PluginService;

use crate::config::ServerSettings;

/// Shared handler state
#[derive(Clone)]
pub struct MarketServer {
    pub service: Arc<PluginService>,
    pub settings: Arc<ServerSettings>,
    started_at: Instant,
}

impl MarketServer {
    pub fn new(service: PluginService, settings: ServerSettings) -> Self {
        Self {
            service: Arc::new(service),
            settings: Arc::new(settings),
            started_at: Instant::now(),
        }
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
