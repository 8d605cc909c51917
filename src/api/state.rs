use std::sync::Arc;

use crate::config::Config;
use crate::handlers::GhostscriptLocator;
use crate::observability::Metrics;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub locator: Arc<GhostscriptLocator>,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let locator = GhostscriptLocator::from_config(&config.compression);
        Self {
            config: Arc::new(config),
            locator: Arc::new(locator),
            metrics: Arc::new(Metrics::new()),
        }
    }
}
