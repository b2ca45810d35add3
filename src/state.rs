use std::sync::Arc;

use crate::{config::AppConfig, engine::Stores};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub stores: Stores,
}

impl AppState {
    pub fn new(config: AppConfig, stores: Stores) -> Self {
        Self {
            config: Arc::new(config),
            stores,
        }
    }
}
