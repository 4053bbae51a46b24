//! Application state shared across handlers

use std::sync::Arc;

use axum::extract::FromRef;

use crate::registry::RegistryClient;
use crate::services::dashboard::DashboardService;

/// Shared application state. The registry client is constructed once at the
/// application root and injected into every consumer.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<RegistryClient>,
    pub dashboard: Arc<DashboardService>,
}

impl AppState {
    pub fn new(registry: Arc<RegistryClient>, dashboard: Arc<DashboardService>) -> Self {
        Self {
            registry,
            dashboard,
        }
    }
}

impl FromRef<AppState> for Arc<RegistryClient> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.registry.clone()
    }
}

impl FromRef<AppState> for Arc<DashboardService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.dashboard.clone()
    }
}
