use std::sync::Arc;

use crate::services::DiscoveryCoordinator;

/// Shared application state
///
/// All request handling goes through the coordinator; handlers hold no
/// state of their own.
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<DiscoveryCoordinator>,
}

impl AppState {
    /// Creates application state around a constructed coordinator
    pub fn new(coordinator: Arc<DiscoveryCoordinator>) -> Self {
        Self { coordinator }
    }
}
