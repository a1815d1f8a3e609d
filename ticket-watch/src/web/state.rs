//! Application state for the web layer.

use std::sync::Arc;

use crate::poller::PollerRegistry;
use crate::purchase::PurchaseOrchestrator;
use crate::stations::StationDirectory;

/// Shared application state.
///
/// Contains all the services needed to handle requests.
#[derive(Clone)]
pub struct AppState {
    /// Station name lookup, shared with every poller
    pub directory: StationDirectory,

    /// One availability poller per user
    pub pollers: PollerRegistry,

    /// Watch task and automation run bookkeeping
    pub orchestrator: Arc<PurchaseOrchestrator>,
}

impl AppState {
    /// Create a new app state.
    pub fn new(
        directory: StationDirectory,
        pollers: PollerRegistry,
        orchestrator: PurchaseOrchestrator,
    ) -> Self {
        Self {
            directory,
            pollers,
            orchestrator: Arc::new(orchestrator),
        }
    }
}
