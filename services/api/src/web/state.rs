//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use crate::web::jobs::JobRegistry;
use results_portal_core::import::Importer;
use results_portal_core::ports::ResultStore;
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ResultStore>,
    pub config: Arc<Config>,
    pub importer: Importer,
    pub jobs: Arc<JobRegistry>,
}

impl AppState {
    pub fn new(store: Arc<dyn ResultStore>, config: Arc<Config>) -> Self {
        let importer = Importer::new(store.clone(), config.import);
        Self {
            store,
            config,
            importer,
            jobs: Arc::new(JobRegistry::new()),
        }
    }
}
