//! Application state.

use std::sync::Arc;

use vshort_worker::{DefaultCollaboratorFactory, JobController, WorkerConfig};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub controller: JobController,
}

impl AppState {
    pub fn new(config: ApiConfig, controller: JobController) -> Self {
        Self { config, controller }
    }

    /// Production state wired from the environment.
    pub fn from_env(config: ApiConfig) -> Self {
        let worker_config = Arc::new(WorkerConfig::from_env());
        let factory = DefaultCollaboratorFactory::new(Arc::clone(&worker_config));
        let controller = JobController::new(worker_config, Arc::new(factory));
        Self::new(config, controller)
    }
}
