//! Worker that keeps the latest charm revisions up to date.

use std::sync::Arc;
use std::time::Duration;

use corral_reconcile::{
    ActionError, Clock, ConfigError, PeriodicWorker, PeriodicWorkerConfig, WorkerHandle,
};

use crate::facade::CharmRevisionFacade;

/// Dependencies of the charm revision worker.
pub struct CharmRevisionConfig {
    pub facade: Arc<dyn CharmRevisionFacade>,
    pub clock: Arc<dyn Clock>,
    pub period: Duration,
}

/// Start a worker that refreshes charm revisions immediately and then once
/// every `period`.
///
/// The first facade error stops the worker and is returned from
/// [`WorkerHandle::wait`] unchanged.
pub fn new_worker(config: CharmRevisionConfig) -> Result<WorkerHandle, ConfigError> {
    let CharmRevisionConfig {
        facade,
        clock,
        period,
    } = config;

    let action = move || {
        let facade = Arc::clone(&facade);
        async move {
            facade
                .update_latest_revisions()
                .await
                .map_err(ActionError::from)
        }
    };

    PeriodicWorker::start(PeriodicWorkerConfig {
        name: "charm-revision".to_string(),
        action,
        clock,
        period,
    })
}
