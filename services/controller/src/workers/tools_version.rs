//! Worker that records the newest available agent tools version, so status
//! can tell operators an upgrade is possible.

use std::sync::Arc;
use std::time::Duration;

use corral_reconcile::{
    ActionError, Clock, ConfigError, PeriodicWorker, PeriodicWorkerConfig, WorkerHandle,
};
use thiserror::Error;

use crate::facade::{FacadeError, ToolsVersionFacade};

/// Parameters of the tools version checker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionCheckerParams {
    pub check_interval: Duration,
}

#[derive(Debug, Error)]
#[error("cannot update tools information: {0}")]
pub struct UpdateToolsError(#[source] pub FacadeError);

pub fn new_worker(
    facade: Arc<dyn ToolsVersionFacade>,
    params: VersionCheckerParams,
    clock: Arc<dyn Clock>,
) -> Result<WorkerHandle, ConfigError> {
    let action = move || {
        let facade = Arc::clone(&facade);
        async move {
            facade
                .update_tools_version()
                .await
                .map_err(|err| ActionError::from(UpdateToolsError(err)))
        }
    };

    PeriodicWorker::start(PeriodicWorkerConfig {
        name: "tools-version".to_string(),
        action,
        clock,
        period: params.check_interval,
    })
}
