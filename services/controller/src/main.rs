//! corral controller
//!
//! Runs the periodic workers that refresh charm revisions and the latest
//! tools version. Either worker failing takes the process down so the
//! service manager can restart it.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use corral_controller::workers::{charm_revision, tools_version};
use corral_controller::{Config, FacadeClient};
use corral_reconcile::{Clock, SystemClock};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str())),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!(
        api_url = %config.api_url,
        charm_revision_interval_secs = config.charm_revision_interval.as_secs(),
        tools_check_interval_secs = config.tools_check_interval.as_secs(),
        "Starting corral controller"
    );

    let facade = Arc::new(
        FacadeClient::new(&config.api_url, REQUEST_TIMEOUT)
            .context("Failed to create facade client")?,
    );
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let charm_revisions = charm_revision::new_worker(charm_revision::CharmRevisionConfig {
        facade: facade.clone(),
        clock: Arc::clone(&clock),
        period: config.charm_revision_interval,
    })?;
    let tools_version = tools_version::new_worker(
        facade,
        tools_version::VersionCheckerParams {
            check_interval: config.tools_check_interval,
        },
        clock,
    )?;

    let failed = tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
            false
        }
        result = charm_revisions.wait() => report_exit(charm_revisions.name(), result),
        result = tools_version.wait() => report_exit(tools_version.name(), result),
    };

    // A fault that ended the select has already been reported.
    for worker in [&charm_revisions, &tools_version] {
        let _ = worker.shutdown().await;
    }

    info!("Controller shutdown complete");
    if failed {
        anyhow::bail!("a controller worker failed");
    }
    Ok(())
}

/// Log how a worker ended and return true if it failed.
fn report_exit(name: &str, result: Result<(), corral_reconcile::WorkerError>) -> bool {
    match result {
        Ok(()) => {
            info!(worker = name, "Worker exited normally");
            false
        }
        Err(e) => {
            error!(worker = name, error = %e, "Worker failed");
            true
        }
    }
}
