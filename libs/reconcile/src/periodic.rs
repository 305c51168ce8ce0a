//! Periodic worker supervision.
//!
//! A periodic worker owns one tokio task that alternates between running its
//! action and waiting for the next tick:
//!
//! ```text
//! Starting ──▶ Running ──┬──▶ Stopped   (stop() / handle dropped)
//!                        └──▶ Faulted   (action returned an error)
//! ```
//!
//! The action runs once immediately, then once per period as measured by the
//! worker's [`Clock`]. The wait between runs is a single `select!` over the
//! clock alarm and the shutdown signal, so stopping never has to wait out a
//! pending period.

use std::error::Error as StdError;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use crate::clock::Clock;

/// Error type returned by worker actions.
pub type ActionError = Box<dyn StdError + Send + Sync>;

/// The unit of work a periodic worker repeats.
///
/// Implemented for any `FnMut() -> impl Future<Output = Result<(), ActionError>>`.
#[async_trait]
pub trait Action: Send + 'static {
    async fn call(&mut self) -> Result<(), ActionError>;
}

#[async_trait]
impl<F, Fut> Action for F
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), ActionError>> + Send,
{
    async fn call(&mut self) -> Result<(), ActionError> {
        (self)().await
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Terminal error of a worker.
#[derive(Debug, Clone, Error)]
pub enum WorkerError {
    /// The action failed; the worker stopped scheduling further runs.
    #[error(transparent)]
    Action(Arc<dyn StdError + Send + Sync>),

    /// The worker task ended without reporting a final state.
    #[error("worker {0} exited unexpectedly")]
    Lost(String),
}

impl WorkerError {
    /// Returns the action error if this fault came from the action.
    pub fn action_error(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        match self {
            Self::Action(err) => Some(err.as_ref()),
            Self::Lost(_) => None,
        }
    }
}

/// Invalid worker configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("period must be positive, got {0:?}")]
    InvalidPeriod(Duration),

    #[error("worker name must not be empty")]
    MissingName,
}

// =============================================================================
// Configuration and State
// =============================================================================

/// Configuration for a periodic worker.
pub struct PeriodicWorkerConfig<A> {
    /// Name used in logs.
    pub name: String,

    /// Action run on every tick.
    pub action: A,

    /// Clock used to measure the period.
    pub clock: Arc<dyn Clock>,

    /// Time between the end of one run and the start of the next.
    pub period: Duration,
}

impl<A> PeriodicWorkerConfig<A> {
    /// Check the configuration before starting a worker.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError::MissingName);
        }
        if self.period.is_zero() {
            return Err(ConfigError::InvalidPeriod(self.period));
        }
        Ok(())
    }
}

/// Worker lifecycle states.
#[derive(Debug, Clone)]
pub enum WorkerState {
    /// Task spawned, first run not yet started.
    Starting,
    /// Running the action or waiting for the next tick.
    Running,
    /// Stopped on request.
    Stopped,
    /// Stopped because the action failed.
    Faulted(WorkerError),
}

impl WorkerState {
    /// Returns true once the worker will never run its action again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped | Self::Faulted(_))
    }
}

// =============================================================================
// Worker
// =============================================================================

/// Entry point for starting periodic workers.
pub struct PeriodicWorker;

impl PeriodicWorker {
    /// Validate `config` and spawn the worker task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<A: Action>(config: PeriodicWorkerConfig<A>) -> Result<WorkerHandle, ConfigError> {
        config.validate()?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (state_tx, state_rx) = watch::channel(WorkerState::Starting);
        let name = config.name.clone();

        tokio::spawn(run_periodic_loop(config, shutdown_rx, state_tx));

        Ok(WorkerHandle {
            name,
            shutdown_tx,
            state_rx,
        })
    }
}

#[instrument(name = "periodic_worker", skip_all, fields(worker = %config.name))]
async fn run_periodic_loop<A: Action>(
    mut config: PeriodicWorkerConfig<A>,
    mut shutdown: watch::Receiver<bool>,
    state: watch::Sender<WorkerState>,
) {
    info!(period_secs = config.period.as_secs(), "Starting periodic worker");
    state.send_replace(WorkerState::Running);

    loop {
        if *shutdown.borrow() {
            break;
        }

        let started_at = config.clock.now();
        let result = tokio::select! {
            result = config.action.call() => result,
            _ = shutdown.changed() => break,
        };

        if let Err(err) = result {
            warn!(error = %err, "Periodic worker action failed");
            state.send_replace(WorkerState::Faulted(WorkerError::Action(Arc::from(err))));
            return;
        }
        debug!(started_at = %started_at, "Periodic worker action complete");

        let mut tick = config.clock.after(config.period);
        let stopped = tokio::select! {
            _ = &mut tick => false,
            _ = shutdown.changed() => true,
        };
        drop(tick);
        if stopped {
            break;
        }
    }

    info!("Periodic worker stopped");
    state.send_replace(WorkerState::Stopped);
}

/// Handle controlling a running periodic worker.
///
/// Dropping the handle stops the worker.
pub struct WorkerHandle {
    name: String,
    shutdown_tx: watch::Sender<bool>,
    state_rx: watch::Receiver<WorkerState>,
}

impl WorkerHandle {
    /// Worker name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current lifecycle state.
    pub fn state(&self) -> WorkerState {
        self.state_rx.borrow().clone()
    }

    /// Ask the worker to stop. Safe to call any number of times.
    pub fn stop(&self) {
        self.shutdown_tx.send_replace(true);
    }

    /// Wait for the worker to finish and return its outcome.
    ///
    /// Returns `Ok(())` for a stopped worker and the latched error for a
    /// faulted one. Can be called repeatedly.
    pub async fn wait(&self) -> Result<(), WorkerError> {
        let mut state_rx = self.state_rx.clone();
        let outcome = match state_rx.wait_for(WorkerState::is_terminal).await {
            Ok(state) => (*state).clone(),
            Err(_) => return Err(WorkerError::Lost(self.name.clone())),
        };

        match outcome {
            WorkerState::Faulted(err) => Err(err),
            _ => Ok(()),
        }
    }

    /// Stop the worker and wait for it to finish.
    pub async fn shutdown(&self) -> Result<(), WorkerError> {
        self.stop();
        self.wait().await
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for WorkerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerHandle")
            .field("name", &self.name)
            .field("state", &*self.state_rx.borrow())
            .finish()
    }
}
