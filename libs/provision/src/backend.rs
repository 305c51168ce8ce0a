//! Collaborators the provisioner drives.
//!
//! - [`ProvisioningBackend`]: the controller API that records machines and
//!   asks the infrastructure provider to allocate them.
//! - [`ManualProvisioner`]: adopts an existing host over SSH.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::Mutex;

use crate::params::{AddMachineParams, AddMachineResult, ProvisioningScriptParams, ResultError, UpdateBehavior};

/// Errors returned by a provisioning backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// The backend speaks an older protocol without this call.
    #[error("not implemented: {0}")]
    NotImplemented(String),

    /// The backend rejected the call.
    #[error("{message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    /// The backend could not be reached or returned an unreadable response.
    #[error("transport error: {0}")]
    Transport(String),
}

impl BackendError {
    /// Returns true if the backend does not support the call.
    pub fn is_not_implemented(&self) -> bool {
        matches!(self, Self::NotImplemented(_))
    }
}

/// The machine provisioning API.
#[async_trait]
pub trait ProvisioningBackend: Send + Sync {
    /// Add a batch of machines, with placement support.
    ///
    /// Returns one result per request, in request order. Backends without
    /// placement support return [`BackendError::NotImplemented`].
    async fn add_machines(
        &self,
        params: &[AddMachineParams],
    ) -> Result<Vec<AddMachineResult>, BackendError>;

    /// Add machines through the legacy call that understands
    /// `container_type`/`parent_id` but not placement.
    async fn add_machines_legacy(
        &self,
        params: &[AddMachineParams],
    ) -> Result<Vec<AddMachineResult>, BackendError>;

    /// UUID of the environment the backend manages.
    async fn environment_uuid(&self) -> Result<String, BackendError>;

    /// Script that installs and starts a machine agent on a manual host.
    async fn provisioning_script(
        &self,
        params: &ProvisioningScriptParams,
    ) -> Result<String, BackendError>;

    /// Remove machines without waiting for their agents.
    async fn force_destroy_machines(&self, machines: &[String]) -> Result<(), BackendError>;
}

/// Shared handle to a boxed reader.
pub type SharedReader = Arc<Mutex<Box<dyn AsyncRead + Send + Unpin>>>;

/// Shared handle to a boxed writer.
pub type SharedWriter = Arc<Mutex<Box<dyn AsyncWrite + Send + Unpin>>>;

/// The operator's terminal, as seen by a manual provisioner.
///
/// Clones share the underlying streams.
#[derive(Clone)]
pub struct TransportStreams {
    pub input: SharedReader,
    pub output: SharedWriter,
    pub error: SharedWriter,
}

impl TransportStreams {
    pub fn new(
        input: impl AsyncRead + Send + Unpin + 'static,
        output: impl AsyncWrite + Send + Unpin + 'static,
        error: impl AsyncWrite + Send + Unpin + 'static,
    ) -> Self {
        Self {
            input: Arc::new(Mutex::new(Box::new(input))),
            output: Arc::new(Mutex::new(Box::new(output))),
            error: Arc::new(Mutex::new(Box::new(error))),
        }
    }

    /// The process's own stdin, stdout and stderr.
    pub fn stdio() -> Self {
        Self::new(tokio::io::stdin(), tokio::io::stdout(), tokio::io::stderr())
    }

    /// Empty input; output is discarded.
    pub fn null() -> Self {
        Self::new(tokio::io::empty(), tokio::io::sink(), tokio::io::sink())
    }
}

impl Default for TransportStreams {
    fn default() -> Self {
        Self::null()
    }
}

impl fmt::Debug for TransportStreams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportStreams").finish_non_exhaustive()
    }
}

/// Arguments for adopting an existing host.
#[derive(Debug, Clone)]
pub struct ManualProvisionArgs {
    /// `[user@]host`.
    pub host: String,

    pub streams: TransportStreams,

    pub update_behavior: UpdateBehavior,
}

/// Errors from manual provisioning.
#[derive(Debug, Error)]
pub enum ManualError {
    #[error("invalid host {0:?}: expected [user@]host")]
    InvalidHost(String),

    #[error("machine is already provisioned")]
    AlreadyProvisioned,

    #[error("failed to run ssh: {0}")]
    Ssh(#[from] std::io::Error),

    #[error("remote command {command:?} failed with {status}: {stderr}")]
    Remote {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("cannot detect host characteristics: {0}")]
    Detection(String),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("cannot register machine: {0}")]
    Registration(ResultError),
}

/// Adopts an existing host and returns its new machine ID.
#[async_trait]
pub trait ManualProvisioner: Send + Sync {
    async fn provision(
        &self,
        backend: &dyn ProvisioningBackend,
        args: &ManualProvisionArgs,
    ) -> Result<String, ManualError>;
}
