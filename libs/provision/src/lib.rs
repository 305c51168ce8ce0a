//! # corral-provision
//!
//! Adding machines to a corral environment.
//!
//! An add-machine request goes through these stages:
//!
//! 1. [`placement::parse_target`] turns the operator's placement argument
//!    into a [`Placement`], defaulting unscoped directives to the current
//!    environment.
//! 2. [`router::route`] checks the request and picks a strategy: manual
//!    provisioning of an existing host, or a batch submitted to the backend.
//! 3. [`Provisioner`] submits the batch. A backend that predates placement
//!    support gets a single legacy request built by [`compat::legacy_params`].
//! 4. [`aggregate::aggregate`] reports each created machine and folds the
//!    per-machine failures into one error.

pub mod aggregate;
pub mod backend;
pub mod compat;
pub mod constraints;
pub mod error;
pub mod manual;
pub mod params;
pub mod placement;
pub mod provisioner;
pub mod router;

#[cfg(test)]
mod testing;

pub use aggregate::{Created, MachineKind, ReportSink};
pub use backend::{
    BackendError, ManualError, ManualProvisionArgs, ManualProvisioner, ProvisioningBackend,
    TransportStreams,
};
pub use constraints::{Constraints, ConstraintsError};
pub use error::ProvisionError;
pub use manual::SshProvisioner;
pub use params::{
    AddMachineParams, AddMachineResult, MachineJob, ProvisioningScriptParams, ResultError,
    UpdateBehavior,
};
pub use placement::{parse_target, Placement, PlacementError};
pub use provisioner::Provisioner;
pub use router::{AddMachineSpec, EnvironmentCapabilities};
