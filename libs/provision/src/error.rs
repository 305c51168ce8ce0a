//! Errors returned by the provisioner.

use corral_id::ContainerType;
use thiserror::Error;

use crate::backend::{BackendError, ManualError};
use crate::constraints::ConstraintsError;
use crate::params::ResultError;
use crate::placement::PlacementError;

/// Errors from adding machines.
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("container constraint \"{0}\" not allowed when adding a machine")]
    ContainerConstraint(ContainerType),

    #[error("cannot use -n when specifying a placement directive")]
    CountWithDirective,

    #[error("number of machines must be at least 1")]
    ZeroMachines,

    #[error(transparent)]
    Placement(#[from] PlacementError),

    #[error(transparent)]
    Constraints(#[from] ConstraintsError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Manual(#[from] ManualError),

    /// The only machine in the batch that failed.
    #[error(transparent)]
    Machine(ResultError),

    /// Several machines failed; their messages in submission order.
    #[error("{}", .0.join(", "))]
    Combined(Vec<String>),
}

impl ProvisionError {
    /// Returns true for invalid user input, detected before any backend call.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::ContainerConstraint(_)
                | Self::CountWithDirective
                | Self::ZeroMachines
                | Self::Placement(_)
                | Self::Constraints(_)
        )
    }
}
