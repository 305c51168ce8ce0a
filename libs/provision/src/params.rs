//! Wire types exchanged with the provisioning backend.

use std::fmt;

use corral_id::ContainerType;
use serde::{Deserialize, Serialize};

use crate::constraints::Constraints;
use crate::placement::Placement;

/// Roles a machine agent takes on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MachineJob {
    /// The machine can host deployed units.
    HostUnits,
    /// The agent configures the machine's network interfaces.
    ManageNetworking,
}

/// Whether package refresh and upgrade run when a machine is provisioned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateBehavior {
    pub enable_os_refresh_update: bool,
    pub enable_os_upgrade: bool,
}

impl Default for UpdateBehavior {
    fn default() -> Self {
        Self {
            enable_os_refresh_update: true,
            enable_os_upgrade: true,
        }
    }
}

/// Hardware detected on a manually provisioned host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardwareCharacteristics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arch: Option<String>,

    /// Memory in megabytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mem: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_cores: Option<u64>,
}

/// Request to add one machine.
///
/// At most one of `placement` and `container_type`/`parent_id` is set: the
/// legacy form is only produced by the compatibility fallback, which clears
/// `placement`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddMachineParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series: Option<String>,

    #[serde(default)]
    pub constraints: Constraints,

    pub jobs: Vec<MachineJob>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placement: Option<Placement>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_type: Option<ContainerType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,

    /// Provider instance ID of an already running host.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,

    /// Nonce the machine agent presents on first connection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hardware: Option<HardwareCharacteristics>,
}

/// Error reported by the backend for a single machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultError {
    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ResultError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

impl fmt::Display for ResultError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ResultError {}

/// Outcome of one request in a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddMachineResult {
    #[serde(default)]
    pub machine: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ResultError>,
}

impl AddMachineResult {
    pub fn created(machine: impl Into<String>) -> Self {
        Self {
            machine: machine.into(),
            error: None,
        }
    }

    pub fn failed(error: ResultError) -> Self {
        Self {
            machine: String::new(),
            error: Some(error),
        }
    }
}

/// Request for the script that installs an agent on a manual machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisioningScriptParams {
    pub machine_id: String,
    pub nonce: String,
    pub update_behavior: UpdateBehavior,
}
