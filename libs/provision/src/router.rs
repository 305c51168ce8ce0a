//! Routing an add-machine request to a provisioning strategy.
//!
//! The router enforces the input invariants and decides between manual
//! provisioning and a batch submission. It never talks to the backend, so
//! every input error is reported before any backend call.

use crate::constraints::Constraints;
use crate::error::ProvisionError;
use crate::params::{AddMachineParams, MachineJob, UpdateBehavior};
use crate::placement::Placement;

/// What the operator asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddMachineSpec {
    pub placement: Option<Placement>,
    pub series: Option<String>,
    pub constraints: Constraints,
    pub num_machines: usize,
}

impl Default for AddMachineSpec {
    fn default() -> Self {
        Self {
            placement: None,
            series: None,
            constraints: Constraints::default(),
            num_machines: 1,
        }
    }
}

/// Properties of the target environment that shape requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnvironmentCapabilities {
    /// The provider configures machine networking itself.
    pub manages_networking: bool,

    pub update_behavior: UpdateBehavior,
}

/// Identical requests submitted in a single backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    template: AddMachineParams,
    count: usize,
}

impl Batch {
    /// A batch of `count` copies of `template`.
    pub fn new(template: AddMachineParams, count: usize) -> Self {
        Self { template, count }
    }

    /// The request every machine in the batch is created from.
    pub fn template(&self) -> &AddMachineParams {
        &self.template
    }

    /// Number of machines requested.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Returns true if the placement scope still names the current environment.
    pub fn needs_environment(&self) -> bool {
        self.template
            .placement
            .as_ref()
            .is_some_and(Placement::is_environment_scope)
    }

    /// Replace the `env-uuid` pseudo-scope with the environment's UUID.
    pub fn resolve_environment_scope(&mut self, uuid: &str) {
        if let Some(placement) = self.template.placement.as_mut() {
            if placement.is_environment_scope() {
                placement.scope = uuid.to_string();
            }
        }
    }

    /// The requests to submit.
    pub fn requests(&self) -> Vec<AddMachineParams> {
        vec![self.template.clone(); self.count]
    }
}

/// An existing host to adopt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManualTarget {
    /// `[user@]host`.
    pub host: String,

    pub update_behavior: UpdateBehavior,
}

/// How a request will be provisioned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Adopt an existing host over SSH. Always a single machine.
    Manual(ManualTarget),

    /// Ask the backend to create machines.
    Batch(Batch),
}

/// Check the request invariants that do not need the backend.
pub fn validate(spec: &AddMachineSpec) -> Result<(), ProvisionError> {
    if let Some(container) = spec.constraints.container {
        return Err(ProvisionError::ContainerConstraint(container));
    }
    if spec.num_machines == 0 {
        return Err(ProvisionError::ZeroMachines);
    }
    let has_directive = spec
        .placement
        .as_ref()
        .is_some_and(|placement| !placement.directive.is_empty());
    if spec.num_machines > 1 && has_directive {
        return Err(ProvisionError::CountWithDirective);
    }
    Ok(())
}

/// Jobs for machines created through the backend.
pub fn machine_jobs(caps: &EnvironmentCapabilities) -> Vec<MachineJob> {
    let mut jobs = vec![MachineJob::HostUnits];
    if !caps.manages_networking {
        jobs.push(MachineJob::ManageNetworking);
    }
    jobs
}

/// Decide how to provision `spec`.
pub fn route(spec: &AddMachineSpec, caps: &EnvironmentCapabilities) -> Result<Route, ProvisionError> {
    validate(spec)?;

    if let Some(placement) = spec.placement.as_ref().filter(|p| p.is_manual()) {
        return Ok(Route::Manual(ManualTarget {
            host: placement.directive.clone(),
            update_behavior: caps.update_behavior,
        }));
    }

    let template = AddMachineParams {
        series: spec.series.clone(),
        constraints: spec.constraints.clone(),
        jobs: machine_jobs(caps),
        placement: spec.placement.clone(),
        ..Default::default()
    };

    Ok(Route::Batch(Batch::new(template, spec.num_machines)))
}
