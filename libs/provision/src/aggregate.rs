//! Reporting the outcome of a batch.

use std::fmt;

use corral_id::is_container_machine;

use crate::error::ProvisionError;
use crate::params::AddMachineResult;

/// Where progress lines for the operator go.
pub trait ReportSink: Send + Sync {
    fn info(&self, line: &str);
    fn error(&self, line: &str);
}

/// Whether a new machine is a host or a container on one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineKind {
    Machine,
    Container,
}

impl MachineKind {
    /// Classify a machine ID.
    pub fn of(machine_id: &str) -> Self {
        if is_container_machine(machine_id) {
            Self::Container
        } else {
            Self::Machine
        }
    }
}

impl fmt::Display for MachineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Machine => f.write_str("machine"),
            Self::Container => f.write_str("container"),
        }
    }
}

/// A machine the backend created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Created {
    pub machine_id: String,
    pub kind: MachineKind,
}

impl Created {
    pub fn new(machine_id: impl Into<String>) -> Self {
        let machine_id = machine_id.into();
        let kind = MachineKind::of(&machine_id);
        Self { machine_id, kind }
    }
}

/// Report every result and fold the failures into a single error.
pub fn aggregate(
    results: Vec<AddMachineResult>,
    sink: &dyn ReportSink,
) -> Result<Vec<Created>, ProvisionError> {
    let mut created = Vec::new();
    let mut errors = Vec::new();

    for result in results {
        match result.error {
            Some(error) => errors.push(error),
            None => {
                let machine = Created::new(result.machine);
                sink.info(&format!("created {} {}", machine.kind, machine.machine_id));
                created.push(machine);
            }
        }
    }

    match errors.len() {
        0 => Ok(created),
        1 => {
            sink.error("failed to create 1 machine");
            let error = errors.remove(0);
            Err(ProvisionError::Machine(error))
        }
        n => {
            sink.error(&format!("failed to create {n} machines"));
            Err(ProvisionError::Combined(
                errors.into_iter().map(|e| e.message).collect(),
            ))
        }
    }
}
