//! Recording doubles for the provisioning collaborators.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::aggregate::ReportSink;
use crate::backend::{BackendError, ProvisioningBackend};
use crate::params::{AddMachineParams, AddMachineResult, ProvisioningScriptParams};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    AddMachines(Vec<AddMachineParams>),
    AddMachinesLegacy(Vec<AddMachineParams>),
    EnvironmentUuid,
    ProvisioningScript(ProvisioningScriptParams),
    ForceDestroy(Vec<String>),
}

/// Backend returning canned responses and recording every call.
///
/// Batch calls without a canned response create machines numbered from 0.
pub(crate) struct MockBackend {
    pub(crate) uuid: String,
    pub(crate) batch_response: Option<Result<Vec<AddMachineResult>, BackendError>>,
    pub(crate) legacy_response: Option<Result<Vec<AddMachineResult>, BackendError>>,
    pub(crate) script: String,
    pub(crate) calls: Mutex<Vec<Call>>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self {
            uuid: "deadbeef-0bad-400d-8000-4b1d0d06f00d".to_string(),
            batch_response: None,
            legacy_response: None,
            script: "#!/bin/bash\ntrue\n".to_string(),
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl MockBackend {
    pub(crate) fn not_implemented() -> Self {
        Self {
            batch_response: Some(Err(BackendError::NotImplemented(
                "AddMachinesV2".to_string(),
            ))),
            ..Default::default()
        }
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn respond(
        canned: &Option<Result<Vec<AddMachineResult>, BackendError>>,
        params: &[AddMachineParams],
    ) -> Result<Vec<AddMachineResult>, BackendError> {
        match canned {
            Some(response) => response.clone(),
            None => Ok((0..params.len())
                .map(|n| AddMachineResult::created(n.to_string()))
                .collect()),
        }
    }
}

#[async_trait]
impl ProvisioningBackend for MockBackend {
    async fn add_machines(
        &self,
        params: &[AddMachineParams],
    ) -> Result<Vec<AddMachineResult>, BackendError> {
        self.record(Call::AddMachines(params.to_vec()));
        Self::respond(&self.batch_response, params)
    }

    async fn add_machines_legacy(
        &self,
        params: &[AddMachineParams],
    ) -> Result<Vec<AddMachineResult>, BackendError> {
        self.record(Call::AddMachinesLegacy(params.to_vec()));
        Self::respond(&self.legacy_response, params)
    }

    async fn environment_uuid(&self) -> Result<String, BackendError> {
        self.record(Call::EnvironmentUuid);
        Ok(self.uuid.clone())
    }

    async fn provisioning_script(
        &self,
        params: &ProvisioningScriptParams,
    ) -> Result<String, BackendError> {
        self.record(Call::ProvisioningScript(params.clone()));
        Ok(self.script.clone())
    }

    async fn force_destroy_machines(&self, machines: &[String]) -> Result<(), BackendError> {
        self.record(Call::ForceDestroy(machines.to_vec()));
        Ok(())
    }
}

/// Sink that records lines with a level prefix.
#[derive(Default)]
pub(crate) struct RecordingSink {
    lines: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub(crate) fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }
}

impl ReportSink for RecordingSink {
    fn info(&self, line: &str) {
        self.lines.lock().unwrap().push(format!("INFO {line}"));
    }

    fn error(&self, line: &str) {
        self.lines.lock().unwrap().push(format!("ERROR {line}"));
    }
}
