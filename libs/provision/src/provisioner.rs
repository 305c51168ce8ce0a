//! The add-machine operation.

use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::aggregate::{aggregate, Created, ReportSink};
use crate::backend::{
    ManualProvisionArgs, ManualProvisioner, ProvisioningBackend, TransportStreams,
};
use crate::compat::legacy_params;
use crate::error::ProvisionError;
use crate::params::AddMachineResult;
use crate::router::{route, AddMachineSpec, Batch, EnvironmentCapabilities, Route};

/// Adds machines to an environment.
pub struct Provisioner {
    backend: Arc<dyn ProvisioningBackend>,
    manual: Arc<dyn ManualProvisioner>,
    caps: EnvironmentCapabilities,
    streams: TransportStreams,
}

impl Provisioner {
    pub fn new(
        backend: Arc<dyn ProvisioningBackend>,
        manual: Arc<dyn ManualProvisioner>,
        caps: EnvironmentCapabilities,
    ) -> Self {
        Self {
            backend,
            manual,
            caps,
            streams: TransportStreams::null(),
        }
    }

    /// Streams handed to the manual provisioner. Defaults to
    /// [`TransportStreams::null`].
    pub fn with_streams(mut self, streams: TransportStreams) -> Self {
        self.streams = streams;
        self
    }

    /// Provision the machines described by `spec`.
    ///
    /// Every created machine is reported to `sink`. Input errors are returned
    /// before the backend is contacted.
    #[instrument(skip_all, fields(num_machines = spec.num_machines))]
    pub async fn add_machines(
        &self,
        spec: &AddMachineSpec,
        sink: &dyn ReportSink,
    ) -> Result<Vec<Created>, ProvisionError> {
        match route(spec, &self.caps)? {
            Route::Manual(target) => {
                debug!(host = %target.host, "Provisioning existing host");
                let args = ManualProvisionArgs {
                    host: target.host,
                    streams: self.streams.clone(),
                    update_behavior: target.update_behavior,
                };
                let machine_id = self.manual.provision(self.backend.as_ref(), &args).await?;
                sink.info(&format!("created machine {machine_id}"));
                Ok(vec![Created::new(machine_id)])
            }
            Route::Batch(mut batch) => {
                if batch.needs_environment() {
                    let uuid = self.backend.environment_uuid().await?;
                    batch.resolve_environment_scope(&uuid);
                }
                let results = self.submit(&batch).await?;
                aggregate(results, sink)
            }
        }
    }

    async fn submit(&self, batch: &Batch) -> Result<Vec<AddMachineResult>, ProvisionError> {
        let requests = batch.requests();
        debug!(count = requests.len(), "Submitting machine batch");

        match self.backend.add_machines(&requests).await {
            Ok(results) => Ok(results),
            Err(err) if err.is_not_implemented() => {
                let Some(legacy) = legacy_params(batch.template()) else {
                    return Err(err.into());
                };
                info!(
                    requested = batch.count(),
                    "Backend does not support placement, falling back to legacy request"
                );
                Ok(self.backend.add_machines_legacy(&[legacy]).await?)
            }
            Err(err) => Err(err.into()),
        }
    }
}
