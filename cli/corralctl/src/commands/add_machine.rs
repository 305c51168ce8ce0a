//! Add-machine command.

use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use corral_provision::{
    parse_target, AddMachineSpec, Constraints, ProvisionError, Provisioner, SshProvisioner,
    TransportStreams,
};
use tracing::debug;

use crate::output::TerminalSink;

use super::CommandContext;

/// Add-machine command.
///
/// Examples:
///   corral add-machine                      (starts a new machine)
///   corral add-machine -n 2                 (starts 2 new machines)
///   corral add-machine lxc                  (starts a new machine with an lxc container)
///   corral add-machine lxc:4                (starts a new lxc container on machine 4)
///   corral add-machine --constraints mem=8G (starts a machine with at least 8GB RAM)
///   corral add-machine ssh:user@10.10.0.3   (manually provisions an existing host)
///   corral add-machine zone=us-east-1a      (starts a machine in a zone)
#[derive(Debug, Args)]
pub struct AddMachineCommand {
    /// Where to place the machine: a container type, `<container>:<machine>`,
    /// `ssh:[user@]host` or a provider directive such as `zone=us-east-1a`.
    placement: Option<String>,

    /// Number of machines to add.
    #[arg(
        short = 'n',
        long = "num-machines",
        default_value_t = 1,
        value_parser = clap::value_parser!(u16).range(1..)
    )]
    num_machines: u16,

    /// Series to install on the new machine.
    #[arg(long)]
    series: Option<String>,

    /// Constraints for the new machine, such as `mem=8G cpu-cores=4`.
    #[arg(long, value_parser = parse_constraints)]
    constraints: Option<Constraints>,
}

/// Parse `--constraints`, rejecting container constraints up front.
fn parse_constraints(raw: &str) -> Result<Constraints, String> {
    let constraints: Constraints = raw.parse().map_err(|e| format!("{e}"))?;
    if let Some(container) = constraints.container {
        return Err(ProvisionError::ContainerConstraint(container).to_string());
    }
    Ok(constraints)
}

impl AddMachineCommand {
    fn spec(self, default_series: Option<&str>) -> Result<AddMachineSpec, ProvisionError> {
        let placement = match self.placement.as_deref() {
            Some(raw) => parse_target(raw)?,
            None => None,
        };
        Ok(AddMachineSpec {
            placement,
            series: self.series.or_else(|| default_series.map(String::from)),
            constraints: self.constraints.unwrap_or_default(),
            num_machines: usize::from(self.num_machines),
        })
    }

    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        let (name, env) = ctx.require_environment()?;
        let spec = self.spec(env.default_series.as_deref())?;
        debug!(environment = name, ?spec, "Adding machines");

        let provisioner = Provisioner::new(
            Arc::new(ctx.client(env)?),
            Arc::new(SshProvisioner::new()),
            env.capabilities(),
        )
        .with_streams(TransportStreams::stdio());
        provisioner.add_machines(&spec, &TerminalSink).await?;
        Ok(())
    }
}
