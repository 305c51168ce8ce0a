//! Adopting existing hosts over SSH.
//!
//! The host is inspected, registered with the backend as a machine with a
//! provider instance ID of `manual:{host}`, and then configured by running
//! the backend's provisioning script. A machine whose script fails is
//! destroyed again so it does not linger in the environment.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWriteExt};
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::backend::{
    ManualError, ManualProvisionArgs, ManualProvisioner, ProvisioningBackend, SharedWriter,
    TransportStreams,
};
use crate::params::{
    AddMachineParams, HardwareCharacteristics, MachineJob, ProvisioningScriptParams, ResultError,
};

/// Directory the machine agent creates on a managed host.
pub const AGENTS_DIR: &str = "/var/lib/corral/agents";

/// Login used when the target names no user.
pub const DEFAULT_USER: &str = "ubuntu";

const DETECT_COMMAND: &str =
    "uname -m && nproc && grep MemTotal /proc/meminfo && lsb_release -cs";

/// An SSH destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshTarget {
    pub user: String,
    pub host: String,
}

impl SshTarget {
    /// Parse `[user@]host`.
    pub fn parse(raw: &str) -> Result<Self, ManualError> {
        let invalid = || ManualError::InvalidHost(raw.to_string());
        let (user, host) = match raw.split_once('@') {
            Some((user, host)) if !user.is_empty() => (user, host),
            Some(_) => return Err(invalid()),
            None => (DEFAULT_USER, raw),
        };
        if host.is_empty() || host.contains('@') || host.contains(char::is_whitespace) {
            return Err(invalid());
        }
        Ok(Self {
            user: user.to_string(),
            host: host.to_string(),
        })
    }

    /// `user@host`, as passed to ssh.
    pub fn destination(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }
}

/// What was found on the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostInfo {
    pub series: String,
    pub hardware: HardwareCharacteristics,
}

/// Runs commands on a remote host.
#[async_trait]
pub trait RemoteShell: Send + Sync {
    /// Run `command` and return its standard output.
    async fn run(&self, target: &SshTarget, command: &str) -> Result<String, ManualError>;

    /// Feed `script` to a root shell, copying its output and errors to
    /// `streams`.
    async fn run_script(
        &self,
        target: &SshTarget,
        script: &str,
        streams: &TransportStreams,
    ) -> Result<(), ManualError>;
}

/// [`RemoteShell`] backed by the system `ssh` client.
#[derive(Debug, Clone, Default)]
pub struct SshShell;

impl SshShell {
    fn command(target: &SshTarget) -> Command {
        let mut cmd = Command::new("ssh");
        cmd.args(["-o", "StrictHostKeyChecking=accept-new", "-o", "BatchMode=yes"])
            .arg(target.destination())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl RemoteShell for SshShell {
    async fn run(&self, target: &SshTarget, command: &str) -> Result<String, ManualError> {
        let output = Self::command(target)
            .arg(command)
            .stdin(Stdio::null())
            .output()
            .await?;

        if !output.status.success() {
            return Err(ManualError::Remote {
                command: command.to_string(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn run_script(
        &self,
        target: &SshTarget,
        script: &str,
        streams: &TransportStreams,
    ) -> Result<(), ManualError> {
        let mut cmd = Self::command(target);
        cmd.arg("sudo /bin/bash");
        pipe_script(cmd, script, streams).await
    }
}

/// Run `cmd` with `script` on its stdin, copying stdout and stderr to
/// `streams` until the child exits.
///
/// The script occupies the child's stdin, so `streams.input` is not read.
async fn pipe_script(
    mut cmd: Command,
    script: &str,
    streams: &TransportStreams,
) -> Result<(), ManualError> {
    let mut child = cmd
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    let stdin = child.stdin.take();
    let feed = async move {
        if let Some(mut stdin) = stdin {
            stdin.write_all(script.as_bytes()).await?;
            stdin.shutdown().await?;
        }
        Ok::<_, std::io::Error>(())
    };
    tokio::try_join!(
        feed,
        forward(child.stdout.take(), &streams.output),
        forward(child.stderr.take(), &streams.error),
    )?;

    let status = child.wait().await?;
    if !status.success() {
        return Err(ManualError::Remote {
            command: "provisioning script".to_string(),
            status: status.to_string(),
            stderr: String::new(),
        });
    }
    Ok(())
}

async fn forward<R: AsyncRead + Unpin>(
    from: Option<R>,
    to: &SharedWriter,
) -> std::io::Result<()> {
    let Some(mut from) = from else {
        return Ok(());
    };
    let mut to = to.lock().await;
    tokio::io::copy(&mut from, &mut *to).await?;
    to.flush().await
}

/// Manual provisioner that reaches hosts through a [`RemoteShell`].
#[derive(Debug, Clone, Default)]
pub struct SshProvisioner<S = SshShell> {
    shell: S,
}

impl SshProvisioner {
    pub fn new() -> Self {
        Self { shell: SshShell }
    }
}

impl<S: RemoteShell> SshProvisioner<S> {
    pub fn with_shell(shell: S) -> Self {
        Self { shell }
    }

    async fn check_unmanaged(&self, target: &SshTarget) -> Result<(), ManualError> {
        let command = format!("test -e {AGENTS_DIR} && echo managed || echo unmanaged");
        let output = self.shell.run(target, &command).await?;
        if output.trim() == "managed" {
            return Err(ManualError::AlreadyProvisioned);
        }
        Ok(())
    }

    async fn register(
        &self,
        backend: &dyn ProvisioningBackend,
        target: &SshTarget,
        info: HostInfo,
        nonce: &str,
    ) -> Result<String, ManualError> {
        let params = AddMachineParams {
            series: Some(info.series),
            jobs: vec![MachineJob::HostUnits],
            instance_id: Some(format!("manual:{}", target.host)),
            nonce: Some(nonce.to_string()),
            hardware: Some(info.hardware),
            ..Default::default()
        };

        let result = backend
            .add_machines(&[params])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ManualError::Registration(ResultError::new("no result returned")))?;

        match result.error {
            Some(error) => Err(ManualError::Registration(error)),
            None => Ok(result.machine),
        }
    }

    async fn install_agent(
        &self,
        backend: &dyn ProvisioningBackend,
        target: &SshTarget,
        params: &ProvisioningScriptParams,
        streams: &TransportStreams,
    ) -> Result<(), ManualError> {
        let script = backend.provisioning_script(params).await?;
        self.shell.run_script(target, &script, streams).await
    }
}

#[async_trait]
impl<S: RemoteShell> ManualProvisioner for SshProvisioner<S> {
    #[instrument(skip_all, fields(host = %args.host))]
    async fn provision(
        &self,
        backend: &dyn ProvisioningBackend,
        args: &ManualProvisionArgs,
    ) -> Result<String, ManualError> {
        let target = SshTarget::parse(&args.host)?;
        self.check_unmanaged(&target).await?;

        let output = self.shell.run(&target, DETECT_COMMAND).await?;
        let info = parse_host_info(&output)?;
        debug!(series = %info.series, arch = ?info.hardware.arch, "Detected host");

        let nonce = Uuid::new_v4().to_string();
        let machine_id = self.register(backend, &target, info, &nonce).await?;
        info!(machine_id = %machine_id, "Registered manual machine");

        let params = ProvisioningScriptParams {
            machine_id: machine_id.clone(),
            nonce,
            update_behavior: args.update_behavior,
        };
        if let Err(err) = self
            .install_agent(backend, &target, &params, &args.streams)
            .await
        {
            if let Err(cleanup) = backend
                .force_destroy_machines(std::slice::from_ref(&machine_id))
                .await
            {
                warn!(machine_id = %machine_id, error = %cleanup, "Failed to remove machine after provisioning error");
            }
            return Err(err);
        }

        Ok(machine_id)
    }
}

/// Parse the output of the detection command.
pub fn parse_host_info(output: &str) -> Result<HostInfo, ManualError> {
    let mut lines = output.lines().map(str::trim);
    let mut next = |what: &str| {
        lines
            .next()
            .filter(|line| !line.is_empty())
            .ok_or_else(|| ManualError::Detection(format!("missing {what}")))
    };

    let arch = normalize_arch(next("architecture")?)?;
    let cores = next("cpu count")?;
    let cpu_cores = cores
        .parse()
        .map_err(|_| ManualError::Detection(format!("invalid cpu count {cores:?}")))?;
    let mem = parse_meminfo(next("memory")?)?;
    let series = next("series")?.to_string();

    Ok(HostInfo {
        series,
        hardware: HardwareCharacteristics {
            arch: Some(arch.to_string()),
            mem: Some(mem),
            cpu_cores: Some(cpu_cores),
        },
    })
}

fn normalize_arch(uname: &str) -> Result<&'static str, ManualError> {
    match uname {
        "x86_64" | "amd64" => Ok("amd64"),
        "i386" | "i486" | "i586" | "i686" => Ok("i386"),
        "aarch64" | "arm64" => Ok("arm64"),
        "armv7l" | "armv6l" | "armhf" => Ok("armhf"),
        "ppc64le" | "ppc64el" => Ok("ppc64el"),
        other => Err(ManualError::Detection(format!(
            "unsupported architecture {other:?}"
        ))),
    }
}

/// `MemTotal:  16318356 kB` in megabytes.
fn parse_meminfo(line: &str) -> Result<u64, ManualError> {
    let invalid = || ManualError::Detection(format!("invalid memory line {line:?}"));
    let mut fields = line.split_whitespace();
    if fields.next() != Some("MemTotal:") {
        return Err(invalid());
    }
    let kilobytes: u64 = fields
        .next()
        .and_then(|n| n.parse().ok())
        .ok_or_else(invalid)?;
    Ok(kilobytes / 1024)
}
