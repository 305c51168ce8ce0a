//! CLI commands.

mod add_machine;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::client::ApiClient;
use crate::config::{Config, EnvironmentConfig};
use crate::error::CliError;

/// corral CLI - Manage machines in corral environments.
#[derive(Debug, Parser)]
#[command(name = "corral")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Environment to operate on.
    #[arg(short = 'e', long, global = true, env = "CORRAL_ENV")]
    environment: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Start a new, empty machine and optionally a container, or add a
    /// container to a machine.
    AddMachine(add_machine::AddMachineCommand),

    /// Show CLI version.
    Version,
}

impl Cli {
    /// Run the CLI command.
    pub async fn run(self) -> Result<()> {
        match self.command {
            Commands::AddMachine(cmd) => {
                let ctx = CommandContext {
                    config: Config::load()?,
                    environment: self.environment,
                };
                cmd.run(ctx).await
            }
            Commands::Version => {
                println!("corral {}", env!("CARGO_PKG_VERSION"));
                Ok(())
            }
        }
    }
}

/// Shared command context.
pub struct CommandContext {
    pub config: Config,
    pub environment: Option<String>,
}

impl CommandContext {
    /// Get an API client for the controller serving `env`.
    pub fn client(&self, env: &EnvironmentConfig) -> Result<ApiClient> {
        ApiClient::new(self.config.api_url(env))
    }

    /// Resolve the current environment, preferring flag over context.
    pub fn resolve_environment(&self) -> Option<&str> {
        self.environment
            .as_deref()
            .or(self.config.context.environment.as_deref())
    }

    /// Require a known environment to be selected.
    pub fn require_environment(&self) -> Result<(&str, &EnvironmentConfig), CliError> {
        let name = self.resolve_environment().ok_or(CliError::NoEnvironment)?;
        let env = self
            .config
            .environments
            .get(name)
            .ok_or_else(|| CliError::UnknownEnvironment(name.to_string()))?;
        Ok((name, env))
    }
}
