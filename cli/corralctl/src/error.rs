//! Error handling and display for the CLI.

use colored::Colorize;
use corral_provision::{BackendError, ManualError, ProvisionError};
use thiserror::Error;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("No environment specified. Use --environment or set a current environment.")]
    NoEnvironment,

    #[error("Unknown environment {0:?}")]
    UnknownEnvironment(String),
}

/// Print an error in a user-friendly format.
pub fn print_error(err: &anyhow::Error) {
    eprintln!("{} {}", "Error:".red().bold(), err);

    if let Some(hint) = hint(err) {
        eprintln!("\n{}", format!("Hint: {hint}").yellow());
    }
}

fn hint(err: &anyhow::Error) -> Option<&'static str> {
    if let Some(cli_err) = err.downcast_ref::<CliError>() {
        return match cli_err {
            CliError::NoEnvironment | CliError::UnknownEnvironment(_) => {
                Some("Environments are listed under \"environments\" in the CLI config file.")
            }
        };
    }

    match err.downcast_ref::<ProvisionError>()? {
        ProvisionError::CountWithDirective => {
            Some("Run add-machine once per placement directive.")
        }
        ProvisionError::Placement(_) => {
            Some("Placement is [scope:]directive, for example lxc:4, zone=us-east-1a or ssh:user@host.")
        }
        ProvisionError::Backend(backend) => backend_hint(backend),
        ProvisionError::Manual(ManualError::Backend(backend)) => backend_hint(backend),
        ProvisionError::Manual(ManualError::AlreadyProvisioned) => {
            Some("The host already runs a machine agent.")
        }
        ProvisionError::Manual(ManualError::Ssh(_)) => {
            Some("Check that ssh is installed and the host accepts your key.")
        }
        _ => None,
    }
}

fn backend_hint(err: &BackendError) -> Option<&'static str> {
    match err {
        BackendError::Transport(_) => {
            Some("Check your network connection and API endpoint.")
        }
        BackendError::Api { status: 401, .. } | BackendError::Api { status: 403, .. } => {
            Some("You may not have permission for this operation.")
        }
        BackendError::NotImplemented(_) => {
            Some("The controller is too old for this request; upgrade it first.")
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hints() {
        let err = anyhow::Error::from(ProvisionError::CountWithDirective);
        assert_eq!(
            hint(&err),
            Some("Run add-machine once per placement directive.")
        );

        let err = anyhow::Error::from(ProvisionError::Backend(BackendError::Transport(
            "connection refused".into(),
        )));
        assert_eq!(
            hint(&err),
            Some("Check your network connection and API endpoint.")
        );

        let err = anyhow::Error::from(ProvisionError::Combined(vec!["a".into(), "b".into()]));
        assert_eq!(hint(&err), None);
    }
}
