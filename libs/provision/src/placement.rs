//! Placement directives.
//!
//! A placement directive tells the provisioning backend where or how to
//! create a machine. It is written `scope:directive`:
//!
//! | input | scope | directive |
//! |---|---|---|
//! | `lxc:4` | `lxc` | `4` (container on machine 4) |
//! | `lxc` | `lxc` | empty (container on a new machine) |
//! | `ssh:ubuntu@10.0.0.3` | `ssh` | `ubuntu@10.0.0.3` (manual provisioning) |
//! | `zone=us-east-1a` | `env-uuid` | `zone=us-east-1a` (provider hint) |
//! | `4` | `#` | `4` (existing machine, rejected by add-machine) |

use std::fmt;

use corral_id::{is_valid_machine, ContainerType};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Scope of a directive naming an existing machine.
pub const MACHINE_SCOPE: &str = "#";

/// Scope requesting manual provisioning of an SSH host.
pub const SSH_SCOPE: &str = "ssh";

/// Pseudo-scope for the current environment, resolved at submission time.
pub const ENV_UUID_SCOPE: &str = "env-uuid";

/// Errors from parsing a placement directive.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlacementError {
    #[error("placement scope missing")]
    ScopeMissing,

    #[error("invalid value {value:?} for {scope:?} scope: expected machine-id")]
    InvalidValue { scope: String, value: String },

    #[error("machine-id cannot be specified when adding machines")]
    MachineScope,
}

/// A parsed placement directive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Placement {
    pub scope: String,
    pub directive: String,
}

impl Placement {
    /// Create a placement from its parts.
    pub fn new(scope: impl Into<String>, directive: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            directive: directive.into(),
        }
    }

    /// Parse a placement directive.
    ///
    /// Returns `Ok(None)` for empty input.
    pub fn parse(raw: &str) -> Result<Option<Self>, PlacementError> {
        if raw.is_empty() {
            return Ok(None);
        }

        if let Some((scope, value)) = raw.split_once(':') {
            if scope.is_empty() {
                return Err(PlacementError::ScopeMissing);
            }
            let needs_machine =
                scope == MACHINE_SCOPE || ContainerType::is_container_type(scope);
            if needs_machine && !is_valid_machine(value) {
                return Err(PlacementError::InvalidValue {
                    scope: scope.to_string(),
                    value: value.to_string(),
                });
            }
            return Ok(Some(Self::new(scope, value)));
        }

        if is_valid_machine(raw) {
            return Ok(Some(Self::new(MACHINE_SCOPE, raw)));
        }
        if ContainerType::is_container_type(raw) {
            return Ok(Some(Self::new(raw, "")));
        }
        Err(PlacementError::ScopeMissing)
    }

    /// Returns true if this directive requests manual provisioning.
    pub fn is_manual(&self) -> bool {
        self.scope == SSH_SCOPE
    }

    /// Returns true if the scope still needs resolving to the environment UUID.
    pub fn is_environment_scope(&self) -> bool {
        self.scope == ENV_UUID_SCOPE
    }

    /// Returns true if this directive names an existing machine.
    pub fn is_machine_scope(&self) -> bool {
        self.scope == MACHINE_SCOPE
    }

    /// Returns the container type if the scope names one.
    pub fn container_type(&self) -> Option<ContainerType> {
        self.scope.parse().ok()
    }
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.scope, self.directive)
    }
}

/// Parse the placement argument of add-machine.
///
/// Input without an explicit scope defaults to the current environment, so
/// `zone=us-east-1a` means `env-uuid:zone=us-east-1a`. Directives naming an
/// existing machine are rejected.
pub fn parse_target(raw: &str) -> Result<Option<Placement>, PlacementError> {
    let placement = match Placement::parse(raw) {
        Err(PlacementError::ScopeMissing) => {
            Placement::parse(&format!("{ENV_UUID_SCOPE}:{raw}"))?
        }
        other => other?,
    };

    if placement.as_ref().is_some_and(Placement::is_machine_scope) {
        return Err(PlacementError::MachineScope);
    }
    Ok(placement)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case("lxc:4", "lxc", "4")]
    #[case("kvm:4/lxc/1", "kvm", "4/lxc/1")]
    #[case("lxc", "lxc", "")]
    #[case("ssh:ubuntu@10.10.0.3", "ssh", "ubuntu@10.10.0.3")]
    #[case("ssh:10.10.0.3", "ssh", "10.10.0.3")]
    #[case("zone=us-east-1a", "env-uuid", "zone=us-east-1a")]
    #[case("maas-node.local", "env-uuid", "maas-node.local")]
    #[case("env-uuid:zone=a", "env-uuid", "zone=a")]
    #[case("aws:zone=a:b", "aws", "zone=a:b")]
    #[case(":x", "env-uuid", ":x")]
    fn test_parse_target(#[case] raw: &str, #[case] scope: &str, #[case] directive: &str) {
        let placement = parse_target(raw).unwrap().unwrap();
        assert_eq!(placement, Placement::new(scope, directive));
    }

    #[test]
    fn test_parse_target_empty() {
        assert_eq!(parse_target("").unwrap(), None);
    }

    #[rstest]
    #[case("4")]
    #[case("0")]
    #[case("4/lxc/0")]
    #[case("#:4")]
    fn test_parse_target_rejects_machine_scope(#[case] raw: &str) {
        assert_eq!(parse_target(raw), Err(PlacementError::MachineScope));
    }

    #[rstest]
    #[case("lxc:foo", "lxc", "foo")]
    #[case("kvm:04", "kvm", "04")]
    #[case("lxc:", "lxc", "")]
    #[case("#:lxc", "#", "lxc")]
    fn test_parse_target_invalid_value(#[case] raw: &str, #[case] scope: &str, #[case] value: &str) {
        assert_eq!(
            parse_target(raw),
            Err(PlacementError::InvalidValue {
                scope: scope.to_string(),
                value: value.to_string(),
            })
        );
    }

    #[test]
    fn test_grammar_reports_scope_missing() {
        assert_eq!(
            Placement::parse("zone=us-east-1a"),
            Err(PlacementError::ScopeMissing)
        );
        assert_eq!(Placement::parse(":4"), Err(PlacementError::ScopeMissing));
    }

    #[test]
    fn test_container_type() {
        let placement = Placement::new("lxc", "4");
        assert_eq!(placement.container_type(), Some(ContainerType::Lxc));
        assert_eq!(Placement::new("zone=a", "").container_type(), None);
    }

    proptest! {
        /// Unscoped input that is not a machine or container type means the
        /// current environment.
        #[test]
        fn prop_scope_default_law(raw in "[a-z][a-z0-9=.\\-]{0,24}") {
            prop_assume!(!ContainerType::is_container_type(&raw));
            prop_assume!(!is_valid_machine(&raw));

            let direct = parse_target(&raw).unwrap();
            let scoped = parse_target(&format!("env-uuid:{raw}")).unwrap();
            prop_assert_eq!(direct, scoped);
        }
    }
}
