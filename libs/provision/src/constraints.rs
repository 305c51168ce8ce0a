//! Machine constraints.
//!
//! Constraints are written as space-separated `key=value` pairs, for example
//! `mem=8G cpu-cores=4 tags=ssd,fast`. Sizes are stored in megabytes.

use std::fmt;
use std::str::FromStr;

use corral_id::ContainerType;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Architectures a machine may be constrained to.
pub const SUPPORTED_ARCHES: [&str; 5] = ["amd64", "i386", "armhf", "arm64", "ppc64el"];

/// Errors from parsing constraints.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstraintsError {
    #[error("malformed constraint {0:?}")]
    Malformed(String),

    #[error("unknown constraint {0:?}")]
    UnknownKey(String),

    #[error("bad {key} constraint: already set")]
    Duplicate { key: String },

    #[error("bad {key} constraint: {reason}")]
    InvalidValue { key: String, reason: String },
}

/// Resource requirements for a machine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Constraints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arch: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container: Option<ContainerType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_cores: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_power: Option<u64>,

    /// Memory in megabytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mem: Option<u64>,

    /// Root disk size in megabytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_disk: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl Constraints {
    /// Returns true if no constraint is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), ConstraintsError> {
        let duplicate = || ConstraintsError::Duplicate {
            key: key.to_string(),
        };

        match key {
            "arch" => {
                if self.arch.is_some() {
                    return Err(duplicate());
                }
                if !value.is_empty() && !SUPPORTED_ARCHES.contains(&value) {
                    return Err(invalid(key, format!("{value:?} not recognized")));
                }
                self.arch = Some(value.to_string());
            }
            "container" => {
                if self.container.is_some() {
                    return Err(duplicate());
                }
                let container = value.parse().map_err(|e| invalid(key, e))?;
                self.container = Some(container);
            }
            "cpu-cores" => {
                if self.cpu_cores.is_some() {
                    return Err(duplicate());
                }
                self.cpu_cores = Some(parse_count(key, value)?);
            }
            "cpu-power" => {
                if self.cpu_power.is_some() {
                    return Err(duplicate());
                }
                self.cpu_power = Some(parse_count(key, value)?);
            }
            "mem" => {
                if self.mem.is_some() {
                    return Err(duplicate());
                }
                self.mem = Some(parse_size(key, value)?);
            }
            "root-disk" => {
                if self.root_disk.is_some() {
                    return Err(duplicate());
                }
                self.root_disk = Some(parse_size(key, value)?);
            }
            "tags" => {
                if self.tags.is_some() {
                    return Err(duplicate());
                }
                let tags = value
                    .split(',')
                    .filter(|tag| !tag.is_empty())
                    .map(str::to_string)
                    .collect();
                self.tags = Some(tags);
            }
            other => return Err(ConstraintsError::UnknownKey(other.to_string())),
        }
        Ok(())
    }
}

impl FromStr for Constraints {
    type Err = ConstraintsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut constraints = Self::default();
        for word in s.split_whitespace() {
            let Some((key, value)) = word.split_once('=') else {
                return Err(ConstraintsError::Malformed(word.to_string()));
            };
            constraints.set(key, value)?;
        }
        Ok(constraints)
    }
}

impl fmt::Display for Constraints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(arch) = &self.arch {
            parts.push(format!("arch={arch}"));
        }
        if let Some(container) = &self.container {
            parts.push(format!("container={container}"));
        }
        if let Some(cores) = self.cpu_cores {
            parts.push(format!("cpu-cores={cores}"));
        }
        if let Some(power) = self.cpu_power {
            parts.push(format!("cpu-power={power}"));
        }
        if let Some(mem) = self.mem {
            parts.push(format!("mem={mem}M"));
        }
        if let Some(disk) = self.root_disk {
            parts.push(format!("root-disk={disk}M"));
        }
        if let Some(tags) = &self.tags {
            parts.push(format!("tags={}", tags.join(",")));
        }
        f.write_str(&parts.join(" "))
    }
}

fn invalid(key: &str, reason: impl fmt::Display) -> ConstraintsError {
    ConstraintsError::InvalidValue {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_count(key: &str, value: &str) -> Result<u64, ConstraintsError> {
    value
        .parse()
        .map_err(|_| invalid(key, "must be a non-negative integer"))
}

/// Parse a size such as `512`, `512M`, `8G` or `1.5T` into megabytes.
fn parse_size(key: &str, value: &str) -> Result<u64, ConstraintsError> {
    let (number, multiplier) = match value.char_indices().last() {
        Some((idx, 'M')) => (&value[..idx], 1.0),
        Some((idx, 'G')) => (&value[..idx], 1024.0),
        Some((idx, 'T')) => (&value[..idx], 1024.0 * 1024.0),
        Some((idx, 'P')) => (&value[..idx], 1024.0 * 1024.0 * 1024.0),
        _ => (value, 1.0),
    };

    let amount: f64 = number
        .parse()
        .map_err(|_| invalid(key, "must be a non-negative float with optional M/G/T/P suffix"))?;
    if !amount.is_finite() || amount < 0.0 {
        return Err(invalid(
            key,
            "must be a non-negative float with optional M/G/T/P suffix",
        ));
    }

    let megabytes = (amount * multiplier).ceil();
    // u64::MAX as f64 rounds up to 2^64, so equality is out of range too.
    if megabytes >= u64::MAX as f64 {
        return Err(invalid(key, "is too large"));
    }
    Ok(megabytes as u64)
}
