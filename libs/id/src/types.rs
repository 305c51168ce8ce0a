//! Machine ID and container type definitions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::IdError;

// =============================================================================
// Container Types
// =============================================================================

/// Container technologies a machine can host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerType {
    Lxc,
    Kvm,
}

impl ContainerType {
    /// All supported container types, in display order.
    pub const ALL: [ContainerType; 2] = [ContainerType::Lxc, ContainerType::Kvm];

    /// Returns the canonical lowercase name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Lxc => "lxc",
            Self::Kvm => "kvm",
        }
    }

    /// Returns true if `s` names a supported container type.
    pub fn is_container_type(s: &str) -> bool {
        s.parse::<Self>().is_ok()
    }
}

impl fmt::Display for ContainerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContainerType {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lxc" => Ok(Self::Lxc),
            "kvm" => Ok(Self::Kvm),
            other => Err(IdError::UnknownContainerType(other.to_string())),
        }
    }
}

// =============================================================================
// Machine IDs
// =============================================================================

/// A validated machine identifier.
///
/// Either a top-level machine (`"7"`) or a container hosted on a parent
/// (`"7/lxc/2"`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MachineId(String);

impl MachineId {
    /// Parses and validates a machine ID.
    pub fn parse(s: &str) -> Result<Self, IdError> {
        if s.is_empty() {
            return Err(IdError::Empty);
        }
        if !is_valid_machine(s) {
            return Err(IdError::InvalidMachineId(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }

    /// Returns the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if this ID names a container.
    pub fn is_container(&self) -> bool {
        self.0.contains('/')
    }

    /// Returns the machine hosting this container, if it is one.
    pub fn parent(&self) -> Option<MachineId> {
        let (rest, _number) = self.0.rsplit_once('/')?;
        let (parent, _kind) = rest.rsplit_once('/')?;
        Some(Self(parent.to_string()))
    }

    /// Returns the innermost container type, if this is a container.
    pub fn container_type(&self) -> Option<ContainerType> {
        let (rest, _number) = self.0.rsplit_once('/')?;
        let (_parent, kind) = rest.rsplit_once('/')?;
        kind.parse().ok()
    }
}

impl fmt::Display for MachineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for MachineId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for MachineId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for MachineId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for MachineId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Returns true if `s` is a valid machine ID.
pub fn is_valid_machine(s: &str) -> bool {
    let mut segments = s.split('/');

    let Some(first) = segments.next() else {
        return false;
    };
    if !is_machine_number(first) {
        return false;
    }

    loop {
        match (segments.next(), segments.next()) {
            (None, None) => return true,
            (Some(kind), Some(number)) => {
                if !ContainerType::is_container_type(kind) || !is_machine_number(number) {
                    return false;
                }
            }
            _ => return false,
        }
    }
}

/// Returns true if `s` is a valid machine ID naming a container.
///
/// Invalid IDs are never containers.
pub fn is_container_machine(s: &str) -> bool {
    is_valid_machine(s) && s.contains('/')
}

/// `0` or a decimal number without a leading zero.
fn is_machine_number(s: &str) -> bool {
    match s.as_bytes() {
        [] => false,
        [b'0'] => true,
        [b'0', ..] => false,
        bytes => bytes.iter().all(u8::is_ascii_digit),
    }
}
