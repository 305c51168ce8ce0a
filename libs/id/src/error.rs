//! Error types for ID parsing and validation.

use thiserror::Error;

/// Errors that can occur when parsing or validating IDs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdError {
    /// The ID string is empty.
    #[error("ID cannot be empty")]
    Empty,

    /// The string is not a valid machine ID.
    #[error("invalid machine ID {0:?}")]
    InvalidMachineId(String),

    /// The string does not name a supported container type.
    #[error("invalid container type {0:?}")]
    UnknownContainerType(String),
}

impl IdError {
    /// Returns true if this error indicates the input was empty.
    pub fn is_empty(&self) -> bool {
        matches!(self, IdError::Empty)
    }
}
