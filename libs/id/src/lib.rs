//! # corral-id
//!
//! Machine identifiers and container types for corral.
//!
//! ## Machine ID Format
//!
//! Top-level machines are plain non-negative integers without leading zeros.
//! Containers embed their parent: `{parent}/{container-type}/{number}`, and
//! may nest.
//!
//! Examples:
//! - `0`
//! - `7`
//! - `7/lxc/2`
//! - `4/kvm/0/lxc/1`
//!
//! Classification (machine vs container) is always derived from the shape of
//! the identifier; there is no separate flag.

mod error;
mod types;

pub use error::IdError;
pub use types::*;
