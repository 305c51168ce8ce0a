//! Periodic controller workers.

pub mod charm_revision;
pub mod tools_version;
