//! corral controller library
//!
//! Background workers that keep environment metadata fresh:
//!
//! - **charm revisions**: asks the controller to look up the latest revision
//!   of every deployed charm, once a day by default.
//! - **tools version**: asks the controller to record the newest available
//!   agent tools so status can offer an upgrade.
//!
//! Each worker is a [`corral_reconcile::PeriodicWorker`] driving a narrow
//! facade trait, so tests can substitute both the facade and the clock.

pub mod config;
pub mod facade;
pub mod workers;

pub use config::Config;
pub use facade::{CharmRevisionFacade, FacadeClient, FacadeError, ToolsVersionFacade};
