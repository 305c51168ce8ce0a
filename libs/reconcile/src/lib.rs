//! Reconciliation loop primitives.
//!
//! This library provides the pieces long-lived background loops are built
//! from:
//!
//! - **Clock**: supplies "now" and alarms that fire after a duration. The
//!   system clock uses tokio timers; the test clock only moves when advanced.
//! - **Periodic worker**: runs an action immediately, then again every
//!   period on a clock, until stopped or until the action fails.
//!
//! # Invariants
//!
//! - A worker never runs two invocations of its action concurrently
//! - The first action error is terminal and latched as the worker's outcome
//! - Stopping a worker is idempotent and drops its pending alarm

pub mod clock;
pub mod periodic;

pub use clock::{Clock, SystemClock, TestClock};
pub use periodic::{
    Action, ActionError, ConfigError, PeriodicWorker, PeriodicWorkerConfig, WorkerError,
    WorkerHandle, WorkerState,
};
