//! Retry and failure triage for remote calls.
//!
//! - [`RetryPolicy`]: when and how long to re-issue a transient failure
//! - [`classify`]: what a terminal failure means for the calling work unit

pub mod classify;
pub mod policy;

pub use classify::{classify, Disposition};
pub use policy::{Attempted, Jitter, RetryError, RetryPolicy, StopReason};
