//! Periodic availability polling.
//!
//! One poller runs per user. Each cycle computes the candidate dates,
//! resolves the preferred route once, queries every date with bounded
//! concurrency and keeps only the preferred trains. The merged result is
//! published as one snapshot, replacing the previous one wholesale.

mod config;
mod cycle;
mod registry;
mod snapshot;

pub use config::PollerConfig;
pub use cycle::{AvailabilityPoller, PollerContext, PollerHandle, china_today};
pub use registry::PollerRegistry;
pub use snapshot::{AvailabilityEntry, AvailabilitySnapshot, DateAvailability};
