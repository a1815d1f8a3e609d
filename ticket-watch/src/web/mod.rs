//! Web layer for the ticket watcher.
//!
//! JSON endpoints for station lookup, commute preferences, availability
//! snapshots, watch tasks and the automation provider's callback.

mod dto;
mod routes;
mod state;

pub use dto::*;
pub use routes::{AppError, create_router};
pub use state::AppState;
