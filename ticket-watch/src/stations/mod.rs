//! Station list client, disk cache and name lookup.
//!
//! Provides station name → provider code resolution. The full list is
//! fetched once and kept for the life of the process; an unknown name
//! triggers a single reload so stations added upstream are picked up
//! without a restart.

mod cache;
mod client;
mod directory;
mod error;

pub use cache::{StationCache, StationCacheConfig};
pub use client::{
    StaticStationSource, StationClient, StationClientConfig, StationSource, parse_station_list,
};
pub use directory::StationDirectory;
pub use error::StationError;
