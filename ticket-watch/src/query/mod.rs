//! Seat availability queries against the ticketing provider.
//!
//! The provider answers a route/date query with an array of
//! pipe-delimited wire records, one per train. This module owns the
//! transport seam, the HTTP implementation of it, the record parser and
//! a canned transport for tests and local development.
//!
//! Wire record layout (0-based field offsets):
//! - 3: train number, 6/7: origin/destination station codes
//! - 8/9: departure/arrival time "HH:MM", 10: duration "HH:MM"
//! - 23 soft sleeper, 26 no seat, 28 hard sleeper, 29 hard seat,
//!   30 second class, 31 first class, 32 business

mod client;
mod error;
mod mock;
mod parse;
mod transport;

pub use client::{QueryClient, QueryClientConfig, parse_query_response};
pub use error::{ParseError, QueryError};
pub use mock::{MockTransport, WireRecord};
pub use parse::{REQUIRED_FIELDS, parse_price, parse_record, parse_seat_token};
pub use transport::QueryTransport;
