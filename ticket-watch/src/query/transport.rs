//! The query transport seam.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::StationCode;

use super::error::QueryError;

/// Anything that can answer "which trains run from `from` to `to` on
/// `date`" with raw wire records.
///
/// Implementations make exactly one upstream attempt per call; retrying
/// is left to the next poll cycle.
#[async_trait]
pub trait QueryTransport: Send + Sync {
    async fn query(
        &self,
        date: NaiveDate,
        from: StationCode,
        to: StationCode,
    ) -> Result<Vec<String>, QueryError>;
}
