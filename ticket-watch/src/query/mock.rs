//! Canned query transport for tests and offline development.
//!
//! Serves wire records registered per (date, from, to) as if they were
//! live provider responses, with optional injected failures and latency.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::RwLock;

use crate::domain::{SeatClass, StationCode};

use super::error::QueryError;
use super::parse::REQUIRED_FIELDS;
use super::transport::QueryTransport;

type RouteKey = (NaiveDate, StationCode, StationCode);

/// Mock transport that serves canned records.
///
/// Routes with nothing registered answer with zero records, like the
/// provider does for a route with no trains.
#[derive(Clone, Default)]
pub struct MockTransport {
    routes: Arc<RwLock<HashMap<RouteKey, Vec<String>>>>,
    failing: Arc<RwLock<HashSet<NaiveDate>>>,
    delay: Option<Duration>,
    calls: Arc<AtomicUsize>,
    in_flight: Arc<AtomicUsize>,
    peak_in_flight: Arc<AtomicUsize>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every call after sleeping this long.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Register the records returned for one route on one date.
    pub async fn set_records(
        &self,
        date: NaiveDate,
        from: StationCode,
        to: StationCode,
        records: Vec<String>,
    ) {
        self.routes.write().await.insert((date, from, to), records);
    }

    /// Make every query for `date` fail.
    pub async fn fail_on(&self, date: NaiveDate) {
        self.failing.write().await.insert(date);
    }

    /// Stop failing queries for `date`.
    pub async fn recover(&self, date: NaiveDate) {
        self.failing.write().await.remove(&date);
    }

    /// Number of queries served so far, failures included.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Most queries that were ever in progress at once.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

/// Counts one query as in progress until dropped.
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(count: &'a AtomicUsize, peak: &AtomicUsize) -> Self {
        let now = count.fetch_add(1, Ordering::SeqCst) + 1;
        peak.fetch_max(now, Ordering::SeqCst);
        Self(count)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl QueryTransport for MockTransport {
    async fn query(
        &self,
        date: NaiveDate,
        from: StationCode,
        to: StationCode,
    ) -> Result<Vec<String>, QueryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let _in_flight = InFlight::enter(&self.in_flight, &self.peak_in_flight);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing.read().await.contains(&date) {
            return Err(QueryError::Unavailable(format!(
                "mock failure for {date} {from}->{to}"
            )));
        }

        Ok(self
            .routes
            .read()
            .await
            .get(&(date, from, to))
            .cloned()
            .unwrap_or_default())
    }
}

/// Builder for syntactically valid wire records.
#[derive(Debug, Clone)]
pub struct WireRecord {
    fields: Vec<String>,
}

impl WireRecord {
    /// A record for one train between two station codes, departing
    /// 08:00 and arriving 12:00 with no seats in any class.
    pub fn new(train: &str, from: &str, to: &str) -> Self {
        let mut fields = vec![String::new(); REQUIRED_FIELDS + 1];
        fields[0] = "secretStr".to_string();
        fields[1] = "预订".to_string();
        fields[2] = format!("24000{train}0A");
        fields[3] = train.to_string();
        fields[4] = from.to_string();
        fields[5] = to.to_string();
        fields[6] = from.to_string();
        fields[7] = to.to_string();
        fields[8] = "08:00".to_string();
        fields[9] = "12:00".to_string();
        fields[10] = "04:00".to_string();
        fields[11] = "Y".to_string();
        Self { fields }
    }

    pub fn times(mut self, departure: &str, arrival: &str, duration: &str) -> Self {
        self.fields[8] = departure.to_string();
        self.fields[9] = arrival.to_string();
        self.fields[10] = duration.to_string();
        self
    }

    /// Set the raw remaining-seat token for a class.
    pub fn seat(mut self, class: SeatClass, token: &str) -> Self {
        self.fields[class.wire_offset()] = token.to_string();
        self
    }

    /// Set a trailing price token such as `¥553.5`.
    pub fn price(mut self, token: &str) -> Self {
        self.fields[REQUIRED_FIELDS] = token.to_string();
        self
    }

    pub fn build(self) -> String {
        self.fields.join("|")
    }
}
