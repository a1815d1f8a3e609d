//! The poll cycle and its scheduling loop.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{FixedOffset, NaiveDate, Utc};
use futures::stream::{self, StreamExt};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::calendar::CalendarEngine;
use crate::domain::{
    CommutePreference, PurchaseKey, PurchaseStatus, StationCode, TicketAvailability, UserId,
};
use crate::purchase::TaskStore;
use crate::query::{QueryError, QueryTransport, parse_record};
use crate::stations::StationDirectory;

use super::config::PollerConfig;
use super::snapshot::{AvailabilityEntry, AvailabilitySnapshot, DateAvailability};

/// Shortest interval the scheduling loop accepts.
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Today's date on the provider's clock (UTC+8).
pub fn china_today() -> NaiveDate {
    let now = Utc::now();
    FixedOffset::east_opt(8 * 3600)
        .map_or_else(|| now.date_naive(), |tz| now.with_timezone(&tz).date_naive())
}

/// Collaborators shared by every poller in the process.
#[derive(Clone)]
pub struct PollerContext {
    pub directory: StationDirectory,
    pub calendar: Arc<CalendarEngine>,
    pub transport: Arc<dyn QueryTransport>,
    /// Purchase ledger used to mark bought tickets; `None` marks nothing.
    pub store: Option<Arc<dyn TaskStore>>,
    pub config: PollerConfig,
}

/// Polls availability for one user's commute preference.
pub struct AvailabilityPoller {
    user_id: UserId,
    preference: CommutePreference,
    ctx: PollerContext,
    cycles: AtomicU64,
}

impl AvailabilityPoller {
    /// Preferences are validated by construction, so a poller can always run.
    pub fn new(
        user_id: impl Into<UserId>,
        preference: CommutePreference,
        ctx: PollerContext,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            preference,
            ctx,
            cycles: AtomicU64::new(0),
        }
    }

    /// Run one cycle for the window starting at `anchor`.
    ///
    /// Always yields an entry for every candidate date. Failures are
    /// contained per date (or per route, for station lookups) and show up
    /// as [`DateAvailability::NoData`].
    pub async fn poll_cycle(&self, anchor: NaiveDate) -> AvailabilitySnapshot {
        let cycle = self.cycles.fetch_add(1, Ordering::SeqCst) + 1;
        let config = &self.ctx.config;

        let dates =
            self.ctx
                .calendar
                .next_n_candidate_dates(config.candidate_days, anchor, config.filter);
        if let Err(e) = self.ctx.calendar.check_coverage(&dates) {
            warn!(user = %self.user_id, error = %e, "falling back to weekday rules");
        }

        let results: Vec<(NaiveDate, DateAvailability)> = match self.resolve_route().await {
            Ok((from, to)) => {
                stream::iter(dates)
                    .map(|date| async move { (date, self.poll_date(date, from, to).await) })
                    .buffer_unordered(config.max_concurrent.max(1))
                    .collect()
                    .await
            }
            Err(reason) => dates
                .into_iter()
                .map(|date| {
                    (
                        date,
                        DateAvailability::NoData {
                            reason: reason.clone(),
                        },
                    )
                })
                .collect(),
        };

        let failed = results.iter().filter(|(_, d)| d.is_no_data()).count();
        debug!(
            user = %self.user_id,
            cycle,
            dates = results.len(),
            failed,
            "poll cycle complete"
        );

        AvailabilitySnapshot {
            cycle,
            generated_at: Utc::now(),
            dates: results.into_iter().collect(),
        }
    }

    /// Run cycles every `interval` until cancelled, publishing each result.
    ///
    /// Cancellation is checked before each cycle starts. A cycle already
    /// in flight runs to completion, but its result is dropped.
    pub async fn run(
        self,
        cancel: CancellationToken,
        publish: watch::Sender<Option<Arc<AvailabilitySnapshot>>>,
    ) {
        let mut interval = tokio::time::interval(self.ctx.config.interval.max(MIN_INTERVAL));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(
            user = %self.user_id,
            from = %self.preference.from_station,
            to = %self.preference.to_station,
            "poller started"
        );

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {}
            }

            let snapshot = self.poll_cycle(china_today()).await;

            if cancel.is_cancelled() {
                debug!(user = %self.user_id, cycle = snapshot.cycle, "cancelled mid-cycle, discarding result");
                break;
            }
            publish.send_replace(Some(Arc::new(snapshot)));
        }

        info!(user = %self.user_id, "poller stopped");
    }

    /// Start the scheduling loop on the runtime.
    pub fn spawn(self) -> PollerHandle {
        let (publish, snapshots) = watch::channel(None);
        let cancel = CancellationToken::new();
        let preference = self.preference.clone();
        let task = tokio::spawn(self.run(cancel.clone(), publish));

        PollerHandle {
            preference,
            cancel,
            snapshots,
            task,
        }
    }

    async fn resolve_route(&self) -> Result<(StationCode, StationCode), String> {
        let directory = &self.ctx.directory;
        let from = directory.resolve(&self.preference.from_station).await;
        let to = directory.resolve(&self.preference.to_station).await;

        match (from, to) {
            (Ok(from), Ok(to)) => Ok((from, to)),
            (Err(e), _) | (_, Err(e)) => {
                warn!(user = %self.user_id, error = %e, "station unresolved, skipping cycle's queries");
                Err(e.to_string())
            }
        }
    }

    async fn poll_date(
        &self,
        date: NaiveDate,
        from: StationCode,
        to: StationCode,
    ) -> DateAvailability {
        let timeout = self.ctx.config.query_timeout;
        let query = self.ctx.transport.query(date, from, to);
        let records = match tokio::time::timeout(timeout, query).await {
            Ok(Ok(records)) => records,
            Ok(Err(e)) => return self.no_data(date, e),
            Err(_) => {
                return self.no_data(
                    date,
                    QueryError::Timeout {
                        secs: timeout.as_secs(),
                    },
                );
            }
        };

        let mut trains = BTreeMap::new();
        for raw in &records {
            match parse_record(raw, date) {
                Ok(ticket) if self.preference.wants(&ticket.train_number) => {
                    let purchased = self.is_purchased(&ticket).await;
                    // A later record for the same train replaces the earlier one
                    trains.insert(
                        ticket.train_number.clone(),
                        AvailabilityEntry { ticket, purchased },
                    );
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(user = %self.user_id, %date, error = %e, "skipping malformed record");
                }
            }
        }

        DateAvailability::Available { trains }
    }

    fn no_data(&self, date: NaiveDate, error: QueryError) -> DateAvailability {
        warn!(user = %self.user_id, %date, error = %error, "query failed, no data for date");
        DateAvailability::NoData {
            reason: error.to_string(),
        }
    }

    async fn is_purchased(&self, ticket: &TicketAvailability) -> bool {
        let Some(store) = &self.ctx.store else {
            return false;
        };
        let key = PurchaseKey {
            user_id: self.user_id.clone(),
            train_number: ticket.train_number.clone(),
            travel_date: ticket.travel_date,
        };
        match store.purchase(&key).await {
            Ok(Some(p)) => p.purchase_status == PurchaseStatus::Purchased,
            Ok(None) => false,
            Err(e) => {
                warn!(user = %self.user_id, error = %e, "purchase lookup failed");
                false
            }
        }
    }
}

/// Owner's handle on a running poller.
pub struct PollerHandle {
    preference: CommutePreference,
    cancel: CancellationToken,
    snapshots: watch::Receiver<Option<Arc<AvailabilitySnapshot>>>,
    task: JoinHandle<()>,
}

impl PollerHandle {
    pub fn preference(&self) -> &CommutePreference {
        &self.preference
    }

    /// The most recently published snapshot, if any cycle has finished.
    pub fn latest(&self) -> Option<Arc<AvailabilitySnapshot>> {
        self.snapshots.borrow().clone()
    }

    /// Watch for new snapshots.
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<AvailabilitySnapshot>>> {
        self.snapshots.clone()
    }

    /// Request cancellation. Returns immediately.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Cancel and wait for the loop to exit.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            warn!(error = %e, "poller task ended abnormally");
        }
    }
}
