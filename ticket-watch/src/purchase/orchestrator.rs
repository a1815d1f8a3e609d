//! Purchase orchestration.
//!
//! Bookkeeping around an external automation provider that is slow,
//! opaque and may call back late or more than once. All transitions on
//! one watch task (`trigger`, `on_callback`, `stop`) are serialised by a
//! per-task lock; different tasks proceed independently.
//!
//! `trigger` does not hold the lock while the webhook is in flight, so a
//! `stop` is never delayed by a slow provider. When the send returns the
//! RPA task is re-read: a callback may already have concluded it.
//!
//! Separate watch tasks may name the same leg. Checking the purchase
//! ledger and claiming the leg happen under a second lock keyed by
//! [`PurchaseKey`], so at most one of them gets a run.

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::domain::{
    DomainError, ExternalProcessRef, PurchaseKey, PurchaseStatus, RpaStatus, RpaTask, RpaTaskId,
    SeatClass, TicketPurchase, TrainNumber, UserId, WatchStatus, WatchTask, WatchTaskId,
};

use super::locks::KeyedLocks;
use super::notify::{Notifier, outcome_message};
use super::signer::{SignError, sign};
use super::store::{StoreError, TaskStore};
use super::webhook::{WebhookError, WebhookParams, WebhookRequest, WebhookSender};

/// Default bound on one webhook send.
const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(30);

/// Default age after which a `Pending` ledger entry stops blocking.
const DEFAULT_PENDING_EXPIRY: Duration = Duration::from_secs(2 * 60 * 60);

#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("watch task {0} not found")]
    WatchTaskNotFound(WatchTaskId),

    #[error("rpa task {0} not found")]
    RpaTaskNotFound(RpaTaskId),

    #[error("watch task {id} is {status:?}, not active")]
    NotActive { id: WatchTaskId, status: WatchStatus },

    #[error("purchase of {train_number} on {travel_date} is already {status:?}")]
    DuplicatePurchase {
        train_number: String,
        travel_date: NaiveDate,
        status: PurchaseStatus,
    },

    #[error("invalid watch request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Why a trigger attempt failed before the provider accepted it.
#[derive(Debug, thiserror::Error)]
enum SendFailure {
    #[error(transparent)]
    Sign(#[from] SignError),

    #[error(transparent)]
    Webhook(#[from] WebhookError),

    #[error("webhook send timed out after {0:?}")]
    Timeout(Duration),

    #[error("callback URL is not configured")]
    CallbackNotConfigured,
}

/// Configuration for the orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Where the provider should report the outcome of a run.
    pub callback_url: String,
    /// Shared secret for webhook signatures.
    pub sign_key: String,
    /// Bound on one webhook send.
    pub send_timeout: Duration,
    /// A `Pending` purchase older than this no longer blocks a new
    /// attempt on the same leg; its callback is presumed lost.
    pub pending_expiry: Duration,
}

impl OrchestratorConfig {
    pub fn new(callback_url: impl Into<String>, sign_key: impl Into<String>) -> Self {
        Self {
            callback_url: callback_url.into(),
            sign_key: sign_key.into(),
            send_timeout: DEFAULT_SEND_TIMEOUT,
            pending_expiry: DEFAULT_PENDING_EXPIRY,
        }
    }

    pub fn with_send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }

    pub fn with_pending_expiry(mut self, expiry: Duration) -> Self {
        self.pending_expiry = expiry;
        self
    }
}

/// A user's request to start watching a leg.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchRequest {
    pub user_id: UserId,
    pub from_station: String,
    pub to_station: String,
    pub travel_date: NaiveDate,
    pub preferred_trains: Vec<TrainNumber>,
    #[serde(default)]
    pub seat_types: Vec<SeatClass>,
}

/// What `on_callback` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CallbackOutcome {
    /// The RPA task reached its terminal state now.
    Applied {
        rpa_status: RpaStatus,
        watch_status: Option<WatchStatus>,
    },
    /// The RPA task was already terminal; nothing changed.
    AlreadyTerminal { rpa_status: RpaStatus },
}

/// Drives watch tasks and RPA tasks through their lifecycles.
pub struct PurchaseOrchestrator {
    store: Arc<dyn TaskStore>,
    sender: Arc<dyn WebhookSender>,
    notifier: Arc<dyn Notifier>,
    config: OrchestratorConfig,
    locks: KeyedLocks<WatchTaskId>,
    legs: KeyedLocks<PurchaseKey>,
}

impl PurchaseOrchestrator {
    pub fn new(
        store: Arc<dyn TaskStore>,
        sender: Arc<dyn WebhookSender>,
        notifier: Arc<dyn Notifier>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            store,
            sender,
            notifier,
            config,
            locks: KeyedLocks::new(),
            legs: KeyedLocks::new(),
        }
    }

    pub fn store(&self) -> &Arc<dyn TaskStore> {
        &self.store
    }

    /// Create an active watch task. No automation run is started.
    pub async fn create(&self, request: WatchRequest) -> Result<WatchTask, OrchestratorError> {
        let from_station = request.from_station.trim().to_string();
        let to_station = request.to_station.trim().to_string();

        if request.user_id.trim().is_empty() {
            return Err(OrchestratorError::InvalidRequest("userId is empty".into()));
        }
        if from_station.is_empty() || to_station.is_empty() {
            return Err(OrchestratorError::InvalidRequest(
                "fromStation and toStation are required".into(),
            ));
        }
        if from_station == to_station {
            return Err(OrchestratorError::InvalidRequest(format!(
                "fromStation and toStation are both {from_station}"
            )));
        }
        if request.preferred_trains.is_empty() {
            return Err(DomainError::NoPreferredTrain.into());
        }

        let now = Utc::now();
        let task = WatchTask {
            id: WatchTaskId::new(),
            user_id: request.user_id,
            from_station,
            to_station,
            travel_date: request.travel_date,
            preferred_trains: request.preferred_trains,
            seat_types: request.seat_types,
            status: WatchStatus::Active,
            current_rpa_task: None,
            created_at: now,
            updated_at: now,
        };

        self.store.put_watch_task(task.clone()).await?;
        info!(watch_task = %task.id, user = %task.user_id, date = %task.travel_date, "watch task created");
        Ok(task)
    }

    /// Start one automation run for an active watch task.
    ///
    /// Returns the new RPA task: `Running` if the provider accepted the
    /// webhook, `Failed` if signing or sending failed. A failed send is
    /// not retried and leaves the watch task active, so the caller may
    /// trigger again.
    pub async fn trigger(&self, id: WatchTaskId) -> Result<RpaTask, OrchestratorError> {
        let (rpa, params, purchase_key) = {
            let _guard = self.locks.lock(id).await;

            let mut watch = self.load_watch(id).await?;
            if watch.status != WatchStatus::Active {
                return Err(OrchestratorError::NotActive {
                    id,
                    status: watch.status,
                });
            }
            let train = watch
                .primary_train()
                .ok_or(DomainError::NoPreferredTrain)?
                .clone();

            let key = PurchaseKey {
                user_id: watch.user_id.clone(),
                train_number: train.as_str().to_string(),
                travel_date: watch.travel_date,
            };
            let _leg = self.legs.lock(key.clone()).await;
            self.check_leg_free(&key).await?;

            let now = Utc::now();
            let rpa = RpaTask::pending(id, now);
            self.store.put_rpa_task(rpa.clone()).await?;

            watch.current_rpa_task = Some(rpa.id);
            watch.updated_at = now;
            self.store.put_watch_task(watch.clone()).await?;

            self.record_purchase(&key, PurchaseStatus::Pending).await?;

            let params = WebhookParams {
                from_station: watch.from_station.clone(),
                to_station: watch.to_station.clone(),
                travel_date: watch.travel_date.format("%Y-%m-%d").to_string(),
                train_number: train.as_str().to_string(),
                seat_type: watch.primary_seat().chinese_name().to_string(),
                callback_url: self.config.callback_url.clone(),
            };
            (rpa, params, key)
        };

        let sent = self.send(params).await;

        let _guard = self.locks.lock(id).await;
        let mut current = self
            .store
            .rpa_task(rpa.id)
            .await?
            .ok_or(OrchestratorError::RpaTaskNotFound(rpa.id))?;
        let now = Utc::now();

        match sent {
            Ok(external) => {
                if current.status == RpaStatus::Pending {
                    current.start(now, external)?;
                    info!(watch_task = %id, rpa_task = %current.id, "automation run started");
                } else {
                    // The provider called back before the send returned
                    debug!(rpa_task = %current.id, status = ?current.status, "run concluded before send returned");
                    current.start_time.get_or_insert(now);
                    if current.external_process_ref.is_none() {
                        current.external_process_ref = external;
                    }
                }
            }
            Err(e) => {
                warn!(watch_task = %id, rpa_task = %current.id, error = %e, "failed to trigger automation run");
                if current.conclude(false, Some(e.to_string()), now) {
                    self.record_purchase(&purchase_key, PurchaseStatus::Failed)
                        .await?;
                }
            }
        }

        self.store.put_rpa_task(current.clone()).await?;
        Ok(current)
    }

    /// Apply the provider's report for one RPA task.
    ///
    /// Idempotent: once the RPA task is terminal, further callbacks
    /// change nothing. A stopped watch task stays stopped; the purchase
    /// ledger still records the outcome.
    pub async fn on_callback(
        &self,
        rpa_id: RpaTaskId,
        success: bool,
        error_message: Option<String>,
    ) -> Result<CallbackOutcome, OrchestratorError> {
        let watch_id = self
            .store
            .rpa_task(rpa_id)
            .await?
            .ok_or(OrchestratorError::RpaTaskNotFound(rpa_id))?
            .watch_task_id;

        let guard = self.locks.lock(watch_id).await;

        let mut rpa = self
            .store
            .rpa_task(rpa_id)
            .await?
            .ok_or(OrchestratorError::RpaTaskNotFound(rpa_id))?;
        let now = Utc::now();
        let error_message = error_message.filter(|m| !m.trim().is_empty());

        if !rpa.conclude(success, error_message.clone(), now) {
            info!(rpa_task = %rpa_id, status = ?rpa.status, "ignoring callback for finished run");
            return Ok(CallbackOutcome::AlreadyTerminal {
                rpa_status: rpa.status,
            });
        }
        self.store.put_rpa_task(rpa.clone()).await?;

        let Some(mut watch) = self.store.watch_task(watch_id).await? else {
            warn!(rpa_task = %rpa_id, watch_task = %watch_id, "callback for run of a missing watch task");
            return Ok(CallbackOutcome::Applied {
                rpa_status: rpa.status,
                watch_status: None,
            });
        };

        if watch.status == WatchStatus::Active {
            let target = if success {
                WatchStatus::Completed
            } else {
                WatchStatus::Failed
            };
            watch.finish(target, now)?;
            self.store.put_watch_task(watch.clone()).await?;
        } else {
            debug!(watch_task = %watch_id, status = ?watch.status, "watch task already finished, leaving it");
        }

        if let Some(train) = watch.primary_train() {
            let key = PurchaseKey {
                user_id: watch.user_id.clone(),
                train_number: train.as_str().to_string(),
                travel_date: watch.travel_date,
            };
            let status = if success {
                PurchaseStatus::Purchased
            } else {
                PurchaseStatus::Failed
            };
            self.record_purchase(&key, status).await?;
        }

        drop(guard);

        info!(rpa_task = %rpa_id, watch_task = %watch_id, success, "automation run finished");

        let message = outcome_message(success, error_message.as_deref());
        if let Err(e) = self.notifier.notify(&watch.user_id, &message).await {
            warn!(user = %watch.user_id, error = %e, "failed to deliver notification");
        }

        Ok(CallbackOutcome::Applied {
            rpa_status: rpa.status,
            watch_status: Some(watch.status),
        })
    }

    /// Stop watching. Takes effect immediately, even with a run in flight;
    /// that run is not cancelled. Stopping a stopped task is a no-op.
    ///
    /// The leg stays `Pending` in the ledger until the run's callback
    /// arrives or the entry passes `pending_expiry`.
    pub async fn stop(&self, id: WatchTaskId) -> Result<WatchTask, OrchestratorError> {
        let _guard = self.locks.lock(id).await;

        let mut watch = self.load_watch(id).await?;
        if watch.status == WatchStatus::Stopped {
            return Ok(watch);
        }
        watch.finish(WatchStatus::Stopped, Utc::now())?;
        self.store.put_watch_task(watch.clone()).await?;

        info!(watch_task = %id, running_run = ?watch.current_rpa_task, "watch task stopped");
        Ok(watch)
    }

    pub async fn watch_task(&self, id: WatchTaskId) -> Result<WatchTask, OrchestratorError> {
        self.load_watch(id).await
    }

    /// Every run for a watch task, oldest first.
    pub async fn rpa_tasks(&self, id: WatchTaskId) -> Result<Vec<RpaTask>, OrchestratorError> {
        Ok(self.store.rpa_tasks_for(id).await?)
    }

    async fn load_watch(&self, id: WatchTaskId) -> Result<WatchTask, OrchestratorError> {
        self.store
            .watch_task(id)
            .await?
            .ok_or(OrchestratorError::WatchTaskNotFound(id))
    }

    /// Refuse a leg that is already bought or has a live attempt.
    async fn check_leg_free(&self, key: &PurchaseKey) -> Result<(), OrchestratorError> {
        let Some(existing) = self.store.purchase(key).await? else {
            return Ok(());
        };
        if !existing.purchase_status.blocks_new_attempt() {
            return Ok(());
        }

        let age = (Utc::now() - existing.updated_at).to_std().unwrap_or_default();
        if existing.purchase_status == PurchaseStatus::Pending && age > self.config.pending_expiry {
            warn!(
                user = %key.user_id,
                train = %key.train_number,
                date = %key.travel_date,
                age_secs = age.as_secs(),
                "pending purchase expired, allowing a new attempt"
            );
            return Ok(());
        }

        Err(OrchestratorError::DuplicatePurchase {
            train_number: key.train_number.clone(),
            travel_date: key.travel_date,
            status: existing.purchase_status,
        })
    }

    async fn record_purchase(
        &self,
        key: &PurchaseKey,
        status: PurchaseStatus,
    ) -> Result<(), OrchestratorError> {
        self.store
            .put_purchase(TicketPurchase {
                user_id: key.user_id.clone(),
                train_number: key.train_number.clone(),
                travel_date: key.travel_date,
                purchase_status: status,
                updated_at: Utc::now(),
            })
            .await?;
        Ok(())
    }

    async fn send(
        &self,
        params: WebhookParams,
    ) -> Result<Option<ExternalProcessRef>, SendFailure> {
        if params.callback_url.trim().is_empty() {
            return Err(SendFailure::CallbackNotConfigured);
        }
        let timestamp = Utc::now().timestamp();
        let request = WebhookRequest {
            sign: sign(&self.config.sign_key, timestamp)?,
            timestamp: timestamp.to_string(),
            params,
        };

        match tokio::time::timeout(self.config.send_timeout, self.sender.send(&request)).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(SendFailure::Timeout(self.config.send_timeout)),
        }
    }
}
