//! Watch tasks, RPA tasks and purchase records.
//!
//! Transition methods enforce the lifecycle rules: a watch task only
//! leaves `Active` once, and an RPA task reaches a terminal state at most
//! once. Anything that would move a record backwards is rejected with a
//! [`DomainError`] rather than silently applied.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::DomainError;
use super::seat::SeatClass;
use super::train_number::TrainNumber;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generate a fresh random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }
    };
}

id_type!(
    /// Identifier of a [`WatchTask`].
    WatchTaskId
);
id_type!(
    /// Identifier of an [`RpaTask`].
    RpaTaskId
);

/// Opaque user identifier owned by the external account system.
pub type UserId = String;

/// Lifecycle of a watch task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchStatus {
    Active,
    Completed,
    Failed,
    Stopped,
}

impl WatchStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, WatchStatus::Active)
    }
}

/// Lifecycle of one automation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RpaStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl RpaStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, RpaStatus::Completed | RpaStatus::Failed)
    }
}

/// A user's intent to monitor and eventually buy a ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchTask {
    pub id: WatchTaskId,
    pub user_id: UserId,
    pub from_station: String,
    pub to_station: String,
    pub travel_date: NaiveDate,
    pub preferred_trains: Vec<TrainNumber>,
    pub seat_types: Vec<SeatClass>,
    pub status: WatchStatus,
    /// The most recent automation attempt, if any.
    pub current_rpa_task: Option<RpaTaskId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WatchTask {
    /// The train the automation provider is asked to buy.
    pub fn primary_train(&self) -> Option<&TrainNumber> {
        self.preferred_trains.first()
    }

    /// The seat class requested from the provider (second class if none given).
    pub fn primary_seat(&self) -> SeatClass {
        self.seat_types.first().copied().unwrap_or_default()
    }

    /// Move out of `Active`. Fails if the task already left it.
    pub fn finish(&mut self, status: WatchStatus, now: DateTime<Utc>) -> Result<(), DomainError> {
        if status == WatchStatus::Active || self.status.is_terminal() {
            return Err(DomainError::InvalidTransition {
                entity: "watch task",
                from: format!("{:?}", self.status),
                to: format!("{status:?}"),
            });
        }
        self.status = status;
        self.updated_at = now;
        Ok(())
    }
}

/// What the provider returned when it accepted a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalProcessRef {
    pub enterprise_id: Option<String>,
    pub flow_id: Option<String>,
    pub flow_process_no: Option<String>,
}

/// One attempt by the external automation provider to buy a ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpaTask {
    pub id: RpaTaskId,
    pub watch_task_id: WatchTaskId,
    pub status: RpaStatus,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub external_process_ref: Option<ExternalProcessRef>,
    pub created_at: DateTime<Utc>,
}

impl RpaTask {
    /// A new attempt in `Pending`.
    pub fn pending(watch_task_id: WatchTaskId, now: DateTime<Utc>) -> Self {
        Self {
            id: RpaTaskId::new(),
            watch_task_id,
            status: RpaStatus::Pending,
            start_time: None,
            end_time: None,
            error_message: None,
            external_process_ref: None,
            created_at: now,
        }
    }

    /// `Pending` → `Running` once the provider accepted the webhook.
    pub fn start(
        &mut self,
        now: DateTime<Utc>,
        external: Option<ExternalProcessRef>,
    ) -> Result<(), DomainError> {
        if self.status != RpaStatus::Pending {
            return Err(DomainError::InvalidTransition {
                entity: "rpa task",
                from: format!("{:?}", self.status),
                to: "Running".to_string(),
            });
        }
        self.status = RpaStatus::Running;
        self.start_time = Some(now);
        self.external_process_ref = external;
        Ok(())
    }

    /// Terminal transition. Returns `false` (and changes nothing) if the
    /// task already reached a terminal state.
    pub fn conclude(
        &mut self,
        success: bool,
        error_message: Option<String>,
        now: DateTime<Utc>,
    ) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = if success {
            RpaStatus::Completed
        } else {
            RpaStatus::Failed
        };
        self.end_time = Some(now);
        self.error_message = error_message;
        true
    }
}

/// Outcome of buying one leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseStatus {
    Pending,
    Purchased,
    Failed,
}

impl PurchaseStatus {
    /// Whether a new attempt for the same leg must be refused.
    pub fn blocks_new_attempt(self) -> bool {
        matches!(self, PurchaseStatus::Pending | PurchaseStatus::Purchased)
    }
}

/// Dedup key for purchases: one attempt per user, train and date.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PurchaseKey {
    pub user_id: UserId,
    pub train_number: String,
    pub travel_date: NaiveDate,
}

/// A purchase attempt record for one leg.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketPurchase {
    pub user_id: UserId,
    pub train_number: String,
    pub travel_date: NaiveDate,
    pub purchase_status: PurchaseStatus,
    pub updated_at: DateTime<Utc>,
}

impl TicketPurchase {
    pub fn key(&self) -> PurchaseKey {
        PurchaseKey {
            user_id: self.user_id.clone(),
            train_number: self.train_number.clone(),
            travel_date: self.travel_date,
        }
    }
}
