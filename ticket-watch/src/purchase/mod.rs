//! Purchase orchestration around the external automation provider.
//!
//! The provider is a black box reached through a signed webhook. It
//! reports back, eventually and possibly more than once, on a callback
//! URL. This module keeps the task bookkeeping consistent through that.

mod locks;
mod notify;
mod orchestrator;
mod signer;
mod store;
mod webhook;

pub use notify::{LogNotifier, Notifier, NotifyError, outcome_message};
pub use orchestrator::{
    CallbackOutcome, OrchestratorConfig, OrchestratorError, PurchaseOrchestrator, WatchRequest,
};
pub use signer::{SignError, sign};
pub use store::{InMemoryTaskStore, StoreError, TaskStore};
pub use webhook::{
    HttpWebhookSender, WebhookConfig, WebhookError, WebhookParams, WebhookRequest, WebhookSender,
};
