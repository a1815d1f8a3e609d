//! User notifications about purchase outcomes.

use async_trait::async_trait;
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification delivery failed: {0}")]
    Delivery(String),
}

/// Delivers a short message to a user. Delivery is best effort.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, user_id: &str, message: &str) -> Result<(), NotifyError>;
}

/// Writes notifications to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, user_id: &str, message: &str) -> Result<(), NotifyError> {
        info!(user = user_id, message, "user notification");
        Ok(())
    }
}

/// The message shown to a user when an automation run finishes.
pub fn outcome_message(success: bool, error: Option<&str>) -> String {
    let mut message = if success {
        "抢票成功！".to_string()
    } else {
        "抢票失败！".to_string()
    };
    if let Some(error) = error.filter(|e| !e.is_empty()) {
        message.push_str("错误信息：");
        message.push_str(error);
    }
    message
}
