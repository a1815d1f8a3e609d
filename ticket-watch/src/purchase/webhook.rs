//! Outbound webhook to the automation provider.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::ExternalProcessRef;

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Trip parameters handed to the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookParams {
    pub from_station: String,
    pub to_station: String,
    /// `YYYY-MM-DD`
    pub travel_date: String,
    pub train_number: String,
    /// Provider display name, e.g. `二等座`.
    pub seat_type: String,
    pub callback_url: String,
}

/// Body of one webhook call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookRequest {
    pub sign: String,
    /// Unix seconds, sent as a string.
    pub timestamp: String,
    pub params: WebhookParams,
}

/// The provider's acknowledgement of a run.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WebhookReply {
    enterprise_id: Option<String>,
    flow_id: Option<String>,
    flow_process_no: Option<String>,
}

impl WebhookReply {
    fn into_process_ref(self) -> Option<ExternalProcessRef> {
        if self.enterprise_id.is_none() && self.flow_id.is_none() && self.flow_process_no.is_none()
        {
            return None;
        }
        Some(ExternalProcessRef {
            enterprise_id: self.enterprise_id,
            flow_id: self.flow_id,
            flow_process_no: self.flow_process_no,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("webhook URL is not configured")]
    NotConfigured,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("webhook timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("provider rejected webhook with status {status}: {message}")]
    Rejected { status: u16, message: String },
}

/// Anything that can deliver a signed request to the provider.
#[async_trait]
pub trait WebhookSender: Send + Sync {
    /// Deliver once. `Ok` means the provider accepted the run.
    async fn send(&self, request: &WebhookRequest)
    -> Result<Option<ExternalProcessRef>, WebhookError>;
}

/// Configuration for the HTTP webhook sender.
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    /// Provider invoke URL; empty means unconfigured.
    pub url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl WebhookConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// Posts webhook requests as JSON.
#[derive(Debug, Clone)]
pub struct HttpWebhookSender {
    http: reqwest::Client,
    url: String,
    timeout_secs: u64,
}

impl HttpWebhookSender {
    pub fn new(config: WebhookConfig) -> Result<Self, WebhookError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            url: config.url,
            timeout_secs: config.timeout_secs,
        })
    }
}

#[async_trait]
impl WebhookSender for HttpWebhookSender {
    async fn send(
        &self,
        request: &WebhookRequest,
    ) -> Result<Option<ExternalProcessRef>, WebhookError> {
        if self.url.is_empty() {
            return Err(WebhookError::NotConfigured);
        }

        let response = self
            .http
            .post(&self.url)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    WebhookError::Timeout {
                        secs: self.timeout_secs,
                    }
                } else {
                    WebhookError::Http(e)
                }
            })?;

        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(WebhookError::Rejected {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = response.text().await.unwrap_or_default();
        Ok(parse_reply(&body))
    }
}

/// Pull the process reference out of an accepted reply, if it has one.
fn parse_reply(body: &str) -> Option<ExternalProcessRef> {
    match serde_json::from_str::<WebhookReply>(body) {
        Ok(reply) => reply.into_process_ref(),
        Err(e) => {
            debug!(error = %e, "webhook reply is not a process reference");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_wire_shape() {
        let request = WebhookRequest {
            sign: "abc=".to_string(),
            timestamp: "1700000000".to_string(),
            params: WebhookParams {
                from_station: "北京".to_string(),
                to_station: "上海".to_string(),
                travel_date: "2025-03-03".to_string(),
                train_number: "G1".to_string(),
                seat_type: "二等座".to_string(),
                callback_url: "https://example.test/api/rpa/callback".to_string(),
            },
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["sign"], "abc=");
        assert_eq!(json["timestamp"], "1700000000");
        assert_eq!(json["params"]["fromStation"], "北京");
        assert_eq!(json["params"]["travelDate"], "2025-03-03");
        assert_eq!(json["params"]["seatType"], "二等座");
        assert_eq!(
            json["params"]["callbackUrl"],
            "https://example.test/api/rpa/callback"
        );
    }

    #[test]
    fn reply_with_process_ref() {
        let reply = parse_reply(r#"{"enterpriseId":"e1","flowId":"f1","flowProcessNo":"p1"}"#)
            .unwrap();
        assert_eq!(reply.enterprise_id.as_deref(), Some("e1"));
        assert_eq!(reply.flow_id.as_deref(), Some("f1"));
        assert_eq!(reply.flow_process_no.as_deref(), Some("p1"));
    }

    #[test]
    fn reply_without_process_ref() {
        assert!(parse_reply(r#"{"code":0}"#).is_none());
        assert!(parse_reply("OK").is_none());
        assert!(parse_reply("").is_none());
    }

    #[tokio::test]
    async fn unconfigured_url_fails_without_network() {
        let sender = HttpWebhookSender::new(WebhookConfig::new("")).unwrap();
        let request = WebhookRequest {
            sign: String::new(),
            timestamp: "0".to_string(),
            params: WebhookParams {
                from_station: String::new(),
                to_station: String::new(),
                travel_date: String::new(),
                train_number: String::new(),
                seat_type: String::new(),
                callback_url: String::new(),
            },
        };
        assert!(matches!(
            sender.send(&request).await,
            Err(WebhookError::NotConfigured)
        ));
    }
}
