//! Outbound SMS through the Twilio Messages API.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::config::{Config, TwilioCredentials};

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("SMS gateway credentials are not configured")]
    NotConfigured,

    #[error("SMS gateway unreachable: {0}")]
    Transport(String),

    #[error("SMS gateway rejected message ({status}): {message}")]
    Rejected { status: u16, message: String },
}

#[async_trait]
pub trait SmsGateway: Send + Sync {
    /// Send `body` to an already-normalized number. Returns the provider's
    /// message id. Each call delivers a new, billable message.
    async fn send(&self, to: &str, body: &str) -> Result<String, DispatchError>;
}

#[derive(Debug, Deserialize)]
struct MessageResource {
    sid: String,
}

#[derive(Debug, Deserialize)]
struct TwilioErrorBody {
    message: Option<String>,
    code: Option<i64>,
}

pub struct TwilioGateway {
    client: reqwest::Client,
    base_url: Url,
    credentials: Option<TwilioCredentials>,
}

impl TwilioGateway {
    pub fn new(base_url: &str, credentials: Option<TwilioCredentials>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: Url::parse(base_url)?,
            credentials,
        })
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Self::new(&config.twilio_base_url, config.twilio.clone(), config.http_timeout)
    }

    fn messages_url(&self, account_sid: &str) -> Result<Url, DispatchError> {
        self.base_url
            .join(&format!("/2010-04-01/Accounts/{account_sid}/Messages.json"))
            .map_err(|e| DispatchError::Transport(e.to_string()))
    }
}

#[async_trait]
impl SmsGateway for TwilioGateway {
    async fn send(&self, to: &str, body: &str) -> Result<String, DispatchError> {
        let creds = self.credentials.as_ref().ok_or(DispatchError::NotConfigured)?;
        let url = self.messages_url(&creds.account_sid)?;

        let resp = self
            .client
            .post(url)
            .basic_auth(&creds.account_sid, Some(&creds.auth_token))
            .form(&[("To", to), ("From", creds.from_number.as_str()), ("Body", body)])
            .send()
            .await
            .map_err(|e| DispatchError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(rejection(status.as_u16(), &text));
        }

        let message: MessageResource = resp
            .json()
            .await
            .map_err(|e| DispatchError::Transport(e.to_string()))?;
        tracing::info!(sid = %message.sid, "SMS accepted by gateway");
        Ok(message.sid)
    }
}

fn rejection(status: u16, body: &str) -> DispatchError {
    let message = serde_json::from_str::<TwilioErrorBody>(body)
        .ok()
        .and_then(|e| match (e.message, e.code) {
            (Some(m), Some(c)) => Some(format!("{m} (code {c})")),
            (Some(m), None) => Some(m),
            _ => None,
        })
        .unwrap_or_else(|| format!("HTTP {status}"));
    DispatchError::Rejected { status, message }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_carries_provider_message() {
        let err = rejection(
            400,
            r#"{"code":21211,"message":"The 'To' number +91 is not a valid phone number.","status":400}"#,
        );
        assert_eq!(
            err.to_string(),
            "SMS gateway rejected message (400): The 'To' number +91 is not a valid phone number. (code 21211)"
        );
    }

    #[test]
    fn rejection_without_json_uses_status() {
        let err = rejection(503, "<html>unavailable</html>");
        assert!(matches!(err, DispatchError::Rejected { status: 503, ref message } if message == "HTTP 503"));
    }

    #[test]
    fn messages_url_is_account_scoped() {
        let gw = TwilioGateway::new("https://api.twilio.com", None, Duration::from_secs(1)).unwrap();
        assert_eq!(
            gw.messages_url("AC123").unwrap().as_str(),
            "https://api.twilio.com/2010-04-01/Accounts/AC123/Messages.json"
        );
    }

    #[tokio::test]
    async fn unconfigured_gateway_refuses_to_send() {
        let gw = TwilioGateway::new("https://api.twilio.com", None, Duration::from_secs(1)).unwrap();
        assert!(matches!(gw.send("+919876543210", "hi").await, Err(DispatchError::NotConfigured)));
    }
}
