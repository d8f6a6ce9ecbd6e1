//! Email delivery through the Resend HTTP API.

use async_trait::async_trait;
use serde::Serialize;

use skycast_common::error::AppError;
use skycast_common::types::{Channel, UserProfile};

use crate::sender::Sender;

const RESEND_API_URL: &str = "https://api.resend.com/emails";
const EMAIL_SUBJECT: &str = "Your SkyCast forecast";

#[derive(Debug, Serialize)]
struct ResendEmail<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    text: &'a str,
}

/// Delivers notifications as plain-text emails.
pub struct EmailSender {
    http: reqwest::Client,
    api_key: String,
    from: String,
    endpoint: String,
}

impl EmailSender {
    pub fn new(http: reqwest::Client, api_key: &str, from: &str) -> Self {
        Self {
            http,
            api_key: api_key.to_string(),
            from: from.to_string(),
            endpoint: RESEND_API_URL.to_string(),
        }
    }

    /// Point the sender at another Resend-compatible endpoint.
    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.to_string();
        self
    }
}

#[async_trait]
impl Sender for EmailSender {
    fn channel(&self) -> Channel {
        Channel::Email
    }

    async fn send(&self, recipient: &UserProfile, content: &str) -> Result<(), AppError> {
        let email = &recipient.notifications.email;
        if !email.enabled || email.address.is_empty() {
            return Err(AppError::OptedOut(Channel::Email.to_string()));
        }

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&ResendEmail {
                from: &self.from,
                to: [&email.address],
                subject: EMAIL_SUBJECT,
                text: content,
            })
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("failed to send email: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!(
                "failed to send email: status {} {}",
                status, detail
            )));
        }

        tracing::debug!(user_id = %recipient.id, "Email accepted by Resend");
        Ok(())
    }
}
