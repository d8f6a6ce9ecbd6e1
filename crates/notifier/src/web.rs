//! Web notification API client.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;

use skycast_common::error::AppError;
use skycast_common::types::{Channel, UserProfile};

use crate::sender::Sender;

const SEND_NOTIFICATION_PATH: &str = "/notification/send";

/// Request body understood by the web notification API.
#[derive(Debug, Serialize)]
struct ExternalNotification<'a> {
    id: &'a str,
    content: &'a str,
}

/// Delivers notifications through the web notification API.
pub struct WebSender {
    http: reqwest::Client,
    send_url: String,
}

impl WebSender {
    pub fn new(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            send_url: format!("{}{}", base_url.trim_end_matches('/'), SEND_NOTIFICATION_PATH),
        }
    }
}

#[async_trait]
impl Sender for WebSender {
    fn channel(&self) -> Channel {
        Channel::Web
    }

    async fn send(&self, recipient: &UserProfile, content: &str) -> Result<(), AppError> {
        let web = &recipient.notifications.web;
        if !web.enabled {
            return Err(AppError::OptedOut(Channel::Web.to_string()));
        }

        let response = self
            .http
            .post(&self.send_url)
            .json(&ExternalNotification {
                id: &web.id,
                content,
            })
            .send()
            .await
            .map_err(|e| {
                AppError::Upstream(format!("failed to send notification to web api: {}", e))
            })?;

        if response.status() != StatusCode::ACCEPTED {
            return Err(AppError::Upstream(format!(
                "failed to send notification to web api: unexpected status code {}",
                response.status()
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skycast_common::types::{NotificationSettings, WebSettings};
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn recipient(web_enabled: bool) -> UserProfile {
        UserProfile {
            id: "USER-1".to_string(),
            name: "Ana".to_string(),
            notifications: NotificationSettings {
                enabled: true,
                web: WebSettings {
                    enabled: web_enabled,
                    id: "WEB-9".to_string(),
                },
                ..Default::default()
            },
        }
    }

    #[tokio::test]
    async fn test_posts_notification() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/notification/send"))
            .and(body_json(serde_json::json!({"id": "WEB-9", "content": "hello"})))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        let sender = WebSender::new(reqwest::Client::new(), &server.uri());
        sender.send(&recipient(true), "hello").await.unwrap();
    }

    #[tokio::test]
    async fn test_opted_out_sends_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(202))
            .expect(0)
            .mount(&server)
            .await;

        let sender = WebSender::new(reqwest::Client::new(), &server.uri());
        let err = sender.send(&recipient(false), "hello").await.unwrap_err();
        assert!(matches!(err, AppError::OptedOut(_)));
    }

    #[tokio::test]
    async fn test_unexpected_status_is_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let sender = WebSender::new(reqwest::Client::new(), &server.uri());
        let err = sender.send(&recipient(true), "hello").await.unwrap_err();
        assert!(matches!(err, AppError::Upstream(_)));
    }
}
