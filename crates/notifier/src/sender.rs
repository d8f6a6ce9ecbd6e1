use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use skycast_common::config::AppConfig;
use skycast_common::error::AppError;
use skycast_common::types::{Channel, UserProfile};

use crate::email::EmailSender;
use crate::web::WebSender;

/// Transport able to deliver rendered content to one user on one channel.
#[async_trait]
pub trait Sender: Send + Sync {
    fn channel(&self) -> Channel;

    /// Deliver `content` to `recipient`.
    ///
    /// Returns `AppError::OptedOut` when the recipient disabled this channel;
    /// callers treat that as a skipped, successful send.
    async fn send(&self, recipient: &UserProfile, content: &str) -> Result<(), AppError>;
}

/// Fixed set of senders keyed by channel, built once at startup.
#[derive(Clone, Default)]
pub struct SenderRegistry {
    senders: HashMap<Channel, Arc<dyn Sender>>,
}

impl SenderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `sender` under its own channel, replacing any previous one.
    pub fn register(mut self, sender: Arc<dyn Sender>) -> Self {
        self.senders.insert(sender.channel(), sender);
        self
    }

    /// Look up the sender for `channel`.
    pub fn get(&self, channel: Channel) -> Result<&dyn Sender, AppError> {
        self.senders
            .get(&channel)
            .map(|sender| sender.as_ref())
            .ok_or_else(|| AppError::UnknownChannel(channel.to_string()))
    }

    /// Registered channels, in no particular order.
    pub fn channels(&self) -> Vec<Channel> {
        self.senders.keys().copied().collect()
    }

    /// Register every channel whose settings are present in `config`.
    pub fn from_config(config: &AppConfig, http: reqwest::Client) -> Self {
        let mut registry = Self::new();

        if let Some(url) = &config.web_notification_api_url {
            registry = registry.register(Arc::new(WebSender::new(http.clone(), url)));
        }

        match (&config.resend_api_key, &config.email_from) {
            (Some(api_key), Some(from)) => {
                registry = registry.register(Arc::new(EmailSender::new(http, api_key, from)));
            }
            (Some(_), None) | (None, Some(_)) => {
                tracing::warn!("Email channel disabled: RESEND_API_KEY and EMAIL_FROM must both be set");
            }
            (None, None) => {}
        }

        tracing::info!(channels = ?registry.channels(), "Notification channels registered");
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullSender(Channel);

    #[async_trait]
    impl Sender for NullSender {
        fn channel(&self) -> Channel {
            self.0
        }

        async fn send(&self, _recipient: &UserProfile, _content: &str) -> Result<(), AppError> {
            Ok(())
        }
    }

    #[test]
    fn test_lookup_registered_channel() {
        let registry = SenderRegistry::new().register(Arc::new(NullSender(Channel::Web)));
        assert_eq!(registry.get(Channel::Web).unwrap().channel(), Channel::Web);
    }

    #[test]
    fn test_unregistered_channel_is_unknown() {
        let registry = SenderRegistry::new().register(Arc::new(NullSender(Channel::Web)));
        assert!(matches!(
            registry.get(Channel::Email),
            Err(AppError::UnknownChannel(name)) if name == "email"
        ));
    }
}
