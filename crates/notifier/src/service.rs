use std::sync::Arc;

use async_trait::async_trait;

use skycast_common::config::AppConfig;
use skycast_common::error::AppError;
use skycast_common::types::{Channel, Notification, UserProfile};
use skycast_queue::Processor;

use crate::forecast::ContentProvider;
use crate::sender::{Sender, SenderRegistry};
use crate::users::UserFinder;

/// Resolves recipients and routes content to the right sender.
pub struct NotificationService {
    users: Arc<dyn UserFinder>,
    content: Arc<dyn ContentProvider>,
    senders: SenderRegistry,
    default_channel: Channel,
}

impl NotificationService {
    pub fn new(
        users: Arc<dyn UserFinder>,
        content: Arc<dyn ContentProvider>,
        senders: SenderRegistry,
        default_channel: Channel,
    ) -> Self {
        Self {
            users,
            content,
            senders,
            default_channel,
        }
    }

    /// Build the service from `config`. Fails when `DEFAULT_CHANNEL` is not a
    /// channel or has no configured sender.
    pub fn from_config(
        users: Arc<dyn UserFinder>,
        content: Arc<dyn ContentProvider>,
        config: &AppConfig,
        http: reqwest::Client,
    ) -> Result<Self, AppError> {
        let default_channel: Channel = config.default_channel.parse()?;
        let senders = SenderRegistry::from_config(config, http);

        if senders.get(default_channel).is_err() {
            return Err(AppError::Config(format!(
                "DEFAULT_CHANNEL {} has no configured sender",
                default_channel
            )));
        }

        Ok(Self::new(users, content, senders, default_channel))
    }

    /// Render the forecast for `city_name` and send it to `user_id` on the
    /// default channel.
    pub async fn notify_user(&self, user_id: &str, city_name: &str) -> Result<(), AppError> {
        let recipient = self.users.find_user(user_id).await?;
        if !recipient.notifications.enabled {
            tracing::info!(user_id, "Notifications disabled for user, skipping");
            return Ok(());
        }

        let channel = self.default_channel;
        let sender = self.senders.get(channel)?;
        let content = self.content.render(&recipient, city_name).await?;

        self.deliver(&recipient, channel, sender, &content).await
    }

    /// Send a pre-rendered notification.
    pub async fn dispatch(&self, notification: &Notification) -> Result<(), AppError> {
        let recipient = self.users.find_user(&notification.user_id).await?;
        if !recipient.notifications.enabled {
            tracing::info!(
                user_id = %notification.user_id,
                "Notifications disabled for user, skipping"
            );
            return Ok(());
        }

        let channel: Channel = notification.channel.parse()?;
        let sender = self.senders.get(channel)?;

        self.deliver(&recipient, channel, sender, &notification.content)
            .await
    }

    async fn deliver(
        &self,
        recipient: &UserProfile,
        channel: Channel,
        sender: &dyn Sender,
        content: &str,
    ) -> Result<(), AppError> {
        match sender.send(recipient, content).await {
            Ok(()) => {
                tracing::info!(user_id = %recipient.id, channel = %channel, "Notification sent");
                Ok(())
            }
            Err(AppError::OptedOut(_)) => {
                tracing::info!(
                    user_id = %recipient.id,
                    channel = %channel,
                    "User opted out of channel, notification skipped"
                );
                Ok(())
            }
            Err(e) => {
                tracing::error!(
                    user_id = %recipient.id,
                    channel = %channel,
                    error = %e,
                    "Failed to send notification"
                );
                Err(AppError::failed_to_process(e))
            }
        }
    }
}

#[async_trait]
impl Processor for NotificationService {
    type Message = Notification;

    async fn handle(&self, message: Notification) -> Result<(), AppError> {
        self.dispatch(&message).await
    }
}
