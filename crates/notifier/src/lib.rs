//! Notification delivery.
//!
//! [`service::NotificationService`] resolves a user's profile and preferences,
//! then hands rendered content to the [`sender::Sender`] registered for the
//! requested channel:
//! - Web (web notification API, [`web::WebSender`])
//! - Email (Resend HTTP API, [`email::EmailSender`])
//!
//! Content for due schedules comes from the forecast provider
//! ([`forecast::ForecastClient`]); profiles come from the user service
//! ([`users::UserClient`]).

pub mod email;
pub mod forecast;
pub mod sender;
pub mod service;
pub mod users;
pub mod web;

pub use sender::{Sender, SenderRegistry};
pub use service::NotificationService;
