//! Schedule lifecycle: creation, recovery of due schedules, publication to
//! the schedule queue and completion after delivery.

pub mod job;
pub mod lease;
pub mod processor;
pub mod publisher;
pub mod service;
pub mod store;
pub mod timers;
pub mod validator;

pub use job::RecoveryJob;
pub use publisher::SchedulePublisher;
pub use service::{Notifier, ScheduleService};
pub use store::{MemoryScheduleStore, PgScheduleStore, ScheduleStore};
