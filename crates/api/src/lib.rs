//! SkyCast HTTP API.
//!
//! Endpoints:
//! - GET  /health
//! - POST /api/schedules — schedule a forecast notification
//! - GET  /api/schedules/{id}
//! - POST /api/notify — send a forecast right away
//! - POST /api/notifications — enqueue a pre-rendered notification

pub mod routes;
pub mod state;
