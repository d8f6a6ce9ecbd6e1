//! API route tests.
//!
//! Uses `tower::ServiceExt` to test Axum routes without a real HTTP server,
//! with in-memory stores and queues behind the handlers.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{Duration, Utc};
use parking_lot::Mutex;
use tower::ServiceExt;

use skycast_api::routes::create_router;
use skycast_api::state::AppState;
use skycast_common::error::AppError;
use skycast_common::types::{Notification, ScheduleStatus};
use skycast_queue::{DurableQueue, MemoryBroker};
use skycast_scheduler::validator::Validator;
use skycast_scheduler::{MemoryScheduleStore, Notifier, ScheduleService};

// ============================================================
// Helpers
// ============================================================

/// Accepts `USER-1` only.
struct KnownUser;

#[async_trait]
impl Validator for KnownUser {
    async fn validate(&self, user_id: &str, _city_name: &str) -> Result<(), AppError> {
        if user_id == "USER-1" {
            Ok(())
        } else {
            Err(AppError::UserNotFound(user_id.to_string()))
        }
    }
}

#[derive(Default)]
struct RecordingNotifier {
    calls: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify_user(&self, user_id: &str, city_name: &str) -> Result<(), AppError> {
        self.calls
            .lock()
            .push((user_id.to_string(), city_name.to_string()));
        if city_name == "Atlantis" {
            return Err(AppError::CityNotFound(city_name.to_string()));
        }
        Ok(())
    }
}

struct TestApp {
    state: AppState,
    store: Arc<MemoryScheduleStore>,
    broker: Arc<MemoryBroker>,
    notifier: Arc<RecordingNotifier>,
}

fn build_test_app() -> TestApp {
    let store = Arc::new(MemoryScheduleStore::new());
    let broker = Arc::new(MemoryBroker::new("notifications"));
    let notifier = Arc::new(RecordingNotifier::default());
    let schedules = Arc::new(ScheduleService::new(
        Arc::new(KnownUser),
        store.clone(),
        notifier.clone(),
    ));
    let state = AppState::new(schedules, notifier.clone(), DurableQueue::new(broker.clone()));

    TestApp {
        state,
        store,
        broker,
        notifier,
    }
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

async fn read_json(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

// ============================================================
// Routes
// ============================================================

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_router(build_test_app().state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = read_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["service"], "skycast-api");
}

#[tokio::test]
async fn test_create_and_fetch_schedule() {
    let test = build_test_app();
    let time = (Utc::now() + Duration::hours(2)).to_rfc3339();

    let response = create_router(test.state.clone())
        .oneshot(post_json(
            "/api/schedules",
            serde_json::json!({"userId": "USER-1", "city": "Santos", "time": time}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let created = read_json(response).await;
    let id = created["id"].as_str().unwrap().to_string();
    assert!(id.starts_with("SCHEDULE-"));
    assert_eq!(created["status"], "active");
    assert_eq!(created["cityName"], "Santos");
    assert_eq!(test.store.get(&id).unwrap().status, ScheduleStatus::Active);

    let response = create_router(test.state)
        .oneshot(
            Request::builder()
                .uri(format!("/api/schedules/{}", id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json(response).await["userID"], "USER-1");
}

#[tokio::test]
async fn test_schedule_in_past_is_bad_request() {
    let test = build_test_app();
    let time = (Utc::now() - Duration::minutes(1)).to_rfc3339();

    let response = create_router(test.state)
        .oneshot(post_json(
            "/api/schedules",
            serde_json::json!({"userId": "USER-1", "city": "Santos", "time": time}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(read_json(response).await["error"].is_string());
    assert!(test.store.all().is_empty());
}

#[tokio::test]
async fn test_schedule_with_malformed_time_is_bad_request() {
    let test = build_test_app();

    let response = create_router(test.state)
        .oneshot(post_json(
            "/api/schedules",
            serde_json::json!({"userId": "USER-1", "city": "Santos", "time": "tomorrow"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_schedule_for_unknown_user_is_not_found() {
    let test = build_test_app();
    let time = (Utc::now() + Duration::hours(2)).to_rfc3339();

    let response = create_router(test.state)
        .oneshot(post_json(
            "/api/schedules",
            serde_json::json!({"userId": "ghost", "city": "Santos", "time": time}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(test.store.all().is_empty());
}

#[tokio::test]
async fn test_get_missing_schedule_is_not_found() {
    let app = create_router(build_test_app().state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/schedules/SCHEDULE-missing")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_notify_user_now() {
    let test = build_test_app();

    let response = create_router(test.state.clone())
        .oneshot(post_json(
            "/api/notify",
            serde_json::json!({"userId": "USER-1", "city": "Santos"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = create_router(test.state)
        .oneshot(post_json(
            "/api/notify",
            serde_json::json!({"userId": "USER-1", "city": "Atlantis"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    assert_eq!(test.notifier.calls.lock().len(), 2);
}

#[tokio::test]
async fn test_enqueue_notification() {
    let test = build_test_app();

    let response = create_router(test.state)
        .oneshot(post_json(
            "/api/notifications",
            serde_json::json!({"userID": "USER-1", "content": "hello", "channel": "web"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let messages = test.broker.ready_messages();
    assert_eq!(messages.len(), 1);
    let queued: Notification = serde_json::from_slice(&messages[0]).unwrap();
    assert_eq!(queued.content, "hello");
}

#[tokio::test]
async fn test_enqueue_unknown_channel_is_rejected() {
    let test = build_test_app();

    let response = create_router(test.state)
        .oneshot(post_json(
            "/api/notifications",
            serde_json::json!({"userID": "USER-1", "content": "hello", "channel": "sms"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(test.broker.ready_len(), 0);
}
