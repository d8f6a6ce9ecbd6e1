//! User service client.

use async_trait::async_trait;
use reqwest::StatusCode;

use skycast_common::error::AppError;
use skycast_common::types::UserProfile;

const GET_USER_PATH: &str = "/user-service/user";

/// Resolves user profiles by id.
#[async_trait]
pub trait UserFinder: Send + Sync {
    /// Fails with `AppError::UserNotFound` when the user does not exist.
    async fn find_user(&self, id: &str) -> Result<UserProfile, AppError>;
}

/// HTTP client for the user service.
pub struct UserClient {
    http: reqwest::Client,
    base_url: String,
}

impl UserClient {
    pub fn new(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl UserFinder for UserClient {
    async fn find_user(&self, id: &str) -> Result<UserProfile, AppError> {
        let url = format!("{}{}/{}", self.base_url, GET_USER_PATH, id);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("error fetching user from api: {}", e)))?;

        match response.status() {
            StatusCode::OK => response.json::<UserProfile>().await.map_err(|e| {
                AppError::Upstream(format!("error reading user service response: {}", e))
            }),
            StatusCode::NOT_FOUND => Err(AppError::UserNotFound(id.to_string())),
            status => Err(AppError::Upstream(format!(
                "error fetching user from api: unexpected status code {}",
                status
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_find_user_parses_profile() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user-service/user/USER-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "USER-1",
                "name": "Ana",
                "notification": {"enabled": true, "web": {"enabled": true, "id": "WEB-1"}}
            })))
            .mount(&server)
            .await;

        let client = UserClient::new(reqwest::Client::new(), &server.uri());
        let user = client.find_user("USER-1").await.unwrap();

        assert_eq!(user.name, "Ana");
        assert!(user.notifications.enabled);
        assert_eq!(user.notifications.web.id, "WEB-1");
        assert!(!user.notifications.email.enabled);
    }

    #[tokio::test]
    async fn test_missing_user_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = UserClient::new(reqwest::Client::new(), &server.uri());
        let err = client.find_user("ghost").await.unwrap_err();
        assert!(matches!(err, AppError::UserNotFound(id) if id == "ghost"));
    }

    #[tokio::test]
    async fn test_server_error_is_transient() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = UserClient::new(reqwest::Client::new(), &server.uri());
        let err = client.find_user("USER-1").await.unwrap_err();
        assert!(matches!(err, AppError::Upstream(_)));
        assert!(!err.is_permanent());
    }
}
