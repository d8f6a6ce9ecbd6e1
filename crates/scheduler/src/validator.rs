use std::sync::Arc;

use async_trait::async_trait;

use skycast_common::error::AppError;
use skycast_notifier::forecast::CityFinder;
use skycast_notifier::users::UserFinder;

/// Checks that a schedule's target user and city exist.
#[async_trait]
pub trait Validator: Send + Sync {
    async fn validate(&self, user_id: &str, city_name: &str) -> Result<(), AppError>;
}

/// Validates by looking the user up in the user service and the city up in
/// the forecast provider.
pub struct LookupValidator {
    users: Arc<dyn UserFinder>,
    cities: Arc<dyn CityFinder>,
}

impl LookupValidator {
    pub fn new(users: Arc<dyn UserFinder>, cities: Arc<dyn CityFinder>) -> Self {
        Self { users, cities }
    }
}

#[async_trait]
impl Validator for LookupValidator {
    async fn validate(&self, user_id: &str, city_name: &str) -> Result<(), AppError> {
        self.users.find_user(user_id).await?;
        self.cities.find_city(city_name).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skycast_common::types::{City, UserProfile};

    struct OneUser;

    #[async_trait]
    impl UserFinder for OneUser {
        async fn find_user(&self, id: &str) -> Result<UserProfile, AppError> {
            if id == "USER-1" {
                Ok(UserProfile {
                    id: id.to_string(),
                    name: "Ana".to_string(),
                    notifications: Default::default(),
                })
            } else {
                Err(AppError::UserNotFound(id.to_string()))
            }
        }
    }

    struct OneCity;

    #[async_trait]
    impl CityFinder for OneCity {
        async fn find_city(&self, name: &str) -> Result<City, AppError> {
            match name {
                "Santos" => Ok(City {
                    id: "244".to_string(),
                    name: name.to_string(),
                    state: "SP".to_string(),
                }),
                "Santa" => Err(AppError::MultipleCities(name.to_string())),
                _ => Err(AppError::CityNotFound(name.to_string())),
            }
        }
    }

    fn make_validator() -> LookupValidator {
        LookupValidator::new(Arc::new(OneUser), Arc::new(OneCity))
    }

    #[tokio::test]
    async fn test_valid_target() {
        make_validator().validate("USER-1", "Santos").await.unwrap();
    }

    #[tokio::test]
    async fn test_lookup_errors_surface_unchanged() {
        let validator = make_validator();

        assert!(matches!(
            validator.validate("ghost", "Santos").await,
            Err(AppError::UserNotFound(_))
        ));
        assert!(matches!(
            validator.validate("USER-1", "Atlantis").await,
            Err(AppError::CityNotFound(_))
        ));
        assert!(matches!(
            validator.validate("USER-1", "Santa").await,
            Err(AppError::MultipleCities(_))
        ));
    }
}
