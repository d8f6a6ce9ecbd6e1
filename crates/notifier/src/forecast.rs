//! Forecast provider client and message rendering.
//!
//! The provider exposes:
//! - `GET /cities?name=<name>` → `[City]`
//! - `GET /cities/{id}/forecast` → [`CityForecast`]
//! - `GET /cities/{id}/waves` → [`WaveForecast`], 404 for inland cities

use std::fmt::Write as _;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use skycast_common::error::AppError;
use skycast_common::types::{City, UserProfile};

/// Resolves a city name to exactly one city.
#[async_trait]
pub trait CityFinder: Send + Sync {
    /// Zero matches is `CityNotFound`, more than one is `MultipleCities`.
    async fn find_city(&self, name: &str) -> Result<City, AppError>;
}

/// Builds the notification body for a user and city.
#[async_trait]
pub trait ContentProvider: Send + Sync {
    async fn render(&self, recipient: &UserProfile, city_name: &str) -> Result<String, AppError>;
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyForecast {
    pub date: NaiveDate,
    #[serde(default)]
    pub condition: String,
    pub min_temperature: i32,
    pub max_temperature: i32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CityForecast {
    #[serde(default)]
    pub days: Vec<DailyForecast>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WaveReading {
    pub swell: String,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WaveForecast {
    pub date: NaiveDate,
    pub morning: WaveReading,
    pub afternoon: WaveReading,
    pub evening: WaveReading,
}

/// Render the forecast message sent to users.
pub fn render_forecast(
    recipient: &UserProfile,
    city: &City,
    forecast: &CityForecast,
    waves: Option<&WaveForecast>,
) -> String {
    let mut content = format!(
        "{}, here is the weather forecast for {}\n\n",
        recipient.name, city.name
    );

    let days: Vec<String> = forecast
        .days
        .iter()
        .map(|day| {
            format!(
                "{}: {} - {}",
                day.date.format("%d/%m/%Y"),
                day.min_temperature,
                day.max_temperature
            )
        })
        .collect();
    content.push_str(&days.join("\n"));

    if let Some(waves) = waves {
        let _ = write!(
            content,
            "\n\nWaves on {}:\nMorning: {} {:.2}m\nAfternoon: {} {:.2}m\nEvening: {} {:.2}m",
            waves.date.format("%d/%m/%Y"),
            waves.morning.swell,
            waves.morning.height,
            waves.afternoon.swell,
            waves.afternoon.height,
            waves.evening.swell,
            waves.evening.height,
        );
    }

    content
}

/// HTTP client for the forecast provider.
pub struct ForecastClient {
    http: reqwest::Client,
    base_url: String,
}

impl ForecastClient {
    pub fn new(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn forecast(&self, city: &City) -> Result<CityForecast, AppError> {
        let url = format!("{}/cities/{}/forecast", self.base_url, city.id);
        self.get_json(&url, "forecast")
            .await?
            .ok_or_else(|| AppError::CityNotFound(city.name.clone()))
    }

    /// Wave forecast for coastal cities; `None` when the provider has none.
    pub async fn waves(&self, city: &City) -> Result<Option<WaveForecast>, AppError> {
        let url = format!("{}/cities/{}/waves", self.base_url, city.id);
        self.get_json(&url, "wave forecast").await
    }

    /// GET `url` and decode the body; 404 yields `None`.
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        what: &str,
    ) -> Result<Option<T>, AppError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("error fetching {}: {}", what, e)))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if !status.is_success() => Err(AppError::Upstream(format!(
                "error fetching {}: unexpected status code {}",
                what, status
            ))),
            _ => response
                .json::<T>()
                .await
                .map(Some)
                .map_err(|e| AppError::Upstream(format!("error reading {}: {}", what, e))),
        }
    }
}

#[async_trait]
impl CityFinder for ForecastClient {
    async fn find_city(&self, name: &str) -> Result<City, AppError> {
        let url = format!("{}/cities", self.base_url);

        let response = self
            .http
            .get(&url)
            .query(&[("name", name)])
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("error fetching city: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Upstream(format!(
                "error fetching city: unexpected status code {}",
                response.status()
            )));
        }

        let mut cities: Vec<City> = response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("error reading city list: {}", e)))?;

        match cities.len() {
            0 => Err(AppError::CityNotFound(name.to_string())),
            1 => Ok(cities.remove(0)),
            _ => Err(AppError::MultipleCities(name.to_string())),
        }
    }
}

#[async_trait]
impl ContentProvider for ForecastClient {
    async fn render(&self, recipient: &UserProfile, city_name: &str) -> Result<String, AppError> {
        let city = self.find_city(city_name).await?;
        let forecast = self.forecast(&city).await?;
        let waves = self.waves(&city).await?;

        tracing::debug!(
            city_id = %city.id,
            days = forecast.days.len(),
            waves = waves.is_some(),
            "Forecast fetched"
        );

        Ok(render_forecast(recipient, &city, &forecast, waves.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn make_user() -> UserProfile {
        UserProfile {
            id: "USER-1".to_string(),
            name: "Ana".to_string(),
            notifications: Default::default(),
        }
    }

    fn make_city() -> City {
        City {
            id: "244".to_string(),
            name: "Santos".to_string(),
            state: "SP".to_string(),
        }
    }

    fn make_day(date: &str, min: i32, max: i32) -> DailyForecast {
        DailyForecast {
            date: date.parse().unwrap(),
            condition: "sunny".to_string(),
            min_temperature: min,
            max_temperature: max,
        }
    }

    fn reading(swell: &str, height: f64) -> WaveReading {
        WaveReading {
            swell: swell.to_string(),
            height,
        }
    }

    #[test]
    fn test_render_without_waves() {
        let forecast = CityForecast {
            days: vec![make_day("2028-02-01", 18, 27), make_day("2028-02-02", 19, 30)],
        };

        let content = render_forecast(&make_user(), &make_city(), &forecast, None);

        assert_eq!(
            content,
            "Ana, here is the weather forecast for Santos\n\n01/02/2028: 18 - 27\n02/02/2028: 19 - 30"
        );
    }

    #[test]
    fn test_render_with_waves() {
        let forecast = CityForecast {
            days: vec![make_day("2028-02-01", 18, 27)],
        };
        let waves = WaveForecast {
            date: "2028-02-01".parse().unwrap(),
            morning: reading("low", 0.5),
            afternoon: reading("medium", 1.25),
            evening: reading("high", 2.0),
        };

        let content = render_forecast(&make_user(), &make_city(), &forecast, Some(&waves));

        assert!(content.ends_with(
            "\n\nWaves on 01/02/2028:\nMorning: low 0.50m\nAfternoon: medium 1.25m\nEvening: high 2.00m"
        ));
    }

    #[tokio::test]
    async fn test_find_city_requires_exactly_one_match() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cities"))
            .and(query_param("name", "Santos"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": "244", "name": "Santos", "state": "SP"}
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/cities"))
            .and(query_param("name", "Atlantis"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/cities"))
            .and(query_param("name", "Santa"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": "1", "name": "Santa Maria", "state": "RS"},
                {"id": "2", "name": "Santa Rosa", "state": "RS"}
            ])))
            .mount(&server)
            .await;

        let client = ForecastClient::new(reqwest::Client::new(), &server.uri());

        assert_eq!(client.find_city("Santos").await.unwrap(), make_city());
        assert!(matches!(
            client.find_city("Atlantis").await,
            Err(AppError::CityNotFound(_))
        ));
        assert!(matches!(
            client.find_city("Santa").await,
            Err(AppError::MultipleCities(_))
        ));
    }

    #[tokio::test]
    async fn test_render_skips_missing_waves() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cities"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": "244", "name": "Santos", "state": "SP"}
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/cities/244/forecast"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "days": [{"date": "2028-02-01", "condition": "rain", "minTemperature": 17, "maxTemperature": 22}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/cities/244/waves"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = ForecastClient::new(reqwest::Client::new(), &server.uri());
        let content = client.render(&make_user(), "Santos").await.unwrap();

        assert!(content.contains("01/02/2028: 17 - 22"));
        assert!(!content.contains("Waves"));
    }

    #[tokio::test]
    async fn test_provider_failure_is_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = ForecastClient::new(reqwest::Client::new(), &server.uri());
        let err = client.render(&make_user(), "Santos").await.unwrap_err();
        assert!(matches!(err, AppError::Upstream(_)));
    }
}
