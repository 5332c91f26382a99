// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Reverse geocoding: coordinates to a short place name and full address

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::GeocoderConfig;
use crate::geo::GeoPoint;
use crate::Result;

/// What a reverse lookup produced; both fields are absent on failure
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedPlace {
    pub short_name: Option<String>,
    pub full_address: Option<String>,
}

impl ResolvedPlace {
    /// Build from a full display name; the short name is the text before the first comma
    pub fn from_display_name(display_name: &str) -> Self {
        let display_name = display_name.trim();
        if display_name.is_empty() {
            return Self::default();
        }
        let short = display_name.split(',').next().unwrap_or_default().trim();
        Self {
            short_name: (!short.is_empty()).then(|| short.to_string()),
            full_address: Some(display_name.to_string()),
        }
    }

    /// Name and address, with the placeholder substituted when the lookup gave nothing
    pub fn or_placeholder(self, point: GeoPoint) -> (String, String) {
        match (self.short_name, self.full_address) {
            (Some(name), Some(address)) => (name, address),
            (Some(name), None) => (name.clone(), name),
            (None, Some(address)) => (placeholder_name(point), address),
            (None, None) => {
                let placeholder = placeholder_name(point);
                (placeholder.clone(), placeholder)
            }
        }
    }
}

/// Name used when no geocoder result is available
pub fn placeholder_name(point: GeoPoint) -> String {
    format!("Scenic Spot near ({:.4}, {:.4})", point.latitude, point.longitude)
}

/// Resolves coordinates to a place. Implementations absorb their own failures.
#[async_trait]
pub trait ReverseGeocoder: Send + Sync {
    async fn resolve(&self, point: GeoPoint) -> ResolvedPlace;
}

/// Nominatim (OpenStreetMap) reverse geocoding client
pub struct NominatimClient {
    client: Client,
    base_url: String,
}

#[derive(Deserialize)]
struct ReverseResponse {
    display_name: Option<String>,
}

impl NominatimClient {
    pub fn new(config: &GeocoderConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
        })
    }

    async fn lookup(&self, point: GeoPoint) -> Result<ResolvedPlace> {
        let url = format!("{}/reverse", self.base_url);

        let response = self.client
            .get(&url)
            .query(&[
                ("format", "json".to_string()),
                ("lat", point.latitude.to_string()),
                ("lon", point.longitude.to_string()),
                ("zoom", "16".to_string()),
                ("addressdetails", "1".to_string()),
            ])
            .send()
            .await?
            .error_for_status()?;

        let body: ReverseResponse = response.json().await?;
        Ok(body.display_name.as_deref().map(ResolvedPlace::from_display_name).unwrap_or_default())
    }
}

#[async_trait]
impl ReverseGeocoder for NominatimClient {
    async fn resolve(&self, point: GeoPoint) -> ResolvedPlace {
        match self.lookup(point).await {
            Ok(place) => {
                debug!("Geocoded ({}, {}) to {:?}", point.latitude, point.longitude, place.short_name);
                place
            }
            Err(e) => {
                warn!("Reverse geocoding failed for ({}, {}): {}", point.latitude, point.longitude, e);
                ResolvedPlace::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::spawn_server;
    use axum::extract::Query;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::{Json, Router};
    use std::collections::HashMap;

    fn point() -> GeoPoint {
        GeoPoint::new(48.8584, 2.2945).unwrap()
    }

    fn client_for(base_url: String) -> NominatimClient {
        NominatimClient::new(&GeocoderConfig {
            url: base_url,
            user_agent: "SnapSphere-test".to_string(),
            timeout_secs: 2,
        })
        .unwrap()
    }

    #[test]
    fn short_name_is_text_before_first_comma() {
        let place = ResolvedPlace::from_display_name(" Tour Eiffel , Avenue Anatole France, Paris ");
        assert_eq!(place.short_name.as_deref(), Some("Tour Eiffel"));
        assert_eq!(place.full_address.as_deref(), Some("Tour Eiffel , Avenue Anatole France, Paris"));
        assert_eq!(ResolvedPlace::from_display_name("   "), ResolvedPlace::default());
    }

    #[test]
    fn placeholder_uses_four_decimals() {
        let point = GeoPoint::new(40.123456, -73.987661).unwrap();
        assert_eq!(placeholder_name(point), "Scenic Spot near (40.1235, -73.9877)");
        let (name, address) = ResolvedPlace::default().or_placeholder(point);
        assert_eq!(name, address);
        assert!(name.starts_with("Scenic Spot near ("));
    }

    #[tokio::test]
    async fn resolves_display_name() {
        let app = Router::new().route(
            "/reverse",
            get(|Query(q): Query<HashMap<String, String>>| async move {
                assert_eq!(q.get("format").map(String::as_str), Some("json"));
                assert_eq!(q.get("zoom").map(String::as_str), Some("16"));
                Json(serde_json::json!({"display_name": "Champ de Mars, Paris, France"}))
            }),
        );
        let client = client_for(spawn_server(app).await);

        let place = client.resolve(point()).await;
        assert_eq!(place.short_name.as_deref(), Some("Champ de Mars"));
        assert_eq!(place.full_address.as_deref(), Some("Champ de Mars, Paris, France"));
    }

    #[tokio::test]
    async fn error_status_yields_nothing() {
        let app = Router::new().route("/reverse", get(|| async { StatusCode::TOO_MANY_REQUESTS }));
        let client = client_for(spawn_server(app).await);
        assert_eq!(client.resolve(point()).await, ResolvedPlace::default());
    }

    #[tokio::test]
    async fn missing_display_name_yields_nothing() {
        let app = Router::new().route("/reverse", get(|| async { Json(serde_json::json!({"error": "Unable to geocode"})) }));
        let client = client_for(spawn_server(app).await);
        assert_eq!(client.resolve(point()).await, ResolvedPlace::default());
    }

    #[tokio::test]
    async fn unreachable_service_yields_nothing() {
        // nothing listens on the discard port
        let client = client_for("http://127.0.0.1:9".to_string());
        assert_eq!(client.resolve(point()).await, ResolvedPlace::default());
    }
}
