// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! JSON HTTP API for SnapSphere

use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::AppConfig;
use crate::geo::GeoPoint;
use crate::recommend::Conditions;
use crate::service::{PhotoService, PlaceDetailsRequest, SubmitRequest};
use crate::{Result, SnapSphereError};

/// Shared application state
pub struct AppState {
    pub service: PhotoService,
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/add_photo", post(add_photo))
        .route("/photos_nearby", get(photos_nearby))
        .route("/classify", post(classify))
        .route("/fetch_mapillary_photos", post(fetch_mapillary_photos))
        .route("/place_details", post(place_details))
        .route("/smart_recommendations", post(smart_recommendations))
        .route("/analyze_vibe", post(analyze_vibe))
        .route("/generate_caption", post(generate_caption))
        .route("/update_ratings", post(update_ratings))
        .route("/health", get(health))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

impl SnapSphereError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            e if e.is_upstream() => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for SnapSphereError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        } else {
            warn!("Request rejected: {}", self);
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Unwrap a JSON body, turning malformed bodies into 400s
fn body<T>(payload: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|e| SnapSphereError::InvalidInput(e.body_text()))
}

fn point(latitude: Option<f64>, longitude: Option<f64>) -> Result<GeoPoint> {
    match (latitude, longitude) {
        (Some(lat), Some(lon)) => GeoPoint::new(lat, lon),
        _ => Err(SnapSphereError::InvalidInput("latitude and longitude required".to_string())),
    }
}

#[derive(Deserialize)]
struct ImageRequest {
    #[serde(default)]
    image_url: String,
}

#[derive(Deserialize)]
struct AreaRequest {
    latitude: Option<f64>,
    longitude: Option<f64>,
    radius: Option<f64>,
}

#[derive(Deserialize)]
struct NearbyQuery {
    latitude: Option<f64>,
    longitude: Option<f64>,
    radius: Option<f64>,
    vibe: Option<String>,
}

#[derive(Deserialize)]
struct RecommendationRequest {
    latitude: Option<f64>,
    longitude: Option<f64>,
    weather: Option<String>,
    time_of_day: Option<String>,
    /// Accepted for compatibility; ranking does not use it
    #[allow(dead_code)]
    preferences: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct CaptionRequest {
    #[serde(default)]
    image_url: String,
    style: Option<String>,
    mood: Option<String>,
}

async fn add_photo(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<SubmitRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let submitted = state.service.submit_photo(body(payload)?).await?;
    Ok((StatusCode::CREATED, Json(submitted)))
}

async fn photos_nearby(
    State(state): State<Arc<AppState>>,
    query: std::result::Result<Query<NearbyQuery>, QueryRejection>,
) -> Result<impl IntoResponse> {
    let Query(query) = query.map_err(|e| SnapSphereError::InvalidInput(e.body_text()))?;
    let center = point(query.latitude, query.longitude)?;
    let photos = state.service.photos_nearby(center, query.radius, query.vibe.as_deref())?;
    Ok(Json(json!({ "photos": photos })))
}

async fn classify(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<ImageRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let request = body(payload)?;
    let tags = state.service.classify(&request.image_url).await?;
    Ok(Json(json!({ "tags": tags })))
}

async fn fetch_mapillary_photos(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<AreaRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let request = body(payload)?;
    let center = point(request.latitude, request.longitude)?;
    Ok(Json(state.service.fetch_bulk(center, request.radius).await?))
}

async fn place_details(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<PlaceDetailsRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    Ok(Json(state.service.place_details(body(payload)?).await?))
}

async fn smart_recommendations(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<RecommendationRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let request = body(payload)?;
    let center = point(request.latitude, request.longitude)?;
    let conditions = Conditions::from_optional(request.weather.as_deref(), request.time_of_day.as_deref());
    Ok(Json(state.service.recommend(center, &conditions)?))
}

async fn analyze_vibe(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<ImageRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let request = body(payload)?;
    Ok(Json(state.service.analyze_vibe(&request.image_url).await?))
}

async fn generate_caption(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<CaptionRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let request = body(payload)?;
    let caption = state
        .service
        .generate_caption(&request.image_url, request.style.as_deref(), request.mood.as_deref())
        .await?;
    Ok(Json(caption))
}

async fn update_ratings(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse> {
    let updated = state.service.backfill_ratings()?;
    Ok(Json(json!({
        "message": format!("Updated {} photos with ratings", updated),
        "updated": updated,
    })))
}

async fn health(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse> {
    let photos = state.service.store().count()?;
    Ok(Json(json!({ "status": "ok", "photos": photos })))
}

/// Start the API server
pub async fn start_server(config: AppConfig, service: PhotoService) -> crate::Result<()> {
    let addr = format!("{}:{}", config.web.host, config.web.port);
    let state = Arc::new(AppState { service });

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("API available at http://{}", addr);

    let router = create_router(state);
    axum::serve(listener, router).await
        .map_err(|e| SnapSphereError::Config(format!("Server error: {}", e)))?;

    Ok(())
}
