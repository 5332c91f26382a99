// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Photo operations shared by the HTTP API and the CLI

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::{AppConfig, ImageryConfig};
use crate::content::SeededSampler;
use crate::db::{CrowdLevel, PhotoRecord, PhotoStore};
use crate::enrich::{EnrichedFields, Enricher};
use crate::geo::{query_nearby, GeoPoint};
use crate::geocoder::NominatimClient;
use crate::ingest::{BulkIngestor, ImageryFeed, IngestReport, MapillaryClient};
use crate::recommend::{rank, Conditions, Recommendation, DEFAULT_MAX_RESULTS};
use crate::vibes::analysis::{self, Caption, CaptionStyle, VibeAnalysis};
use crate::vibes::classifier::{HttpImageSource, OllamaVibeClassifier};
use crate::vibes::{top_vibes, Vibe, PHOTO_VIBES};
use crate::{Result, SnapSphereError};

/// Radius used by nearby queries and bulk fetches when none is given
pub const DEFAULT_RADIUS_KM: f64 = 2.0;

const DEFAULT_MOOD: &str = "happy";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmitRequest {
    pub photo_url: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmittedPhoto {
    pub message: String,
    pub tags: Vec<Vibe>,
    #[serde(flatten)]
    pub details: EnrichedFields,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlaceDetailsRequest {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub photo_url: Option<String>,
}

/// Enrichment bundle for one photo, from the store or freshly computed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaceDetails {
    pub place_name: Option<String>,
    pub full_address: Option<String>,
    pub description: Option<String>,
    pub vibes: Vec<Vibe>,
    pub rating: Option<f64>,
    pub best_time: Option<String>,
    pub crowd_level: Option<CrowdLevel>,
    pub safety_notes: Option<String>,
    pub submitted_by: Option<String>,
    pub cached: bool,
}

impl PlaceDetails {
    fn from_record(record: PhotoRecord, cached: bool) -> Self {
        Self {
            place_name: record.place_name,
            full_address: record.full_address,
            description: record.description,
            vibes: record.vibes,
            rating: record.rating,
            best_time: record.best_time,
            crowd_level: record.crowd_level,
            safety_notes: record.safety_notes,
            submitted_by: record.submitted_by,
            cached,
        }
    }
}

/// One row of a nearby query as returned to clients
#[derive(Debug, Clone, Serialize)]
pub struct NearbyPhotoView {
    pub photo_url: String,
    pub latitude: f64,
    pub longitude: f64,
    pub vibes: Vec<Vibe>,
    pub timestamp: DateTime<Utc>,
    pub distance_km: f64,
}

/// Wires the store, the enricher and the bulk ingestor together
pub struct PhotoService {
    store: PhotoStore,
    enricher: Arc<Enricher>,
    ingestor: BulkIngestor,
}

impl PhotoService {
    pub fn new(store: PhotoStore, enricher: Arc<Enricher>, feed: Arc<dyn ImageryFeed>, imagery: &ImageryConfig) -> Self {
        let ingestor = BulkIngestor::new(
            store.clone(),
            enricher.clone(),
            feed,
            Duration::from_millis(imagery.throttle_ms),
            imagery.max_pages,
        );
        Self { store, enricher, ingestor }
    }

    /// Build the production service: SQLite store, Nominatim, Ollama and Mapillary
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let store = PhotoStore::open(&config.database.path)?;
        info!("Database: {}", config.database.path);

        let enricher = Arc::new(Enricher::new(
            Arc::new(NominatimClient::new(&config.geocoder)?),
            Arc::new(OllamaVibeClassifier::new(&config.ai_engine)?),
            Arc::new(HttpImageSource::new(&config.image_fetch)?),
            Arc::new(SeededSampler::new(config.enrichment.seed)),
        ));
        let feed = Arc::new(MapillaryClient::new(&config.imagery)?);

        Ok(Self::new(store, enricher, feed, &config.imagery))
    }

    pub fn store(&self) -> &PhotoStore {
        &self.store
    }

    /// Enrich and store a submitted photo
    pub async fn submit_photo(&self, request: SubmitRequest) -> Result<SubmittedPhoto> {
        let (photo_url, location) = match (required_url(request.photo_url), request.latitude, request.longitude) {
            (Some(url), Some(lat), Some(lon)) => (url, GeoPoint::new(lat, lon)?),
            _ => {
                return Err(SnapSphereError::InvalidInput(
                    "photo_url, latitude, longitude required".to_string(),
                ))
            }
        };
        let timestamp = match request.timestamp.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            Some(raw) => parse_timestamp(raw)?,
            None => Utc::now(),
        };

        let details = self.enricher.enrich(&photo_url, location).await;
        self.store.put(&details.clone().into_record(photo_url.clone(), location, timestamp))?;
        info!("Stored {} as '{}'", photo_url, details.place_name);

        Ok(SubmittedPhoto {
            message: "Photo added".to_string(),
            tags: details.vibes.clone(),
            details,
        })
    }

    pub fn photos_nearby(&self, center: GeoPoint, radius_km: Option<f64>, vibe: Option<&str>) -> Result<Vec<NearbyPhotoView>> {
        let radius_km = radius_km.unwrap_or(DEFAULT_RADIUS_KM);
        if !radius_km.is_finite() || radius_km < 0.0 {
            return Err(SnapSphereError::InvalidInput(format!("radius {} must be non-negative", radius_km)));
        }

        let hits = query_nearby(self.store.all()?, center, radius_km, vibe);
        debug!("{} photos within {} km", hits.len(), radius_km);

        Ok(hits
            .into_iter()
            .map(|hit| NearbyPhotoView {
                photo_url: hit.record.photo_url,
                latitude: hit.record.location.map_or(center.latitude, |p| p.latitude),
                longitude: hit.record.location.map_or(center.longitude, |p| p.longitude),
                vibes: hit.record.vibes,
                timestamp: hit.record.timestamp,
                distance_km: hit.distance_km,
            })
            .collect())
    }

    /// Top vibes of an image. Classifier failures are returned, not absorbed.
    pub async fn classify(&self, image_url: &str) -> Result<Vec<Vibe>> {
        let image_url = non_blank_url(image_url)?;
        let ranked = self.enricher.classify_url(image_url).await?;
        Ok(top_vibes(&ranked, PHOTO_VIBES))
    }

    pub async fn fetch_bulk(&self, center: GeoPoint, radius_km: Option<f64>) -> Result<IngestReport> {
        self.ingestor.ingest(center, radius_km.unwrap_or(DEFAULT_RADIUS_KM)).await
    }

    /// Stored details when the photo is fully enriched at these exact coordinates,
    /// otherwise a fresh enrichment that replaces the stored record.
    pub async fn place_details(&self, request: PlaceDetailsRequest) -> Result<PlaceDetails> {
        let (photo_url, location) = match (required_url(request.photo_url), request.latitude, request.longitude) {
            (Some(url), Some(lat), Some(lon)) => (url, GeoPoint::new(lat, lon)?),
            _ => {
                return Err(SnapSphereError::InvalidInput(
                    "latitude, longitude, and photo_url required".to_string(),
                ))
            }
        };

        if let Some(record) = self.store.get_by_key(&photo_url, location)? {
            if record.is_fully_enriched() {
                debug!("Place details cache hit for {}", photo_url);
                return Ok(PlaceDetails::from_record(record, true));
            }
        }

        // re-enrichment replaces the enrichment fields only
        let timestamp = self.store.get_by_url(&photo_url)?.map_or_else(Utc::now, |existing| existing.timestamp);
        let details = self.enricher.enrich(&photo_url, location).await;
        let record = details.into_record(photo_url, location, timestamp);
        self.store.put(&record)?;
        Ok(PlaceDetails::from_record(record, false))
    }

    pub fn recommend(&self, center: GeoPoint, conditions: &Conditions) -> Result<Vec<Recommendation>> {
        Ok(rank(self.store.all()?, center, conditions, DEFAULT_MAX_RESULTS))
    }

    pub async fn analyze_vibe(&self, image_url: &str) -> Result<VibeAnalysis> {
        let image_url = non_blank_url(image_url)?;
        let ranked = self.enricher.classify_url(image_url).await?;
        analysis::analyze(&ranked)
    }

    /// Caption for an image; falls back to a stock caption when classification fails
    pub async fn generate_caption(&self, image_url: &str, style: Option<&str>, mood: Option<&str>) -> Result<Caption> {
        let image_url = non_blank_url(image_url)?;
        let style = CaptionStyle::parse_or_default(style);
        let mood = mood.map(str::trim).filter(|m| !m.is_empty()).unwrap_or(DEFAULT_MOOD);

        match self.enricher.classify_url(image_url).await {
            Ok(ranked) => Ok(analysis::caption(&top_vibes(&ranked, PHOTO_VIBES), style, mood, self.enricher.sampler())),
            Err(e) => {
                warn!("Caption classification failed for {}: {}", image_url, e);
                Ok(analysis::fallback_caption(style, mood))
            }
        }
    }

    pub fn backfill_ratings(&self) -> Result<usize> {
        let updated = self.store.backfill_ratings(self.enricher.sampler())?;
        info!("Backfilled ratings on {} photos", updated);
        Ok(updated)
    }
}

fn required_url(raw: Option<String>) -> Option<String> {
    raw.map(|u| u.trim().to_string()).filter(|u| !u.is_empty())
}

fn non_blank_url(raw: &str) -> Result<&str> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(SnapSphereError::InvalidInput("Image URL is required".to_string()));
    }
    Ok(trimmed)
}

/// RFC 3339, or a naive ISO 8601 date/time taken as UTC
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(Utc.from_utc_datetime(&naive));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
        .ok_or_else(|| SnapSphereError::InvalidInput(format!("unrecognised timestamp '{}'", raw)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{record_at, test_enricher, FailingClassifier, FixedGeocoder, ScriptedFeed, StaticImages};
    use chrono::Datelike;

    fn service_with(store: PhotoStore, enricher: Enricher) -> PhotoService {
        let imagery = ImageryConfig { throttle_ms: 0, ..ImageryConfig::default() };
        PhotoService::new(store, Arc::new(enricher), Arc::new(ScriptedFeed::pages(vec![])), &imagery)
    }

    fn service() -> PhotoService {
        service_with(PhotoStore::in_memory().unwrap(), test_enricher())
    }

    fn offline_service() -> PhotoService {
        let enricher = Enricher::new(
            Arc::new(FixedGeocoder::unavailable()),
            Arc::new(FailingClassifier),
            Arc::new(StaticImages::default()),
            Arc::new(SeededSampler::from_seed(4)),
        );
        service_with(PhotoStore::in_memory().unwrap(), enricher)
    }

    fn submit(url: &str, lat: f64, lon: f64) -> SubmitRequest {
        SubmitRequest {
            photo_url: Some(url.to_string()),
            latitude: Some(lat),
            longitude: Some(lon),
            timestamp: None,
        }
    }

    #[tokio::test]
    async fn submit_enriches_and_stores() {
        let service = service();
        let submitted = service.submit_photo(submit("https://img/plaza.jpg", 40.0, -73.0)).await.unwrap();

        assert_eq!(submitted.message, "Photo added");
        assert_eq!(submitted.tags, vec![Vibe::Urban, Vibe::Colorful, Vibe::Modern]);
        assert_eq!(submitted.details.place_name, "Test Plaza");

        let stored = service.store().get_by_url("https://img/plaza.jpg").unwrap().unwrap();
        assert!(stored.is_fully_enriched());
        assert_eq!(stored.rating, Some(submitted.details.rating));
    }

    #[tokio::test]
    async fn resubmission_keeps_one_record() {
        let service = service();
        service.submit_photo(submit("https://img/plaza.jpg", 40.0, -73.0)).await.unwrap();
        service.submit_photo(submit("https://img/plaza.jpg", 40.0, -73.0)).await.unwrap();
        assert_eq!(service.store().count().unwrap(), 1);
    }

    #[tokio::test]
    async fn submit_requires_url_and_coordinates() {
        let service = service();
        let mut missing = submit("https://img/x.jpg", 1.0, 1.0);
        missing.longitude = None;
        assert!(matches!(service.submit_photo(missing).await, Err(SnapSphereError::InvalidInput(_))));

        let blank = submit("   ", 1.0, 1.0);
        assert!(matches!(service.submit_photo(blank).await, Err(SnapSphereError::InvalidInput(_))));

        let out_of_range = submit("https://img/x.jpg", 91.0, 1.0);
        assert!(matches!(service.submit_photo(out_of_range).await, Err(SnapSphereError::InvalidInput(_))));
        assert_eq!(service.store().count().unwrap(), 0);
    }

    #[tokio::test]
    async fn submit_honours_timestamp() {
        let service = service();
        let mut request = submit("https://img/old.jpg", 1.0, 1.0);
        request.timestamp = Some("2023-06-01T18:30:00".to_string());
        service.submit_photo(request).await.unwrap();
        let stored = service.store().get_by_url("https://img/old.jpg").unwrap().unwrap();
        assert_eq!(stored.timestamp.year(), 2023);

        let mut bad = submit("https://img/bad.jpg", 1.0, 1.0);
        bad.timestamp = Some("last tuesday".to_string());
        assert!(matches!(service.submit_photo(bad).await, Err(SnapSphereError::InvalidInput(_))));
    }

    #[test]
    fn timestamp_formats() {
        assert!(parse_timestamp("2024-01-02T03:04:05Z").is_ok());
        assert!(parse_timestamp("2024-01-02T03:04:05.123456").is_ok());
        assert_eq!(parse_timestamp("2024-01-02").unwrap().day(), 2);
    }

    #[test]
    fn nearby_uses_default_radius_and_filter() {
        let service = service();
        service.store().put(&record_at("https://img/a.jpg", 40.005, -73.0, &[Vibe::Urban])).unwrap();
        service.store().put(&record_at("https://img/b.jpg", 40.015, -73.0, &[Vibe::Urban])).unwrap();
        service.store().put(&record_at("https://img/c.jpg", 40.03, -73.0, &[Vibe::Urban])).unwrap();
        let center = GeoPoint::new(40.0, -73.0).unwrap();

        let hits = service.photos_nearby(center, None, None).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].photo_url, "https://img/a.jpg");
        assert!((hits[0].distance_km - 0.556).abs() < 0.01);

        assert!(service.photos_nearby(center, Some(5.0), Some("nature")).unwrap().is_empty());
        assert!(service.photos_nearby(center, Some(-1.0), None).is_err());
    }

    #[tokio::test]
    async fn place_details_cache_hit_and_recompute() {
        let service = service();
        let point = GeoPoint::new(10.0, 20.0).unwrap();
        let request = |url: &str| PlaceDetailsRequest {
            latitude: Some(point.latitude),
            longitude: Some(point.longitude),
            photo_url: Some(url.to_string()),
        };

        service.store().put(&record_at("https://img/cached.jpg", 10.0, 20.0, &[Vibe::Calm])).unwrap();
        let hit = service.place_details(request("https://img/cached.jpg")).await.unwrap();
        assert!(hit.cached);
        assert_eq!(hit.place_name.as_deref(), Some("Spot cached.jpg"));
        assert_eq!(hit.vibes, vec![Vibe::Calm]);

        service.store().put(&record_at("https://img/bare.jpg", 10.0, 20.0, &[])).unwrap();
        let miss = service.place_details(request("https://img/bare.jpg")).await.unwrap();
        assert!(!miss.cached);
        assert_eq!(miss.place_name.as_deref(), Some("Test Plaza"));
        let stored = service.store().get_by_url("https://img/bare.jpg").unwrap().unwrap();
        assert_eq!(stored.vibes, vec![Vibe::Urban, Vibe::Colorful, Vibe::Modern]);

        let absent = service.place_details(request("https://img/new.jpg")).await.unwrap();
        assert!(!absent.cached);
        assert_eq!(service.store().count().unwrap(), 3);
    }

    #[tokio::test]
    async fn place_details_recompute_keeps_capture_time() {
        let service = service();
        let taken = parse_timestamp("2020-05-05T10:00:00Z").unwrap();
        let mut bare = record_at("https://img/old.jpg", 10.0, 20.0, &[]);
        bare.timestamp = taken;
        service.store().put(&bare).unwrap();

        let request = PlaceDetailsRequest {
            latitude: Some(10.0),
            longitude: Some(20.0),
            photo_url: Some("https://img/old.jpg".to_string()),
        };
        let details = service.place_details(request).await.unwrap();
        assert!(!details.cached);

        let stored = service.store().get_by_url("https://img/old.jpg").unwrap().unwrap();
        assert_eq!(stored.timestamp, taken);
        assert_eq!(stored.vibes, vec![Vibe::Urban, Vibe::Colorful, Vibe::Modern]);
    }

    #[tokio::test]
    async fn classify_and_analyze() {
        let service = service();
        assert_eq!(
            service.classify("https://img/x.jpg").await.unwrap(),
            vec![Vibe::Urban, Vibe::Colorful, Vibe::Modern]
        );
        let analysis = service.analyze_vibe("https://img/x.jpg").await.unwrap();
        assert_eq!(analysis.primary_vibe, Vibe::Urban);
        assert!(matches!(service.classify(" ").await, Err(SnapSphereError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn classifier_failure_surfaces_except_for_captions() {
        let service = offline_service();
        assert!(matches!(
            service.classify("https://img/x.jpg").await,
            Err(SnapSphereError::ModelUnavailable(_))
        ));

        let caption = service.generate_caption("https://img/x.jpg", Some("creative"), None).await.unwrap();
        assert_eq!(caption.vibes, vec![Vibe::Nature, Vibe::Peaceful, Vibe::Calm]);
        assert_eq!(caption.mood, "happy");
        assert_eq!(caption.style, CaptionStyle::Creative);
    }

    #[tokio::test]
    async fn recommend_and_backfill() {
        let service = service();
        let mut unrated = record_at("https://img/u.jpg", 0.01, 0.0, &[Vibe::Urban]);
        unrated.rating = None;
        service.store().put(&unrated).unwrap();

        let recs = service.recommend(GeoPoint::new(0.0, 0.0).unwrap(), &Conditions::default()).unwrap();
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].rating, 4.5);

        assert_eq!(service.backfill_ratings().unwrap(), 1);
        let rating = service.store().get_by_url("https://img/u.jpg").unwrap().unwrap().rating.unwrap();
        assert!((4.5..=4.9).contains(&rating));
    }
}
