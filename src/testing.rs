// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Fakes and fixtures shared by unit tests

use async_trait::async_trait;
use axum::Router;
use chrono::Utc;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::content::SeededSampler;
use crate::db::{CrowdLevel, PhotoRecord};
use crate::enrich::Enricher;
use crate::geo::{BoundingBox, GeoPoint};
use crate::geocoder::{ReverseGeocoder, ResolvedPlace};
use crate::ingest::{FeedPage, ImageryFeed};
use crate::vibes::classifier::{ImageSource, VibeClassifier};
use crate::vibes::{rank_scores, ScoredVibe, Vibe};
use crate::{Result, SnapSphereError};

/// A fully enriched record at the given point
pub fn record_at(url: &str, latitude: f64, longitude: f64, vibes: &[Vibe]) -> PhotoRecord {
    PhotoRecord {
        photo_url: url.to_string(),
        location: Some(GeoPoint::new(latitude, longitude).expect("valid test coordinates")),
        timestamp: Utc::now(),
        vibes: vibes.to_vec(),
        place_name: Some(format!("Spot {}", url.rsplit('/').next().unwrap_or(url))),
        full_address: Some(format!("{}, Test City", url)),
        description: Some("A photogenic test spot.".to_string()),
        best_time: Some("Golden Hour (6-7 PM)".to_string()),
        crowd_level: Some(CrowdLevel::Medium),
        safety_notes: Some("Safe area. Popular with tourists and locals.".to_string()),
        rating: Some(4.6),
        submitted_by: Some("Emma L.".to_string()),
    }
}

/// Serve `app` on an ephemeral local port and return its base URL
pub async fn spawn_server(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind test listener");
    let addr = listener.local_addr().expect("listener address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });
    format!("http://{}", addr)
}

/// A small gradient PNG
pub fn sample_png(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_fn(width, height, |x, y| image::Rgb([x as u8, y as u8, 128]));
    let mut buffer = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut std::io::Cursor::new(&mut buffer), image::ImageFormat::Png)
        .expect("encode test png");
    buffer
}

pub struct FixedGeocoder {
    place: ResolvedPlace,
}

impl FixedGeocoder {
    pub fn named(display_name: &str) -> Self {
        Self { place: ResolvedPlace::from_display_name(display_name) }
    }

    pub fn unavailable() -> Self {
        Self { place: ResolvedPlace::default() }
    }
}

#[async_trait]
impl ReverseGeocoder for FixedGeocoder {
    async fn resolve(&self, _point: GeoPoint) -> ResolvedPlace {
        self.place.clone()
    }
}

pub struct FixedClassifier {
    ranked: Vec<ScoredVibe>,
}

impl FixedClassifier {
    pub fn new(scores: &[(Vibe, f64)]) -> Self {
        Self { ranked: rank_scores(scores).expect("positive test scores") }
    }
}

#[async_trait]
impl VibeClassifier for FixedClassifier {
    async fn classify(&self, _image: &[u8]) -> Result<Vec<ScoredVibe>> {
        Ok(self.ranked.clone())
    }
}

pub struct FailingClassifier;

#[async_trait]
impl VibeClassifier for FailingClassifier {
    async fn classify(&self, _image: &[u8]) -> Result<Vec<ScoredVibe>> {
        Err(SnapSphereError::ModelUnavailable("test model offline".to_string()))
    }
}

/// Returns the same small image for every URL
pub struct StaticImages {
    bytes: Vec<u8>,
}

impl Default for StaticImages {
    fn default() -> Self {
        Self { bytes: sample_png(8, 8) }
    }
}

#[async_trait]
impl ImageSource for StaticImages {
    async fn fetch(&self, _url: &str) -> Result<Vec<u8>> {
        Ok(self.bytes.clone())
    }
}

/// Enricher over fixed fakes and a seeded sampler
pub fn test_enricher() -> Enricher {
    Enricher::new(
        Arc::new(FixedGeocoder::named("Test Plaza, Springfield, USA")),
        Arc::new(FixedClassifier::new(&[(Vibe::Urban, 0.6), (Vibe::Colorful, 0.3), (Vibe::Modern, 0.1)])),
        Arc::new(StaticImages::default()),
        Arc::new(SeededSampler::from_seed(1)),
    )
}

/// Feed that replays scripted pages in order, then reports nothing further
pub struct ScriptedFeed {
    pages: Mutex<VecDeque<Result<FeedPage>>>,
}

impl ScriptedFeed {
    pub fn pages(pages: Vec<Result<FeedPage>>) -> Self {
        Self { pages: Mutex::new(pages.into()) }
    }
}

#[async_trait]
impl ImageryFeed for ScriptedFeed {
    async fn fetch_page(&self, _bbox: &BoundingBox, _cursor: Option<&str>) -> Result<FeedPage> {
        let next = self.pages.lock().expect("feed lock").pop_front();
        next.unwrap_or_else(|| Ok(FeedPage::default()))
    }
}
