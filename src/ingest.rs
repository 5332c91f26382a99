// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Bulk ingestion of street-level imagery around a point

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::ImageryConfig;
use crate::db::PhotoStore;
use crate::enrich::{EnrichedFields, Enricher};
use crate::geo::{BoundingBox, GeoPoint};
use crate::{Result, SnapSphereError};

/// One image listed by the feed
#[derive(Debug, Clone, PartialEq)]
pub struct FeedImage {
    pub id: Option<String>,
    pub url: String,
    pub location: GeoPoint,
}

/// A page of feed results plus the cursor for the next one
#[derive(Debug, Clone, Default)]
pub struct FeedPage {
    pub images: Vec<FeedImage>,
    pub next: Option<String>,
}

/// An index of geolocated images searchable by bounding box
#[async_trait]
pub trait ImageryFeed: Send + Sync {
    /// First page when `cursor` is `None`, otherwise the page the cursor points at
    async fn fetch_page(&self, bbox: &BoundingBox, cursor: Option<&str>) -> Result<FeedPage>;
}

/// Mapillary Graph API client
pub struct MapillaryClient {
    client: Client,
    base_url: String,
    access_token: String,
    page_limit: u32,
}

#[derive(Deserialize)]
struct ImagesResponse {
    #[serde(default)]
    data: Vec<RawImage>,
    paging: Option<Paging>,
}

#[derive(Deserialize)]
struct RawImage {
    id: Option<String>,
    thumb_1024_url: Option<String>,
    geometry: Option<Geometry>,
}

#[derive(Deserialize)]
struct Geometry {
    #[serde(default)]
    coordinates: Vec<f64>,
}

#[derive(Deserialize)]
struct Paging {
    next: Option<String>,
}

impl RawImage {
    /// Usable only with a URL and a `[lon, lat]` point
    fn into_feed_image(self) -> Option<FeedImage> {
        let url = self.thumb_1024_url.filter(|u| !u.trim().is_empty())?;
        let coords = self.geometry?.coordinates;
        if coords.len() != 2 {
            return None;
        }
        let location = GeoPoint::new(coords[1], coords[0]).ok()?;
        Some(FeedImage { id: self.id, url, location })
    }
}

impl MapillaryClient {
    pub fn new(config: &ImageryConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            access_token: config.access_token.clone(),
            page_limit: config.page_limit,
        })
    }
}

#[async_trait]
impl ImageryFeed for MapillaryClient {
    async fn fetch_page(&self, bbox: &BoundingBox, cursor: Option<&str>) -> Result<FeedPage> {
        if self.access_token.trim().is_empty() {
            return Err(SnapSphereError::Feed("imagery.access_token is not configured".to_string()));
        }

        let request = match cursor {
            Some(next) => self.client.get(next),
            None => self.client
                .get(format!("{}/images", self.base_url))
                .query(&[
                    ("access_token", self.access_token.clone()),
                    ("fields", "id,thumb_1024_url,geometry".to_string()),
                    ("bbox", bbox.to_query_param()),
                    ("limit", self.page_limit.to_string()),
                ]),
        };

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let details = response.text().await.unwrap_or_default();
            return Err(SnapSphereError::Feed(format!("imagery feed returned {}: {}", status, details)));
        }

        let body: ImagesResponse = response.json().await?;
        let listed = body.data.len();
        let images: Vec<FeedImage> = body.data.into_iter().filter_map(RawImage::into_feed_image).collect();
        debug!("Feed page: {} listed, {} usable", listed, images.len());

        Ok(FeedPage {
            images,
            next: body.paging.and_then(|p| p.next),
        })
    }
}

/// A photo added by a bulk run
#[derive(Debug, Clone, Serialize)]
pub struct IngestedPhoto {
    pub photo_url: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(flatten)]
    pub details: EnrichedFields,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub new_photos: Vec<IngestedPhoto>,
    pub count: usize,
}

/// Pages the feed, enriching and storing photos the store does not know yet
pub struct BulkIngestor {
    store: PhotoStore,
    enricher: Arc<Enricher>,
    feed: Arc<dyn ImageryFeed>,
    throttle: Duration,
    max_pages: u32,
}

impl BulkIngestor {
    pub fn new(
        store: PhotoStore,
        enricher: Arc<Enricher>,
        feed: Arc<dyn ImageryFeed>,
        throttle: Duration,
        max_pages: u32,
    ) -> Self {
        Self { store, enricher, feed, throttle, max_pages: max_pages.max(1) }
    }

    pub async fn ingest(&self, center: GeoPoint, radius_km: f64) -> Result<IngestReport> {
        if !radius_km.is_finite() || radius_km <= 0.0 {
            return Err(SnapSphereError::InvalidInput(format!("radius {} must be positive", radius_km)));
        }

        let bbox = BoundingBox::around(center, radius_km);
        info!("Bulk ingest around ({}, {}) within {} km", center.latitude, center.longitude, radius_km);

        let mut new_photos = Vec::new();
        let mut cursor: Option<String> = None;

        for page_number in 0..self.max_pages {
            let page = match self.feed.fetch_page(&bbox, cursor.as_deref()).await {
                Ok(page) => page,
                Err(e) if page_number == 0 => return Err(e),
                Err(e) => {
                    warn!("Stopping after page {}: {}", page_number, e);
                    break;
                }
            };

            for image in page.images {
                match self.store.contains_url(&image.url) {
                    Ok(false) => {}
                    Ok(true) => {
                        debug!("Already known: {}", image.url);
                        continue;
                    }
                    Err(e) => {
                        warn!("Failed to look up {}: {}", image.url, e);
                        continue;
                    }
                }

                let details = self.enricher.enrich(&image.url, image.location).await;
                let record = details.clone().into_record(image.url.clone(), image.location, Utc::now());
                if let Err(e) = self.store.put(&record) {
                    warn!("Failed to store {}: {}", image.url, e);
                    continue;
                }

                new_photos.push(IngestedPhoto {
                    photo_url: image.url,
                    latitude: image.location.latitude,
                    longitude: image.location.longitude,
                    details,
                });

                tokio::time::sleep(self.throttle).await;
            }

            match page.next {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        info!("Bulk ingest added {} photos", new_photos.len());
        Ok(IngestReport { count: new_photos.len(), new_photos })
    }
}
