// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Photo enrichment: place identity, vibes and generated visit details
//!
//! Enrichment is total. Every external step has a fallback, so a photo URL
//! with valid coordinates always yields a complete set of fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::content::{choose, render, sample_rating, Sampler, POOLS};
use crate::db::{CrowdLevel, PhotoRecord};
use crate::geo::GeoPoint;
use crate::geocoder::ReverseGeocoder;
use crate::vibes::classifier::{ImageSource, VibeClassifier};
use crate::vibes::{top_vibes, ScoredVibe, Vibe, PHOTO_VIBES};
use crate::Result;

/// Everything enrichment derives for one photo
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedFields {
    pub place_name: String,
    pub full_address: String,
    pub description: String,
    pub vibes: Vec<Vibe>,
    pub best_time: String,
    pub crowd_level: CrowdLevel,
    pub safety_notes: String,
    pub rating: f64,
    pub submitted_by: String,
}

impl EnrichedFields {
    pub fn into_record(self, photo_url: String, location: GeoPoint, timestamp: DateTime<Utc>) -> PhotoRecord {
        PhotoRecord {
            photo_url,
            location: Some(location),
            timestamp,
            vibes: self.vibes,
            place_name: Some(self.place_name),
            full_address: Some(self.full_address),
            description: Some(self.description),
            best_time: Some(self.best_time),
            crowd_level: Some(self.crowd_level),
            safety_notes: Some(self.safety_notes),
            rating: Some(self.rating),
            submitted_by: Some(self.submitted_by),
        }
    }
}

/// Combines the geocoder, the classifier and the content pools
pub struct Enricher {
    geocoder: Arc<dyn ReverseGeocoder>,
    classifier: Arc<dyn VibeClassifier>,
    images: Arc<dyn ImageSource>,
    sampler: Arc<dyn Sampler>,
}

impl Enricher {
    pub fn new(
        geocoder: Arc<dyn ReverseGeocoder>,
        classifier: Arc<dyn VibeClassifier>,
        images: Arc<dyn ImageSource>,
        sampler: Arc<dyn Sampler>,
    ) -> Self {
        Self { geocoder, classifier, images, sampler }
    }

    pub fn sampler(&self) -> &dyn Sampler {
        self.sampler.as_ref()
    }

    /// Fetch a photo and rank the whole vocabulary against it
    pub async fn classify_url(&self, photo_url: &str) -> Result<Vec<ScoredVibe>> {
        let bytes = self.images.fetch(photo_url).await?;
        self.classifier.classify(&bytes).await
    }

    /// Derive all enrichment fields for a photo. Never fails.
    pub async fn enrich(&self, photo_url: &str, location: GeoPoint) -> EnrichedFields {
        info!("Enriching {}", photo_url);

        let (place, ranked) = tokio::join!(self.geocoder.resolve(location), self.classify_url(photo_url));

        let (place_name, full_address) = place.or_placeholder(location);

        let vibes = match ranked {
            Ok(ranked) => top_vibes(&ranked, PHOTO_VIBES),
            Err(e) => {
                warn!("Vibe classification failed for {}: {}", photo_url, e);
                Vec::new()
            }
        };

        let description = self.describe(&place_name, &vibes);
        let sampler = self.sampler();

        let fields = EnrichedFields {
            place_name,
            full_address,
            description,
            vibes,
            best_time: choose(sampler, POOLS.best_times).to_string(),
            crowd_level: CrowdLevel::ALL[sampler.pick(CrowdLevel::ALL.len())],
            safety_notes: choose(sampler, POOLS.safety_notes).to_string(),
            rating: sample_rating(sampler),
            submitted_by: choose(sampler, POOLS.submitters).to_string(),
        };
        debug!("Enriched {} as '{}' with vibes {:?}", photo_url, fields.place_name, fields.vibes);
        fields
    }

    fn describe(&self, place_name: &str, vibes: &[Vibe]) -> String {
        let vibe_text = vibe_phrase(vibes);
        let template = choose(self.sampler(), POOLS.description_templates);
        render(template, minijinja::context! { place => place_name, vibes => vibe_text.as_str() }).unwrap_or_else(|e| {
            warn!("Description template failed: {}", e);
            format!(
                "A photogenic spot with {} vibes at {}. Perfect for capturing memorable moments.",
                vibe_text, place_name
            )
        })
    }
}

/// Human-readable vibe list, or "unique" when there is none
pub fn vibe_phrase(vibes: &[Vibe]) -> String {
    if vibes.is_empty() {
        "unique".to_string()
    } else {
        vibes.iter().map(|v| v.as_str()).collect::<Vec<_>>().join(", ")
    }
}
