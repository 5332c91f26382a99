// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Condition-aware recommendations of nearby photo spots

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashSet;
use tracing::debug;

use crate::db::{CrowdLevel, PhotoRecord};
use crate::geo::{haversine_km, GeoPoint};
use crate::vibes::Vibe;

/// Only spots this close are recommended
pub const RECOMMENDATION_RADIUS_KM: f64 = 10.0;

pub const DEFAULT_MAX_RESULTS: usize = 5;

const UNKNOWN_PLACE: &str = "Unknown Location";
const DEFAULT_DESCRIPTION: &str = "Beautiful photo spot with great views";
const DEFAULT_BEST_TIME: &str = "daylight";
const DEFAULT_RATING: f64 = 4.5;

/// Current weather and light at the requester
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conditions {
    pub weather: String,
    pub time_of_day: String,
}

impl Default for Conditions {
    fn default() -> Self {
        Self {
            weather: "clear".to_string(),
            time_of_day: "daylight".to_string(),
        }
    }
}

impl Conditions {
    /// Blank or missing values take the defaults
    pub fn from_optional(weather: Option<&str>, time_of_day: Option<&str>) -> Self {
        let defaults = Self::default();
        let pick = |raw: Option<&str>, fallback: String| {
            raw.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).unwrap_or(fallback)
        };
        Self {
            weather: pick(weather, defaults.weather),
            time_of_day: pick(time_of_day, defaults.time_of_day),
        }
    }

    /// Only two combinations boost a spot
    fn priority_for(&self, vibes: &[Vibe]) -> Priority {
        let has_any = |wanted: &[Vibe]| vibes.iter().any(|v| wanted.contains(v));
        let boosted = match (self.weather.as_str(), self.time_of_day.as_str()) {
            ("clear", "golden_hour") => has_any(&[Vibe::Nature, Vibe::Peaceful]),
            ("sunny", "daylight") => has_any(&[Vibe::Urban, Vibe::Modern]),
            _ => false,
        };
        if boosted {
            Priority::High
        } else {
            Priority::Normal
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Normal,
    High,
}

/// A spot as returned to the client, with display defaults filled in
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub photo_url: String,
    pub latitude: f64,
    pub longitude: f64,
    pub vibes: Vec<Vibe>,
    pub timestamp: DateTime<Utc>,
    pub place_name: String,
    pub description: String,
    pub best_time: String,
    pub crowd_level: CrowdLevel,
    pub safety_notes: Option<String>,
    pub rating: f64,
    pub submitted_by: Option<String>,
    #[serde(serialize_with = "one_decimal")]
    pub distance_km: f64,
    pub priority: Priority,
}

fn rounded_km(km: f64) -> f64 {
    (km * 10.0).round() / 10.0
}

fn one_decimal<S: Serializer>(value: &f64, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_f64(rounded_km(*value))
}

impl Recommendation {
    fn from_record(record: PhotoRecord, location: GeoPoint, distance_km: f64, priority: Priority) -> Self {
        Self {
            photo_url: record.photo_url,
            latitude: location.latitude,
            longitude: location.longitude,
            vibes: record.vibes,
            timestamp: record.timestamp,
            place_name: place_key(&record.place_name).to_string(),
            description: non_blank(record.description).unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
            best_time: non_blank(record.best_time).unwrap_or_else(|| DEFAULT_BEST_TIME.to_string()),
            crowd_level: record.crowd_level.unwrap_or(CrowdLevel::Medium),
            safety_notes: record.safety_notes,
            rating: record.rating.unwrap_or(DEFAULT_RATING),
            submitted_by: record.submitted_by,
            distance_km,
            priority,
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

fn place_key(place_name: &Option<String>) -> &str {
    place_name.as_deref().filter(|s| !s.trim().is_empty()).unwrap_or(UNKNOWN_PLACE)
}

/// Rank stored photos around `center` for the given conditions.
///
/// One spot per place name (the first in store order), boosted spots first,
/// then by distance as shown (one decimal). Equal keys keep store order.
pub fn rank<I>(records: I, center: GeoPoint, conditions: &Conditions, max_results: usize) -> Vec<Recommendation>
where
    I: IntoIterator<Item = PhotoRecord>,
{
    let mut seen_places = HashSet::new();
    let mut ranked: Vec<Recommendation> = records
        .into_iter()
        .filter_map(|record| {
            let location = record.location?;
            let distance_km = haversine_km(center, location);
            if distance_km > RECOMMENDATION_RADIUS_KM {
                return None;
            }
            if !seen_places.insert(place_key(&record.place_name).to_string()) {
                return None;
            }
            let priority = conditions.priority_for(&record.vibes);
            Some(Recommendation::from_record(record, location, distance_km, priority))
        })
        .collect();

    ranked.sort_by(|a, b| {
        (a.priority != Priority::High)
            .cmp(&(b.priority != Priority::High))
            .then(rounded_km(a.distance_km).total_cmp(&rounded_km(b.distance_km)))
    });
    ranked.truncate(max_results);

    debug!(
        "Recommended {} spots for weather={} time_of_day={}",
        ranked.len(),
        conditions.weather,
        conditions.time_of_day
    );
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::record_at;

    const ORIGIN: (f64, f64) = (0.0, 0.0);

    fn origin() -> GeoPoint {
        GeoPoint::new(ORIGIN.0, ORIGIN.1).unwrap()
    }

    /// A record roughly `km` north of the origin
    fn spot(url: &str, place: &str, km: f64, vibes: &[Vibe]) -> PhotoRecord {
        let mut record = record_at(url, km / 111.195, 0.0, vibes);
        record.place_name = Some(place.to_string());
        record
    }

    fn conditions(weather: &str, time_of_day: &str) -> Conditions {
        Conditions { weather: weather.to_string(), time_of_day: time_of_day.to_string() }
    }

    #[test]
    fn boosted_spot_outranks_closer_one() {
        let records = vec![
            spot("https://img/cafe.jpg", "Cafe", 1.0, &[Vibe::Urban]),
            spot("https://img/lake.jpg", "Lake", 5.0, &[Vibe::Nature]),
        ];
        let ranked = rank(records, origin(), &conditions("clear", "golden_hour"), DEFAULT_MAX_RESULTS);

        assert_eq!(ranked[0].place_name, "Lake");
        assert_eq!(ranked[0].priority, Priority::High);
        assert_eq!(ranked[1].place_name, "Cafe");
        assert_eq!(ranked[1].priority, Priority::Normal);
    }

    #[test]
    fn priority_rule_is_asymmetric() {
        let urban = [Vibe::Urban];
        let nature = [Vibe::Nature];
        assert_eq!(conditions("sunny", "daylight").priority_for(&urban), Priority::High);
        assert_eq!(conditions("sunny", "golden_hour").priority_for(&urban), Priority::Normal);
        assert_eq!(conditions("clear", "daylight").priority_for(&nature), Priority::Normal);
        assert_eq!(conditions("sunny", "daylight").priority_for(&nature), Priority::Normal);
        assert_eq!(conditions("clear", "golden_hour").priority_for(&[Vibe::Peaceful]), Priority::High);
    }

    #[test]
    fn one_spot_per_place_first_in_store_order() {
        let mut unnamed_a = spot("https://img/u1.jpg", "", 3.0, &[]);
        unnamed_a.place_name = None;
        let unnamed_b = spot("https://img/u2.jpg", "  ", 1.0, &[]);
        let records = vec![
            spot("https://img/pier-far.jpg", "Pier", 4.0, &[]),
            spot("https://img/pier-near.jpg", "Pier", 0.5, &[]),
            unnamed_a,
            unnamed_b,
        ];
        let ranked = rank(records, origin(), &Conditions::default(), DEFAULT_MAX_RESULTS);

        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].place_name, "Unknown Location");
        assert_eq!(ranked[0].photo_url, "https://img/u1.jpg");
        assert_eq!(ranked[1].photo_url, "https://img/pier-far.jpg");
    }

    #[test]
    fn radius_and_limit_apply() {
        let mut records: Vec<_> = (0..8)
            .map(|i| spot(&format!("https://img/{}.jpg", i), &format!("Place {}", i), 1.0 + i as f64, &[]))
            .collect();
        records.push(spot("https://img/far.jpg", "Far", 10.5, &[Vibe::Urban]));

        let ranked = rank(records, origin(), &conditions("sunny", "daylight"), DEFAULT_MAX_RESULTS);
        assert_eq!(ranked.len(), 5);
        assert!(ranked.iter().all(|r| r.place_name != "Far"));
        let distances: Vec<_> = ranked.iter().map(|r| r.distance_km).collect();
        assert!(distances.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn defaults_fill_response_only() {
        let mut sparse = spot("https://img/sparse.jpg", "Sparse", 2.0, &[]);
        sparse.place_name = None;
        sparse.description = None;
        sparse.best_time = None;
        sparse.crowd_level = None;
        sparse.rating = None;
        let before = sparse.clone();

        let ranked = rank(vec![sparse.clone()], origin(), &Conditions::default(), DEFAULT_MAX_RESULTS);
        let rec = &ranked[0];
        assert_eq!(rec.place_name, "Unknown Location");
        assert_eq!(rec.description, "Beautiful photo spot with great views");
        assert_eq!(rec.best_time, "daylight");
        assert_eq!(rec.crowd_level, CrowdLevel::Medium);
        assert_eq!(rec.rating, 4.5);
        assert_eq!(sparse, before);
    }

    #[test]
    fn distance_is_rounded_when_serialized() {
        let ranked = rank(
            vec![spot("https://img/x.jpg", "X", 2.26, &[])],
            origin(),
            &Conditions::default(),
            DEFAULT_MAX_RESULTS,
        );
        let json = serde_json::to_value(&ranked[0]).unwrap();
        assert_eq!(json["distance_km"], serde_json::json!(2.3));
        assert_eq!(json["priority"], "normal");
        assert!((ranked[0].distance_km - 2.26).abs() < 0.01);
    }

    #[test]
    fn same_shown_distance_keeps_store_order() {
        let records = vec![
            spot("https://img/a.jpg", "A", 1.04, &[]),
            spot("https://img/b.jpg", "B", 1.01, &[]),
            spot("https://img/c.jpg", "C", 0.96, &[]),
        ];
        let ranked = rank(records, origin(), &Conditions::default(), DEFAULT_MAX_RESULTS);
        let names: Vec<_> = ranked.iter().map(|r| r.place_name.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);

        let records = vec![spot("https://img/far.jpg", "Far", 1.26, &[]), spot("https://img/near.jpg", "Near", 1.01, &[])];
        let ranked = rank(records, origin(), &Conditions::default(), DEFAULT_MAX_RESULTS);
        assert_eq!(ranked[0].place_name, "Near");
    }

    #[test]
    fn blank_conditions_take_defaults() {
        assert_eq!(Conditions::from_optional(None, Some(" ")), Conditions::default());
        let c = Conditions::from_optional(Some("sunny"), None);
        assert_eq!(c.weather, "sunny");
        assert_eq!(c.time_of_day, "daylight");
    }
}
