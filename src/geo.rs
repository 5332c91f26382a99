// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Great-circle distance and radius queries over stored photos

use serde::{Deserialize, Serialize};

use crate::db::PhotoRecord;
use crate::vibes::Vibe;
use crate::{Result, SnapSphereError};

/// Mean Earth radius in kilometres
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Approximate length of one degree of latitude, used for bounding boxes
pub const KM_PER_DEGREE: f64 = 111.0;

/// A validated latitude/longitude pair in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(SnapSphereError::InvalidInput(format!("latitude {} out of range", latitude)));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(SnapSphereError::InvalidInput(format!("longitude {} out of range", longitude)));
        }
        Ok(Self { latitude, longitude })
    }
}

/// Haversine distance between two points, in kilometres
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let phi1 = a.latitude.to_radians();
    let phi2 = b.latitude.to_radians();
    let d_phi = (b.latitude - a.latitude).to_radians();
    let d_lambda = (b.longitude - a.longitude).to_radians();

    let h = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Axis-aligned box in degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub min_lon: f64,
    pub max_lat: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    /// Square box of half-width `radius_km / 111` degrees around `center`
    pub fn around(center: GeoPoint, radius_km: f64) -> Self {
        let delta = radius_km / KM_PER_DEGREE;
        Self {
            min_lat: center.latitude - delta,
            min_lon: center.longitude - delta,
            max_lat: center.latitude + delta,
            max_lon: center.longitude + delta,
        }
    }

    /// `min_lon,min_lat,max_lon,max_lat`, as imagery APIs expect
    pub fn to_query_param(&self) -> String {
        format!("{},{},{},{}", self.min_lon, self.min_lat, self.max_lon, self.max_lat)
    }
}

/// A stored photo annotated with its distance from the query point
#[derive(Debug, Clone)]
pub struct NearbyPhoto {
    pub record: PhotoRecord,
    pub distance_km: f64,
}

/// Keep records within `radius_km` (inclusive) that carry `vibe_filter`, if given.
///
/// Store order is preserved. Records without a location never match. A filter
/// that names no known vibe matches nothing.
pub fn query_nearby<I>(records: I, center: GeoPoint, radius_km: f64, vibe_filter: Option<&str>) -> Vec<NearbyPhoto>
where
    I: IntoIterator<Item = PhotoRecord>,
{
    let wanted: Option<Option<Vibe>> = vibe_filter
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(Vibe::parse);

    records
        .into_iter()
        .filter_map(|record| {
            let location = record.location?;
            let distance_km = haversine_km(center, location);
            if distance_km > radius_km {
                return None;
            }
            match wanted {
                Some(Some(vibe)) if !record.vibes.contains(&vibe) => None,
                Some(None) => None,
                _ => Some(NearbyPhoto { record, distance_km }),
            }
        })
        .collect()
}
