// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! SnapSphere: geotagged photo enrichment and recommendations
//!
//! Photos are enriched with a place name, vibe tags from a local vision model
//! and generated visit details, stored in SQLite, and served back through
//! radius queries and condition-aware recommendations.

pub mod config;
pub mod content;
pub mod db;
pub mod enrich;
pub mod error;
pub mod geo;
pub mod geocoder;
pub mod ingest;
pub mod ollama;
pub mod recommend;
pub mod service;
pub mod vibes;
pub mod web;

#[cfg(test)]
pub(crate) mod testing;

pub use config::AppConfig;
pub use error::{Result, SnapSphereError};
