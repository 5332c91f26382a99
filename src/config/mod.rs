// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Configuration management for SnapSphere

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main application configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    /// Reverse geocoding service
    #[serde(default)]
    pub geocoder: GeocoderConfig,

    /// Vision model engine used for vibe classification
    pub ai_engine: EngineConfig,

    /// External imagery index used for bulk ingestion
    #[serde(default)]
    pub imagery: ImageryConfig,

    /// Photo download settings
    #[serde(default)]
    pub image_fetch: ImageFetchConfig,

    /// Generated content settings
    #[serde(default)]
    pub enrichment: EnrichmentConfig,

    /// HTTP API settings
    #[serde(default)]
    pub web: WebConfig,

    /// Database settings
    #[serde(default)]
    pub database: DatabaseConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GeocoderConfig {
    #[serde(default = "default_geocoder_url")]
    pub url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_geocoder_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EngineConfig {
    pub url: String,
    pub models: ModelConfig,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_retries")]
    pub retries: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ModelConfig {
    pub vision: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ImageryConfig {
    #[serde(default = "default_imagery_url")]
    pub url: String,
    /// Mapillary client token; ingestion is refused while empty
    #[serde(default)]
    pub access_token: String,
    #[serde(default = "default_page_limit")]
    pub page_limit: u32,
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
    /// Pause between ingested items, in milliseconds
    #[serde(default = "default_throttle_ms")]
    pub throttle_ms: u64,
    #[serde(default = "default_imagery_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ImageFetchConfig {
    #[serde(default = "default_fetch_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct EnrichmentConfig {
    /// Fixed seed for generated content; entropy when absent
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WebConfig {
    #[serde(default = "default_web_host")]
    pub host: String,
    #[serde(default = "default_web_port")]
    pub port: u16,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

// Default value functions
fn default_geocoder_url() -> String { "https://nominatim.openstreetmap.org".to_string() }
fn default_user_agent() -> String { "SnapSphere/1.0".to_string() }
fn default_geocoder_timeout() -> u64 { 5 }
fn default_timeout() -> u64 { 120 }
fn default_retries() -> u32 { 2 }
fn default_imagery_url() -> String { "https://graph.mapillary.com".to_string() }
fn default_page_limit() -> u32 { 20 }
fn default_max_pages() -> u32 { 1 }
fn default_throttle_ms() -> u64 { 200 }
fn default_imagery_timeout() -> u64 { 30 }
fn default_fetch_timeout() -> u64 { 15 }
fn default_web_host() -> String { "127.0.0.1".to_string() }
fn default_web_port() -> u16 { 5000 }
fn default_db_path() -> String { "photos.db".to_string() }

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            geocoder: GeocoderConfig::default(),
            ai_engine: EngineConfig {
                url: "http://localhost:11434".to_string(),
                models: ModelConfig {
                    vision: "llava".to_string(),
                },
                timeout_secs: default_timeout(),
                retries: default_retries(),
            },
            imagery: ImageryConfig::default(),
            image_fetch: ImageFetchConfig::default(),
            enrichment: EnrichmentConfig::default(),
            web: WebConfig::default(),
            database: DatabaseConfig::default(),
        }
    }
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            url: default_geocoder_url(),
            user_agent: default_user_agent(),
            timeout_secs: default_geocoder_timeout(),
        }
    }
}

impl Default for ImageryConfig {
    fn default() -> Self {
        Self {
            url: default_imagery_url(),
            access_token: String::new(),
            page_limit: default_page_limit(),
            max_pages: default_max_pages(),
            throttle_ms: default_throttle_ms(),
            timeout_secs: default_imagery_timeout(),
        }
    }
}

impl Default for ImageFetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_fetch_timeout(),
        }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: default_web_host(),
            port: default_web_port(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> crate::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = serde_json::from_str(&content)
                .map_err(|e| crate::SnapSphereError::Config(format!("Failed to parse config: {}", e)))?;
            config.validate()?;
            Ok(config)
        } else {
            tracing::info!("Config file not found at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: &Path) -> crate::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject settings that would make the service unusable
    pub fn validate(&self) -> crate::Result<()> {
        if self.ai_engine.models.vision.trim().is_empty() {
            return Err(crate::SnapSphereError::Config("ai_engine.models.vision is empty".to_string()));
        }
        if self.imagery.page_limit == 0 {
            return Err(crate::SnapSphereError::Config("imagery.page_limit must be positive".to_string()));
        }
        if self.geocoder.timeout_secs == 0 || self.image_fetch.timeout_secs == 0 {
            return Err(crate::SnapSphereError::Config("timeouts must be positive".to_string()));
        }
        Ok(())
    }
}
