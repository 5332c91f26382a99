// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Error types for SnapSphere

use thiserror::Error;

/// Result type alias for SnapSphere operations
pub type Result<T> = std::result::Result<T, SnapSphereError>;

/// SnapSphere error types
#[derive(Error, Debug)]
pub enum SnapSphereError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File system error: {0}")]
    FileSystem(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Model server not available: {0}")]
    ModelUnavailable(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Classification error: {0}")]
    Classification(String),

    #[error("Imagery feed error: {0}")]
    Feed(String),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl SnapSphereError {
    /// True for failures of a remote collaborator (model server, feed, network)
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Self::Http(_) | Self::ModelUnavailable(_) | Self::Classification(_) | Self::Feed(_)
        )
    }
}
