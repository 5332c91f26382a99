// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Vibe classification of photos through a vision model

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

use super::{rank_scores, ScoredVibe, Vibe};
use crate::config::{EngineConfig, ImageFetchConfig};
use crate::ollama::OllamaClient;
use crate::{Result, SnapSphereError};

/// Side length of the square image handed to the model
pub const MODEL_INPUT_SIZE: u32 = 224;

/// Loads photo bytes for a URL
#[async_trait]
pub trait ImageSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// Downloads images over HTTP; `data:` URLs are decoded in place
pub struct HttpImageSource {
    client: Client,
}

impl HttpImageSource {
    pub fn new(config: &ImageFetchConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ImageSource for HttpImageSource {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        if url.starts_with("data:") {
            return decode_data_url(url);
        }

        let response = self.client
            .get(url)
            .send()
            .await?
            .error_for_status()?;

        let bytes = response.bytes().await?;
        debug!("Fetched {} bytes from {}", bytes.len(), url);
        Ok(bytes.to_vec())
    }
}

/// Decode a `data:image/...;base64,` URL
pub fn decode_data_url(url: &str) -> Result<Vec<u8>> {
    let (header, payload) = url
        .split_once(',')
        .ok_or_else(|| SnapSphereError::InvalidInput("data URL without payload".to_string()))?;
    if !header.starts_with("data:image") || !header.ends_with(";base64") {
        return Err(SnapSphereError::InvalidInput(format!("unsupported data URL header '{}'", header)));
    }
    general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| SnapSphereError::InvalidInput(format!("bad base64 image: {}", e)))
}

/// Decode any supported format and re-encode as a 224x224 RGB JPEG
pub fn prepare_image(bytes: &[u8]) -> Result<Vec<u8>> {
    let img = image::load_from_memory(bytes)?;
    let rgb = img
        .resize_exact(MODEL_INPUT_SIZE, MODEL_INPUT_SIZE, image::imageops::FilterType::Triangle)
        .to_rgb8();

    let mut buffer = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut buffer);
    image::DynamicImage::ImageRgb8(rgb).write_to(&mut cursor, image::ImageFormat::Jpeg)?;

    Ok(buffer)
}

/// Scores photos against the vibe vocabulary
#[async_trait]
pub trait VibeClassifier: Send + Sync {
    /// Every vibe with its probability, highest first
    async fn classify(&self, image: &[u8]) -> Result<Vec<ScoredVibe>>;
}

/// Classifier backed by an Ollama vision model
pub struct OllamaVibeClassifier {
    client: OllamaClient,
    model: String,
    prompt: String,
}

impl OllamaVibeClassifier {
    pub fn new(config: &EngineConfig) -> Result<Self> {
        Ok(Self {
            client: OllamaClient::new(config)?,
            model: config.models.vision.clone(),
            prompt: scoring_prompt(),
        })
    }
}

/// Prompt asking for one score per vocabulary entry
pub fn scoring_prompt() -> String {
    let tags = Vibe::ALL.iter().map(|v| v.as_str()).collect::<Vec<_>>().join(", ");
    format!(
        "Rate how well each of these words describes the mood and style of this photo: {}. \
         Reply with a JSON object whose keys are exactly these words and whose values are \
         numbers between 0 and 1. Return ONLY the JSON object.",
        tags
    )
}

/// Read per-vibe scores from a model reply.
///
/// Accepts `{"calm": 0.4, ...}` or the same object under a `"scores"` key. Numbers may
/// be given as strings. Keys outside the vocabulary are ignored.
pub fn parse_scores(reply: &str) -> Result<Vec<ScoredVibe>> {
    let value: serde_json::Value = serde_json::from_str(reply.trim())
        .map_err(|e| SnapSphereError::Classification(format!("model reply is not JSON: {}", e)))?;

    let object = value
        .get("scores")
        .and_then(|s| s.as_object())
        .or_else(|| value.as_object())
        .ok_or_else(|| SnapSphereError::Classification("model reply is not a JSON object".to_string()))?;

    let scores: Vec<(Vibe, f64)> = object
        .iter()
        .filter_map(|(key, raw)| {
            let vibe = Vibe::parse(key)?;
            let score = match raw {
                serde_json::Value::Number(n) => n.as_f64()?,
                serde_json::Value::String(s) => s.trim().parse().ok()?,
                _ => return None,
            };
            Some((vibe, score))
        })
        .collect();

    rank_scores(&scores).ok_or_else(|| SnapSphereError::Classification("model gave no positive scores".to_string()))
}

#[async_trait]
impl VibeClassifier for OllamaVibeClassifier {
    async fn classify(&self, image: &[u8]) -> Result<Vec<ScoredVibe>> {
        let prepared = prepare_image(image)?;
        let encoded = general_purpose::STANDARD.encode(&prepared);

        let reply = self.client
            .generate_json_with_image_retry(&self.model, &self.prompt, &encoded)
            .await?;

        let ranked = parse_scores(&reply)?;
        info!(
            "Classified image: top vibe {} ({:.0}%)",
            ranked[0].vibe,
            ranked[0].probability * 100.0
        );
        Ok(ranked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelConfig;
    use crate::testing::{sample_png, spawn_server};
    use axum::routing::post;
    use axum::{Json, Router};
    use image::GenericImageView;

    #[test]
    fn prepared_image_is_224_square_rgb() {
        let prepared = prepare_image(&sample_png(640, 480)).unwrap();
        let decoded = image::load_from_memory(&prepared).unwrap();
        assert_eq!(decoded.dimensions(), (224, 224));
        assert_eq!(decoded.color(), image::ColorType::Rgb8);
    }

    #[test]
    fn undecodable_bytes_are_an_error() {
        assert!(matches!(prepare_image(b"definitely not an image"), Err(SnapSphereError::Image(_))));
    }

    #[test]
    fn data_url_round_trip() {
        let png = sample_png(4, 4);
        let url = format!("data:image/png;base64,{}", general_purpose::STANDARD.encode(&png));
        assert_eq!(decode_data_url(&url).unwrap(), png);
        assert!(decode_data_url("data:text/plain;base64,aGk=").is_err());
        assert!(decode_data_url("data:image/png;base64").is_err());
    }

    #[test]
    fn parse_scores_is_lenient() {
        let ranked = parse_scores(r#"{"Nature": 0.7, "calm": "0.2", "sunset": 5, "urban": null, "moody": 0.1}"#).unwrap();
        assert_eq!(ranked[0].vibe, Vibe::Nature);
        assert_eq!(ranked[1].vibe, Vibe::Calm);
        assert_eq!(ranked[2].vibe, Vibe::Moody);
        assert!((ranked[0].probability - 0.7).abs() < 1e-9);

        let nested = parse_scores(r#"{"scores": {"graffiti": 3, "urban": 1}}"#).unwrap();
        assert_eq!(nested[0].vibe, Vibe::Graffiti);
    }

    #[test]
    fn parse_scores_rejects_useless_replies() {
        assert!(parse_scores("a moody urban street").is_err());
        assert!(parse_scores("[0.1, 0.2]").is_err());
        assert!(parse_scores(r#"{"sunset": 1}"#).is_err());
    }

    #[test]
    fn prompt_lists_whole_vocabulary() {
        let prompt = scoring_prompt();
        for vibe in Vibe::ALL {
            assert!(prompt.contains(vibe.as_str()));
        }
    }

    #[tokio::test]
    async fn classifies_through_ollama() {
        let app = Router::new().route(
            "/api/generate",
            post(|Json(body): Json<serde_json::Value>| async move {
                // the image travels as base64 JPEG
                let image = body["images"][0].as_str().unwrap_or_default();
                let bytes = general_purpose::STANDARD.decode(image).unwrap();
                assert_eq!(image::guess_format(&bytes).unwrap(), image::ImageFormat::Jpeg);
                Json(serde_json::json!({"response": "{\"trail\": 0.5, \"nature\": 0.3, \"peaceful\": 0.2}"}))
            }),
        );
        let classifier = OllamaVibeClassifier::new(&EngineConfig {
            url: spawn_server(app).await,
            models: ModelConfig { vision: "llava".to_string() },
            timeout_secs: 5,
            retries: 0,
        })
        .unwrap();

        let ranked = classifier.classify(&sample_png(32, 32)).await.unwrap();
        let top: Vec<_> = ranked.iter().take(3).map(|s| s.vibe).collect();
        assert_eq!(top, vec![Vibe::Trail, Vibe::Nature, Vibe::Peaceful]);
    }
}
