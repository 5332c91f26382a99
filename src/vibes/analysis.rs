// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Derived views of a classification: vibe analysis and social captions

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{top_vibes, ScoredVibe, Vibe};
use crate::content::{choose, render, Sampler, CAPTIONS};
use crate::{Result, SnapSphereError};

/// Vibes considered by an analysis (primary plus secondaries)
pub const ANALYSIS_VIBES: usize = 5;

/// Placeholder palette until real color extraction exists
const GRAYSCALE_PALETTE: [&str; 5] = ["#000000", "#ffffff", "#cccccc", "#999999", "#666666"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VibeAnalysis {
    pub primary_vibe: Vibe,
    pub secondary_vibes: Vec<Vibe>,
    pub confidence_score: f64,
    pub mood_score: f64,
    pub style_tags: Vec<String>,
    pub color_palette: Vec<String>,
}

/// Summarise a ranked classification
pub fn analyze(ranked: &[ScoredVibe]) -> Result<VibeAnalysis> {
    let (primary, rest) = ranked
        .split_first()
        .ok_or_else(|| SnapSphereError::Classification("empty classification".to_string()))?;

    let confidence_score = primary.probability.clamp(0.0, 1.0);

    Ok(VibeAnalysis {
        primary_vibe: primary.vibe,
        secondary_vibes: top_vibes(rest, ANALYSIS_VIBES - 1),
        confidence_score,
        mood_score: (confidence_score + 0.2).min(1.0),
        style_tags: style_tags(primary.vibe, confidence_score),
        color_palette: GRAYSCALE_PALETTE.iter().map(|c| c.to_string()).collect(),
    })
}

fn style_tags(primary: Vibe, confidence: f64) -> Vec<String> {
    let mut tags = Vec::new();
    if confidence > 0.7 {
        tags.push("high_contrast");
    }
    match primary {
        Vibe::Nature => tags.extend(["organic", "natural"]),
        Vibe::Urban => tags.extend(["city", "modern"]),
        Vibe::Vintage => tags.extend(["retro", "nostalgic"]),
        _ => {}
    }
    tags.into_iter().map(String::from).collect()
}

/// Voice of a generated caption
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CaptionStyle {
    #[default]
    Casual,
    Professional,
    Creative,
}

impl CaptionStyle {
    /// Unknown styles fall back to casual
    pub fn parse_or_default(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("professional") => Self::Professional,
            Some("creative") => Self::Creative,
            _ => Self::Casual,
        }
    }

    fn templates(self) -> &'static [&'static str] {
        match self {
            Self::Casual => CAPTIONS.casual,
            Self::Professional => CAPTIONS.professional,
            Self::Creative => CAPTIONS.creative,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Caption {
    pub caption: String,
    pub hashtags: Vec<String>,
    pub style: CaptionStyle,
    pub mood: String,
    pub vibes: Vec<Vibe>,
}

const STOCK_HASHTAGS: [&str; 4] = ["#photography", "#snapsphere", "#photooftheday", "#instagood"];

/// Write a caption around the strongest detected vibes
pub fn caption(vibes: &[Vibe], style: CaptionStyle, mood: &str, sampler: &dyn Sampler) -> Caption {
    let Some(&first) = vibes.first() else {
        return fallback_caption(style, mood);
    };
    let second = vibes.get(1).copied().unwrap_or(first);

    let template = choose(sampler, style.templates());
    let text = match render(template, minijinja::context! { first => first.as_str(), second => second.as_str() }) {
        Ok(text) => text,
        Err(e) => {
            warn!("Caption template failed: {}", e);
            format!("Exploring the {} side of life", first)
        }
    };

    let detected: Vec<Vibe> = vibes.iter().take(3).copied().collect();
    let hashtags = detected
        .iter()
        .map(|v| format!("#{}", v))
        .chain(STOCK_HASHTAGS.iter().map(|t| t.to_string()))
        .collect();

    Caption {
        caption: text,
        hashtags,
        style,
        mood: mood.to_string(),
        vibes: detected,
    }
}

/// Caption used when the photo could not be classified
pub fn fallback_caption(style: CaptionStyle, mood: &str) -> Caption {
    Caption {
        caption: "Living my best life! 🌟 This moment is everything I needed today.".to_string(),
        hashtags: [
            "#nature", "#peaceful", "#calm", "#goodvibes", "#lifestyle", "#daily", "#happy", "#positive", "#joy",
        ]
        .iter()
        .map(|t| t.to_string())
        .collect(),
        style,
        mood: mood.to_string(),
        vibes: vec![Vibe::Nature, Vibe::Peaceful, Vibe::Calm],
    }
}
