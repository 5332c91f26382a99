// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Vibe vocabulary and ranking of classifier scores
//!
//! The vocabulary is closed: every tag a classifier can produce is a [`Vibe`],
//! so nothing outside the fixed list can reach the photo store.

pub mod analysis;
pub mod classifier;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::SnapSphereError;

/// Number of vibes persisted with a photo
pub const PHOTO_VIBES: usize = 3;

/// A descriptive tag characterising a photo's visual mood or style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vibe {
    Moody,
    Urban,
    Nature,
    Colorful,
    Peaceful,
    Vintage,
    Graffiti,
    Trail,
    Abandoned,
    Calm,
    Modern,
}

impl Vibe {
    /// The full candidate vocabulary, in canonical order
    pub const ALL: [Vibe; 11] = [
        Vibe::Moody,
        Vibe::Urban,
        Vibe::Nature,
        Vibe::Colorful,
        Vibe::Peaceful,
        Vibe::Vintage,
        Vibe::Graffiti,
        Vibe::Trail,
        Vibe::Abandoned,
        Vibe::Calm,
        Vibe::Modern,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Vibe::Moody => "moody",
            Vibe::Urban => "urban",
            Vibe::Nature => "nature",
            Vibe::Colorful => "colorful",
            Vibe::Peaceful => "peaceful",
            Vibe::Vintage => "vintage",
            Vibe::Graffiti => "graffiti",
            Vibe::Trail => "trail",
            Vibe::Abandoned => "abandoned",
            Vibe::Calm => "calm",
            Vibe::Modern => "modern",
        }
    }

    /// Case-insensitive, whitespace-tolerant lookup
    pub fn parse(raw: &str) -> Option<Vibe> {
        let raw = raw.trim();
        Vibe::ALL.into_iter().find(|v| v.as_str().eq_ignore_ascii_case(raw))
    }
}

impl fmt::Display for Vibe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Vibe {
    type Err = SnapSphereError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Vibe::parse(s).ok_or_else(|| SnapSphereError::InvalidInput(format!("unknown vibe '{}'", s)))
    }
}

/// A vibe paired with the probability the classifier assigned to it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoredVibe {
    pub vibe: Vibe,
    pub probability: f64,
}

/// Turn raw per-vibe scores into a probability-ranked list covering the vocabulary.
///
/// Negative or non-finite scores count as zero. Vibes without a score get zero.
/// Ties keep vocabulary order. Returns `None` when no vibe has a positive score.
pub fn rank_scores(scores: &[(Vibe, f64)]) -> Option<Vec<ScoredVibe>> {
    let mut ranked: Vec<ScoredVibe> = Vibe::ALL
        .into_iter()
        .map(|vibe| {
            let score = scores
                .iter()
                .filter(|(v, _)| *v == vibe)
                .map(|(_, s)| if s.is_finite() && *s > 0.0 { *s } else { 0.0 })
                .fold(0.0_f64, f64::max);
            ScoredVibe { vibe, probability: score }
        })
        .collect();

    let max = ranked.iter().map(|s| s.probability).fold(0.0_f64, f64::max);
    if max <= 0.0 {
        return None;
    }
    // scale by the max first so huge scores cannot overflow the sum
    for scored in &mut ranked {
        scored.probability /= max;
    }
    let total: f64 = ranked.iter().map(|s| s.probability).sum();
    for scored in &mut ranked {
        scored.probability /= total;
    }

    // stable: equal probabilities stay in vocabulary order
    ranked.sort_by(|a, b| b.probability.total_cmp(&a.probability));
    Some(ranked)
}

/// The first `k` vibes of a ranked list that carry any confidence
pub fn top_vibes(ranked: &[ScoredVibe], k: usize) -> Vec<Vibe> {
    ranked.iter().filter(|s| s.probability > 0.0).take(k).map(|s| s.vibe).collect()
}

/// Serialize vibes for the comma-separated store column
pub fn join_vibes(vibes: &[Vibe]) -> String {
    vibes.iter().map(|v| v.as_str()).collect::<Vec<_>>().join(",")
}

/// Parse a stored vibes column, dropping blank or unknown entries
pub fn split_vibes(column: &str) -> Vec<Vibe> {
    let mut vibes = Vec::new();
    for vibe in column.split(',').filter_map(Vibe::parse) {
        if !vibes.contains(&vibe) {
            vibes.push(vibe);
        }
    }
    vibes
}
