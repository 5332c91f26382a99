// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Generated content: the read-only option pools and the sampling source
//! that picks from them.

use minijinja::Environment;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Mutex, OnceLock};

/// Lowest and highest generated rating
pub const RATING_RANGE: (f64, f64) = (4.5, 4.9);

/// Option pools for generated photo-spot content
pub struct ContentPools {
    /// minijinja sources; `place` and `vibes` are in scope
    pub description_templates: &'static [&'static str],
    pub best_times: &'static [&'static str],
    pub safety_notes: &'static [&'static str],
    pub submitters: &'static [&'static str],
}

/// Process-wide content table
pub static POOLS: ContentPools = ContentPools {
    description_templates: &[
        "Capture the essence of {{ place }}, a spot known for its {{ vibes }} vibes. Let your camera tell the story of this hidden gem. Every visit offers a new perspective and a fresh adventure.",
        "Discover {{ place }}, where {{ vibes }} energy fills the air. Perfect for spontaneous photo walks and creative inspiration. Don't forget to explore the surroundings for even more surprises!",
        "Hidden gem alert: {{ place }}! Snap stunning shots and soak in the {{ vibes }} atmosphere. This place is a favorite among locals and explorers alike. Bring a friend and make memories that last a lifetime.",
        "Every corner of {{ place }} tells a story. Experience its {{ vibes }} charm through your lens. Ideal for both quiet reflection and lively group photos. Let your creativity run wild in this photogenic haven.",
        "Looking for {{ vibes }} inspiration? {{ place }} is the place to be for unforgettable photos. The light here is magical at any time of day. Capture moments that will brighten your feed and your mood.",
        "Let {{ place }} surprise you with its {{ vibes }} scenery and unique photo ops. Wander, explore, and find your favorite angle. This spot is a must-visit for every SnapSphere explorer!",
        "Step into {{ place }} and feel the {{ vibes }} spirit all around you. From sunrise to sunset, every moment is picture-perfect. Share your story and inspire others to visit this special place.",
        "At {{ place }}, the {{ vibes }} ambiance sets the stage for creativity. Lose yourself in the details and discover new beauty with every step. This is where memories are made and adventures begin.",
        "Uncover the magic of {{ place }}, a haven for {{ vibes }} seekers. Let the colors, textures, and sounds spark your imagination. Your next viral photo could be just a click away!",
        "{{ place }} is more than a location, it's an experience. Feel the {{ vibes }} energy as you explore every nook and cranny. Bring your friends, your camera, and your sense of wonder.",
        "Wander through {{ place }} and let the {{ vibes }} vibes guide your journey. Every visit reveals something new to capture and cherish. This is the spot where ordinary days become extraordinary memories.",
    ],
    best_times: &[
        "Golden Hour (6-7 PM)",
        "Sunrise (6-7 AM)",
        "Blue Hour (8-9 PM)",
        "Afternoon (2-4 PM)",
        "Early Morning (7-9 AM)",
        "Late Afternoon (4-6 PM)",
    ],
    safety_notes: &[
        "Safe during daylight hours. Well-lit area.",
        "Check for security. Some areas may be restricted.",
        "Very safe area. Popular with joggers and photographers.",
        "Safe area. Popular with tourists and locals.",
        "Access requires permission. Best during business hours.",
        "Safe during business hours. Check for evening access.",
    ],
    submitters: &[
        "Sarah M.", "Mike R.", "Emma L.", "Alex K.", "David P.",
        "Jessica W.", "Tom H.", "Lisa F.", "Chris B.", "Maria S.",
    ],
};

/// Caption templates per style; `first` and `second` are the two strongest vibes
pub struct CaptionPools {
    pub casual: &'static [&'static str],
    pub professional: &'static [&'static str],
    pub creative: &'static [&'static str],
}

pub static CAPTIONS: CaptionPools = CaptionPools {
    casual: &[
        "Living my best {{ first }} life ✨",
        "Found this {{ first }} spot and I'm obsessed!",
        "Can't get enough of these {{ first }} vibes",
        "Today's mood: {{ first }} and {{ second }}",
        "Exploring the {{ first }} side of life",
    ],
    professional: &[
        "Capturing the essence of {{ first }} in this composition",
        "A study in {{ first }} and {{ second }} aesthetics",
        "The interplay of light and {{ first }} elements",
        "Documenting the {{ first }} character of this location",
        "An exploration of {{ first }} visual narratives",
    ],
    creative: &[
        "✨ {{ first | upper }} MAGIC ✨",
        "Where {{ first }} meets {{ second }} and dreams come true",
        "Lost in a {{ first }} daydream",
        "Channeling {{ first }} energy today",
        "✨ {{ first }} vibes only ✨",
    ],
};

fn environment() -> &'static Environment<'static> {
    static ENV: OnceLock<Environment<'static>> = OnceLock::new();
    ENV.get_or_init(Environment::new)
}

/// Render one of the pool templates
pub fn render(template: &str, ctx: minijinja::Value) -> crate::Result<String> {
    Ok(environment().render_str(template, ctx)?)
}

/// Source of the "pick one of N" and "uniform in range" choices behind generated content
pub trait Sampler: Send + Sync {
    /// Uniform index in `0..n`; `n` is never zero
    fn pick(&self, n: usize) -> usize;

    /// Uniform value in `[low, high]`
    fn uniform(&self, low: f64, high: f64) -> f64;
}

/// [`Sampler`] backed by a seedable `StdRng`
pub struct SeededSampler {
    rng: Mutex<StdRng>,
}

impl SeededSampler {
    pub fn from_seed(seed: u64) -> Self {
        Self { rng: Mutex::new(StdRng::seed_from_u64(seed)) }
    }

    pub fn from_entropy() -> Self {
        Self { rng: Mutex::new(StdRng::from_entropy()) }
    }

    /// Seeded when `seed` is given, entropy otherwise
    pub fn new(seed: Option<u64>) -> Self {
        seed.map_or_else(Self::from_entropy, Self::from_seed)
    }

    fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        // a poisoned lock still holds a usable rng
        let mut guard = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard)
    }
}

impl Sampler for SeededSampler {
    fn pick(&self, n: usize) -> usize {
        self.with_rng(|rng| rng.gen_range(0..n.max(1)))
    }

    fn uniform(&self, low: f64, high: f64) -> f64 {
        self.with_rng(|rng| rng.gen_range(low..=high))
    }
}

/// Pick one entry of a non-empty pool
pub fn choose<'a>(sampler: &dyn Sampler, pool: &[&'a str]) -> &'a str {
    pool[sampler.pick(pool.len())]
}

/// A rating in [`RATING_RANGE`], rounded to one decimal
pub fn sample_rating(sampler: &dyn Sampler) -> f64 {
    let (low, high) = RATING_RANGE;
    let raw = sampler.uniform(low, high);
    ((raw * 10.0).round() / 10.0).clamp(low, high)
}
