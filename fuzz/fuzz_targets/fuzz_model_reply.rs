// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

#![no_main]

use libfuzzer_sys::fuzz_target;
use snapsphere::vibes::classifier::{decode_data_url, parse_scores};

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        if let Ok(ranked) = parse_scores(text) {
            let total: f64 = ranked.iter().map(|s| s.probability).sum();
            assert!((total - 1.0).abs() < 1e-6);
        }
        let _ = decode_data_url(text);
    }
});
