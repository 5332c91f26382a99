// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use snapsphere::geo::{haversine_km, GeoPoint};
use snapsphere::vibes::{split_vibes, Vibe};

#[derive(Arbitrary, Debug)]
struct Input {
    vibes_column: String,
    a: (f64, f64),
    b: (f64, f64),
}

fuzz_target!(|input: Input| {
    let vibes = split_vibes(&input.vibes_column);
    assert!(vibes.len() <= Vibe::ALL.len());

    if let (Ok(a), Ok(b)) = (GeoPoint::new(input.a.0, input.a.1), GeoPoint::new(input.b.0, input.b.1)) {
        let d = haversine_km(a, b);
        assert!(d >= 0.0 && d <= 20_016.0);
        assert_eq!(d, haversine_km(b, a));
    }
});
