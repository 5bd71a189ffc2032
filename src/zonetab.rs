//! IANA `zone.tab` loader (SPEC_FULL.md §4.2 `TimezoneGate`).
//!
//! Tab-separated columns: `<country>\t<coords>\t<zone>\t<comment>`. Loaded once
//! and treated read-only for the rest of the process.

use rand::seq::IndexedRandom;
use std::collections::HashMap;
use std::path::Path;

use crate::error::GateCaptureResult;

pub struct ZoneTable {
    by_country: HashMap<String, Vec<String>>,
}

impl ZoneTable {
    pub fn load(path: &Path) -> GateCaptureResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        let mut by_country: HashMap<String, Vec<String>> = HashMap::new();
        for line in raw.lines() {
            if line.starts_with('#') || line.trim().is_empty() {
                continue;
            }
            let mut cols = line.split('\t');
            let Some(country) = cols.next() else { continue };
            let _coords = cols.next();
            let Some(zone) = cols.next() else { continue };
            by_country
                .entry(country.trim().to_uppercase())
                .or_default()
                .push(zone.trim().to_string());
        }
        Ok(Self { by_country })
    }

    /// Uniform-random zone for `country_code`, falling back to `UTC` when the
    /// country has no mapped zones (SPEC_FULL.md invariant I6).
    #[must_use]
    pub fn select_for_country(&self, country_code: &str) -> String {
        let code = country_code.to_uppercase();
        let Some(zones) = self.by_country.get(&code) else {
            return "UTC".to_string();
        };
        let mut rng = rand::rng();
        zones
            .choose(&mut rng)
            .cloned()
            .unwrap_or_else(|| "UTC".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_utc_for_unmapped_country() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("zone.tab");
        std::fs::write(&path, "DE\t+5230+01322\tEurope/Berlin\tcomment\n").expect("write");
        let table = ZoneTable::load(&path).expect("load");
        assert_eq!(table.select_for_country("zz"), "UTC");
        assert_eq!(table.select_for_country("de"), "Europe/Berlin");
    }
}
