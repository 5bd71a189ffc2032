//! `base_profiles.json` catalog and selection (SPEC_FULL.md §3 `BaseProfile`,
//! §4.4 dynamic resolver step 3).
//!
//! A base profile is a coherent hardware class: selection filters the catalog on
//! the resolved UA's OS family, picks uniformly among the surviving candidates,
//! then draws one value from each of that candidate's pools so RAM/cores/screen/
//! WebGL never contradict each other within a session.

use rand::seq::IndexedRandom;
use serde::Deserialize;
use std::path::Path;

use crate::error::{GateCaptureError, GateCaptureResult};
use crate::plan::BaseProfile;

#[derive(Debug, Deserialize)]
struct CatalogEntry {
    id: String,
    os: Vec<String>,
    mem: Vec<u32>,
    cores: Vec<u32>,
    screen: Vec<(u32, u32)>,
    webgl: Vec<(String, String)>,
}

pub struct BaseProfileCatalog {
    entries: Vec<CatalogEntry>,
}

impl BaseProfileCatalog {
    pub fn load(path: &Path) -> GateCaptureResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        let entries: Vec<CatalogEntry> = serde_json::from_str(&raw)
            .map_err(|e| GateCaptureError::configuration(format!("invalid base_profiles.json: {e}")))?;
        Ok(Self { entries })
    }

    /// Pick a profile compatible with `os_family` (SPEC_FULL.md `UserAgentProfile::os_family`),
    /// then draw one value from each of its pools.
    pub fn select(&self, os_family: &str) -> GateCaptureResult<BaseProfile> {
        let candidates: Vec<&CatalogEntry> = self
            .entries
            .iter()
            .filter(|e| e.os.iter().any(|os| os == os_family))
            .collect();
        let mut rng = rand::rng();
        let entry = candidates.choose(&mut rng).copied().or_else(|| self.entries.first()).ok_or_else(|| {
            GateCaptureError::configuration("base_profiles.json has no entries".to_string())
        })?;

        let memory_gib = *entry.mem.choose(&mut rng).unwrap_or(&8);
        let cores = *entry.cores.choose(&mut rng).unwrap_or(&4);
        let (screen_width, screen_height) = entry.screen.choose(&mut rng).cloned().unwrap_or((1920, 1080));
        let (webgl_vendor, webgl_renderer) = entry
            .webgl
            .choose(&mut rng)
            .cloned()
            .unwrap_or_else(|| ("Google Inc.".to_string(), "ANGLE (Google, Vulkan 1.3.0)".to_string()));

        Ok(BaseProfile {
            id: entry.id.clone(),
            memory_gib,
            cores,
            screen_width,
            screen_height,
            webgl_vendor,
            webgl_renderer,
            connection_profile: entry.id.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selects_profile_matching_os_family() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("base_profiles.json");
        std::fs::write(
            &path,
            r#"[{"id":"desk_mid","os":["windows"],"mem":[16],"cores":[8],"screen":[[1920,1080]],"webgl":[["Intel Inc.","Intel(R) UHD Graphics 630"]]}]"#,
        )
        .expect("write");
        let catalog = BaseProfileCatalog::load(&path).expect("load");
        let profile = catalog.select("windows").expect("select");
        assert_eq!(profile.id, "desk_mid");
        assert_eq!(profile.memory_gib, 16);
    }
}
