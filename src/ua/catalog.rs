//! `user-agents.json` catalog: maps a `"<OS>;;<Browser>"` selector to a pool of
//! concrete UA strings, and the resolver draws uniformly from the matching pool.

use rand::seq::IndexedRandom;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use crate::error::{GateCaptureError, GateCaptureResult};

#[derive(Debug, Deserialize)]
struct CatalogEntry {
    #[serde(rename = "userAgent")]
    user_agent: String,
}

/// Loaded `user-agents.json` catalog, keyed by selector string.
pub struct UaCatalog {
    entries: HashMap<String, Vec<CatalogEntry>>,
}

impl UaCatalog {
    pub fn load(path: &Path) -> GateCaptureResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        let entries: HashMap<String, Vec<CatalogEntry>> = serde_json::from_str(&raw)
            .map_err(|e| GateCaptureError::configuration(format!("invalid user-agents.json: {e}")))?;
        Ok(Self { entries })
    }

    /// Pick a uniform-random UA string from the pool for `selector` (e.g.
    /// `"Windows;;Chrome"`).
    pub fn choose(&self, selector: &str) -> GateCaptureResult<String> {
        let pool = self.entries.get(selector).ok_or_else(|| {
            GateCaptureError::configuration(format!("unknown ua_selector: {selector}"))
        })?;
        let mut rng = rand::rng();
        pool.choose(&mut rng)
            .map(|entry| entry.user_agent.clone())
            .ok_or_else(|| GateCaptureError::configuration(format!("empty ua pool for {selector}")))
    }
}
