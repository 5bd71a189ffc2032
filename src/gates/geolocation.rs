//! Geolocation spoofing (SPEC_FULL.md §4.2, REDESIGN FLAG).
//!
//! The original tool's `GeolocationGate.handle` calls `context.grant_permissions`
//! so the driver itself answers `navigator.geolocation` calls. A granted
//! permission is itself a fingerprintable signal (a fresh automated context that
//! silently holds a geolocation grant is unusual), so this gate never touches
//! driver permissions — coherence comes entirely from JS-patching
//! `getCurrentPosition`/`watchPosition` to resolve with the resolved coordinate.

use std::collections::HashMap;

use super::contract::{Gate, GateConfig, GateId};
use crate::plan::TemplateVars;
use crate::ua::Engine;

pub struct GeolocationGate;

impl Gate for GeolocationGate {
    fn id(&self) -> GateId {
        GateId::Geolocation
    }

    fn js_patches(&self, _engine: Engine, config: &GateConfig) -> Vec<&'static str> {
        if config.has_builtin_stealth() || config.geolocation.geolocation.is_none() {
            return Vec::new();
        }
        vec!["geolocation_spoof.js"]
    }

    fn js_template_vars(&self, config: &GateConfig) -> TemplateVars {
        let mut vars = HashMap::new();
        if let Some(geo) = config.geolocation.geolocation {
            vars.insert("LATITUDE".to_string(), geo.latitude.to_string());
            vars.insert("LONGITUDE".to_string(), geo.longitude.to_string());
            vars.insert("ACCURACY".to_string(), geo.accuracy_meters.to_string());
        }
        vars
    }
}
