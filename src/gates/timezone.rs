//! Timezone coherence gate (SPEC_FULL.md §4.2).
//!
//! Selection (country → IANA zone) happens once in the dynamic resolver
//! ([`crate::resolver::timezone`]) before the orchestrator runs; this gate only
//! republishes the resolved zone as `__TIMEZONE__` so every other gate and the
//! context factory read the exact same string (invariant I3).

use std::collections::HashMap;

use super::contract::{Gate, GateConfig, GateId};
use crate::plan::TemplateVars;

pub const DEFAULT_TIMEZONE: &str = "UTC";

pub struct TimezoneGate;

impl Gate for TimezoneGate {
    fn id(&self) -> GateId {
        GateId::Timezone
    }

    fn js_template_vars(&self, config: &GateConfig) -> TemplateVars {
        let mut vars = HashMap::new();
        let tz = config
            .timezone
            .resolved_timezone_id
            .clone()
            .unwrap_or_else(|| DEFAULT_TIMEZONE.to_string());
        vars.insert("TIMEZONE".to_string(), tz.clone());
        vars.insert("timezone_id".to_string(), tz);
        vars
    }
}
