//! Referer header gate (SPEC_FULL.md §4.2).

use std::collections::HashMap;

use super::contract::{Gate, GateConfig, GateId};

pub struct ReferrerGate;

impl Gate for ReferrerGate {
    fn id(&self) -> GateId {
        GateId::Referrer
    }

    fn headers(&self, config: &GateConfig) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        if let Some(referrer) = &config.referrer.referrer {
            headers.insert("referer".to_string(), referrer.clone());
        }
        headers
    }
}
