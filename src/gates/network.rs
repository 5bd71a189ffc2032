//! `navigator.connection` coherence gate (SPEC_FULL.md §4.2).

use std::collections::HashMap;

use super::contract::{ConnectionProfile, Gate, GateConfig, GateId};
use crate::plan::TemplateVars;
use crate::ua::Engine;

/// A resolved `navigator.connection` reading.
#[derive(Debug, Clone)]
pub struct NetworkInfo {
    pub r#type: String,
    pub effective_type: String,
    pub downlink: u32,
    pub rtt: u32,
    pub save_data: bool,
}

fn named(r#type: &str, effective_type: &str, downlink: u32, rtt: u32, save_data: bool) -> NetworkInfo {
    NetworkInfo {
        r#type: r#type.to_string(),
        effective_type: effective_type.to_string(),
        downlink,
        rtt,
        save_data,
    }
}

/// Fixed mapping from base-profile id to a coherent connection reading
/// (SPEC_FULL.md §4.2 `NetworkGate`).
fn named_profile(id: &str) -> NetworkInfo {
    match id {
        "desk_low" => named("wifi", "3g", 5, 150, false),
        "desk_mid" => named("wifi", "4g", 10, 80, false),
        "desk_high" => named("ethernet", "4g", 50, 20, false),
        "mac_notch" => named("wifi", "4g", 30, 30, false),
        "chrome_book" => named("wifi", "4g", 10, 70, false),
        "mobile_high" => named("cellular", "5g", 20, 100, true),
        _ => named("wifi", "4g", 10, 80, false),
    }
}

fn resolve(profile: &ConnectionProfile) -> NetworkInfo {
    match profile {
        ConnectionProfile::Named(name) => named_profile(name),
        ConnectionProfile::Explicit { r#type, effective_type, downlink, rtt, save_data } => NetworkInfo {
            r#type: r#type.clone(),
            effective_type: effective_type.clone(),
            downlink: *downlink,
            rtt: *rtt,
            save_data: *save_data,
        },
    }
}

pub struct NetworkGate;

impl Gate for NetworkGate {
    fn id(&self) -> GateId {
        GateId::Network
    }

    fn js_patches(&self, _engine: Engine, config: &GateConfig) -> Vec<&'static str> {
        if config.has_builtin_stealth() || config.network.connection_profile.is_none() {
            return Vec::new();
        }
        vec!["network_info_stub.js"]
    }

    fn js_template_vars(&self, config: &GateConfig) -> TemplateVars {
        let mut vars = HashMap::new();
        let Some(profile) = &config.network.connection_profile else {
            return vars;
        };
        let info = resolve(profile);
        vars.insert("CONNECTION_TYPE".to_string(), info.r#type);
        vars.insert("EFFECTIVE_TYPE".to_string(), info.effective_type);
        vars.insert("DOWNLINK".to_string(), info.downlink.to_string());
        vars.insert("RTT".to_string(), info.rtt.to_string());
        vars.insert("SAVE_DATA".to_string(), info.save_data.to_string());
        vars
    }
}
