//! Engine-agnostic floor-level stealth patches (SPEC_FULL.md §4.2 `StealthGate`).
//!
//! These patches establish behavior that would otherwise reveal automation
//! regardless of which other gates are enabled: font-metrics masking, the WebRTC
//! local-IP leak, `performance.timing` normalization, incognito-mode hints,
//! DPR/CSS consistency, and stubs for APIs headless Chromium omits entirely
//! (gamepad, MIDI, HID, generic sensors). They must never duplicate what another
//! gate already injects (`navigator.webdriver`, UA, WebGL) — this is the floor,
//! not the whole fingerprint.

use std::collections::HashMap;

use super::contract::{Gate, GateConfig, GateId};
use crate::plan::TemplateVars;
use crate::ua::Engine;

/// Fixed ordered patch set, independent of engine or session options.
const PATCHES: &[&str] = &[
    "font_metrics_mask.js",
    "webrtc_leak_block.js",
    "performance_timing_normalize.js",
    "navigator_incognito_hints.js",
    "dpr_css_patch.js",
    "gamepad_midi_hid_stub.js",
    "generic_sensor_stub.js",
];

pub struct StealthGate;

impl Gate for StealthGate {
    fn id(&self) -> GateId {
        GateId::Stealth
    }

    fn js_patches(&self, _engine: Engine, config: &GateConfig) -> Vec<&'static str> {
        if config.has_builtin_stealth() {
            return Vec::new();
        }
        PATCHES.to_vec()
    }

    fn js_template_vars(&self, _config: &GateConfig) -> TemplateVars {
        HashMap::new()
    }
}
