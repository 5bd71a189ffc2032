//! WebGL vendor/renderer coherence gate (SPEC_FULL.md §4.2).
//!
//! Either an explicit vendor/renderer pair was supplied (typically by the
//! resolver, which draws one from the base profile's pool), or this gate draws a
//! uniform-random pair from the UA's OS-family pool itself.

use std::collections::HashMap;

use rand::seq::IndexedRandom;

use super::contract::{Gate, GateConfig, GateId};
use crate::plan::TemplateVars;
use crate::ua::{Engine, Platform};

/// OS-family → (vendor, renderer) candidate pool (SPEC_FULL.md §4.2 `WebGLGate`).
fn pool(platform: Platform) -> &'static [(&'static str, &'static str)] {
    match platform {
        Platform::Windows => &[
            ("NVIDIA Corporation", "NVIDIA GeForce RTX 3060/PCIe/SSE2"),
            ("Intel Inc.", "Intel(R) UHD Graphics 630"),
            ("ATI Technologies Inc.", "AMD Radeon RX 6600 XT"),
        ],
        Platform::MacOs => &[
            ("Apple Inc.", "Apple M2"),
            ("Apple Inc.", "Apple M1 Pro"),
            ("ATI Technologies Inc.", "AMD Radeon Pro 5500M"),
        ],
        Platform::Linux => &[
            ("Mesa/X.org", "llvmpipe (LLVM 15.0.7, 256 bits)"),
            ("X.Org", "AMD Radeon RX 6700 XT (navi22, LLVM 15.0.7, DRM 3.49, 6.2.0)"),
            ("NVIDIA Corporation", "NVIDIA GeForce GTX 1660/PCIe/SSE2"),
        ],
        Platform::Android => &[
            ("Qualcomm", "Adreno (TM) 730"),
            ("ARM", "Mali-G78 MP14"),
        ],
        Platform::Ios => &[("Apple Inc.", "Apple A16 GPU"), ("Apple Inc.", "Apple A15 GPU")],
        Platform::ChromeOs | Platform::Other => &[("Google Inc.", "ANGLE (Google, Vulkan 1.3.0)")],
    }
}

pub struct WebGlGate;

impl Gate for WebGlGate {
    fn id(&self) -> GateId {
        GateId::WebGl
    }

    fn js_patches(&self, _engine: Engine, config: &GateConfig) -> Vec<&'static str> {
        if config.has_builtin_stealth() {
            return Vec::new();
        }
        let has_explicit =
            config.webgl.webgl_vendor.is_some() || config.webgl.webgl_renderer.is_some();
        if !has_explicit && config.webgl.user_agent.is_none() {
            return Vec::new();
        }
        vec!["webgl_patch.js"]
    }

    fn js_template_vars(&self, config: &GateConfig) -> TemplateVars {
        let mut vars = HashMap::new();
        let (vendor, renderer) = if let (Some(v), Some(r)) =
            (&config.webgl.webgl_vendor, &config.webgl.webgl_renderer)
        {
            (v.clone(), r.clone())
        } else if let Some(ua) = &config.webgl.user_agent {
            let platform = crate::ua::client_hints::detect_platform(ua);
            let candidates = pool(platform);
            let mut rng = rand::rng();
            let (v, r) = candidates
                .choose(&mut rng)
                .copied()
                .unwrap_or(("Google Inc.", "ANGLE (Google, Vulkan 1.3.0)"));
            (v.to_string(), r.to_string())
        } else {
            return vars;
        };

        vars.insert("WEBGL_VENDOR".to_string(), vendor);
        vars.insert("WEBGL_RENDERER".to_string(), renderer);
        vars
    }
}
