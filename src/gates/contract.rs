//! The gate contract (SPEC_FULL.md §4.2).
//!
//! The source implementation reaches gate-specific options through free-form
//! dictionaries threaded by string keys (`gate_args["UserAgentGate"]["ua_selector"]`).
//! Per the "runtime reflection" design note, this crate replaces that with one
//! typed options struct per gate plus a small fixed [`GateId`] enum — the gate set
//! is closed and known at compile time, so enum dispatch stands in for the
//! source's polymorphic gate objects without paying for `dyn` trait objects or an
//! `async-trait` dependency just to get one `handle` hook.

use std::collections::HashMap;

use crate::plan::{Geolocation, TemplateVars};
use crate::ua::Engine;

/// Identity used in configuration maps and as the dispatch key for per-gate
/// async setup (`handle` / `setup_page_handlers`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GateId {
    Geolocation,
    Referrer,
    UserAgent,
    Language,
    Network,
    WebGl,
    Stealth,
    Timezone,
}

impl GateId {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Geolocation => "GeolocationGate",
            Self::Referrer => "ReferrerGate",
            Self::UserAgent => "UserAgentGate",
            Self::Language => "LanguageGate",
            Self::Network => "NetworkGate",
            Self::WebGl => "WebGLGate",
            Self::Stealth => "StealthGate",
            Self::Timezone => "TimezoneGate",
        }
    }
}

/// Fixed dependency order for Phase A (SPEC_FULL.md §4.5): Timezone is resolved
/// before Phase C reads `jsTemplateVars`, but Phase A's `handle` order follows the
/// original gate init list, which happens to already place coherence-sensitive
/// gates (UserAgent, Language) after the values they consume (Geolocation, then
/// Timezone at the end of `handle` but first in Phase C's var collection).
pub const GATE_ORDER: [GateId; 8] = [
    GateId::Geolocation,
    GateId::Referrer,
    GateId::UserAgent,
    GateId::Language,
    GateId::Network,
    GateId::WebGl,
    GateId::Stealth,
    GateId::Timezone,
];

#[derive(Debug, Clone, Default)]
pub struct GeolocationOptions {
    pub country_code: Option<String>,
    pub geolocation: Option<Geolocation>,
}

#[derive(Debug, Clone, Default)]
pub struct ReferrerOptions {
    pub referrer: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UserAgentOptions {
    pub user_agent: Option<String>,
    pub ua_selector: Option<String>,
    pub timezone_id: Option<String>,
    pub device_memory_gib: Option<u32>,
    pub accept_language: Option<String>,
    pub webgl_vendor: Option<String>,
    pub webgl_renderer: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct LanguageOptions {
    pub accept_language: Option<String>,
    pub timezone_id: Option<String>,
    pub user_agent: Option<String>,
}

/// A named profile from the fixed connection table, or fully explicit values.
#[derive(Debug, Clone)]
pub enum ConnectionProfile {
    Named(String),
    Explicit {
        r#type: String,
        effective_type: String,
        downlink: u32,
        rtt: u32,
        save_data: bool,
    },
}

#[derive(Debug, Clone, Default)]
pub struct NetworkOptions {
    pub connection_profile: Option<ConnectionProfile>,
}

#[derive(Debug, Clone, Default)]
pub struct WebGlOptions {
    pub webgl_vendor: Option<String>,
    pub webgl_renderer: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct StealthOptions {}

#[derive(Debug, Clone, Default)]
pub struct TimezoneOptions {
    pub country_code: Option<String>,
    /// Filled in by the dynamic resolver before the orchestrator runs; the gate
    /// itself only republishes this as a template variable.
    pub resolved_timezone_id: Option<String>,
}

/// The full gate configuration map (SPEC_FULL.md §3 `GateConfig`): one typed
/// options struct per gate, an enable/disable map, and the active engine tag.
#[derive(Debug, Clone, Default)]
pub struct GateConfig {
    pub gates_enabled: HashMap<GateId, bool>,
    pub browser_engine: Option<String>,
    pub geolocation: GeolocationOptions,
    pub referrer: ReferrerOptions,
    pub user_agent: UserAgentOptions,
    pub language: LanguageOptions,
    pub network: NetworkOptions,
    pub webgl: WebGlOptions,
    pub stealth: StealthOptions,
    pub timezone: TimezoneOptions,
}

impl GateConfig {
    #[must_use]
    pub fn is_enabled(&self, id: GateId) -> bool {
        *self.gates_enabled.get(&id).unwrap_or(&true)
    }

    /// True when the active `browser_engine` already bundles stealth coverage
    /// (`patchright`, `camoufox`) and gates should return empty `js_patches`.
    #[must_use]
    pub fn has_builtin_stealth(&self) -> bool {
        matches!(self.browser_engine.as_deref(), Some("patchright" | "camoufox"))
    }
}

/// Pure, synchronous facet of a gate: header contribution, JS patch selection,
/// and template variable contribution. Object-safe, so the orchestrator holds a
/// `Vec<Box<dyn Gate>>` in [`GATE_ORDER`] order.
pub trait Gate: Send + Sync {
    fn id(&self) -> GateId;

    /// Static headers merged into every request.
    fn headers(&self, _config: &GateConfig) -> HashMap<String, String> {
        HashMap::new()
    }

    /// Per-request dynamic headers; `accept_ch` is the set of hint names the
    /// request's origin has previously asked for via `Accept-CH`.
    fn inject_headers(
        &self,
        _accept_ch: Option<&[String]>,
        _config: &GateConfig,
    ) -> HashMap<String, String> {
        HashMap::new()
    }

    /// Ordered list of JS template file names to install as init scripts.
    fn js_patches(&self, _engine: Engine, _config: &GateConfig) -> Vec<&'static str> {
        Vec::new()
    }

    /// Template variables this gate contributes to the shared `templateVars`.
    fn js_template_vars(&self, _config: &GateConfig) -> TemplateVars {
        TemplateVars::new()
    }
}
