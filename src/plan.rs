//! Shared data model types threaded between the gates, the resolver, and the
//! orchestrator (SPEC_FULL.md §3): [`Geolocation`], template variables, the
//! resolved hardware [`BaseProfile`], and the frozen [`SpoofingPlan`].

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::ua::UserAgentProfile;

/// A point sampled inside a country polygon, jittered with an accuracy radius.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geolocation {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy_meters: f64,
}

/// A coherent hardware class: RAM/cores/screen/WebGL drawn together so JS-visible
/// device facets never contradict each other.
#[derive(Debug, Clone)]
pub struct BaseProfile {
    pub id: String,
    pub memory_gib: u32,
    pub cores: u32,
    pub screen_width: u32,
    pub screen_height: u32,
    pub webgl_vendor: String,
    pub webgl_renderer: String,
    pub connection_profile: String,
}

/// Viewport / screen size, shared by context params and the base profile.
#[derive(Debug, Clone, Copy)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

/// Proxy configuration accepted from the CLI (`socks5://host:port` or
/// `http://host:port`).
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub uri: String,
}

/// The shared template-variable table: every JS patch consumes read-only from
/// this map (invariant I1 — one producer per variable, frozen before any render).
pub type TemplateVars = HashMap<String, String>;

/// Browser-context construction parameters, assembled by the context factory and
/// handed to the driver.
#[derive(Debug, Clone)]
pub struct ContextParams {
    pub user_agent: Option<String>,
    pub locale: String,
    pub timezone_id: String,
    pub viewport: Size,
    pub screen: Size,
    pub geolocation: Option<Geolocation>,
    pub proxy: Option<ProxyConfig>,
    pub ignore_tls_errors: bool,
    pub accept_downloads: bool,
}

/// Merged, frozen output of the gate pipeline (internal to the orchestrator).
/// Once Phase C completes, `template_vars` and `init_scripts` never change again.
#[derive(Debug, Clone)]
pub struct SpoofingPlan {
    pub static_headers: HashMap<String, String>,
    pub context_params: ContextParams,
    pub init_scripts: Vec<String>,
    pub template_vars: TemplateVars,
    pub user_agent_profile: Option<UserAgentProfile>,
    /// Per-origin `Accept-CH` memo the routing task reads from and the
    /// session's response listener writes into.
    pub accept_ch_memo: crate::orchestrator::AcceptChMemo,
}
