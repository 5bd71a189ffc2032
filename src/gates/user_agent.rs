//! User-Agent / Client-Hints coherence gate (SPEC_FULL.md §4.2).
//!
//! Owns the single `UserAgentProfile` resolution every other surface reads from
//! (invariant I2): the `user-agent`/`sec-ch-ua*` headers, the JS `navigator.*`
//! patch, and the worker-injected copy all derive from the same parsed profile.
//! The per-origin `Accept-CH` memo lives on the orchestrator (it is populated by
//! a response listener, a capability this pure, synchronous trait object does not
//! have); `inject_headers` only consumes whatever hint names the orchestrator
//! looked up for the request's origin.

use std::collections::HashMap;

use super::contract::{Gate, GateConfig, GateId};
use crate::plan::TemplateVars;
use crate::ua::{self, Engine, Platform, UserAgentProfile};

/// High-entropy Client-Hints this gate knows how to emit, keyed by the
/// `Accept-CH` token name a server would ask for.
const HIGH_ENTROPY_HINTS: &[&str] = &[
    "sec-ch-ua-model",
    "sec-ch-ua-platform-version",
    "sec-ch-ua-full-version",
    "sec-ch-ua-arch",
    "sec-ch-ua-bitness",
    "sec-ch-ua-wow64",
    "sec-ch-ua-full-version-list",
];

pub struct UserAgentGate;

impl UserAgentGate {
    /// Resolve the effective UA string and its parsed profile for this session.
    /// `options.user_agent` wins when the resolver already picked a concrete
    /// string (selector resolution happens before the orchestrator runs).
    #[must_use]
    pub fn resolve(config: &GateConfig) -> Option<UserAgentProfile> {
        config
            .user_agent
            .user_agent
            .as_deref()
            .map(ua::client_hints::parse)
    }
}

impl Gate for UserAgentGate {
    fn id(&self) -> GateId {
        GateId::UserAgent
    }

    fn headers(&self, config: &GateConfig) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        let Some(profile) = Self::resolve(config) else {
            return headers;
        };
        headers.insert("user-agent".to_string(), profile.raw.clone());
        if profile.supports_client_hints {
            if let Ok(sec_ch_ua) = ua::client_hints::generate_sec_ch_ua(&profile.raw) {
                headers.insert("sec-ch-ua".to_string(), sec_ch_ua);
            }
            headers.insert(
                "sec-ch-ua-mobile".to_string(),
                if profile.mobile { "?1" } else { "?0" }.to_string(),
            );
            headers.insert(
                "sec-ch-ua-platform".to_string(),
                format!("\"{}\"", profile.platform.sec_ch_ua_platform()),
            );
        }
        headers
    }

    fn inject_headers(
        &self,
        accept_ch: Option<&[String]>,
        config: &GateConfig,
    ) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        let Some(profile) = Self::resolve(config) else {
            return headers;
        };
        if !profile.supports_client_hints {
            return headers;
        }
        let Some(accept_ch) = accept_ch else {
            return headers;
        };

        for hint in accept_ch.iter().map(|h| h.to_lowercase()) {
            if !HIGH_ENTROPY_HINTS.contains(&hint.as_str()) {
                continue;
            }
            match hint.as_str() {
                "sec-ch-ua-model" if !profile.model.is_empty() => {
                    headers.insert(hint, format!("\"{}\"", profile.model));
                }
                "sec-ch-ua-platform-version" if !profile.platform_version.is_empty() => {
                    headers.insert(hint, format!("\"{}\"", profile.platform_version));
                }
                "sec-ch-ua-full-version" if !profile.engine_full_version.is_empty() => {
                    headers.insert(hint, format!("\"{}\"", profile.engine_full_version));
                }
                "sec-ch-ua-arch" if !profile.architecture.is_empty() => {
                    headers.insert(hint, format!("\"{}\"", profile.architecture));
                }
                "sec-ch-ua-bitness" if !profile.bitness.is_empty() => {
                    headers.insert(hint, format!("\"{}\"", profile.bitness));
                }
                "sec-ch-ua-wow64" => {
                    headers.insert(hint, if profile.wow64 { "?1" } else { "?0" }.to_string());
                }
                "sec-ch-ua-full-version-list" => {
                    if let Ok(list) = ua::client_hints::generate_sec_ch_ua_full_version_list(&profile.raw) {
                        headers.insert(hint, list);
                    }
                }
                _ => {}
            }
        }
        headers
    }

    fn js_patches(&self, engine: Engine, config: &GateConfig) -> Vec<&'static str> {
        if config.has_builtin_stealth() {
            return Vec::new();
        }
        match engine {
            Engine::Chromium => vec!["spoof_useragent.js", "chromium_stealth.js", "extra_stealth.js"],
            Engine::Gecko | Engine::WebKit => vec!["fwk_stealth.js", "extra_stealth.js"],
        }
    }

    fn js_template_vars(&self, config: &GateConfig) -> TemplateVars {
        let mut vars = TemplateVars::new();
        let Some(profile) = Self::resolve(config) else {
            return vars;
        };

        vars.insert("USER_AGENT".to_string(), profile.raw.clone());
        vars.insert("BRAND".to_string(), profile.brand.clone());
        vars.insert("BRAND_VERSION".to_string(), profile.brand_version.clone());
        vars.insert(
            "FULL_VERSION".to_string(),
            profile.engine_full_version.clone(),
        );
        vars.insert(
            "PLATFORM".to_string(),
            profile.platform.navigator_platform().to_string(),
        );
        vars.insert("ARCHITECTURE".to_string(), profile.architecture.clone());
        vars.insert("BITNESS".to_string(), profile.bitness.clone());
        vars.insert("WOW64".to_string(), profile.wow64.to_string());
        vars.insert("MODEL".to_string(), profile.model.clone());
        vars.insert("MOBILE".to_string(), profile.mobile.to_string());
        vars.insert(
            "PLATFORM_VERSION".to_string(),
            profile.platform_version.clone(),
        );

        if let Some(tz) = &config.user_agent.timezone_id {
            vars.insert("TIMEZONE".to_string(), tz.clone());
        }
        if let Some(mem) = config.user_agent.device_memory_gib {
            vars.insert("DEVICE_MEMORY".to_string(), mem.to_string());
        }
        let primary_lang = config
            .user_agent
            .accept_language
            .as_deref()
            .and_then(|al| al.split(',').next())
            .unwrap_or("en-US")
            .to_string();
        let lang_list = serde_json::to_string(&[primary_lang.clone(), "en".to_string()])
            .unwrap_or_else(|_| "[]".to_string());
        vars.insert("LANGUAGE".to_string(), primary_lang);
        vars.insert("LANG_JS".to_string(), lang_list);

        let touch_script = if profile.mobile {
            "window.ontouchstart = window.ontouchstart || function () {};"
        } else {
            ""
        };
        vars.insert("TOUCH_SCRIPT".to_string(), touch_script.to_string());

        if matches!(profile.platform, Platform::Ios) {
            vars.insert(
                "PLATFORM".to_string(),
                if profile.model.contains("iPad") { "iPad" } else { "iPhone" }.to_string(),
            );
        }

        vars
    }
}
