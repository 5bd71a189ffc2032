//! Session configuration (SPEC_FULL.md §6 Inputs): the options surface the CLI
//! validates before the core is ever entered. Bad values are a
//! `GateCaptureError::Configuration` raised here, never inside a session
//! (SPEC_FULL.md §7).

use std::path::PathBuf;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{GateCaptureError, GateCaptureResult};
use crate::gates::contract::{GateConfig, GeolocationOptions, LanguageOptions, ReferrerOptions, TimezoneOptions, UserAgentOptions};
use crate::plan::ProxyConfig;

static LANG_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z]{2,3}(-[A-Z]{2})?$").expect("valid regex"));
static COUNTRY_CODE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z]{2}$").expect("valid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowserEngine {
    Auto,
    Standard,
    StealthA,
    StealthB,
}

impl BrowserEngine {
    #[must_use]
    pub fn tag(self) -> Option<&'static str> {
        match self {
            Self::StealthA => Some("patchright"),
            Self::StealthB => Some("camoufox"),
            Self::Auto | Self::Standard => None,
        }
    }
}

/// One fully-validated session's worth of options (SPEC_FULL.md §6 Inputs).
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub url: String,
    pub country: Option<String>,
    pub lang: Option<String>,
    pub ua_selector: Option<String>,
    pub ua_full: Option<String>,
    pub proxy: Option<ProxyConfig>,
    pub engine: BrowserEngine,
    pub timeout_sec: u64,
    pub headless: bool,
    pub output_dir: PathBuf,
    pub verbose: bool,
    pub plain_progress: bool,
    pub referrer: Option<String>,
}

impl SessionOptions {
    /// Validates `country`/`lang`/`proxy`/`timeout_sec` (SPEC_FULL.md §7
    /// `ConfigurationError`) and produces the raw (unresolved)
    /// [`GateConfig`] the dynamic resolver will fill in.
    pub fn validate(&self) -> GateCaptureResult<()> {
        if let Some(country) = &self.country {
            if !COUNTRY_CODE_RE.is_match(country) {
                return Err(GateCaptureError::configuration(format!(
                    "invalid country code: {country}"
                )));
            }
        }
        if let Some(lang) = &self.lang {
            if !LANG_TAG_RE.is_match(lang) {
                return Err(GateCaptureError::configuration(format!("invalid language tag: {lang}")));
            }
        }
        if let Some(proxy) = &self.proxy {
            if !(proxy.uri.starts_with("socks5://") || proxy.uri.starts_with("http://")) {
                return Err(GateCaptureError::configuration(format!(
                    "invalid proxy uri: {}",
                    proxy.uri
                )));
            }
        }
        if self.timeout_sec == 0 {
            return Err(GateCaptureError::configuration("timeout_sec must be positive"));
        }
        if self.ua_selector.is_some() && self.ua_full.is_some() {
            return Err(GateCaptureError::configuration(
                "ua_selector and ua_full are mutually exclusive",
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_sec)
    }

    #[must_use]
    pub fn to_gate_config(&self) -> GateConfig {
        GateConfig {
            gates_enabled: Default::default(),
            browser_engine: self.engine.tag().map(str::to_string),
            geolocation: GeolocationOptions { country_code: self.country.clone(), geolocation: None },
            referrer: ReferrerOptions { referrer: self.referrer.clone() },
            user_agent: UserAgentOptions {
                user_agent: self.ua_full.clone(),
                ua_selector: self.ua_selector.clone(),
                timezone_id: None,
                device_memory_gib: None,
                accept_language: self.lang.clone(),
                webgl_vendor: None,
                webgl_renderer: None,
            },
            language: LanguageOptions {
                accept_language: self.lang.clone(),
                timezone_id: None,
                user_agent: self.ua_full.clone(),
            },
            network: Default::default(),
            webgl: Default::default(),
            stealth: Default::default(),
            timezone: TimezoneOptions { country_code: self.country.clone(), resolved_timezone_id: None },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_options() -> SessionOptions {
        SessionOptions {
            url: "https://example.com".to_string(),
            country: None,
            lang: None,
            ua_selector: None,
            ua_full: None,
            proxy: None,
            engine: BrowserEngine::Auto,
            timeout_sec: 40,
            headless: true,
            output_dir: PathBuf::from("/tmp/out"),
            verbose: false,
            plain_progress: false,
            referrer: None,
        }
    }

    #[test]
    fn rejects_bad_country_code() {
        let mut opts = base_options();
        opts.country = Some("Germany".to_string());
        assert!(opts.validate().is_err());
    }

    #[test]
    fn rejects_zero_timeout() {
        let mut opts = base_options();
        opts.timeout_sec = 0;
        assert!(opts.validate().is_err());
    }

    #[test]
    fn accepts_valid_options() {
        let mut opts = base_options();
        opts.country = Some("DE".to_string());
        opts.lang = Some("de-DE".to_string());
        assert!(opts.validate().is_ok());
    }
}
