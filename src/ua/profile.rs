//! Parsed view of a User-Agent string: the single source of truth every gate and
//! header consults so the UA never gets resolved twice (invariant I2 of the
//! fingerprint data model).

use serde::{Deserialize, Serialize};

/// Coarse platform family a UA claims to run on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Platform {
    Windows,
    MacOs,
    Linux,
    Android,
    Ios,
    ChromeOs,
    Other,
}

impl Platform {
    /// The literal `navigator.platform` a browser on this platform reports.
    #[must_use]
    pub fn navigator_platform(self) -> &'static str {
        match self {
            Self::Windows => "Win32",
            Self::MacOs => "MacIntel",
            Self::Linux | Self::ChromeOs => "Linux x86_64",
            Self::Android => "Linux armv7l",
            Self::Ios => "iPhone",
            Self::Other => "",
        }
    }

    #[must_use]
    pub fn sec_ch_ua_platform(self) -> &'static str {
        match self {
            Self::Windows => "Windows",
            Self::MacOs => "macOS",
            Self::Linux => "Linux",
            Self::Android => "Android",
            Self::Ios => "iOS",
            Self::ChromeOs => "Chrome OS",
            Self::Other => "",
        }
    }
}

/// Rendering engine family, used by the context factory to choose a driver launch
/// path (only Chromium has a concrete implementation in this crate; others are
/// accepted for gate-contract interface compatibility per SPEC_FULL.md §4.11).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Engine {
    Chromium,
    Gecko,
    WebKit,
}

impl Engine {
    /// Detect the engine family from an optional UA string; `None` when no UA
    /// was supplied (nothing to contribute on that surface yet).
    #[must_use]
    pub fn from_user_agent_option(ua: Option<&str>) -> Option<Self> {
        ua.map(super::client_hints::detect_engine)
    }
}

/// Full parsed view of a single UA string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAgentProfile {
    pub raw: String,
    pub brand: String,
    pub brand_version: String,
    pub engine_version: String,
    pub engine_full_version: String,
    pub platform: Platform,
    pub platform_version: String,
    pub architecture: String,
    pub bitness: String,
    pub wow64: bool,
    pub model: String,
    pub mobile: bool,
    pub supports_client_hints: bool,
}

impl UserAgentProfile {
    #[must_use]
    pub fn os_family(&self) -> &'static str {
        match self.platform {
            Platform::Windows => "windows",
            Platform::MacOs => "mac",
            Platform::Linux => "linux",
            Platform::Android => "android",
            Platform::Ios => "ios",
            Platform::ChromeOs => "chromeos",
            Platform::Other => "other",
        }
    }
}
