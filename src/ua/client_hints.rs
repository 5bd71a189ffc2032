//! Pure functions over a User-Agent string: parsing, Client-Hints eligibility, and
//! `Sec-CH-UA*` header generation.
//!
//! Ported from the arch/platform/brand pattern tables of the original tool's
//! `clienthints` module, kept as ordered match tables rather than a parser
//! generator since the rule set is small and stable.

use once_cell::sync::Lazy;
use rand::seq::SliceRandom;
use regex::Regex;
use thiserror::Error;

use super::profile::{Engine, Platform, UserAgentProfile};

#[derive(Debug, Error)]
pub enum UaError {
    #[error("not a recognized Chromium-based user agent: {0}")]
    UnrecognizedUa(String),
}

struct ArchPattern {
    needles: &'static [&'static str],
    architecture: &'static str,
    bitness: &'static str,
    wow64: bool,
}

static ARCH_PATTERNS: &[ArchPattern] = &[
    ArchPattern { needles: &["wow64"], architecture: "x86", bitness: "32", wow64: true },
    ArchPattern {
        needles: &["amd64", "x86_64", "win64", "x64", "ia64"],
        architecture: "x86",
        bitness: "64",
        wow64: false,
    },
    ArchPattern { needles: &["i686", "i386", "x86"], architecture: "x86", bitness: "32", wow64: false },
    ArchPattern { needles: &["arm64", "aarch64", "armv8"], architecture: "arm", bitness: "64", wow64: false },
    ArchPattern { needles: &["armv7", "armv6", "arm;"], architecture: "arm", bitness: "32", wow64: false },
];

static ANDROID_MODEL_BUILD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Android [\d.]+; ([^;/)]+) Build/").expect("valid regex"));
static ANDROID_MODEL_RELAXED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Android [\d.]+; ([^;)]+)").expect("valid regex"));
static IOS_MODEL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\((iP(?:hone|ad|od)[^;)]*)").expect("valid regex"));

static WINDOWS_VERSION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Windows NT ([\d.]+)").expect("valid regex"));
static MACOS_VERSION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"Mac OS X ([\d_]+)").expect("valid regex"));
static ANDROID_VERSION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"Android ([\d.]+)").expect("valid regex"));
static IOS_VERSION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"OS ([\d_]+)").expect("valid regex"));
static CROS_VERSION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"CrOS \S+ ([\d.]+)").expect("valid regex"));

static EDGE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"EdgA?/([0-9.]+)").expect("valid regex"));
static OPERA_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"OPR/([0-9.]+)").expect("valid regex"));
static YANDEX_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"YaBrowser/([0-9.]+)").expect("valid regex"));
static BRAVE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"Brave/([0-9.]+)").expect("valid regex"));
static CHROME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"Chrome/([0-9.]+)").expect("valid regex"));
static CHROMIUM_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"Chromium/([0-9.]+)").expect("valid regex"));
static QQ_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"QQBrowser/([0-9.]+)").expect("valid regex"));
static UC_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"UCBrowser/([0-9.]+)").expect("valid regex"));

static ENGINE_VERSION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:Chrome|Chromium)/([0-9.]+)").expect("valid regex"));

fn detect_arch(ua_lower: &str) -> (&'static str, &'static str, bool) {
    for pattern in ARCH_PATTERNS {
        if pattern.needles.iter().any(|needle| ua_lower.contains(needle)) {
            return (pattern.architecture, pattern.bitness, pattern.wow64);
        }
    }
    ("", "", false)
}

fn detect_model(ua: &str) -> String {
    if let Some(caps) = ANDROID_MODEL_BUILD_RE.captures(ua) {
        return caps[1].trim().to_string();
    }
    if let Some(caps) = ANDROID_MODEL_RELAXED_RE.captures(ua) {
        return caps[1].trim().to_string();
    }
    if let Some(caps) = IOS_MODEL_RE.captures(ua) {
        return caps[1].trim().to_string();
    }
    String::new()
}

/// Best-effort OS family classification, used by WebGL/base-profile selection.
#[must_use]
pub fn detect_platform(ua: &str) -> Platform {
    if ua.contains("Windows NT") {
        Platform::Windows
    } else if ua.contains("CrOS") {
        Platform::ChromeOs
    } else if ua.contains("Android") {
        Platform::Android
    } else if ua.contains("iPhone") || ua.contains("iPad") || ua.contains("iPod") {
        Platform::Ios
    } else if ua.contains("Mac OS X") {
        Platform::MacOs
    } else if ua.contains("Linux") {
        Platform::Linux
    } else {
        Platform::Other
    }
}

fn detect_platform_version(platform: Platform, ua: &str) -> String {
    let re = match platform {
        Platform::Windows => &*WINDOWS_VERSION_RE,
        Platform::MacOs => &*MACOS_VERSION_RE,
        Platform::Android => &*ANDROID_VERSION_RE,
        Platform::Ios => &*IOS_VERSION_RE,
        Platform::ChromeOs => &*CROS_VERSION_RE,
        Platform::Linux | Platform::Other => return String::new(),
    };
    re.captures(ua)
        .map(|caps| caps[1].replace('_', "."))
        .unwrap_or_default()
}

fn parse_chromium_brand(ua: &str) -> Option<(&'static str, String)> {
    let table: &[(&Lazy<Regex>, &'static str)] = &[
        (&EDGE_RE, "Microsoft Edge"),
        (&OPERA_RE, "Opera"),
        (&YANDEX_RE, "Yandex"),
        (&BRAVE_RE, "Brave"),
        (&CHROME_RE, "Google Chrome"),
        (&CHROMIUM_RE, "Chromium"),
        (&QQ_RE, "QQBrowser"),
        (&UC_RE, "UC Browser"),
    ];
    for (re, brand) in table {
        if let Some(caps) = re.captures(ua) {
            return Some((brand, caps[1].to_string()));
        }
    }
    None
}

fn parse_engine_version(ua: &str) -> Option<String> {
    ENGINE_VERSION_RE.captures(ua).map(|caps| caps[1].to_string())
}

/// `false` for Firefox and Safari; otherwise checks a per-brand minimum version
/// floor below which the browser did not yet ship Client Hints.
#[must_use]
pub fn supports_client_hints(ua: &str) -> bool {
    let lower = ua.to_lowercase();
    if lower.contains("firefox") {
        return false;
    }
    if lower.contains("safari") && lower.contains("ucbrowser") && !lower.contains("chrome") && !lower.contains("chromium")
    {
        return false;
    }

    struct Rule {
        re: &'static str,
        min_version: u32,
    }
    static RULES: &[Rule] = &[
        Rule { re: r"chrome/(\d+)", min_version: 89 },
        Rule { re: r"crios/(\d+)", min_version: 89 },
        Rule { re: r"edg[a]?/(\d+)", min_version: 90 },
        Rule { re: r"opr/(\d+)", min_version: 75 },
        Rule { re: r"yabrowser/(\d+)", min_version: 1 },
        Rule { re: r"miui browser/(\d+)", min_version: 1 },
        Rule { re: r"qqbrowser/(\d+)", min_version: 10 },
        Rule { re: r"android.*version/(\d+).*chrome", min_version: 84 },
    ];

    for rule in RULES {
        // Compiled on demand: this table is only walked once per header build,
        // so the cost of (re)compiling is negligible compared to a round trip.
        if let Ok(re) = Regex::new(rule.re) {
            if let Some(caps) = re.captures(&lower) {
                if let Ok(version) = caps[1].parse::<u32>() {
                    return version >= rule.min_version;
                }
            }
        }
    }
    false
}

/// Detects the rendering engine family from a UA string for driver/engine selection.
#[must_use]
pub fn detect_engine(ua: &str) -> Engine {
    let lower = ua.to_lowercase();
    if lower.contains("firefox") {
        Engine::Gecko
    } else if lower.contains("safari")
        && !lower.contains("chrome")
        && !lower.contains("chromium")
        && !lower.contains("crios")
        && !lower.contains("edg")
        && !lower.contains("opr")
    {
        Engine::WebKit
    } else {
        Engine::Chromium
    }
}

/// Parse a raw UA string into the canonical [`UserAgentProfile`].
#[must_use]
pub fn parse(ua: &str) -> UserAgentProfile {
    let lower = ua.to_lowercase();
    let (architecture, bitness, wow64) = detect_arch(&lower);
    let platform = detect_platform(ua);
    let platform_version = detect_platform_version(platform, ua);
    let model = detect_model(ua);
    let mobile = lower.contains("mobile") || matches!(platform, Platform::Android | Platform::Ios);
    let supports_ch = supports_client_hints(ua);

    let (brand, brand_version) = parse_chromium_brand(ua)
        .map(|(b, v)| (b.to_string(), v))
        .unwrap_or_default();
    let engine_full_version = parse_engine_version(ua).unwrap_or_default();
    let engine_version = engine_full_version
        .split('.')
        .next()
        .unwrap_or_default()
        .to_string();

    UserAgentProfile {
        raw: ua.to_string(),
        brand,
        brand_version,
        engine_version,
        engine_full_version,
        platform,
        platform_version,
        architecture: architecture.to_string(),
        bitness: bitness.to_string(),
        wow64,
        model,
        mobile,
        supports_client_hints: supports_ch,
    }
}

/// GREASE-style `Sec-CH-UA` brand list: `Chromium`, the detected brand, and a
/// `Not-A.Brand;v="99"` fake entry, shuffled on every call.
pub fn generate_sec_ch_ua(ua: &str) -> Result<String, UaError> {
    let (brand, brand_version) =
        parse_chromium_brand(ua).ok_or_else(|| UaError::UnrecognizedUa(ua.to_string()))?;
    let engine_version =
        parse_engine_version(ua).ok_or_else(|| UaError::UnrecognizedUa(ua.to_string()))?;

    let chromium_major = engine_version.split('.').next().unwrap_or_default();
    let brand_major = brand_version.split('.').next().unwrap_or_default();

    let mut brands: Vec<(&str, &str)> = vec![("Chromium", chromium_major), ("Not-A.Brand", "99")];
    if !brands.iter().any(|(b, _)| *b == brand) {
        brands.push((brand, brand_major));
    }

    let mut rng = rand::rng();
    brands.shuffle(&mut rng);

    Ok(brands
        .into_iter()
        .map(|(b, v)| format!("\"{b}\";v=\"{v}\""))
        .collect::<Vec<_>>()
        .join(", "))
}

/// `Sec-CH-UA-Full-Version-List`: same brand set as [`generate_sec_ch_ua`] but with
/// full dotted versions instead of just the major component.
pub fn generate_sec_ch_ua_full_version_list(ua: &str) -> Result<String, UaError> {
    let (brand, brand_version) =
        parse_chromium_brand(ua).ok_or_else(|| UaError::UnrecognizedUa(ua.to_string()))?;
    let engine_version =
        parse_engine_version(ua).ok_or_else(|| UaError::UnrecognizedUa(ua.to_string()))?;

    let mut brands: Vec<(&str, &str)> =
        vec![("Chromium", engine_version.as_str()), ("Not-A.Brand", "99.0.0.0")];
    if !brands.iter().any(|(b, _)| *b == brand) {
        brands.push((brand, brand_version.as_str()));
    }

    let mut rng = rand::rng();
    brands.shuffle(&mut rng);

    Ok(brands
        .into_iter()
        .map(|(b, v)| format!("\"{b}\";v=\"{v}\""))
        .collect::<Vec<_>>()
        .join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHROME_WINDOWS: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";
    const FIREFOX_LINUX: &str =
        "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0";

    #[test]
    fn parses_windows_chrome() {
        let profile = parse(CHROME_WINDOWS);
        assert_eq!(profile.platform, Platform::Windows);
        assert_eq!(profile.architecture, "x86");
        assert_eq!(profile.bitness, "64");
        assert!(!profile.wow64);
        assert!(profile.supports_client_hints);
        assert_eq!(profile.engine_version, "131");
    }

    #[test]
    fn firefox_never_sends_client_hints() {
        assert!(!supports_client_hints(FIREFOX_LINUX));
        assert_eq!(detect_engine(FIREFOX_LINUX), Engine::Gecko);
    }

    #[test]
    fn sec_ch_ua_contains_expected_brands() {
        let header = generate_sec_ch_ua(CHROME_WINDOWS).expect("recognized chromium ua");
        assert!(header.contains("\"Chromium\";v=\"131\""));
        assert!(header.contains("\"Google Chrome\";v=\"131\""));
        assert!(header.contains("\"Not-A.Brand\";v=\"99\""));
    }

    #[test]
    fn rejects_non_chromium_ua() {
        assert!(generate_sec_ch_ua(FIREFOX_LINUX).is_err());
    }
}
