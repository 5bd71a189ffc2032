//! Exercises the dynamic resolver and template rendering against the data and
//! JS assets actually shipped with the crate (SPEC_FULL.md §4.4, §4.5 Phase C).

use std::path::PathBuf;

use gatecapture::gates::contract::GateConfig;
use gatecapture::gates::contract::{GeolocationOptions, TimezoneOptions, UserAgentOptions};
use gatecapture::{BaseProfileCatalog, CountryGeoTable, DynamicResolver, UaCatalog, ZoneTable};

fn data_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("assets").join("data")
}

fn js_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("assets").join("js")
}

#[test]
fn resolves_a_full_session_from_bundled_assets() {
    let ua_catalog = UaCatalog::load(&data_dir().join("user-agents.json")).expect("load ua catalog");
    let country_geo = CountryGeoTable::load(&data_dir().join("country_geo.csv")).expect("load country geo");
    let zone_table = ZoneTable::load(&data_dir().join("zone.tab")).expect("load zone table");
    let base_profiles = BaseProfileCatalog::load(&data_dir().join("base_profiles.json")).expect("load base profiles");

    let resolver = DynamicResolver {
        ua_catalog: &ua_catalog,
        country_geo: &country_geo,
        zone_table: &zone_table,
        base_profiles: &base_profiles,
    };

    let config = GateConfig {
        geolocation: GeolocationOptions { country_code: Some("DE".to_string()), geolocation: None },
        user_agent: UserAgentOptions { ua_selector: Some("Windows;;Chrome".to_string()), ..Default::default() },
        timezone: TimezoneOptions { country_code: Some("DE".to_string()), resolved_timezone_id: None },
        ..Default::default()
    };

    let resolved = resolver.resolve(config).expect("resolve session");

    assert!(resolved.gate_config.user_agent.user_agent.as_deref().unwrap_or("").contains("Chrome"));
    let geo = resolved.gate_config.geolocation.geolocation.expect("geolocation resolved");
    assert!((5.0..16.0).contains(&geo.longitude), "DE longitude out of expected range: {}", geo.longitude);
    assert!((47.0..56.0).contains(&geo.latitude), "DE latitude out of expected range: {}", geo.latitude);
    assert!((100.0..=200.0).contains(&geo.accuracy_meters));

    let tz = resolved.gate_config.timezone.resolved_timezone_id.expect("timezone resolved");
    assert!(tz.starts_with("Europe/"), "unexpected timezone for DE: {tz}");
}

#[test]
fn every_bundled_js_template_renders_without_unexpected_missing_vars() {
    let loader = gatecapture::TemplateLoader::new(js_dir()).expect("template dir exists");
    let mut vars = gatecapture::plan::TemplateVars::new();
    for (k, v) in [
        ("USER_AGENT", "Mozilla/5.0 test-agent"),
        ("BRAND", "Google Chrome"),
        ("BRAND_VERSION", "131"),
        ("FULL_VERSION", "131.0.0.0"),
        ("PLATFORM", "Win32"),
        ("ARCHITECTURE", "x86"),
        ("BITNESS", "64"),
        ("WOW64", "false"),
        ("MODEL", ""),
        ("MOBILE", "false"),
        ("PLATFORM_VERSION", "10.0"),
        ("TIMEZONE", "Europe/Berlin"),
        ("DEVICE_MEMORY", "8"),
        ("LANGUAGE", "en-US"),
        ("LANG_JS", "[\"en-US\",\"en\"]"),
        ("TOUCH_SCRIPT", ""),
        ("WEBGL_VENDOR", "Google Inc. (NVIDIA)"),
        ("WEBGL_RENDERER", "ANGLE (NVIDIA GeForce)"),
        ("LATITUDE", "52.5"),
        ("LONGITUDE", "13.4"),
        ("ACCURACY", "150"),
        ("CONNECTION_TYPE", "wifi"),
        ("EFFECTIVE_TYPE", "4g"),
        ("DOWNLINK", "10"),
        ("RTT", "50"),
        ("SAVE_DATA", "false"),
    ] {
        vars.insert(k.to_string(), v.to_string());
    }

    for name in [
        "spoof_useragent.js",
        "chromium_stealth.js",
        "extra_stealth.js",
        "fwk_stealth.js",
        "geolocation_spoof.js",
        "webgl_patch.js",
        "network_info_stub.js",
        "font_metrics_mask.js",
        "webrtc_leak_block.js",
        "performance_timing_normalize.js",
        "navigator_incognito_hints.js",
        "dpr_css_patch.js",
        "gamepad_midi_hid_stub.js",
        "generic_sensor_stub.js",
    ] {
        let rendered = loader
            .load_and_render(name, &vars)
            .unwrap_or_else(|e| panic!("{name} failed to render: {e}"));
        assert!(!rendered.is_empty());
    }
}
