//! Dynamic resolver (SPEC_FULL.md §4.4): turns selection criteria (country code,
//! UA selector, base-profile id) into concrete randomized values for one
//! session, before the orchestrator ever runs. Runs exactly once per session;
//! its output is then immutable for the session's lifetime (SPEC_FULL.md §3
//! Lifecycle).

use crate::error::GateCaptureResult;
use crate::gates::contract::{ConnectionProfile, GateConfig};
use crate::geodata::CountryGeoTable;
use crate::plan::BaseProfile;
use crate::profiles::BaseProfileCatalog;
use crate::ua::{self, Engine, UaCatalog, UserAgentProfile};
use crate::zonetab::ZoneTable;

/// Everything the context factory and orchestrator need about this session's
/// resolved identity, alongside the resolved [`GateConfig`].
pub struct ResolvedSession {
    pub gate_config: GateConfig,
    pub base_profile: BaseProfile,
    pub user_agent_profile: UserAgentProfile,
    pub engine: Engine,
}

pub struct DynamicResolver<'a> {
    pub ua_catalog: &'a UaCatalog,
    pub country_geo: &'a CountryGeoTable,
    pub zone_table: &'a ZoneTable,
    pub base_profiles: &'a BaseProfileCatalog,
}

impl<'a> DynamicResolver<'a> {
    /// Resolve `config` in place (the caller's original map is not further
    /// mutated once this returns per SPEC_FULL.md §4.4) and return the
    /// session-level derived values.
    pub fn resolve(&self, mut config: GateConfig) -> GateCaptureResult<ResolvedSession> {
        // 1. UA: selector -> concrete string, or pass through an explicit UA.
        if config.user_agent.user_agent.is_none() {
            if let Some(selector) = &config.user_agent.ua_selector {
                let chosen = self.ua_catalog.choose(selector)?;
                config.user_agent.user_agent = Some(chosen);
            }
        }
        let ua_string = config
            .user_agent
            .user_agent
            .clone()
            .unwrap_or_else(|| crate::utils::constants::CHROME_USER_AGENT.to_string());
        let user_agent_profile = ua::client_hints::parse(&ua_string);
        let engine = ua::client_hints::detect_engine(&ua_string);

        // 2. Geolocation: country code -> area-weighted point inside polygon.
        if let Some(country) = config.geolocation.country_code.clone() {
            if config.geolocation.geolocation.is_none() {
                let geo = self.country_geo.sample(&country)?;
                config.geolocation.geolocation = Some(geo);
            }
        }

        // 3. Timezone: read first so later gates observe the same zone id
        // (SPEC_FULL.md §4.5 Phase C ordering note).
        let country_for_tz = config
            .timezone
            .country_code
            .clone()
            .or_else(|| config.geolocation.country_code.clone());
        let timezone_id = match country_for_tz {
            Some(country) => self.zone_table.select_for_country(&country),
            None => "UTC".to_string(),
        };
        config.timezone.resolved_timezone_id = Some(timezone_id.clone());
        config.user_agent.timezone_id = Some(timezone_id.clone());
        config.language.timezone_id = Some(timezone_id);
        config.language.user_agent.get_or_insert_with(|| ua_string.clone());

        // 4. Base profile: compatible with the resolved UA's OS family, draws
        // memory/cores/screen/WebGL together.
        let base_profile = self.base_profiles.select(user_agent_profile.os_family())?;
        config.user_agent.device_memory_gib.get_or_insert(base_profile.memory_gib);
        if config.webgl.webgl_vendor.is_none() && config.webgl.webgl_renderer.is_none() {
            config.webgl.webgl_vendor = Some(base_profile.webgl_vendor.clone());
            config.webgl.webgl_renderer = Some(base_profile.webgl_renderer.clone());
        }
        config.webgl.user_agent.get_or_insert_with(|| ua_string.clone());

        // 5. Network: connection class from the base profile's mapping.
        if config.network.connection_profile.is_none() {
            config.network.connection_profile =
                Some(ConnectionProfile::Named(base_profile.connection_profile.clone()));
        }

        Ok(ResolvedSession { gate_config: config, base_profile, user_agent_profile, engine })
    }
}
