//! Gate modules: one policy per fingerprint dimension (SPEC_FULL.md §4.2).

pub mod contract;
pub mod geolocation;
pub mod language;
pub mod network;
pub mod referrer;
pub mod stealth;
pub mod timezone;
pub mod user_agent;
pub mod webgl;

pub use contract::{Gate, GateConfig, GateId, GATE_ORDER};
pub use geolocation::GeolocationGate;
pub use language::LanguageGate;
pub use network::NetworkGate;
pub use referrer::ReferrerGate;
pub use stealth::StealthGate;
pub use timezone::TimezoneGate;
pub use user_agent::UserAgentGate;
pub use webgl::WebGlGate;

/// One boxed [`Gate`] per [`GateId`], in [`GATE_ORDER`].
#[must_use]
pub fn all_gates() -> Vec<Box<dyn Gate>> {
    vec![
        Box::new(GeolocationGate),
        Box::new(ReferrerGate),
        Box::new(UserAgentGate),
        Box::new(LanguageGate),
        Box::new(NetworkGate),
        Box::new(WebGlGate),
        Box::new(StealthGate),
        Box::new(TimezoneGate),
    ]
}
