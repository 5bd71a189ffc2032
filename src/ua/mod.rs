//! Client-Hints / User-Agent parsing (SPEC_FULL.md §4.1).

pub mod catalog;
pub mod client_hints;
pub mod profile;

pub use catalog::UaCatalog;
pub use client_hints::{
    detect_engine, detect_platform, generate_sec_ch_ua, generate_sec_ch_ua_full_version_list,
    parse, supports_client_hints, UaError,
};
pub use profile::{Engine, Platform, UserAgentProfile};
