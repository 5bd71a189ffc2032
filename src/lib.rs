//! Fingerprint Coherence & Interception Pipeline: a gate-driven spoofing
//! orchestrator, capture pipeline, and session runner for archiving
//! country/device-coherent captures of adversarial web pages through a real
//! Chromium instance.
//!
//! See `SPEC_FULL.md` for the full component design; `DESIGN.md` for the
//! grounding ledger.

pub mod browser_setup;
pub mod capture;
pub mod context_factory;
pub mod devtools_logger;
pub mod error;
pub mod gates;
pub mod geodata;
pub mod offline_html;
pub mod orchestrator;
pub mod plan;
pub mod profiles;
pub mod resolver;
pub mod session;
pub mod session_config;
pub mod template;
pub mod ua;
pub mod urlnorm;
pub mod utils;
pub mod zonetab;

pub use capture::ResourceData;
pub use context_factory::{create_context, LaunchOptions};
pub use error::{GateCaptureError, GateCaptureResult};
pub use gates::{all_gates, Gate, GateConfig, GateId, GATE_ORDER};
pub use geodata::CountryGeoTable;
pub use orchestrator::Orchestrator;
pub use plan::SpoofingPlan;
pub use profiles::BaseProfileCatalog;
pub use resolver::{DynamicResolver, ResolvedSession};
pub use session::SessionRunner;
pub use session_config::{BrowserEngine, SessionOptions};
pub use template::TemplateLoader;
pub use ua::UaCatalog;
pub use zonetab::ZoneTable;
