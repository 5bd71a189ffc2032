//! Accept-Language header and non-Chromium language/timezone JS coherence
//! (SPEC_FULL.md §4.2).

use std::collections::HashMap;

use super::contract::{Gate, GateConfig, GateId};
use crate::plan::TemplateVars;
use crate::ua::Engine;

pub struct LanguageGate;

impl Gate for LanguageGate {
    fn id(&self) -> GateId {
        GateId::Language
    }

    fn headers(&self, config: &GateConfig) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        if let Some(accept_language) = &config.language.accept_language {
            headers.insert("accept-language".to_string(), accept_language.clone());
        }
        headers
    }

    /// Only contributes on Firefox/WebKit, where `fwk_stealth.js` needs its own
    /// copy of language/timezone/UA since `UserAgentGate` covers Chromium.
    fn js_template_vars(&self, config: &GateConfig) -> TemplateVars {
        let mut vars = TemplateVars::new();
        let Some(engine) = Engine::from_user_agent_option(config.language.user_agent.as_deref())
        else {
            return vars;
        };
        if matches!(engine, Engine::Chromium) {
            return vars;
        }

        let primary = config
            .language
            .accept_language
            .as_deref()
            .and_then(|al| al.split(',').next())
            .unwrap_or("en-US");
        let lang_json =
            serde_json::to_string(&[primary, "en"]).unwrap_or_else(|_| "[]".to_string());
        vars.insert("LANG_JS".to_string(), lang_json);
        if let Some(tz) = &config.language.timezone_id {
            vars.insert("TZ".to_string(), tz.clone());
        }
        if let Some(user_agent) = &config.language.user_agent {
            vars.insert("USER_AGENT".to_string(), user_agent.clone());
        }
        vars
    }
}
