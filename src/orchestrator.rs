//! Spoofing orchestrator (SPEC_FULL.md §4.5): the only component that composes
//! gates. Runs four phases against a single page/context:
//!
//! - **Phase A** — nothing to set up eagerly beyond what Phase B's listener
//!   itself installs (the Accept-CH memo); kept as an explicit phase marker so
//!   the ordering story in the spec stays visible in the code.
//! - **Phase B** — static + dynamic header injection via a `Fetch`-domain
//!   request-stage interception.
//! - **Phase C** — collect `jsTemplateVars` from every gate, render each gate's
//!   `jsPatches` once, install as page-scoped init scripts.
//! - **Phase D** — auto-attach to dedicated/service workers and re-evaluate the
//!   rendered worker-spoof script in each one as it appears.

use std::collections::HashMap;
use std::sync::Arc;

use chromiumoxide::cdp::browser_protocol::fetch::{
    ContinueRequestParams, EnableParams as FetchEnableParams, EventRequestPaused, HeaderEntry,
    RequestPattern, RequestStage,
};
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::cdp::browser_protocol::target::{EventAttachedToTarget, SetAutoAttachParams};
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::Page;
use dashmap::DashMap;
use futures::StreamExt;
use tracing::{debug, warn};

use crate::capture::ResourceData;
use crate::gates::{Gate, GateConfig, GATE_ORDER};
use crate::plan::{SpoofingPlan, TemplateVars};
use crate::template::TemplateLoader;
use crate::ua::Engine;

/// Per-origin memo of hint names a server asked for via `Accept-CH`, populated
/// as responses are observed and consulted by `UserAgentGate::inject_headers`
/// on every subsequent request to that origin.
pub type AcceptChMemo = Arc<DashMap<String, Vec<String>>>;

pub struct Orchestrator {
    gates: Vec<Box<dyn Gate>>,
    templates: Arc<TemplateLoader>,
}

impl Orchestrator {
    #[must_use]
    pub fn new(gates: Vec<Box<dyn Gate>>, templates: Arc<TemplateLoader>) -> Self {
        Self { gates, templates }
    }

    fn enabled_gates(&self, config: &GateConfig) -> Vec<&dyn Gate> {
        GATE_ORDER
            .iter()
            .filter(|id| config.is_enabled(**id))
            .filter_map(|id| self.gates.iter().find(|g| g.id() == *id).map(AsRef::as_ref))
            .collect()
    }

    /// Phase B: sum every enabled gate's static headers. Does not touch the
    /// page; callers install the returned map before registering the route.
    fn static_headers(&self, config: &GateConfig) -> HashMap<String, String> {
        let mut merged = HashMap::new();
        for gate in self.enabled_gates(config) {
            merged.extend(gate.headers(config));
        }
        merged
    }

    /// Phase C: collect every enabled gate's `jsTemplateVars` into one frozen
    /// map. Timezone is read first (SPEC_FULL.md §4.5 Phase C note) so gates
    /// observing shared coherence read the same value regardless of
    /// `GATE_ORDER` position.
    fn collect_template_vars(&self, config: &GateConfig) -> TemplateVars {
        let mut vars = TemplateVars::new();
        if let Some(tz_gate) = self.gates.iter().find(|g| g.id() == crate::gates::GateId::Timezone) {
            vars.extend(tz_gate.js_template_vars(config));
        }
        for gate in self.enabled_gates(config) {
            vars.extend(gate.js_template_vars(config));
        }
        vars
    }

    fn render_init_scripts(&self, engine: Engine, config: &GateConfig, vars: &TemplateVars) -> Vec<String> {
        let mut scripts = Vec::new();
        for gate in self.enabled_gates(config) {
            for template_name in gate.js_patches(engine, config) {
                match self.templates.load_and_render(template_name, vars) {
                    Ok(rendered) => scripts.push(rendered),
                    Err(e) => warn!(template = template_name, error = %e, "js patch render failed, surface un-spoofed"),
                }
            }
        }
        scripts
    }

    /// Find the worker-spoof patch among the merged init scripts. `UserAgentGate`
    /// is the only gate with `setup_page_handlers` in the source design; here it
    /// is represented by re-rendering the same template set inside each new
    /// worker target rather than a separate typed hook, since the gate trait is
    /// a plain synchronous object and workers only exist after the page does.
    fn worker_scripts(&self, engine: Engine, config: &GateConfig, vars: &TemplateVars) -> Vec<String> {
        self.render_init_scripts(engine, config, vars)
    }

    /// Install the full spoofing plan on `page`: Phase B header routing, Phase C
    /// init scripts, Phase D worker handlers (SPEC_FULL.md ordering O2: B before
    /// C so scripts see the same origin policy the first real request will).
    pub async fn install(
        &self,
        page: &Page,
        engine: Engine,
        config: GateConfig,
        resource_data: Option<Arc<ResourceData>>,
    ) -> crate::error::GateCaptureResult<SpoofingPlan> {
        let static_headers = self.static_headers(&config);
        let accept_ch_memo: AcceptChMemo = Arc::new(DashMap::new());
        self.install_routing(
            page,
            engine,
            static_headers.clone(),
            config.clone(),
            resource_data,
            accept_ch_memo.clone(),
        )
        .await?;

        let template_vars = self.collect_template_vars(&config);
        let init_scripts = self.render_init_scripts(engine, &config, &template_vars);
        for script in &init_scripts {
            if let Err(e) = page
                .execute(AddScriptToEvaluateOnNewDocumentParams {
                    source: script.clone(),
                    world_name: None,
                    include_command_line_api: None,
                    run_immediately: None,
                })
                .await
            {
                warn!(error = %e, "patch install failed, surface un-spoofed");
            }
        }

        let worker_scripts = self.worker_scripts(engine, &config, &template_vars);
        self.install_worker_handlers(page, worker_scripts).await?;

        let user_agent_profile = config
            .user_agent
            .user_agent
            .as_deref()
            .map(crate::ua::client_hints::parse);

        Ok(SpoofingPlan {
            static_headers,
            context_params: crate::context_factory::context_params_from(&config),
            init_scripts,
            template_vars,
            user_agent_profile,
            accept_ch_memo,
        })
    }

    /// Phase B: enable `Fetch` interception at the request stage, merge headers
    /// per SPEC_FULL.md ordering O1 (gate-registration order, last writer wins
    /// on duplicate names), and continue the request. `Accept-CH` itself is
    /// observed and written into `accept_ch_memo` by the session's own
    /// response listener (request-stage pauses have no response headers yet);
    /// this routing task only ever reads the memo.
    ///
    /// On a genuine Chromium engine a second, response-stage pattern is also
    /// registered so `ChromiumDownloadInterceptor` sees paused responses; this
    /// task leaves those events untouched (`response_status_code.is_some()`)
    /// since `ContinueRequestParams` is only valid for request-stage pauses.
    async fn install_routing(
        &self,
        page: &Page,
        engine: Engine,
        static_headers: HashMap<String, String>,
        config: GateConfig,
        resource_data: Option<Arc<ResourceData>>,
        accept_ch_memo: AcceptChMemo,
    ) -> crate::error::GateCaptureResult<()> {
        let mut patterns = vec![RequestPattern {
            url_pattern: Some("*".to_string()),
            resource_type: None,
            request_stage: Some(RequestStage::Request),
        }];
        if matches!(engine, Engine::Chromium) {
            patterns.push(RequestPattern {
                url_pattern: Some("*".to_string()),
                resource_type: None,
                request_stage: Some(RequestStage::Response),
            });
        }
        page.execute(FetchEnableParams { patterns: Some(patterns), handle_auth_requests: Some(false) })
            .await
            .map_err(|e| crate::error::GateCaptureError::ContextLaunch(e.to_string()))?;

        let gate_ids = GATE_ORDER.to_vec();
        let gates: Vec<Box<dyn Gate>> = crate::gates::all_gates();
        let mut stream = page
            .event_listener::<EventRequestPaused>()
            .await
            .map_err(|e| crate::error::GateCaptureError::ContextLaunch(e.to_string()))?;
        let page = page.clone();

        tokio::spawn(async move {
            while let Some(event) = stream.next().await {
                if event.response_status_code.is_some() {
                    // Response-stage pause, owned by ChromiumDownloadInterceptor's
                    // continue_response/fulfill_request.
                    continue;
                }
                let request_id = event.request_id.clone();
                let url = event.request.url.clone();
                let origin = origin_of(&url);

                let mut headers: HashMap<String, String> = event
                    .request
                    .headers
                    .inner()
                    .as_object()
                    .map(|obj| {
                        obj.iter()
                            .filter_map(|(k, v)| v.as_str().map(|s| (k.to_lowercase(), s.to_string())))
                            .collect()
                    })
                    .unwrap_or_default();
                headers.extend(static_headers.clone());

                let accept_ch = accept_ch_memo.get(&origin).map(|v| v.clone());
                for id in &gate_ids {
                    if !config.is_enabled(*id) {
                        continue;
                    }
                    if let Some(gate) = gates.iter().find(|g| g.id() == *id) {
                        headers.extend(gate.inject_headers(accept_ch.as_deref(), &config));
                    }
                }

                if let Some(resource_data) = &resource_data {
                    resource_data.record_request(&url, &event.request.method, &headers);
                }

                let header_entries: Vec<HeaderEntry> = headers
                    .into_iter()
                    .map(|(name, value)| HeaderEntry { name, value })
                    .collect();

                if let Err(e) = page
                    .execute(ContinueRequestParams {
                        request_id,
                        url: None,
                        method: None,
                        post_data: None,
                        headers: Some(header_entries),
                        intercept_response: None,
                    })
                    .await
                {
                    debug!(error = %e, "continue_request failed (interception id likely gone)");
                }
            }
        });

        Ok(())
    }

    /// Phase D: `Target.setAutoAttach` with `flatten=true` catches dedicated and
    /// service workers as they spawn; each attached worker target gets the same
    /// rendered scripts evaluated in it via its own CDP session, so the UA,
    /// timezone, and WebGL reported in a worker always match the main document
    /// (SPEC_FULL.md invariant I8/S6).
    async fn install_worker_handlers(
        &self,
        page: &Page,
        worker_scripts: Vec<String>,
    ) -> crate::error::GateCaptureResult<()> {
        if worker_scripts.is_empty() {
            return Ok(());
        }

        page.execute(SetAutoAttachParams {
            auto_attach: true,
            wait_for_debugger_on_start: false,
            flatten: Some(true),
            filter: None,
        })
        .await
        .map_err(|e| crate::error::GateCaptureError::ContextLaunch(e.to_string()))?;

        let mut stream = page
            .event_listener::<EventAttachedToTarget>()
            .await
            .map_err(|e| crate::error::GateCaptureError::ContextLaunch(e.to_string()))?;
        let page = page.clone();

        tokio::spawn(async move {
            while let Some(event) = stream.next().await {
                let session_id = event.session_id.clone();
                for script in &worker_scripts {
                    let params = EvaluateParams {
                        expression: script.clone(),
                        object_group: None,
                        include_command_line_api: None,
                        silent: Some(true),
                        context_id: None,
                        return_by_value: None,
                        generate_preview: None,
                        user_gesture: None,
                        await_promise: None,
                        throw_on_side_effect: None,
                        timeout: None,
                        disable_breaks: None,
                        repl_mode: None,
                        allow_unsafe_eval_blocked_by_csp: None,
                        unique_context_id: None,
                    };
                    if let Err(e) = page.execute_on_session(params, session_id.clone()).await {
                        debug!(error = %e, "worker spoof evaluate failed");
                    }
                }
            }
        });

        Ok(())
    }
}

pub(crate) fn origin_of(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .map(|u| format!("{}://{}", u.scheme(), u.host_str().unwrap_or_default()))
        .unwrap_or_default()
}
