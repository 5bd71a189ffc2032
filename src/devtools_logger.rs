//! DevTools transcript logger (SPEC_FULL.md §4.8): a separate CDP session from
//! the capture pipeline's, recording the redirect chain, POST bodies, and a
//! capped preview of every `eval`/`Function`-created script. Exists purely to
//! produce `cdp_log.json`; it never alters requests or responses.

use std::sync::atomic::{AtomicU64, Ordering};

use chromiumoxide::cdp::browser_protocol::debugger::{EventScriptParsed, GetScriptSourceParams};
use chromiumoxide::cdp::browser_protocol::network::{
    EnableParams as NetworkEnableParams, EventRequestWillBeSent, GetRequestPostDataParams,
};
use chromiumoxide::cdp::browser_protocol::page::{EventFrameNavigated, EventFrameRequestedNavigation};
use chromiumoxide::Page;
use futures::StreamExt;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::debug;

use crate::error::GateCaptureResult;

const SCRIPT_PREVIEW_CHARS: usize = 200;

#[derive(Debug, Clone, Serialize)]
pub struct RedirectEvent {
    pub phase: &'static str, // "before" | "after"
    pub url: String,
    pub loader_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestSummary {
    pub id: String,
    pub url: String,
    pub method: String,
    pub post_data: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EvalScriptPreview {
    pub script_id: String,
    pub length: i64,
    pub preview: String,
}

#[derive(Default)]
struct TranscriptInner {
    redirects: Vec<RedirectEvent>,
    requests: Vec<RequestSummary>,
    eval_scripts: Vec<EvalScriptPreview>,
}

/// Shared, append-only transcript state; `Mutex` rather than `DashMap` since
/// the three event kinds append to independent `Vec`s that are only ever read
/// back wholesale at flush time.
pub struct DevToolsLogger {
    inner: Mutex<TranscriptInner>,
    request_count: AtomicU64,
}

impl DevToolsLogger {
    /// Attach to `page` and start recording. Failure to enable any one CDP
    /// domain degrades that slice of the transcript rather than the session
    /// (SPEC_FULL.md §7: DevTools logging is observational, never fatal).
    pub async fn attach(page: &Page) -> GateCaptureResult<std::sync::Arc<Self>> {
        let logger = std::sync::Arc::new(Self {
            inner: Mutex::new(TranscriptInner::default()),
            request_count: AtomicU64::new(0),
        });

        if let Err(e) = page.execute(NetworkEnableParams::default()).await {
            debug!(error = %e, "Network.enable failed, request log will be empty");
        }

        Self::spawn_frame_navigation(page, logger.clone()).await;
        Self::spawn_frame_navigated(page, logger.clone()).await;
        Self::spawn_request_will_be_sent(page, logger.clone()).await;
        Self::spawn_script_parsed(page, logger.clone()).await;

        Ok(logger)
    }

    async fn spawn_frame_navigation(page: &Page, logger: std::sync::Arc<Self>) {
        let Ok(mut stream) = page.event_listener::<EventFrameRequestedNavigation>().await else { return };
        tokio::spawn(async move {
            while let Some(event) = stream.next().await {
                logger.inner.lock().redirects.push(RedirectEvent {
                    phase: "before",
                    url: event.url.clone(),
                    loader_id: None,
                });
            }
        });
    }

    async fn spawn_frame_navigated(page: &Page, logger: std::sync::Arc<Self>) {
        let Ok(mut stream) = page.event_listener::<EventFrameNavigated>().await else { return };
        tokio::spawn(async move {
            while let Some(event) = stream.next().await {
                logger.inner.lock().redirects.push(RedirectEvent {
                    phase: "after",
                    url: event.frame.url.clone(),
                    loader_id: event.frame.loader_id.clone().map(|id| id.inner().to_string()),
                });
            }
        });
    }

    async fn spawn_request_will_be_sent(page: &Page, logger: std::sync::Arc<Self>) {
        let Ok(mut stream) = page.event_listener::<EventRequestWillBeSent>().await else { return };
        let page = page.clone();
        tokio::spawn(async move {
            while let Some(event) = stream.next().await {
                logger.request_count.fetch_add(1, Ordering::Relaxed);
                let mut post_data = None;
                if event.request.has_post_data.unwrap_or(false) {
                    post_data = page
                        .execute(GetRequestPostDataParams { request_id: event.request_id.clone() })
                        .await
                        .ok()
                        .map(|r| r.result.post_data.clone());
                }
                logger.inner.lock().requests.push(RequestSummary {
                    id: event.request_id.inner().to_string(),
                    url: event.request.url.clone(),
                    method: event.request.method.clone(),
                    post_data,
                });
            }
        });
    }

    /// `Debugger.scriptParsed` with an empty `url` means the script came from
    /// `eval`/`new Function`, not a loaded resource (SPEC_FULL.md §4.8).
    async fn spawn_script_parsed(page: &Page, logger: std::sync::Arc<Self>) {
        let Ok(mut stream) = page.event_listener::<EventScriptParsed>().await else { return };
        let page = page.clone();
        tokio::spawn(async move {
            while let Some(event) = stream.next().await {
                if !event.url.is_empty() {
                    continue;
                }
                let source = page
                    .execute(GetScriptSourceParams { script_id: event.script_id.clone() })
                    .await
                    .ok()
                    .map(|r| r.result.script_source.clone())
                    .unwrap_or_default();
                let preview = crate::utils::string_utils::safe_truncate_chars(&source, SCRIPT_PREVIEW_CHARS).to_string();
                logger.inner.lock().eval_scripts.push(EvalScriptPreview {
                    script_id: event.script_id.inner().to_string(),
                    length: source.len() as i64,
                    preview,
                });
            }
        });
    }

    /// Render the final `cdp_log.json` document (SPEC_FULL.md §6 Outputs).
    #[must_use]
    pub fn transcript(&self, final_page_url: Option<&str>) -> serde_json::Value {
        let inner = self.inner.lock();
        serde_json::json!({
            "redirects": inner.redirects,
            "requests": inner.requests,
            "eval_scripts": inner.eval_scripts,
            "metadata": {
                "redirect_count": inner.redirects.len(),
                "request_count": self.request_count.load(Ordering::Relaxed),
                "eval_script_count": inner.eval_scripts.len(),
                "final_url": final_page_url.unwrap_or("<closed>"),
            },
        })
    }
}
