//! Session runner (SPEC_FULL.md §4.9): per-URL lifecycle — output directory,
//! context creation, guarded navigation, optional interactive dwell, and a
//! metadata flush that runs on every exit path (success, timeout, cancellation,
//! or tab death).

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chromiumoxide::cdp::browser_protocol::network::EventResponseReceived;
use chromiumoxide::cdp::browser_protocol::page::{CaptureScreenshotParams, NavigateParams};
use futures::StreamExt;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::capture::{ChromiumDownloadInterceptor, ResourceData};
use crate::context_factory::{self, LaunchOptions};
use crate::devtools_logger::DevToolsLogger;
use crate::error::{GateCaptureError, GateCaptureResult};
use crate::orchestrator::Orchestrator;
use crate::resolver::DynamicResolver;
use crate::session_config::SessionOptions;
use crate::ua::Engine;

const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(40);
const INTERACTIVE_CEILING: Duration = Duration::from_secs(24 * 3600);

/// One entry in the flushed `cookies.json` (SPEC_FULL.md §6 Outputs).
#[derive(Debug, Clone, Serialize)]
pub struct CookieRecord {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    pub expires: f64,
    pub http_only: bool,
    pub secure: bool,
    pub same_site: Option<String>,
}

fn cookies_to_records(cookies: Vec<chromiumoxide::cdp::browser_protocol::network::Cookie>) -> Vec<CookieRecord> {
    cookies
        .into_iter()
        .map(|c| CookieRecord {
            name: c.name,
            value: c.value,
            domain: c.domain,
            path: c.path,
            expires: c.expires,
            http_only: c.http_only,
            secure: c.secure,
            same_site: c.same_site.map(|s| format!("{s:?}")),
        })
        .collect()
}

pub struct SessionRunner<'a> {
    pub resolver: DynamicResolver<'a>,
    pub orchestrator: Orchestrator,
    pub http_client: reqwest::Client,
}

impl<'a> SessionRunner<'a> {
    /// Run one URL end to end. Errors returned here are only the fatal kinds
    /// (`ContextLaunch`); everything else degrades per SPEC_FULL.md §7 and
    /// still reaches the metadata flush.
    pub async fn run(&self, options: &SessionOptions, interactive: bool) -> GateCaptureResult<()> {
        let slug = crate::utils::slug_for_url(&options.url);
        let out_dir = options.output_dir.join(format!("saved_{slug}"));
        tokio::fs::create_dir_all(&out_dir).await?;
        info!(url = %options.url, out_dir = %out_dir.display(), "session starting");

        let resource_data = Arc::new(ResourceData::new());
        let gate_config = options.to_gate_config();

        let launch = LaunchOptions {
            headless: options.headless && !interactive,
            proxy: options.proxy.clone(),
            accept_downloads: true,
            chrome_data_dir: None,
        };

        let (browser, page, plan, resolved) = context_factory::create_context(
            &self.resolver,
            &self.orchestrator,
            gate_config,
            launch,
            resource_data.clone(),
        )
        .await?;

        if matches!(resolved.engine, Engine::Chromium) {
            if let Err(e) =
                ChromiumDownloadInterceptor::spawn(page.clone(), out_dir.clone(), resource_data.clone()).await
            {
                warn!(error = %e, "chromium download interceptor failed to attach");
            }
        }
        let devtools_logger = match DevToolsLogger::attach(&page).await {
            Ok(logger) => Some(logger),
            Err(e) => {
                warn!(error = %e, "devtools logger failed to attach");
                None
            }
        };

        self.spawn_response_recorder(&page, resource_data.clone(), out_dir.clone(), plan.accept_ch_memo.clone());

        let deadline = Duration::from_secs(options.timeout_sec);
        let nav_result = tokio::time::timeout(deadline, self.guarded_navigate(&page, &options.url)).await;

        let mut reached = true;
        match nav_result {
            Ok(Ok(())) => {
                info!(url = %options.url, "navigation complete");
            }
            Ok(Err(NavError::Aborted(reason))) => {
                info!(url = %options.url, reason = %reason, "[ABORT] navigation aborted, likely a download");
            }
            Ok(Err(NavError::Tls(reason))) => {
                warn!(url = %options.url, reason = %reason, "tls error, already retried with errors ignored");
            }
            Ok(Err(NavError::Other(reason))) => {
                resource_data.bump_errors();
                error!(url = %options.url, reason = %reason, "[ERROR] navigation failed");
            }
            Err(_) => {
                info!(url = %options.url, "[TIMEOUT] session deadline elapsed");
                reached = false;
            }
        }

        let final_url = page
            .url()
            .await
            .ok()
            .flatten()
            .map(|u| u.to_string())
            .filter(|_| reached);

        if !interactive && reached {
            if let Err(e) = self.take_screenshot(&page, &out_dir).await {
                warn!(error = %e, "screenshot failed");
            }
        } else if interactive {
            let _ = tokio::time::timeout(INTERACTIVE_CEILING, page.wait_for_navigation()).await;
        }

        self.flush_metadata(&page, &out_dir, resource_data.as_ref(), devtools_logger.as_deref(), final_url.as_deref())
            .await;

        if let Err(e) = browser.close().await {
            warn!(error = %e, "browser close failed");
        }
        Ok(())
    }

    /// `domcontentloaded`-gated navigation with a single TLS-error retry
    /// (SPEC_FULL.md §4.9, §9 open question: effectiveness of the retry is
    /// unclear since the context already ignores TLS errors, but the behavior
    /// is preserved as specified).
    async fn guarded_navigate(&self, page: &chromiumoxide::Page, url: &str) -> Result<(), NavError> {
        let nav = tokio::time::timeout(
            NAVIGATION_TIMEOUT,
            page.execute(NavigateParams::new(url.to_string())),
        )
        .await;

        match nav {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => {
                let msg = e.to_string();
                if msg.contains("ERR_ABORTED") {
                    Err(NavError::Aborted(msg))
                } else if msg.contains("ERR_CERT_") || msg.contains("SSL_") {
                    // Retry once; the context was created with
                    // `ignoreHttpsErrors = true` already.
                    match page.execute(NavigateParams::new(url.to_string())).await {
                        Ok(_) => Ok(()),
                        Err(e2) => Err(NavError::Tls(e2.to_string())),
                    }
                } else {
                    Err(NavError::Other(msg))
                }
            }
            Err(_) => Err(NavError::Other("navigation timed out before the outer session deadline".to_string())),
        }
    }

    async fn take_screenshot(&self, page: &chromiumoxide::Page, out_dir: &PathBuf) -> GateCaptureResult<()> {
        let shot = page
            .execute(CaptureScreenshotParams::builder().build())
            .await
            .map_err(|e| GateCaptureError::Io(std::io::Error::other(e.to_string())))?;
        let bytes = base64::Engine::decode(&base64::engine::general_purpose::STANDARD, &shot.result.data)
            .map_err(|e| GateCaptureError::Io(std::io::Error::other(e.to_string())))?;
        tokio::fs::write(out_dir.join("screenshot.png"), bytes).await?;
        Ok(())
    }

    /// Response observer for the engine-neutral capture path (SPEC_FULL.md
    /// §4.7 "Main mode" `onResponse`). Chromium's `Fetch`-intercepted downloads
    /// already populate `resource_data`; this always records headers/status
    /// regardless (invariant I5).
    fn spawn_response_recorder(
        &self,
        page: &chromiumoxide::Page,
        resource_data: Arc<ResourceData>,
        out_dir: PathBuf,
        accept_ch_memo: crate::orchestrator::AcceptChMemo,
    ) {
        let page = page.clone();
        let client = self.http_client.clone();
        tokio::spawn(async move {
            let Ok(mut stream) = page.event_listener::<EventResponseReceived>().await else { return };
            while let Some(event) = stream.next().await {
                let url = event.response.url.clone();
                let status = event.response.status as u16;
                let resource_type = format!("{:?}", event.r#type);
                let headers: std::collections::HashMap<String, String> = event
                    .response
                    .headers
                    .inner()
                    .as_object()
                    .map(|obj| {
                        obj.iter()
                            .filter_map(|(k, v)| v.as_str().map(|s| (k.to_lowercase(), s.to_string())))
                            .collect()
                    })
                    .unwrap_or_default();

                if let Some(accept_ch) = headers.get("accept-ch") {
                    let hints: Vec<String> =
                        accept_ch.split(',').map(|h| h.trim().to_lowercase()).filter(|h| !h.is_empty()).collect();
                    if !hints.is_empty() {
                        accept_ch_memo.insert(crate::orchestrator::origin_of(&url), hints);
                    }
                }

                resource_data.record_response(&url, status, headers.clone());

                if (300..400).contains(&status) || resource_data.has_file(&url) {
                    continue;
                }

                let content_type = headers.get("content-type").cloned().unwrap_or_default();
                let content_disposition = headers.get("content-disposition").cloned();
                let is_download = crate::capture::looks_like_download(&content_type, content_disposition.as_deref());
                let kind = crate::capture::ResourceKind::from_cdp_resource_type(&resource_type);

                // The top-level document always lands at a fixed name so the
                // offline rewrite has a stable `page.html` to read back.
                let path = if kind == crate::capture::ResourceKind::Document && !is_download {
                    out_dir.join("page.html")
                } else {
                    let dir = crate::capture::target_dir(&out_dir, kind, is_download);
                    let filename =
                        crate::capture::derive_filename(&url, &content_type, content_disposition.as_deref(), &url);
                    crate::capture::dedup_path(&dir, &filename)
                };

                let body = page
                    .execute(chromiumoxide::cdp::browser_protocol::network::GetResponseBodyParams {
                        request_id: event.request_id.clone(),
                    })
                    .await
                    .ok();

                let bytes = match body {
                    Some(resp) if resp.result.base64_encoded => {
                        base64::Engine::decode(&base64::engine::general_purpose::STANDARD, &resp.result.body).ok()
                    }
                    Some(resp) => Some(resp.result.body.clone().into_bytes()),
                    None => None,
                };

                let bytes = match bytes {
                    Some(b) if !b.is_empty() => b,
                    _ => {
                        let cookies = page.get_cookies().await.map(cookies_to_records).unwrap_or_default();
                        let cookie_header = crate::capture::replay::cookie_header_for_url(&cookies, &url);
                        let method = resource_data.request_method(&url).unwrap_or_else(|| "GET".to_string());
                        match crate::capture::replay::replay_request(
                            &client,
                            &method,
                            &url,
                            &headers,
                            cookie_header.as_deref(),
                        )
                        .await
                        {
                            Ok(b) => b,
                            Err(_) => {
                                resource_data.bump_errors();
                                continue;
                            }
                        }
                    }
                };

                if crate::capture::save_stream_to_file(&path, &bytes).await.is_ok() {
                    let relative = path.strip_prefix(&out_dir).unwrap_or(&path).to_string_lossy().to_string();
                    resource_data.record_file(&url, &relative);
                }
            }
        });
    }

    /// Flush every metadata artefact, best-effort (SPEC_FULL.md §4.9, §7: a
    /// `CookieCollectionFailure` writes `[]` rather than aborting the flush).
    async fn flush_metadata(
        &self,
        page: &chromiumoxide::Page,
        out_dir: &PathBuf,
        resource_data: &ResourceData,
        devtools_logger: Option<&DevToolsLogger>,
        final_url: Option<&str>,
    ) {
        let cookies = match page.get_cookies().await {
            Ok(cookies) => cookies_to_records(cookies),
            Err(e) => {
                warn!(error = %e, "[WARN] cookie collection failed");
                Vec::new()
            }
        };

        let _ = tokio::fs::write(
            out_dir.join("cookies.json"),
            serde_json::to_vec_pretty(&cookies).unwrap_or_else(|_| b"[]".to_vec()),
        )
        .await;
        let _ = tokio::fs::write(
            out_dir.join("http_request_headers.json"),
            serde_json::to_vec_pretty(&resource_data.request_headers_json()).unwrap_or_default(),
        )
        .await;
        let _ = tokio::fs::write(
            out_dir.join("http_response_headers.json"),
            serde_json::to_vec_pretty(&resource_data.response_headers_json()).unwrap_or_default(),
        )
        .await;
        if let Some(logger) = devtools_logger {
            let transcript = logger.transcript(final_url);
            let _ = tokio::fs::write(
                out_dir.join("cdp_log.json"),
                serde_json::to_vec_pretty(&transcript).unwrap_or_default(),
            )
            .await;
        }

        // Offline rewrite runs last and only when a document body exists
        // (SPEC_FULL.md §4.10: "both page.html and page_offline.html are
        // always written together; a rewrite failure is logged and only
        // page.html is guaranteed").
        if let Ok(page_html) = tokio::fs::read_to_string(out_dir.join("page.html")).await {
            let rewritten = crate::offline_html::rewrite(&page_html, &resource_data.url_to_file_map());
            if let Err(e) = tokio::fs::write(out_dir.join("page_offline.html"), rewritten).await {
                warn!(error = %e, "[WARN] offline html rewrite write failed");
            }
        }

        let stats = resource_data.stats();
        info!(
            downloads = stats.downloads,
            warnings = stats.warnings,
            errors = stats.errors,
            seen_urls = resource_data.seen_url_count(),
            "[STATS] session metadata flushed"
        );
    }
}

enum NavError {
    Aborted(String),
    Tls(String),
    Other(String),
}
