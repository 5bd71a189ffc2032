//! Chromium-only download interception via the `Fetch` response stage
//! (SPEC_FULL.md §4.7 "Chromium-only mode"). A navigation that turns out to be
//! a file transfer is taken over at the protocol level so the capture pipeline
//! still yields the bytes and metadata, never a broken tab.

use std::path::PathBuf;
use std::sync::Arc;

use chromiumoxide::cdp::browser_protocol::fetch::{
    EventRequestPaused, FulfillRequestParams, GetResponseBodyParams, HeaderEntry,
};
use chromiumoxide::cdp::browser_protocol::io::ReadParams;
use chromiumoxide::Page;
use futures::StreamExt;
use tracing::{debug, warn};

use crate::capture::{derive_filename, looks_like_download, save_stream_to_file, ResourceData};
use crate::error::GateCaptureResult;

pub struct ChromiumDownloadInterceptor;

impl ChromiumDownloadInterceptor {
    /// Spawn the response-stage listener. Must run alongside (not instead of)
    /// the request-stage header-injection listener the orchestrator installs;
    /// both share the same `Fetch` domain via distinct `requestStage` patterns.
    pub async fn spawn(
        page: Page,
        out_dir: PathBuf,
        resource_data: Arc<ResourceData>,
    ) -> GateCaptureResult<()> {
        let mut stream = page
            .event_listener::<EventRequestPaused>()
            .await
            .map_err(|e| crate::error::GateCaptureError::ContextLaunch(e.to_string()))?;

        tokio::spawn(async move {
            while let Some(event) = stream.next().await {
                // Request-stage events (no response_status_code) are handled by
                // the orchestrator's header-injection listener; skip them here.
                let Some(status_code) = event.response_status_code else { continue };
                let request_id = event.request_id.clone();
                let url = event.request.url.clone();

                let headers: std::collections::HashMap<String, String> = event
                    .response_headers
                    .as_ref()
                    .map(|hs| hs.iter().map(|h| (h.name.to_lowercase(), h.value.clone())).collect())
                    .unwrap_or_default();
                let content_type = headers.get("content-type").cloned().unwrap_or_default();
                let content_disposition = headers.get("content-disposition").cloned();

                resource_data.record_response(&url, status_code as u16, headers.clone());

                if resource_data.has_file(&url) {
                    // Already saved by an earlier response-stage event for this
                    // request id; continuing untouched just lets the page see
                    // the normal body (shouldn't recur, but never double-write).
                    if let Err(e) = page
                        .execute(chromiumoxide::cdp::browser_protocol::fetch::ContinueResponseParams {
                            request_id,
                            response_code: None,
                            response_phrase: None,
                            response_headers: None,
                            binary_response_headers: None,
                        })
                        .await
                    {
                        debug!(error = %e, "continue_response failed");
                    }
                    continue;
                }

                if !looks_like_download(&content_type, content_disposition.as_deref()) {
                    if let Err(e) = page
                        .execute(chromiumoxide::cdp::browser_protocol::fetch::ContinueResponseParams {
                            request_id,
                            response_code: None,
                            response_phrase: None,
                            response_headers: None,
                            binary_response_headers: None,
                        })
                        .await
                    {
                        debug!(error = %e, "continue_response failed");
                    }
                    continue;
                }

                let filename = derive_filename(&url, &content_type, content_disposition.as_deref(), &url);
                let path = crate::capture::dedup_path(&out_dir.join("downloads"), &filename);

                let bytes = match Self::drain_body(&page, request_id.clone()).await {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        warn!(url = %url, error = %e, "download body drain failed");
                        resource_data.bump_errors();
                        continue;
                    }
                };

                if let Err(e) = save_stream_to_file(&path, &bytes).await {
                    warn!(url = %url, error = %e, "download save failed");
                    resource_data.bump_errors();
                    continue;
                }

                let relative = path
                    .strip_prefix(&out_dir)
                    .unwrap_or(&path)
                    .to_string_lossy()
                    .to_string();
                resource_data.record_file(&url, &relative);
                resource_data.bump_downloads();

                let mut response_headers = headers.clone();
                response_headers
                    .entry("content-disposition".to_string())
                    .or_insert_with(|| format!("attachment; filename=\"{filename}\""));
                let header_entries: Vec<HeaderEntry> = response_headers
                    .into_iter()
                    .map(|(name, value)| HeaderEntry { name, value })
                    .collect();

                if let Err(e) = page
                    .execute(FulfillRequestParams {
                        request_id,
                        response_code: status_code,
                        response_headers: Some(header_entries),
                        binary_response_headers: None,
                        body: None,
                        response_phrase: None,
                    })
                    .await
                {
                    debug!(error = %e, "fulfill_request failed");
                }
            }
        });

        Ok(())
    }

    /// `Fetch.takeResponseBodyAsStream` + repeated `IO.read` (SPEC_FULL.md
    /// §4.7). Falls back to `Fetch.getResponseBody` for small bodies the driver
    /// already buffered.
    async fn drain_body(
        page: &Page,
        request_id: chromiumoxide::cdp::browser_protocol::fetch::RequestId,
    ) -> GateCaptureResult<Vec<u8>> {
        match page
            .execute(chromiumoxide::cdp::browser_protocol::fetch::TakeResponseBodyAsStreamParams {
                request_id: request_id.clone(),
            })
            .await
        {
            Ok(resp) => {
                let handle = resp.result.stream.clone();
                let mut buf = Vec::new();
                loop {
                    let chunk = page
                        .execute(ReadParams { handle: handle.clone(), offset: None, size: Some(1024 * 64) })
                        .await
                        .map_err(|e| crate::error::GateCaptureError::DownloadSave(e.to_string()))?;
                    let decoded = if chunk.result.base64_encoded.unwrap_or(false) {
                        base64::Engine::decode(&base64::engine::general_purpose::STANDARD, &chunk.result.data)
                            .unwrap_or_default()
                    } else {
                        chunk.result.data.clone().into_bytes()
                    };
                    buf.extend_from_slice(&decoded);
                    if chunk.result.eof {
                        break;
                    }
                }
                Ok(buf)
            }
            Err(_) => {
                let resp = page
                    .execute(GetResponseBodyParams { request_id })
                    .await
                    .map_err(|e| crate::error::GateCaptureError::DownloadSave(e.to_string()))?;
                if resp.result.base64_encoded {
                    Ok(base64::Engine::decode(&base64::engine::general_purpose::STANDARD, &resp.result.body)
                        .unwrap_or_default())
                } else {
                    Ok(resp.result.body.clone().into_bytes())
                }
            }
        }
    }
}
