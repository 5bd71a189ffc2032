//! HTTP-replay fallback (SPEC_FULL.md §4.7 "Main mode"): when the driver
//! reports a response body as unavailable (common for navigations that became
//! downloads, or bodies already consumed by the DevTools intercept), re-issue
//! the same request over plain HTTP, seeded with the session's cookies for that
//! URL, and save the result.

use std::collections::HashMap;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::error::{GateCaptureError, GateCaptureResult};

/// Re-issue `method url` with `headers` (minus `content-length`, which no
/// longer matches once headers are rewritten) via a fresh `reqwest` client
/// seeded with `cookie_header` for this origin. `status >= 400` is treated as
/// a failed replay per SPEC_FULL.md §4.7.
pub async fn replay_request(
    client: &reqwest::Client,
    method: &str,
    url: &str,
    headers: &HashMap<String, String>,
    cookie_header: Option<&str>,
) -> GateCaptureResult<Vec<u8>> {
    let mut header_map = HeaderMap::new();
    for (name, value) in headers {
        if name.eq_ignore_ascii_case("content-length") {
            continue;
        }
        if let (Ok(name), Ok(value)) = (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
            header_map.insert(name, value);
        }
    }
    if let Some(cookie) = cookie_header {
        if let Ok(value) = HeaderValue::from_str(cookie) {
            header_map.insert(reqwest::header::COOKIE, value);
        }
    }

    let method = method
        .parse::<reqwest::Method>()
        .map_err(|e| GateCaptureError::BodyUnavailable(format!("invalid method {method}: {e}")))?;

    let response = client
        .request(method, url)
        .headers(header_map)
        .send()
        .await
        .map_err(|e| GateCaptureError::BodyUnavailable(e.to_string()))?;

    if response.status().as_u16() >= 400 {
        return Err(GateCaptureError::BodyUnavailable(format!(
            "replay for {url} returned {}",
            response.status()
        )));
    }

    response
        .bytes()
        .await
        .map(|b| b.to_vec())
        .map_err(|e| GateCaptureError::BodyUnavailable(e.to_string()))
}

/// Build a `Cookie:` header value from the driver's cookie jar, filtered to the
/// entries whose domain matches `url`'s host.
#[must_use]
pub fn cookie_header_for_url(cookies: &[crate::session::CookieRecord], url: &str) -> Option<String> {
    let host = url::Url::parse(url).ok()?.host_str()?.to_string();
    let matching: Vec<String> = cookies
        .iter()
        .filter(|c| host.ends_with(c.domain.trim_start_matches('.')))
        .map(|c| format!("{}={}", c.name, c.value))
        .collect();
    if matching.is_empty() {
        None
    } else {
        Some(matching.join("; "))
    }
}
