//! Resource capture (SPEC_FULL.md §4.7): request/response classification,
//! collision-free filename derivation, and the `ResourceData` bundle every
//! session accumulates into for its metadata flush.

pub mod download;
pub mod replay;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use dashmap::DashMap;
use serde::Serialize;

use crate::error::GateCaptureResult;

/// One classified resource kind, driving both the output subdirectory and
/// whether the body is captured at all (SPEC_FULL.md §4.7 "Main mode").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Document,
    Stylesheet,
    Script,
    Image,
    Font,
    Media,
    Download,
    Other,
}

impl ResourceKind {
    #[must_use]
    pub fn type_dir(self) -> &'static str {
        match self {
            Self::Document => "html",
            Self::Stylesheet => "stylesheets",
            Self::Script => "scripts",
            Self::Image => "images",
            Self::Font => "fonts",
            Self::Media => "media",
            Self::Download => "downloads",
            Self::Other => "other",
        }
    }

    /// Classify from the CDP `resourceType` string (`Document`, `Stylesheet`,
    /// `Script`, `Image`, `Font`, `Media`, `XHR`, `Other`, ...).
    #[must_use]
    pub fn from_cdp_resource_type(resource_type: &str) -> Self {
        match resource_type {
            "Document" => Self::Document,
            "Stylesheet" => Self::Stylesheet,
            "Script" => Self::Script,
            "Image" => Self::Image,
            "Font" => Self::Font,
            "Media" => Self::Media,
            _ => Self::Other,
        }
    }
}

/// `_looksLikeDownload` (SPEC_FULL.md §4.7): content-disposition or
/// known-binary-MIME heuristics independent of CDP's own resource-type
/// classification, since a navigation that becomes a download is often
/// reported as `Document`.
#[must_use]
pub fn looks_like_download(content_type: &str, content_disposition: Option<&str>) -> bool {
    if let Some(cd) = content_disposition {
        let lower = cd.to_lowercase();
        if lower.contains("attachment") || lower.contains("filename=") {
            return true;
        }
    }
    matches!(
        content_type.split(';').next().unwrap_or("").trim(),
        "application/pdf"
            | "application/zip"
            | "application/x-msdownload"
            | "application/vnd.microsoft.portable-executable"
            | "application/octet-stream"
    )
}

/// Append-only per-URL HTTP record (SPEC_FULL.md §3 `ResourceRecord`).
#[derive(Debug, Clone, Serialize)]
pub struct RequestRecord {
    pub method: String,
    pub headers: std::collections::HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResponseRecord {
    pub status_code: u16,
    pub headers: std::collections::HashMap<String, String>,
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct CaptureStats {
    pub downloads: u64,
    pub warnings: u64,
    pub errors: u64,
}

/// The mutable bundle a single session accumulates into (SPEC_FULL.md §3
/// `ResourceData`). Owned by exactly one session; every mutation happens from
/// the session's own event loop, so interior mutability via `DashMap` gives
/// `Send + Sync` snapshot access without an explicit lock (§5 concurrency
/// model: "do not require locks").
#[derive(Default)]
pub struct ResourceData {
    seen_urls: DashMap<String, ()>,
    request_headers: DashMap<String, RequestRecord>,
    response_headers: DashMap<String, ResponseRecord>,
    url_to_file: DashMap<String, String>,
    stats_downloads: std::sync::atomic::AtomicU64,
    stats_warnings: std::sync::atomic::AtomicU64,
    stats_errors: std::sync::atomic::AtomicU64,
}

impl ResourceData {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self, url: &str, method: &str, headers: &std::collections::HashMap<String, String>) {
        self.seen_urls.insert(url.to_string(), ());
        self.request_headers.insert(
            url.to_string(),
            RequestRecord { method: method.to_string(), headers: headers.clone() },
        );
    }

    pub fn record_response(&self, url: &str, status_code: u16, headers: std::collections::HashMap<String, String>) {
        self.response_headers.insert(url.to_string(), ResponseRecord { status_code, headers });
    }

    /// The HTTP method recorded for `url`'s request, if one was observed.
    #[must_use]
    pub fn request_method(&self, url: &str) -> Option<String> {
        self.request_headers.get(url).map(|r| r.method.clone())
    }

    /// `true` if `url` already has a saved file (SPEC_FULL.md invariant I4/O4 —
    /// the authoritative "already saved" signal, not filesystem `exists()`).
    #[must_use]
    pub fn has_file(&self, url: &str) -> bool {
        self.url_to_file.contains_key(url)
    }

    pub fn record_file(&self, url: &str, relative_path: &str) {
        self.url_to_file.insert(url.to_string(), relative_path.to_string());
    }

    pub fn bump_downloads(&self) {
        self.stats_downloads.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
    }

    pub fn bump_warnings(&self) {
        self.stats_warnings.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
    }

    pub fn bump_errors(&self) {
        self.stats_errors.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
    }

    #[must_use]
    pub fn seen_url_count(&self) -> usize {
        self.seen_urls.len()
    }

    pub fn request_headers_json(&self) -> serde_json::Value {
        let map: std::collections::HashMap<String, serde_json::Value> = self
            .request_headers
            .iter()
            .map(|entry| {
                let mut obj = serde_json::Map::new();
                obj.insert("method".to_string(), serde_json::json!(entry.value().method));
                for (k, v) in &entry.value().headers {
                    obj.insert(k.clone(), serde_json::json!(v));
                }
                (entry.key().clone(), serde_json::Value::Object(obj))
            })
            .collect();
        serde_json::json!(map)
    }

    pub fn response_headers_json(&self) -> serde_json::Value {
        let map: std::collections::HashMap<String, serde_json::Value> = self
            .response_headers
            .iter()
            .map(|entry| {
                (
                    entry.key().clone(),
                    serde_json::json!({
                        "status_code": entry.value().status_code,
                        "headers": entry.value().headers,
                    }),
                )
            })
            .collect();
        serde_json::json!(map)
    }

    /// Snapshot of `urlToFile` for the offline HTML rewrite (SPEC_FULL.md
    /// §4.10), keyed by the original (not relative) URL.
    #[must_use]
    pub fn url_to_file_map(&self) -> std::collections::HashMap<String, String> {
        self.url_to_file.iter().map(|entry| (entry.key().clone(), entry.value().clone())).collect()
    }

    #[must_use]
    pub fn stats(&self) -> CaptureStats {
        CaptureStats {
            downloads: self.stats_downloads.load(std::sync::atomic::Ordering::Relaxed),
            warnings: self.stats_warnings.load(std::sync::atomic::Ordering::Relaxed),
            errors: self.stats_errors.load(std::sync::atomic::Ordering::Relaxed),
        }
    }
}

/// RFC 5987 `filename*=UTF-8''...` decoded first, else the plain `filename="..."`
/// token. Rejects anything that would escape the target directory.
#[must_use]
pub fn filename_from_content_disposition(cd: &str) -> Option<String> {
    for part in cd.split(';') {
        let part = part.trim();
        if let Some(encoded) = part.strip_prefix("filename*=") {
            let encoded = encoded.trim_start_matches("UTF-8''").trim_matches('"');
            if let Ok(decoded) = urlencoding::decode(encoded) {
                return Some(sanitize_filename::sanitize(decoded.into_owned()));
            }
        }
    }
    for part in cd.split(';') {
        let part = part.trim();
        if let Some(name) = part.strip_prefix("filename=") {
            let name = name.trim_matches('"');
            if !name.is_empty() {
                return Some(sanitize_filename::sanitize(name));
            }
        }
    }
    None
}

fn extension_from_content_type(content_type: &str) -> String {
    let mime = content_type.split(';').next().unwrap_or("").trim();
    match mime {
        "text/css" => ".css".to_string(),
        "text/html" => ".html".to_string(),
        "text/javascript" | "application/javascript" | "application/x-javascript" => ".js".to_string(),
        "application/pdf" => ".pdf".to_string(),
        "application/zip" => ".zip".to_string(),
        "application/json" => ".json".to_string(),
        "application/octet-stream" | "application/x-msdownload" => ".bin".to_string(),
        _ if mime.starts_with("image/") => format!(".{}", mime.trim_start_matches("image/")),
        _ if mime.starts_with("font/") => format!(".{}", mime.trim_start_matches("font/")),
        _ => String::new(),
    }
}

/// Basename-derived stem, falling back to `"index"` when empty.
fn stem_from_url(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|mut segs| segs.next_back().map(str::to_string))
        })
        .filter(|s| !s.is_empty())
        .map(|s| {
            // Drop an existing extension; the content-type-derived one wins.
            std::path::Path::new(&s)
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or(&s)
                .to_string()
        })
        .unwrap_or_else(|| "index".to_string())
}

const MAX_PATH_LEN: usize = 240;

/// Derive the safe, collision-aware filename (SPEC_FULL.md §4.7, §8 boundary
/// behaviors): `stem + '_' + 8-hex-of-md5(salt) + ext`, trimmed so the *total
/// path* fits `MAX_PATH_LEN`, then deduped with a `_1`, `_2`, ... suffix against
/// what already exists on disk.
#[must_use]
pub fn derive_filename(
    url: &str,
    content_type: &str,
    content_disposition: Option<&str>,
    salt: &str,
) -> String {
    let stem = content_disposition
        .and_then(filename_from_content_disposition)
        .map(|name| {
            std::path::Path::new(&name)
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("index")
                .to_string()
        })
        .unwrap_or_else(|| stem_from_url(url));

    let ext = content_disposition
        .and_then(filename_from_content_disposition)
        .and_then(|name| {
            std::path::Path::new(&name)
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| format!(".{e}"))
        })
        .unwrap_or_else(|| extension_from_content_type(content_type));

    let hash = format!("{:x}", md5::compute(format!("{salt}{url}")));
    let hash_suffix = &hash[..8];

    let mut stem = sanitize_filename::sanitize(stem);
    if stem.is_empty() {
        stem = "index".to_string();
    }

    let fixed_len = 1 + hash_suffix.len() + ext.len();
    let max_stem_len = MAX_PATH_LEN.saturating_sub(fixed_len);
    let stem = crate::utils::string_utils::safe_truncate_chars(&stem, max_stem_len.max(1));

    format!("{stem}_{hash_suffix}{ext}")
}

/// Append `_1`, `_2`, ... until `dir/filename` does not already exist on disk
/// (SPEC_FULL.md §8 boundary behavior, invariant I2/I4).
pub fn dedup_path(dir: &Path, filename: &str) -> PathBuf {
    let candidate = dir.join(filename);
    if !candidate.exists() {
        return candidate;
    }
    let (stem, ext) = match filename.rsplit_once('.') {
        Some((s, e)) => (s.to_string(), format!(".{e}")),
        None => (filename.to_string(), String::new()),
    };
    for n in 1.. {
        let candidate = dir.join(format!("{stem}_{n}{ext}"));
        if !candidate.exists() {
            return candidate;
        }
    }
    unreachable!("infinite suffix search space")
}

/// Root directory by classification (SPEC_FULL.md §4.7): downloads always go to
/// `<out>/downloads` regardless of their CDP resource type.
#[must_use]
pub fn target_dir(out_dir: &Path, kind: ResourceKind, is_download: bool) -> PathBuf {
    if is_download {
        out_dir.join("downloads")
    } else {
        out_dir.join(kind.type_dir())
    }
}

/// Seen-URL tracking helper used by `onRequest` (SPEC_FULL.md §4.7 "Main mode").
#[must_use]
pub fn should_track(seen: &HashSet<String>, url: &str) -> bool {
    !seen.contains(url)
}

pub use download::ChromiumDownloadInterceptor;

pub async fn save_stream_to_file(path: &Path, bytes: &[u8]) -> GateCaptureResult<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, bytes).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn download_detection_honors_content_disposition() {
        assert!(looks_like_download("text/html", Some("attachment; filename=report.html")));
        assert!(looks_like_download("application/pdf", None));
        assert!(!looks_like_download("text/html", None));
    }

    #[test]
    fn rfc5987_filename_star_decodes_percent_encoding() {
        let cd = "attachment; filename*=UTF-8''na%C3%AFve%20file.pdf";
        let name = filename_from_content_disposition(cd).expect("decoded name");
        assert!(!name.contains('%'));
        assert!(!name.contains('/'));
    }

    #[test]
    fn derived_filename_has_no_path_separators_and_fits_budget() {
        let long_url = format!("https://example.com/{}", "a".repeat(500));
        let name = derive_filename(&long_url, "image/png", None, "salt");
        assert!(name.len() <= MAX_PATH_LEN);
        assert!(!name.contains('/'));
        assert!(!name.contains(".."));
        assert!(name.ends_with(".png"));
    }

    #[test]
    fn dedup_path_increments_suffix() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("a.txt"), b"1").expect("write");
        std::fs::write(dir.path().join("a_1.txt"), b"1").expect("write");
        let path = dedup_path(dir.path(), "a.txt");
        assert_eq!(path.file_name().and_then(|f| f.to_str()), Some("a_2.txt"));
    }
}
