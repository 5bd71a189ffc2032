//! Error kinds for the gate-capture pipeline.
//!
//! Every fallible operation inside a session returns [`GateCaptureError`]. `anyhow`
//! is reserved for the CLI boundary, where additional context is layered on before
//! a failure is printed and the process exits.

use thiserror::Error;

/// Error kinds produced across configuration, session, gate, and capture boundaries.
#[derive(Debug, Error)]
pub enum GateCaptureError {
    /// Bad country code, language tag, proxy URI, or non-positive timeout. Fails
    /// fast at the CLI boundary; the core is never entered.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Browser launch or context creation failed. Fatal for the session.
    #[error("context launch failed: {0}")]
    ContextLaunch(String),

    /// Navigation aborted, typically because a download was intercepted mid-flight.
    /// Not fatal; the session continues to metadata flush.
    #[error("navigation aborted: {0}")]
    NavigationAborted(String),

    /// A TLS/certificate error during navigation. Retried once with TLS errors
    /// ignored before being treated as a real failure.
    #[error("tls error: {0}")]
    Tls(String),

    /// A response body could not be obtained through the driver. Recovered by the
    /// HTTP-replay fallback; surfaced only if the fallback also fails.
    #[error("response body unavailable: {0}")]
    BodyUnavailable(String),

    /// A JS template failed to render. The affected surface is left un-spoofed.
    #[error("template render failed for {template}: {reason}")]
    TemplateRender { template: String, reason: String },

    /// A gate's JS patch could not be installed as a context init script.
    #[error("patch install failed for {template}: {reason}")]
    PatchInstall { template: String, reason: String },

    /// A `Fetch` interception id referenced a request that no longer exists
    /// (the page navigated away). Never fatal.
    #[error("devtools interception id invalid: {0}")]
    DevToolsInterceptionIdInvalid(String),

    /// Cookie collection failed because the context already closed.
    #[error("cookie collection failed: {0}")]
    CookieCollection(String),

    /// The session's hard outer deadline elapsed.
    #[error("session timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// A download could not be saved via the driver's native download path.
    #[error("download save failed: {0}")]
    DownloadSave(String),

    /// Catch-all for I/O failures not covered by a more specific kind.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl GateCaptureError {
    #[must_use]
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }
}

pub type GateCaptureResult<T> = Result<T, GateCaptureError>;
