use thiserror::Error;

use crate::idc::ImportConflict;

/// Top-level error type for the `sitectl-api` crate.
///
/// Covers every failure mode across both remote surfaces (legacy IDC
/// services and the REST APIs), the local relay, and the job poller.
/// `sitectl-core` maps these into user-facing diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// The server rejected the supplied credentials.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS handshake or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    /// Local I/O failure (reading an upload, writing a download).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // ── IDC services ────────────────────────────────────────────────
    /// An IDC service answered with a non-`"0"` `StatusCode`.
    #[error("{service} failed: {message}")]
    Idc { service: String, message: String },

    /// Template import stopped on conflicts the server would not resolve.
    #[error("Template import failed with {} conflict(s)", .0.len())]
    ImportConflicts(Vec<ImportConflict>),

    // ── REST ────────────────────────────────────────────────────────
    /// Structured error from a REST endpoint.
    #[error("REST API error (HTTP {status}): {message}")]
    Rest { status: u16, message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    // ── Session & jobs ──────────────────────────────────────────────
    /// The tenant config never produced a signed-in user and token.
    #[error("No user session after {attempts} attempts")]
    SessionTimeout { attempts: u32 },

    /// A background job reported failure.
    #[error("Job {job_id} failed: {message}")]
    JobFailed { job_id: String, message: String },

    /// A background job was still running when the poll budget ran out.
    #[error("Job {job_id} did not finish after {attempts} status checks")]
    JobTimeout { job_id: String, attempts: u32 },

    // ── Relay ───────────────────────────────────────────────────────
    /// The local relay could not start or forward a request.
    #[error("Relay error: {0}")]
    Relay(String),

    /// A POST named an IDC service outside the relay whitelist.
    #[error("Unsupported IDC service: {0}")]
    UnsupportedService(String),
}

impl Error {
    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            Self::Rest { status: 404, .. } => true,
            _ => false,
        }
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Rest { status, .. } => matches!(status, 502..=504),
            _ => false,
        }
    }

    /// Returns `true` if a poll budget or request deadline was exhausted.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout(),
            Self::SessionTimeout { .. } | Self::JobTimeout { .. } => true,
            _ => false,
        }
    }
}
