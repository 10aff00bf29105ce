// ── Core error types ──
//
// User-facing errors from sitectl-core. Consumers never see HTTP status
// codes or JSON parse failures directly; `From<sitectl_api::Error>`
// translates transport-layer errors into domain variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to server at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    // ── Lookup errors ────────────────────────────────────────────────
    #[error("{entity_type} {identifier} does not exist")]
    NotFound {
        entity_type: String,
        identifier: String,
    },

    #[error("{entity_type} {identifier} already exists")]
    AlreadyExists {
        entity_type: String,
        identifier: String,
    },

    // ── Precondition errors ──────────────────────────────────────────
    /// The remote entity is in a state that forbids the request.
    #[error("{message}")]
    InvalidState { message: String },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    #[error("Invalid site access code: {0}")]
    InvalidAccessCode(u32),

    #[error("Invalid site access combination: {0}")]
    InvalidAccessSet(String),

    // ── Asynchronous work ────────────────────────────────────────────
    #[error("No user session after {attempts} attempts")]
    SessionTimeout { attempts: u32 },

    #[error("Job {job_id} failed: {message}")]
    JobFailed { job_id: String, message: String },

    #[error("Job {job_id} still running after {attempts} status checks")]
    JobTimeout { job_id: String, attempts: u32 },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    #[error("Operation not supported: {operation} ({reason})")]
    Unsupported { operation: String, reason: String },

    // ── Local errors ─────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn not_found(entity_type: &str, identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: entity_type.into(),
            identifier: identifier.into(),
        }
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationFailed {
            message: message.into(),
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<sitectl_api::Error> for CoreError {
    fn from(err: sitectl_api::Error) -> Self {
        match err {
            sitectl_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            sitectl_api::Error::Transport(ref e) => {
                if e.is_connect() || e.is_timeout() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            sitectl_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            sitectl_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            sitectl_api::Error::Io(e) => CoreError::Io(e),
            sitectl_api::Error::Idc { service, message } => CoreError::Api {
                message: format!("{service}: {message}"),
                status: None,
            },
            sitectl_api::Error::ImportConflicts(conflicts) => CoreError::ValidationFailed {
                message: format!("template import stopped on {} conflict(s)", conflicts.len()),
            },
            sitectl_api::Error::Rest { status, message } => CoreError::Api {
                message,
                status: Some(status),
            },
            sitectl_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
            sitectl_api::Error::SessionTimeout { attempts } => {
                CoreError::SessionTimeout { attempts }
            }
            sitectl_api::Error::JobFailed { job_id, message } => {
                CoreError::JobFailed { job_id, message }
            }
            sitectl_api::Error::JobTimeout { job_id, attempts } => {
                CoreError::JobTimeout { job_id, attempts }
            }
            sitectl_api::Error::Relay(reason) => CoreError::ConnectionFailed {
                url: "local relay".into(),
                reason,
            },
            sitectl_api::Error::UnsupportedService(service) => CoreError::Unsupported {
                operation: service,
                reason: "not forwarded by the relay".into(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_reads_like_a_sentence() {
        let err = CoreError::not_found("repository", "Marketing");
        assert_eq!(err.to_string(), "repository Marketing does not exist");
    }

    #[test]
    fn job_errors_keep_their_kind() {
        let err: CoreError = sitectl_api::Error::JobTimeout {
            job_id: "J1".into(),
            attempts: 3,
        }
        .into();
        assert!(matches!(err, CoreError::JobTimeout { attempts: 3, .. }));

        let err: CoreError = sitectl_api::Error::Rest {
            status: 409,
            message: "busy".into(),
        }
        .into();
        assert!(matches!(err, CoreError::Api { status: Some(409), .. }));
    }
}
