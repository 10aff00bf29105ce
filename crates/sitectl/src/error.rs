//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and a process exit code.

use miette::Diagnostic;
use thiserror::Error;

use sitectl_config::ConfigError;
use sitectl_core::CoreError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    pub const PRECONDITION: i32 = 9;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to {url}")]
    #[diagnostic(
        code(sitectl::connection_failed),
        help(
            "{reason}\n\
             Check the server URL, or use --insecure (-k) for self-signed certificates."
        )
    )]
    ConnectionFailed { url: String, reason: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(sitectl::auth_failed),
        help("Verify the credentials, or store new ones with: sitectl config set-secret <server>")
    )]
    AuthFailed { message: String },

    #[error("No credentials configured for server '{server}'")]
    #[diagnostic(
        code(sitectl::no_credentials),
        help(
            "Set password_env or token_env in the server entry,\n\
             or run: sitectl config set-secret {server}"
        )
    )]
    NoCredentials { server: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{message}")]
    #[diagnostic(code(sitectl::not_found))]
    NotFound { message: String },

    #[error("{message}")]
    #[diagnostic(code(sitectl::conflict))]
    Conflict { message: String },

    #[error("{message}")]
    #[diagnostic(code(sitectl::precondition))]
    Precondition { message: String },

    // ── Remote work ──────────────────────────────────────────────────
    #[error("{message}")]
    #[diagnostic(
        code(sitectl::timeout),
        help("Raise poll_max_attempts or session_max_attempts under [defaults] in the config file.")
    )]
    Timeout { message: String },

    #[error("{message}")]
    #[diagnostic(code(sitectl::remote))]
    Remote { message: String },

    #[error("Operation '{operation}' is not supported")]
    #[diagnostic(code(sitectl::unsupported), help("{reason}"))]
    Unsupported { operation: String, reason: String },

    // ── Input ────────────────────────────────────────────────────────
    #[error("Invalid {field}: {reason}")]
    #[diagnostic(code(sitectl::validation))]
    Validation { field: String, reason: String },

    #[error("Server '{name}' not found in configuration")]
    #[diagnostic(
        code(sitectl::server_not_found),
        help(
            "Available servers: {available}\n\
             Add one with: sitectl config add <name> --url <url>"
        )
    )]
    ServerNotFound { name: String, available: String },

    #[error("No server selected")]
    #[diagnostic(
        code(sitectl::no_server),
        help(
            "Pass --server, set SITECTL_SERVER, or set default_server in {path}"
        )
    )]
    NoServer { path: String },

    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(sitectl::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── Local ────────────────────────────────────────────────────────
    #[error("Configuration error: {0}")]
    #[diagnostic(code(sitectl::config))]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Could not render output: {0}")]
    Render(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::NotFound { .. } | Self::ServerNotFound { .. } => exit_code::NOT_FOUND,
            Self::Conflict { .. } => exit_code::CONFLICT,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Precondition { .. } => exit_code::PRECONDITION,
            Self::Validation { .. }
            | Self::NoServer { .. }
            | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        let message = err.to_string();
        match err {
            CoreError::ConnectionFailed { url, reason } => Self::ConnectionFailed { url, reason },
            CoreError::AuthenticationFailed { message } => Self::AuthFailed { message },
            CoreError::NotFound { .. } => Self::NotFound { message },
            CoreError::AlreadyExists { .. } => Self::Conflict { message },
            CoreError::InvalidState { message } => Self::Precondition { message },
            CoreError::ValidationFailed { message } => Self::Validation {
                field: "request".into(),
                reason: message,
            },
            CoreError::InvalidAccessCode(_) | CoreError::InvalidAccessSet(_) => Self::Validation {
                field: "access".into(),
                reason: message,
            },
            CoreError::SessionTimeout { .. } | CoreError::JobTimeout { .. } => {
                Self::Timeout { message }
            }
            CoreError::JobFailed { .. } | CoreError::Api { .. } | CoreError::Internal(_) => {
                Self::Remote { message }
            }
            CoreError::Unsupported { operation, reason } => Self::Unsupported { operation, reason },
            CoreError::Config { message } => Self::Config(message),
            CoreError::Io(e) => Self::Io(e),
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            ConfigError::UnknownServer { name } => Self::ServerNotFound {
                name,
                available: String::new(),
            },
            ConfigError::NoServer => Self::NoServer {
                path: sitectl_config::config_path().display().to_string(),
            },
            ConfigError::NoCredentials { server } => Self::NoCredentials { server },
            ConfigError::Io(e) => Self::Io(e),
            other => Self::Config(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_keep_their_message_and_code() {
        let err = CliError::from(CoreError::invalid_state("site blog is already online"));
        assert_eq!(err.exit_code(), exit_code::PRECONDITION);
        assert_eq!(err.to_string(), "site blog is already online");

        let err = CliError::from(CoreError::not_found("site", "blog"));
        assert_eq!(err.exit_code(), exit_code::NOT_FOUND);
        assert_eq!(err.to_string(), "site blog does not exist");

        let err = CliError::from(CoreError::JobTimeout {
            job_id: "j1".into(),
            attempts: 3,
        });
        assert_eq!(err.exit_code(), exit_code::TIMEOUT);
    }

    #[test]
    fn config_errors_map_to_usage_and_auth() {
        assert_eq!(CliError::from(ConfigError::NoServer).exit_code(), exit_code::USAGE);
        let err = CliError::from(ConfigError::NoCredentials {
            server: "dev".into(),
        });
        assert_eq!(err.exit_code(), exit_code::AUTH);
    }
}
