//! Server resolution for the CLI: config file + global flag overrides.

use std::time::Duration;

use sitectl_config::{Config, ConfigError};
use sitectl_core::{ServerConnection, TlsVerification};

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Resolve `name` (or the selected/default server) into a connection,
/// applying `--insecure` and `--timeout`.
pub fn resolve_server(
    cfg: &Config,
    name: Option<&str>,
    global: &GlobalOpts,
) -> Result<ServerConnection, CliError> {
    let mut conn = sitectl_config::validate(cfg, name.or(global.server.as_deref()))
        .map_err(|e| server_error(e, cfg))?;

    if global.insecure {
        conn.tls = TlsVerification::DangerAcceptInvalid;
    }
    if let Some(secs) = global.timeout {
        conn.timeout = Duration::from_secs(secs);
    }
    Ok(conn)
}

/// Attach the configured server names to an unknown-server error.
pub fn server_error(err: ConfigError, cfg: &Config) -> CliError {
    match err {
        ConfigError::UnknownServer { name } => CliError::ServerNotFound {
            name,
            available: available_servers(cfg),
        },
        other => other.into(),
    }
}

pub fn available_servers(cfg: &Config) -> String {
    if cfg.servers.is_empty() {
        "(none)".into()
    } else {
        cfg.servers.keys().cloned().collect::<Vec<_>>().join(", ")
    }
}
