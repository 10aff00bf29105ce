//! Server profiles for sitectl.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext), and
//! translation to `sitectl_core::ServerConnection`. The CLI layers its
//! global flags on top.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use sitectl_core::{
    AuthCredentials, PollConfig, PollSettings, ServerConnection, ServerEnv, ServerMode,
    TlsVerification,
};

const KEYRING_SERVICE: &str = "sitectl";
const REDACTED: &str = "********";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("server '{name}' is not configured")]
    UnknownServer { name: String },

    #[error("no server given and no default server configured")]
    NoServer,

    #[error("no credentials configured for server '{server}'")]
    NoCredentials { server: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level `config.toml`.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    /// Server used when none is named on the command line.
    pub default_server: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named server profiles.
    #[serde(default)]
    pub servers: BTreeMap<String, ServerProfile>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default)]
    pub insecure: bool,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_poll_max_attempts")]
    pub poll_max_attempts: u32,

    #[serde(default = "default_session_interval_ms")]
    pub session_interval_ms: u64,

    #[serde(default = "default_session_max_attempts")]
    pub session_max_attempts: u32,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            insecure: false,
            poll_interval_ms: default_poll_interval_ms(),
            poll_max_attempts: default_poll_max_attempts(),
            session_interval_ms: default_session_interval_ms(),
            session_max_attempts: default_session_max_attempts(),
        }
    }
}

fn default_timeout() -> u64 {
    60
}
fn default_poll_interval_ms() -> u64 {
    6_000
}
fn default_poll_max_attempts() -> u32 {
    600
}
fn default_session_interval_ms() -> u64 {
    5_000
}
fn default_session_max_attempts() -> u32 {
    60
}

/// A named server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerProfile {
    /// Base URL, e.g. "https://tenant.example.com".
    pub url: String,

    /// Deployment tag: "pod_ec", "pod_ic" or "dev_ec".
    #[serde(default = "default_env")]
    pub env: String,

    /// Surface for mutating calls: "idc" or "rest".
    #[serde(default = "default_mode")]
    pub mode: String,

    pub username: Option<String>,

    /// Plaintext password (prefer keyring or env var).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Environment variable holding the password.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_env: Option<String>,

    /// Plaintext bearer token (prefer keyring or env var).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_env: Option<String>,

    /// Custom CA certificate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ca_cert: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub insecure: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

fn default_env() -> String {
    "pod_ec".into()
}
fn default_mode() -> String {
    "idc".into()
}

impl ServerProfile {
    /// A profile for `url` with everything else defaulted.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            env: default_env(),
            mode: default_mode(),
            username: None,
            password: None,
            password_env: None,
            token: None,
            token_env: None,
            ca_cert: None,
            insecure: None,
            timeout: None,
        }
    }

    /// A copy safe to print: plaintext secrets are masked.
    pub fn redacted(&self) -> Self {
        Self {
            password: self.password.as_ref().map(|_| REDACTED.into()),
            token: self.token.as_ref().map(|_| REDACTED.into()),
            ..self.clone()
        }
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "sitectl", "sitectl").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("sitectl");
    p
}

// ── Loading and saving ──────────────────────────────────────────────

/// Load the config from the canonical path and the environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load `path` merged over the defaults, then `SITECTL_` variables
/// (`SITECTL_DEFAULTS__TIMEOUT=120`). A missing file is not an error.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("SITECTL_").split("__"));
    Ok(figment.extract()?)
}

pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, toml::to_string_pretty(cfg)?)?;
    Ok(())
}

// ── Server selection ────────────────────────────────────────────────

impl Config {
    /// The named server, or the default one when `name` is `None`.
    pub fn server(&self, name: Option<&str>) -> Result<(&str, &ServerProfile), ConfigError> {
        let name = name
            .or(self.default_server.as_deref())
            .ok_or(ConfigError::NoServer)?;
        self.servers
            .get_key_value(name)
            .map(|(k, v)| (k.as_str(), v))
            .ok_or_else(|| ConfigError::UnknownServer { name: name.into() })
    }
}

// ── Credential resolution ───────────────────────────────────────────

/// `env_var` → keyring `<server>/<kind>` → plaintext.
fn resolve_secret(
    env_var: Option<&str>,
    server: &str,
    kind: &str,
    plaintext: Option<&str>,
) -> Option<SecretString> {
    if let Some(val) = env_var.and_then(|name| std::env::var(name).ok()) {
        return Some(SecretString::from(val));
    }
    let stored = keyring::Entry::new(KEYRING_SERVICE, &format!("{server}/{kind}"))
        .and_then(|entry| entry.get_password());
    if let Ok(secret) = stored {
        return Some(SecretString::from(secret));
    }
    plaintext.map(|p| SecretString::from(p.to_owned()))
}

/// A token if one is configured, otherwise username and password.
pub fn resolve_auth(profile: &ServerProfile, server: &str) -> Result<AuthCredentials, ConfigError> {
    let token_configured = profile.token.is_some() || profile.token_env.is_some();
    if token_configured || profile.username.is_none() {
        if let Some(token) = resolve_secret(
            profile.token_env.as_deref(),
            server,
            "token",
            profile.token.as_deref(),
        ) {
            return Ok(AuthCredentials::Bearer(token));
        }
    }

    let no_credentials = || ConfigError::NoCredentials {
        server: server.into(),
    };
    let username = profile.username.clone().ok_or_else(no_credentials)?;
    let password = resolve_secret(
        profile.password_env.as_deref(),
        server,
        "password",
        profile.password.as_deref(),
    )
    .ok_or_else(no_credentials)?;
    Ok(AuthCredentials::Basic { username, password })
}

/// Store a secret in the system keyring under `<server>/<kind>`.
pub fn store_secret(server: &str, kind: &str, secret: &str) -> Result<(), ConfigError> {
    keyring::Entry::new(KEYRING_SERVICE, &format!("{server}/{kind}"))
        .and_then(|entry| entry.set_password(secret))
        .map_err(|e| ConfigError::Validation {
            field: "keyring".into(),
            reason: e.to_string(),
        })
}

// ── Translation ─────────────────────────────────────────────────────

/// Check the profile fields that do not need credentials.
pub fn check_profile(profile: &ServerProfile) -> Result<(Url, ServerEnv, ServerMode), ConfigError> {
    let url = Url::parse(&profile.url).map_err(|_| ConfigError::Validation {
        field: "url".into(),
        reason: format!("invalid URL: {}", profile.url),
    })?;
    let env = ServerEnv::from_str(&profile.env).map_err(|_| ConfigError::Validation {
        field: "env".into(),
        reason: format!(
            "expected 'pod_ec', 'pod_ic' or 'dev_ec', got '{}'",
            profile.env
        ),
    })?;
    let mode = ServerMode::from_str(&profile.mode).map_err(|_| ConfigError::Validation {
        field: "mode".into(),
        reason: format!("expected 'idc' or 'rest', got '{}'", profile.mode),
    })?;
    Ok((url, env, mode))
}

/// Build a `ServerConnection` from a profile and the global defaults.
pub fn profile_to_connection(
    profile: &ServerProfile,
    server: &str,
    defaults: &Defaults,
) -> Result<ServerConnection, ConfigError> {
    let (url, env, mode) = check_profile(profile)?;
    let auth = resolve_auth(profile, server)?;

    let mut conn = ServerConnection::new(server, url, auth)
        .with_env(env)
        .with_mode(mode)
        .with_poll(poll_settings(defaults));
    conn.tls = if profile.insecure.unwrap_or(defaults.insecure) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ca_path) = &profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };
    conn.timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));
    Ok(conn)
}

/// Resolve a server name (or the default server) into a validated
/// connection.
pub fn validate(cfg: &Config, name: Option<&str>) -> Result<ServerConnection, ConfigError> {
    let (name, profile) = cfg.server(name)?;
    profile_to_connection(profile, name, &cfg.defaults)
}

pub fn poll_settings(defaults: &Defaults) -> PollSettings {
    PollSettings {
        session: PollConfig::new(
            Duration::from_millis(defaults.session_interval_ms),
            defaults.session_max_attempts,
        ),
        job: PollConfig::new(
            Duration::from_millis(defaults.poll_interval_ms),
            defaults.poll_max_attempts,
        ),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;

    const SAMPLE: &str = r#"
default_server = "dev"

[defaults]
timeout = 90
poll_interval_ms = 250

[servers.dev]
url = "https://dev.example.com"
env = "dev_ec"
mode = "rest"
username = "admin"
password = "welcome1"

[servers.legacy]
url = "https://ic.example.com"
env = "pod_ic"
token = "abc"
"#;

    fn load(contents: &str) -> (TempDir, Config) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, contents).unwrap();
        let cfg = load_config_from(&path).unwrap();
        (dir, cfg)
    }

    #[test]
    fn file_values_override_defaults() {
        let (_dir, cfg) = load(SAMPLE);
        assert_eq!(cfg.defaults.timeout, 90);
        assert_eq!(cfg.defaults.poll_interval_ms, 250);
        assert_eq!(cfg.defaults.poll_max_attempts, 600);
        assert_eq!(cfg.servers.len(), 2);
        assert_eq!(cfg.servers["legacy"].mode, "idc");
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let cfg = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert!(cfg.servers.is_empty());
        assert_eq!(cfg.defaults.session_max_attempts, 60);
    }

    #[test]
    fn server_falls_back_to_default() {
        let (_dir, cfg) = load(SAMPLE);
        assert_eq!(cfg.server(None).unwrap().0, "dev");
        assert_eq!(cfg.server(Some("legacy")).unwrap().0, "legacy");
        assert!(matches!(
            cfg.server(Some("prod")),
            Err(ConfigError::UnknownServer { .. })
        ));
        assert!(matches!(
            Config::default().server(None),
            Err(ConfigError::NoServer)
        ));
    }

    #[test]
    fn profile_becomes_a_connection() {
        let (_dir, cfg) = load(SAMPLE);
        let (name, profile) = cfg.server(None).unwrap();
        let conn = profile_to_connection(profile, name, &cfg.defaults).unwrap();
        assert_eq!(conn.name, "dev");
        assert_eq!(conn.env, ServerEnv::DevEc);
        assert_eq!(conn.mode, ServerMode::Rest);
        assert_eq!(conn.timeout, Duration::from_secs(90));
        assert_eq!(conn.poll.job.interval, Duration::from_millis(250));
        assert_eq!(conn.tls, TlsVerification::SystemDefaults);
        assert!(matches!(conn.auth, AuthCredentials::Basic { ref username, .. } if username == "admin"));
    }

    #[test]
    fn validate_resolves_the_default_server() {
        let (_dir, cfg) = load(SAMPLE);
        assert_eq!(validate(&cfg, None).unwrap().name, "dev");
        assert!(matches!(
            validate(&cfg, Some("prod")),
            Err(ConfigError::UnknownServer { .. })
        ));
    }

    #[test]
    fn token_profile_uses_bearer_auth() {
        let (_dir, cfg) = load(SAMPLE);
        let profile = &cfg.servers["legacy"];
        assert!(matches!(
            resolve_auth(profile, "legacy").unwrap(),
            AuthCredentials::Bearer(_)
        ));
    }

    #[test]
    fn bad_fields_are_rejected_before_credentials() {
        let mut profile = ServerProfile::new("not a url");
        let err = check_profile(&profile).unwrap_err();
        assert_eq!(err.to_string(), "invalid url: invalid URL: not a url");

        profile.url = "https://ok.example.com".into();
        profile.env = "moon".into();
        assert!(matches!(
            check_profile(&profile),
            Err(ConfigError::Validation { ref field, .. }) if field == "env"
        ));

        profile.env = "pod_ic".into();
        profile.mode = "soap".into();
        assert!(matches!(
            check_profile(&profile),
            Err(ConfigError::Validation { ref field, .. }) if field == "mode"
        ));
    }

    #[test]
    fn redaction_masks_plaintext_secrets() {
        let mut profile = ServerProfile::new("https://dev.example.com");
        profile.password = Some("welcome1".into());
        profile.password_env = Some("DEV_PASSWORD".into());
        let shown = profile.redacted();
        assert_eq!(shown.password.as_deref(), Some(REDACTED));
        assert_eq!(shown.password_env.as_deref(), Some("DEV_PASSWORD"));
        assert!(shown.token.is_none());
    }

    #[test]
    fn saved_config_loads_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let cfg = Config {
            default_server: Some("dev".into()),
            defaults: Defaults::default(),
            servers: BTreeMap::from([(
                "dev".to_owned(),
                ServerProfile::new("https://dev.example.com"),
            )]),
        };
        save_config_to(&cfg, &path).unwrap();

        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded.default_server.as_deref(), Some("dev"));
        assert_eq!(loaded.servers["dev"].url, "https://dev.example.com");
        assert_eq!(loaded.servers["dev"].env, "pod_ec");
    }
}
