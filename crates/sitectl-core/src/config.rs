// ── Runtime connection configuration ──
//
// These types describe *how* to reach one content server. They carry
// credential data and connection tuning, but never touch disk. The CLI
// resolves a named server profile into a `ServerConnection` and hands it in.

use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use url::Url;

use sitectl_api::relay::RelayUpstream;
use sitectl_api::{Credentials, PollConfig, RestClient, ServerAuth, TlsMode, TransportConfig};

use crate::error::CoreError;

/// How to authenticate with a server.
#[derive(Debug, Clone)]
pub enum AuthCredentials {
    /// HTTP basic auth.
    Basic {
        username: String,
        password: SecretString,
    },
    /// OAuth bearer token.
    Bearer(SecretString),
}

/// Which remote surface mutating calls go through.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum ServerMode {
    /// Legacy IDC services through the local relay, polled by job id.
    #[default]
    Idc,
    /// Resource-oriented REST APIs, called directly.
    Rest,
}

/// Deployment tag of a server.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub enum ServerEnv {
    /// External tenant pod.
    #[default]
    PodEc,
    /// Internal-only pod. Valid as a migration source only.
    PodIc,
    /// Development server.
    DevEc,
}

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification (self-signed development pods).
    DangerAcceptInvalid,
}

/// Poll budgets for session establishment and background jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub session: PollConfig,
    pub job: PollConfig,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            session: PollConfig::session_default(),
            job: PollConfig::job_default(),
        }
    }
}

/// Everything needed to talk to one server for the duration of a command.
#[derive(Debug, Clone)]
pub struct ServerConnection {
    /// Profile name the connection was resolved from.
    pub name: String,
    pub url: Url,
    pub auth: AuthCredentials,
    pub env: ServerEnv,
    pub mode: ServerMode,
    /// Session cookie captured at login, sent with every request.
    pub session_cookie: Option<SecretString>,
    pub tls: TlsVerification,
    pub timeout: Duration,
    pub poll: PollSettings,
}

impl ServerConnection {
    /// A connection with default tuning.
    pub fn new(name: impl Into<String>, url: Url, auth: AuthCredentials) -> Self {
        Self {
            name: name.into(),
            url,
            auth,
            env: ServerEnv::default(),
            mode: ServerMode::default(),
            session_cookie: None,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(60),
            poll: PollSettings::default(),
        }
    }

    pub fn with_mode(mut self, mode: ServerMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_env(mut self, env: ServerEnv) -> Self {
        self.env = env;
        self
    }

    pub fn with_poll(mut self, poll: PollSettings) -> Self {
        self.poll = poll;
        self
    }

    pub fn uses_rest(&self) -> bool {
        self.mode == ServerMode::Rest
    }

    /// Build a [`TransportConfig`] from this connection.
    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            tls: match &self.tls {
                TlsVerification::SystemDefaults => TlsMode::System,
                TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
                TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
            },
            timeout: self.timeout,
        }
    }

    pub fn server_auth(&self) -> ServerAuth {
        let credentials = match &self.auth {
            AuthCredentials::Basic { username, password } => Credentials::Basic {
                username: username.clone(),
                password: password.clone(),
            },
            AuthCredentials::Bearer(token) => Credentials::Bearer {
                token: token.clone(),
            },
        };
        let auth = ServerAuth::new(credentials);
        match &self.session_cookie {
            Some(cookie) => auth.with_cookie(cookie.clone()),
            None => auth,
        }
    }

    /// A REST client for this server, polling jobs with the job budget.
    pub fn rest_client(&self) -> Result<RestClient, CoreError> {
        Ok(RestClient::new(self.url.clone(), self.server_auth(), &self.transport())?
            .with_poll(self.poll.job))
    }

    pub(crate) fn relay_upstream(&self) -> RelayUpstream {
        RelayUpstream {
            base_url: self.url.clone(),
            auth: self.server_auth(),
            transport: self.transport(),
        }
    }

    /// Two connections point at the same server when their URLs match
    /// after normalization.
    pub fn same_server(&self, other: &Self) -> bool {
        self.url.as_str().trim_end_matches('/') == other.url.as_str().trim_end_matches('/')
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::str::FromStr;

    use super::*;

    fn conn(url: &str) -> ServerConnection {
        ServerConnection::new(
            "dev",
            Url::parse(url).unwrap(),
            AuthCredentials::Bearer(SecretString::from("t".to_owned())),
        )
    }

    #[test]
    fn mode_and_env_parse_from_profile_strings() {
        assert_eq!(ServerMode::from_str("REST").unwrap(), ServerMode::Rest);
        assert_eq!(ServerEnv::from_str("pod_ic").unwrap(), ServerEnv::PodIc);
        assert!(ServerEnv::from_str("pod_xx").is_err());
    }

    #[test]
    fn same_server_ignores_trailing_slash() {
        assert!(conn("https://a.example.com").same_server(&conn("https://a.example.com/")));
        assert!(!conn("https://a.example.com").same_server(&conn("https://b.example.com")));
    }
}
