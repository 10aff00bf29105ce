use reqwest::RequestBuilder;
use reqwest::header::{COOKIE, HeaderValue};
use secrecy::{ExposeSecret, SecretString};

/// Credentials for authenticating against a content server.
///
/// Each variant carries the secret material needed for its auth flow.
#[derive(Debug, Clone)]
pub enum Credentials {
    /// HTTP basic auth (development and internal pods).
    Basic {
        username: String,
        password: SecretString,
    },
    /// OAuth bearer token (`pod_ec` tenants).
    Bearer { token: SecretString },
}

impl Credentials {
    /// The login name, when the credentials carry one.
    pub fn username(&self) -> Option<&str> {
        match self {
            Self::Basic { username, .. } => Some(username),
            Self::Bearer { .. } => None,
        }
    }

    /// Apply these credentials to an outgoing request.
    pub fn apply(&self, builder: RequestBuilder) -> RequestBuilder {
        match self {
            Self::Basic { username, password } => {
                builder.basic_auth(username, Some(password.expose_secret()))
            }
            Self::Bearer { token } => builder.bearer_auth(token.expose_secret()),
        }
    }
}

/// Everything needed to authenticate one request to a server:
/// credentials plus the optional session cookie obtained at login.
#[derive(Debug, Clone)]
pub struct ServerAuth {
    pub credentials: Credentials,
    pub session_cookie: Option<SecretString>,
}

impl ServerAuth {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            session_cookie: None,
        }
    }

    pub fn with_cookie(mut self, cookie: SecretString) -> Self {
        self.session_cookie = Some(cookie);
        self
    }

    /// Apply credentials and the session cookie to an outgoing request.
    pub fn apply(&self, builder: RequestBuilder) -> RequestBuilder {
        let builder = self.credentials.apply(builder);
        match self.cookie_header() {
            Some(value) => builder.header(COOKIE, value),
            None => builder,
        }
    }

    fn cookie_header(&self) -> Option<HeaderValue> {
        let cookie = self.session_cookie.as_ref()?;
        let mut value = HeaderValue::from_str(cookie.expose_secret()).ok()?;
        value.set_sensitive(true);
        Some(value)
    }
}
