// User session establishment
//
// The relay forwards the tenant config with the caller's credentials. Once
// the server has a signed-in user it returns that user plus an anti-forgery
// `idcToken`, which every mutating service needs.

use secrecy::SecretString;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::error::Error;
use crate::idc::client::IdcClient;
use crate::idc::models::LocalData;
use crate::poller::PollConfig;

pub(crate) const TENANT_CONFIG_SERVICE: &str = "SCS_GET_TENANT_CONFIG";

const ANONYMOUS: &str = "anonymous";

/// The signed-in user and its anti-forgery token, valid for one command.
#[derive(Debug, Clone)]
pub struct SessionToken {
    pub user: String,
    pub token: SecretString,
    /// Server build as reported by the tenant config, if any.
    pub product_version: Option<String>,
}

impl SessionToken {
    fn from_local_data(data: &LocalData) -> Option<Self> {
        let user = data
            .user
            .as_deref()
            .filter(|u| !u.is_empty() && *u != ANONYMOUS)?;
        let token = data.idc_token.as_deref().filter(|t| !t.is_empty())?;
        Some(Self {
            user: user.to_owned(),
            token: SecretString::from(token.to_owned()),
            product_version: data.product_version.clone(),
        })
    }
}

impl IdcClient {
    /// `GET SCS_GET_TENANT_CONFIG` once.
    pub async fn tenant_config(&self) -> Result<LocalData, Error> {
        let resp = self.get_service(TENANT_CONFIG_SERVICE, &[]).await?;
        Ok(resp.local_data)
    }

    /// Poll the tenant config until it names a real user and a token.
    ///
    /// Rejected credentials end the loop at once; any other failure is
    /// retried until the budget is spent.
    pub async fn acquire_session(&self, poll: PollConfig) -> Result<SessionToken, Error> {
        let mut ticker = tokio::time::interval(poll.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        for attempt in 1..=poll.max_attempts {
            ticker.tick().await;
            match self.tenant_config().await {
                Ok(data) => {
                    if let Some(session) = SessionToken::from_local_data(&data) {
                        info!(user = %session.user, "established user session");
                        return Ok(session);
                    }
                    debug!(attempt, "no signed-in user yet");
                }
                Err(e @ Error::Authentication { .. }) => return Err(e),
                Err(e) => debug!(attempt, error = %e, "tenant config unavailable"),
            }
        }

        Err(Error::SessionTimeout {
            attempts: poll.max_attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(user: Option<&str>, token: Option<&str>) -> LocalData {
        LocalData {
            user: user.map(str::to_owned),
            idc_token: token.map(str::to_owned),
            ..LocalData::default()
        }
    }

    #[test]
    fn needs_real_user_and_token() {
        assert!(SessionToken::from_local_data(&data(Some("anonymous"), Some("t"))).is_none());
        assert!(SessionToken::from_local_data(&data(Some("alice"), None)).is_none());
        assert!(SessionToken::from_local_data(&data(Some("alice"), Some(""))).is_none());
        assert!(SessionToken::from_local_data(&data(None, Some("t"))).is_none());

        let session = SessionToken::from_local_data(&data(Some("alice"), Some("t"))).map(|s| s.user);
        assert_eq!(session.as_deref(), Some("alice"));
    }
}
