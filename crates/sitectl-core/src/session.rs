// ── Relay-scoped sessions ──
//
// Legacy IDC commands run inside `with_relay`: start a relay for the
// command's server, establish the user session through it, run the
// pipeline, and shut the relay down on every exit path.

use std::future::Future;

use tracing::{debug, info};

use sitectl_api::idc::{IdcOperation, RepositoryPrefix, SessionToken};
use sitectl_api::{IdcClient, JobOutcome, JobPoller, RelayServer};

use crate::collab::Reporter;
use crate::config::ServerConnection;
use crate::error::CoreError;

/// The relay-backed IDC client and signed-in session of one command.
pub struct RelaySession<'a> {
    pub idc: IdcClient,
    pub session: SessionToken,
    poller: JobPoller,
    reporter: &'a dyn Reporter,
}

impl RelaySession<'_> {
    /// Submit a mutating service and wait for its job. Progress goes to
    /// the reporter; import conflicts are listed one per line.
    pub async fn run(&self, op: &IdcOperation) -> Result<JobOutcome, CoreError> {
        let reporter = self.reporter;
        let result = self
            .poller
            .submit_and_await(&self.idc, op, |state| reporter.job(state))
            .await;
        match result {
            Ok(outcome) => Ok(outcome),
            Err(sitectl_api::Error::ImportConflicts(conflicts)) => {
                for conflict in &conflicts {
                    reporter.info(&format!("   {conflict}"));
                }
                Err(sitectl_api::Error::ImportConflicts(conflicts).into())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Repository reference prefix for this server's version.
    pub fn repository_prefix(&self) -> RepositoryPrefix {
        RepositoryPrefix::for_version(self.session.product_version.as_deref())
    }
}

/// Run `f` with a relay-backed session for `conn`.
///
/// The relay is shut down exactly once whether `f` succeeds or fails, and
/// also when session establishment fails.
pub async fn with_relay<'r, T, F, Fut>(
    conn: &ServerConnection,
    reporter: &'r dyn Reporter,
    f: F,
) -> Result<T, CoreError>
where
    F: FnOnce(RelaySession<'r>) -> Fut,
    Fut: Future<Output = Result<T, CoreError>>,
{
    let relay = RelayServer::start(conn.relay_upstream()).await?;
    debug!(relay = %relay.base_url(), server = %conn.name, "relay started");

    let result = run_in_session(&relay, conn, reporter, f).await;

    relay.shutdown().await;
    debug!(server = %conn.name, "relay stopped");
    result
}

async fn run_in_session<'r, T, F, Fut>(
    relay: &RelayServer,
    conn: &ServerConnection,
    reporter: &'r dyn Reporter,
    f: F,
) -> Result<T, CoreError>
where
    F: FnOnce(RelaySession<'r>) -> Fut,
    Fut: Future<Output = Result<T, CoreError>>,
{
    let idc = relay.idc_client(&conn.transport())?;
    let session = idc.acquire_session(conn.poll.session).await?;
    info!(user = %session.user, server = %conn.name, "signed in");
    relay.set_token(session.token.clone()).await;

    f(RelaySession {
        idc,
        session,
        poller: JobPoller::new(conn.poll.job),
        reporter,
    })
    .await
}
