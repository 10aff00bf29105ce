// sitectl-api: Async Rust client for the content service (IDC + REST),
// with the local relay and the background job poller.

pub mod auth;
pub mod error;
pub mod idc;
pub mod poller;
pub mod relay;
pub mod rest;
pub mod transport;

pub use auth::{Credentials, ServerAuth};
pub use error::Error;
pub use idc::IdcClient;
pub use poller::{JobOutcome, JobPoller, JobState, PollConfig, Submission};
pub use relay::{RelayServer, RelayUpstream};
pub use rest::RestClient;
pub use transport::{TlsMode, TransportConfig};
