//! Site lifecycle orchestration between `sitectl-api` and the CLI.
//!
//! This crate owns the business logic and domain model of the sitectl
//! workspace:
//!
//! - **[`SiteController`]** is the facade over one server connection.
//!   [`execute()`](SiteController::execute) routes a [`Command`] to its
//!   pipeline and returns a [`CommandResult`]. Progress lines go to a
//!   [`Reporter`].
//!
//! - **Relay sessions** ([`session`]). Legacy IDC pipelines run inside
//!   [`with_relay`], which starts the local relay, signs in through it and
//!   shuts it down on every exit path.
//!
//! - **Collaborators** ([`collab`]). Folder transfer, template packaging
//!   and site update sit behind traits so callers can swap them out.
//!
//! - **Domain model** ([`model`]). Site state and control actions, and the
//!   site access descriptor with its legacy code table.

pub mod collab;
pub mod command;
pub mod config;
pub mod controller;
pub mod error;
pub mod model;
pub mod principals;
pub mod session;
pub mod static_site;

// ── Primary re-exports ──────────────────────────────────────────────
pub use collab::{
    DocumentTransfer, MemoryReporter, Reporter, RestDocuments, RestTemplatePackager,
    SiteUpdater, TemplatePackager,
};
pub use command::requests::*;
pub use command::{Command, CommandResult, SecuritySummary, ValidationReport};
pub use config::{
    AuthCredentials, PollSettings, ServerConnection, ServerEnv, ServerMode, TlsVerification,
};
pub use controller::SiteController;
pub use error::CoreError;
pub use session::{RelaySession, with_relay};
pub use sitectl_api::{JobState, PollConfig};

pub use model::{
    AccessGroup, PublishStatus, RuntimeStatus, Site, SiteAccess, SiteAction, SiteStatus,
};
