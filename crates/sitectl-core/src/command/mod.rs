// ── Command API ──
//
// Every site operation is a `Command` variant. `SiteController::execute`
// routes each one to its orchestrator, which runs its steps in order and
// stops at the first failure.

pub mod requests;

mod control;
mod create;
mod migrate;
mod prerender;
mod security;
mod share;
mod static_files;
mod transfer;
mod validate;

use std::path::PathBuf;

use serde::Serialize;

use sitectl_api::rest::types::RestSite;
use sitectl_api::{JobPoller, RestClient, Submission};

use crate::collab::Reporter;
use crate::error::CoreError;
use crate::model::SiteAction;

pub use requests::{
    CreateSiteRequest, MigrateSiteRequest, ShareRole, ShareSiteRequest, SiteSecurityRequest,
    StaticDownloadRequest, TransferSiteRequest, UnshareSiteRequest,
};
pub use security::SecuritySummary;
pub use validate::{AssetValidation, PageReport, ValidationReport};

pub(crate) use control::control_site;
pub(crate) use create::create_site;
pub(crate) use migrate::migrate_site;
pub(crate) use prerender::refresh_prerender_cache;
pub(crate) use security::set_site_security;
pub(crate) use share::{share_site, unshare_site};
pub(crate) use static_files::{delete_static, download_static, upload_static};
pub(crate) use transfer::transfer_site;
pub(crate) use validate::validate_site;

/// All operations against a content server.
#[derive(Debug, Clone)]
pub enum Command {
    // ── Lifecycle ────────────────────────────────────────────────────
    CreateSite(CreateSiteRequest),
    TransferSite(TransferSiteRequest),
    MigrateSite(MigrateSiteRequest),
    ControlSite { site: String, action: SiteAction },

    // ── Access ───────────────────────────────────────────────────────
    ShareSite(ShareSiteRequest),
    UnshareSite(UnshareSiteRequest),
    SetSiteSecurity(SiteSecurityRequest),

    // ── Inspection ───────────────────────────────────────────────────
    ValidateSite { site: String },
    RefreshPrerenderCache { site: String },

    // ── Static files ─────────────────────────────────────────────────
    UploadStaticFiles { site: String, folder: PathBuf },
    DownloadStaticFiles(StaticDownloadRequest),
    DeleteStaticFiles { site: String },
}

/// What a command hands back besides its progress lines.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CommandResult {
    Ok,
    /// Per-principal share or unshare outcome.
    Shared { succeeded: usize, failed: usize },
    Validation(ValidationReport),
    Security(SecuritySummary),
    /// Static files written to this folder.
    Downloaded { folder: PathBuf },
    /// Job started by a fire-and-report call.
    Job { job_id: Option<String> },
}

// ── Shared steps ─────────────────────────────────────────────────────

/// Wait for a REST submission to finish, reporting progress.
pub(crate) async fn await_submission(
    rest: &RestClient,
    submission: Submission,
    reporter: &dyn Reporter,
) -> Result<(), CoreError> {
    if let Some(job_id) = submission.job_id {
        JobPoller::new(rest.poll_config())
            .await_job(rest, &job_id, |state| reporter.job(state))
            .await?;
    }
    Ok(())
}

/// Look a site up over REST and report it, or fail with "site X does not
/// exist".
pub(crate) async fn verify_site(
    rest: &RestClient,
    name: &str,
    expand: &[&str],
    reporter: &dyn Reporter,
) -> Result<RestSite, CoreError> {
    let site = rest
        .get_site(name, expand)
        .await?
        .ok_or_else(|| CoreError::not_found("site", name))?;
    reporter.step("verify site");
    Ok(site)
}

/// `   <label padded to 20> <value>`
pub(crate) fn field_line(label: &str, value: &str) -> String {
    format!("   {label:<20} {value}")
}
