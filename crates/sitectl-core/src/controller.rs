// ── Site controller ──
//
// Facade over one server connection. Owns the collaborators the
// orchestrators delegate to and routes each `Command` to its pipeline.
// Nothing is held between commands: every legacy pipeline starts and
// stops its own relay.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::collab::{
    DocumentTransfer, Reporter, RestDocuments, RestTemplatePackager, SiteUpdater,
    TemplatePackager,
};
use crate::command::{self, Command, CommandResult};
use crate::config::ServerConnection;
use crate::error::CoreError;

/// Runs site commands against one server.
pub struct SiteController {
    conn: ServerConnection,
    reporter: Arc<dyn Reporter>,
    documents: Option<Arc<dyn DocumentTransfer>>,
    packager: Arc<dyn TemplatePackager>,
    updater: Option<Arc<dyn SiteUpdater>>,
    project_dir: PathBuf,
    work_dir: PathBuf,
}

impl SiteController {
    pub fn new(conn: ServerConnection, reporter: Arc<dyn Reporter>) -> Self {
        Self {
            conn,
            reporter,
            documents: None,
            packager: Arc::new(RestTemplatePackager),
            updater: None,
            project_dir: PathBuf::from("."),
            work_dir: std::env::temp_dir().join("sitectl"),
        }
    }

    /// Use `documents` for static-file transfers instead of the documents
    /// REST API.
    pub fn with_documents(mut self, documents: Arc<dyn DocumentTransfer>) -> Self {
        self.documents = Some(documents);
        self
    }

    pub fn with_packager(mut self, packager: Arc<dyn TemplatePackager>) -> Self {
        self.packager = packager;
        self
    }

    pub fn with_updater(mut self, updater: Arc<dyn SiteUpdater>) -> Self {
        self.updater = Some(updater);
        self
    }

    /// Root of the local project (`src/sites/<site>/...`).
    pub fn with_project_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.project_dir = dir.into();
        self
    }

    /// Scratch space for template zips and staged uploads.
    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = dir.into();
        self
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn connection(&self) -> &ServerConnection {
        &self.conn
    }

    pub(crate) fn reporter(&self) -> &dyn Reporter {
        self.reporter.as_ref()
    }

    pub(crate) fn documents(&self) -> Result<Arc<dyn DocumentTransfer>, CoreError> {
        match &self.documents {
            Some(documents) => Ok(Arc::clone(documents)),
            None => Ok(Arc::new(RestDocuments::new(self.conn.rest_client()?))),
        }
    }

    pub(crate) fn packager(&self) -> &dyn TemplatePackager {
        self.packager.as_ref()
    }

    pub(crate) fn updater(&self) -> Option<&dyn SiteUpdater> {
        self.updater.as_deref()
    }

    pub(crate) fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    /// A fresh scratch folder under the work dir.
    pub(crate) fn scratch_dir(&self) -> PathBuf {
        self.work_dir.join(uuid::Uuid::new_v4().simple().to_string())
    }

    // ── Command execution ────────────────────────────────────────────

    /// Run one command to completion.
    pub async fn execute(&self, cmd: Command) -> Result<CommandResult, CoreError> {
        debug!(server = %self.conn.name, mode = %self.conn.mode, ?cmd, "executing command");
        let result = route_command(self, cmd).await;
        if let Err(e) = &result {
            info!(server = %self.conn.name, error = %e, "command failed");
        }
        result
    }
}

async fn route_command(ctl: &SiteController, cmd: Command) -> Result<CommandResult, CoreError> {
    match cmd {
        // ── Lifecycle ────────────────────────────────────────────────
        Command::CreateSite(req) => {
            command::create_site(ctl, &req).await?;
            Ok(CommandResult::Ok)
        }
        Command::TransferSite(req) => {
            command::transfer_site(ctl, &req).await?;
            Ok(CommandResult::Ok)
        }
        Command::MigrateSite(req) => {
            command::migrate_site(ctl, &req).await?;
            Ok(CommandResult::Ok)
        }
        Command::ControlSite { site, action } => {
            command::control_site(ctl, &site, action).await?;
            Ok(CommandResult::Ok)
        }

        // ── Access ───────────────────────────────────────────────────
        Command::ShareSite(req) => command::share_site(ctl, &req).await,
        Command::UnshareSite(req) => command::unshare_site(ctl, &req).await,
        Command::SetSiteSecurity(req) => {
            let summary = command::set_site_security(ctl, &req).await?;
            Ok(CommandResult::Security(summary))
        }

        // ── Inspection ───────────────────────────────────────────────
        Command::ValidateSite { site } => {
            let report = command::validate_site(ctl, &site).await?;
            Ok(CommandResult::Validation(report))
        }
        Command::RefreshPrerenderCache { site } => {
            let job_id = command::refresh_prerender_cache(ctl, &site).await?;
            Ok(CommandResult::Job { job_id })
        }

        // ── Static files ─────────────────────────────────────────────
        Command::UploadStaticFiles { site, folder } => {
            command::upload_static(ctl, &site, &folder).await?;
            Ok(CommandResult::Ok)
        }
        Command::DownloadStaticFiles(req) => {
            let folder = command::download_static(ctl, &req).await?;
            Ok(CommandResult::Downloaded { folder })
        }
        Command::DeleteStaticFiles { site } => {
            command::delete_static(ctl, &site).await?;
            Ok(CommandResult::Ok)
        }
    }
}
