// ── Collaborators ──
//
// Seams between the orchestrators and the work they delegate: progress
// output, bulk folder transfer, template packaging and the site update
// algorithm. Shipped implementations talk to the documents and sites REST
// APIs; tests and other front ends can substitute their own.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::{debug, warn};

use sitectl_api::{JobPoller, JobState, RestClient};

use crate::config::ServerConnection;
use crate::error::CoreError;

// ── Reporter ────────────────────────────────────────────────────────

/// Sink for the user-visible progress and error lines of a command.
pub trait Reporter: Send + Sync {
    /// A raw line, printed as given.
    fn info(&self, line: &str);

    /// A non-fatal error. Fatal errors travel as `CoreError` instead.
    fn error(&self, message: &str);

    /// A pipeline step, printed as ` - <message>`.
    fn step(&self, message: &str) {
        self.info(&format!(" - {message}"));
    }

    /// Progress of a background job.
    fn job(&self, state: &JobState) {
        if let JobState::Polling {
            percentage: Some(p),
            ..
        } = state
        {
            self.step(&format!("job in progress: {p}%"));
        }
    }
}

/// Collects lines in memory. Errors are stored with an `ERROR: ` prefix.
#[derive(Debug, Default)]
pub struct MemoryReporter {
    lines: Mutex<Vec<String>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }

    pub fn errors(&self) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter(|l| l.starts_with("ERROR: "))
            .collect()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|l| l.contains(needle))
    }

    fn push(&self, line: String) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(line);
        }
    }
}

impl Reporter for MemoryReporter {
    fn info(&self, line: &str) {
        self.push(line.to_owned());
    }

    fn error(&self, message: &str) {
        self.push(format!("ERROR: {message}"));
    }
}

// ── Document transfer ───────────────────────────────────────────────

/// Bulk folder transfer against the documents store.
#[async_trait]
pub trait DocumentTransfer: Send + Sync {
    /// Upload `local` (the folder itself, not just its contents) under
    /// `parent_id`. Returns the id of the new remote folder.
    async fn upload_folder(&self, local: &Path, parent_id: &str) -> Result<String, CoreError>;

    /// Download the contents of `folder_id` into `local`, creating it.
    async fn download_folder(&self, folder_id: &str, local: &Path) -> Result<(), CoreError>;

    async fn delete_folder(&self, folder_id: &str) -> Result<(), CoreError>;
}

/// [`DocumentTransfer`] over the documents REST API.
pub struct RestDocuments {
    rest: RestClient,
}

impl RestDocuments {
    pub fn new(rest: RestClient) -> Self {
        Self { rest }
    }
}

#[async_trait]
impl DocumentTransfer for RestDocuments {
    async fn upload_folder(&self, local: &Path, parent_id: &str) -> Result<String, CoreError> {
        let name = local
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| CoreError::validation(format!("{} has no name", local.display())))?;
        let root = self.rest.create_folder(parent_id, &name).await?;

        let mut pending = vec![(local.to_path_buf(), root.id.clone())];
        while let Some((dir, remote_id)) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                let entry_name = entry.file_name().to_string_lossy().into_owned();
                if entry.file_type().await?.is_dir() {
                    let folder = self.rest.create_folder(&remote_id, &entry_name).await?;
                    pending.push((path, folder.id));
                } else {
                    debug!(file = %path.display(), "uploading");
                    self.rest.upload_file(&remote_id, &path).await?;
                }
            }
        }
        Ok(root.id)
    }

    async fn download_folder(&self, folder_id: &str, local: &Path) -> Result<(), CoreError> {
        let mut pending = vec![(folder_id.to_owned(), local.to_path_buf())];
        while let Some((remote_id, dir)) = pending.pop() {
            tokio::fs::create_dir_all(&dir).await?;
            for item in self.rest.folder_items(&remote_id).await? {
                let target = dir.join(&item.name);
                if item.is_folder() {
                    pending.push((item.id, target));
                } else {
                    debug!(file = %target.display(), "downloading");
                    let bytes = self.rest.download_file(&item.id).await?;
                    tokio::fs::write(&target, &bytes).await?;
                }
            }
        }
        Ok(())
    }

    async fn delete_folder(&self, folder_id: &str) -> Result<(), CoreError> {
        Ok(self.rest.delete_folder(folder_id).await?)
    }
}

// ── Template packaging ──────────────────────────────────────────────

/// Turns a site on one server into a template zip on local disk.
#[async_trait]
pub trait TemplatePackager: Send + Sync {
    async fn create_and_download(
        &self,
        source: &ServerConnection,
        template_name: &str,
        site_name: &str,
        dest_dir: &Path,
    ) -> Result<PathBuf, CoreError>;
}

/// [`TemplatePackager`] over the sites REST API: create a template from
/// the site, export it, download the zip and drop the remote copies.
#[derive(Debug, Default, Clone, Copy)]
pub struct RestTemplatePackager;

#[async_trait]
impl TemplatePackager for RestTemplatePackager {
    async fn create_and_download(
        &self,
        source: &ServerConnection,
        template_name: &str,
        site_name: &str,
        dest_dir: &Path,
    ) -> Result<PathBuf, CoreError> {
        let rest = source.rest_client()?;
        let submission = rest
            .create_template_from_site(template_name, site_name, true)
            .await?;
        if let Some(job_id) = submission.job_id {
            JobPoller::new(rest.poll_config())
                .await_job(&rest, &job_id, |_| {})
                .await?;
        }

        let template = rest
            .get_template(template_name, &[])
            .await?
            .ok_or_else(|| CoreError::not_found("template", template_name))?;
        let export = rest.export_template(&template.id).await?;
        let bytes = rest.download_file(&export.file.id).await?;

        tokio::fs::create_dir_all(dest_dir).await?;
        let path = dest_dir.join(format!("{template_name}.zip"));
        tokio::fs::write(&path, &bytes).await?;

        if let Err(e) = rest.delete_file(&export.file.id).await {
            warn!(file_id = %export.file.id, error = %e, "could not delete exported template file");
        }
        if let Err(e) = rest.delete_template(&template.id, true).await {
            warn!(template = template_name, error = %e, "could not delete source template");
        }
        Ok(path)
    }
}

// ── Site update ─────────────────────────────────────────────────────

/// Applies a template package to an existing site. No implementation
/// ships with this crate.
#[async_trait]
pub trait SiteUpdater: Send + Sync {
    async fn update_site(
        &self,
        dest: &ServerConnection,
        site_name: &str,
        template_zip: &Path,
    ) -> Result<(), CoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_reporter_prefixes_steps_and_errors() {
        let reporter = MemoryReporter::new();
        reporter.step("verify site");
        reporter.error("user bob does not exist");
        reporter.job(&JobState::Polling {
            attempt: 1,
            percentage: Some(40),
        });
        reporter.job(&JobState::Complete);

        assert_eq!(
            reporter.lines(),
            vec![
                " - verify site",
                "ERROR: user bob does not exist",
                " - job in progress: 40%"
            ]
        );
        assert_eq!(reporter.errors().len(), 1);
    }
}
