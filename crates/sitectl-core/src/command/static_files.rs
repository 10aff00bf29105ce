// Upload, download and delete the static files of a site.
//
// The remote copy lives in the `static` folder of the site, in the
// `_files` layout handled by `static_site`.

use std::path::{Path, PathBuf};

use tracing::info;

use sitectl_api::RestClient;
use sitectl_api::rest::types::FolderItem;

use crate::command::requests::StaticDownloadRequest;
use crate::command::verify_site;
use crate::controller::SiteController;
use crate::error::CoreError;
use crate::static_site::{self, STATIC_FOLDER};

pub(crate) async fn upload_static(
    ctl: &SiteController,
    site: &str,
    folder: &Path,
) -> Result<(), CoreError> {
    let reporter = ctl.reporter();
    let src = local_folder(ctl.project_dir(), folder)?;
    reporter.step(&format!("static site folder: {}", src.display()));

    let rest = ctl.connection().rest_client()?;
    let remote_site = verify_site(&rest, site, &[], reporter).await?;

    let staging = ctl.scratch_dir();
    let wrapped = staging.join(STATIC_FOLDER);
    let result = async {
        static_site::wrap(&src, &wrapped)?;
        let documents = ctl.documents()?;
        if let Some(existing) = static_folder(&rest, &remote_site.id).await? {
            documents.delete_folder(&existing.id).await?;
        }
        documents.upload_folder(&wrapped, &remote_site.id).await
    }
    .await;
    let _ = tokio::fs::remove_dir_all(&staging).await;
    result?;

    info!(site, "static files uploaded");
    reporter.step("static files uploaded");
    Ok(())
}

pub(crate) async fn download_static(
    ctl: &SiteController,
    req: &StaticDownloadRequest,
) -> Result<PathBuf, CoreError> {
    let reporter = ctl.reporter();
    let target = match &req.folder {
        Some(folder) => local_folder(ctl.project_dir(), folder)?,
        None => ctl
            .project_dir()
            .join("src")
            .join("sites")
            .join(&req.site)
            .join(STATIC_FOLDER),
    };
    reporter.step(&format!("local folder {}", target.display()));

    let rest = ctl.connection().rest_client()?;
    let site = verify_site(&rest, &req.site, &[], reporter).await?;
    let folder = require_static(&rest, &site.id, &req.site).await?;

    ctl.documents()?
        .download_folder(&folder.id, &target)
        .await?;
    static_site::unwrap(&target)?;

    info!(site = %req.site, target = %target.display(), "static files downloaded");
    reporter.step(&format!("static files saved to {}", target.display()));
    Ok(target)
}

pub(crate) async fn delete_static(ctl: &SiteController, site: &str) -> Result<(), CoreError> {
    let reporter = ctl.reporter();
    let rest = ctl.connection().rest_client()?;
    let remote_site = verify_site(&rest, site, &[], reporter).await?;
    let folder = require_static(&rest, &remote_site.id, site).await?;

    ctl.documents()?.delete_folder(&folder.id).await?;
    info!(site, "static files deleted");
    reporter.step("static files deleted");
    Ok(())
}

/// An existing local folder, relative paths taken from the project root.
fn local_folder(project_dir: &Path, folder: &Path) -> Result<PathBuf, CoreError> {
    let path = if folder.is_absolute() {
        folder.to_path_buf()
    } else {
        project_dir.join(folder)
    };
    if !path.exists() {
        return Err(CoreError::validation(format!(
            "folder {} does not exist",
            path.display()
        )));
    }
    if !path.is_dir() {
        return Err(CoreError::validation(format!(
            "{} is not a folder",
            path.display()
        )));
    }
    Ok(path)
}

async fn static_folder(rest: &RestClient, site_id: &str) -> Result<Option<FolderItem>, CoreError> {
    Ok(rest.find_child_folder(site_id, STATIC_FOLDER).await?)
}

async fn require_static(
    rest: &RestClient,
    site_id: &str,
    site: &str,
) -> Result<FolderItem, CoreError> {
    static_folder(rest, site_id)
        .await?
        .ok_or_else(|| CoreError::invalid_state(format!("site {site} does not have static files")))
}
