// Migrate a site from an internal-only pod, or from a template package
// exported earlier, into an enterprise site on this server.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use sitectl_api::RestClient;
use sitectl_api::idc::{CopySiteForm, EnterpriseCopy, IdcOperation, RepositoryRef};
use sitectl_api::rest::HOME_FOLDER;
use sitectl_api::rest::types::CreateSiteRequest as RestCreateSite;

use crate::command::await_submission;
use crate::command::requests::MigrateSiteRequest;
use crate::config::{ServerConnection, ServerEnv};
use crate::controller::SiteController;
use crate::error::CoreError;
use crate::model::{SITE_PREFIX_MAX, default_site_prefix, transient_template_name};
use crate::session::with_relay;

/// Where the template package comes from.
enum PackageSource<'a> {
    Server(&'a ServerConnection),
    File(PathBuf),
}

pub(crate) async fn migrate_site(
    ctl: &SiteController,
    req: &MigrateSiteRequest,
) -> Result<(), CoreError> {
    let reporter = ctl.reporter();
    let dest = ctl.connection();
    let package = check_request(req, dest, ctl.project_dir())?;

    let name = req.name.clone().unwrap_or_else(|| req.site.clone());
    let site_prefix = match &req.site_prefix {
        Some(prefix) => prefix.chars().take(SITE_PREFIX_MAX).collect(),
        None => default_site_prefix(&name),
    };
    let rest = dest.rest_client()?;

    if rest.site_exists(&name).await? {
        return Err(CoreError::AlreadyExists {
            entity_type: "site".into(),
            identifier: name,
        });
    }
    let repository = rest
        .repository_by_name(&req.repository)
        .await?
        .ok_or_else(|| CoreError::not_found("repository", &req.repository))?;
    reporter.step(&format!("verify repository (Id: {})", repository.id));

    let (zip, template_name) = match package {
        PackageSource::File(path) => {
            let template_name = template_name_of(&path);
            reporter.step(&format!(
                "template file {} name {template_name}",
                path.display()
            ));
            (path, template_name)
        }
        PackageSource::Server(source) => {
            let template_name = transient_template_name(&req.site);
            let zip = ctl
                .packager()
                .create_and_download(source, &template_name, &req.site, &ctl.scratch_dir())
                .await?;
            if !zip.is_file() {
                return Err(CoreError::Internal(format!(
                    "failed to download template {template_name}"
                )));
            }
            (zip, template_name)
        }
    };

    let file = rest.upload_file(HOME_FOLDER, &zip).await?;
    reporter.step(&format!(
        "file {} uploaded to Home folder (Id: {} version:{})",
        file.name, file.id, file.version
    ));

    let target = Target {
        name: &name,
        description: req.description.as_deref().unwrap_or_default(),
        repository_id: &repository.id,
        site_prefix: &site_prefix,
        template_name: &template_name,
        file_id: &file.id,
    };
    let created = import_and_copy(ctl, &rest, &target).await;

    if let Err(e) = rest.delete_file(&file.id).await {
        warn!(file_id = %file.id, error = %e, "could not delete uploaded template file");
    }
    created?;
    reporter.step(&format!("site {name} created on {}", dest.url));
    info!(site = %name, server = %dest.name, "site migrated");
    Ok(())
}

/// Check the servers and the template file before any remote call.
fn check_request<'a>(
    req: &'a MigrateSiteRequest,
    dest: &ServerConnection,
    project_dir: &Path,
) -> Result<PackageSource<'a>, CoreError> {
    if dest.env == ServerEnv::PodIc {
        return Err(CoreError::validation(format!(
            "server {} is not a valid destination to migrate site",
            dest.url
        )));
    }

    if let Some(path) = &req.template_file {
        let path = if path.is_absolute() {
            path.clone()
        } else {
            project_dir.join(path)
        };
        if !path.exists() {
            return Err(CoreError::validation(format!(
                "file {} does not exist",
                path.display()
            )));
        }
        if !path.is_file() {
            return Err(CoreError::validation(format!(
                "{} is not a file",
                path.display()
            )));
        }
        return Ok(PackageSource::File(path));
    }

    match &req.source {
        Some(source) if source.env == ServerEnv::PodIc => Ok(PackageSource::Server(source)),
        Some(source) => Err(CoreError::validation(format!(
            "server {} is not a valid source to migrate site",
            source.url
        ))),
        None => Err(CoreError::validation(
            "either a source server or a template file is required",
        )),
    }
}

/// Template name carried by a package file: its name up to the first dot.
fn template_name_of(path: &Path) -> String {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    match file_name.split_once('.') {
        Some((stem, _)) => stem.to_owned(),
        None => file_name,
    }
}

/// The site being created and the uploaded package it comes from.
struct Target<'a> {
    name: &'a str,
    description: &'a str,
    repository_id: &'a str,
    site_prefix: &'a str,
    template_name: &'a str,
    file_id: &'a str,
}

async fn import_and_copy(
    ctl: &SiteController,
    rest: &RestClient,
    target: &Target<'_>,
) -> Result<(), CoreError> {
    let reporter = ctl.reporter();

    if ctl.connection().uses_rest() {
        let submission = rest
            .import_template(target.template_name, target.file_id)
            .await?;
        await_submission(rest, submission, reporter).await?;
        let template_id = imported_template(rest, target.template_name).await?;

        let submission = rest
            .create_site(&RestCreateSite {
                name: target.name.to_owned(),
                template: target.template_name.to_owned(),
                template_id: Some(template_id.clone()),
                description: Some(target.description.to_owned()).filter(|d| !d.is_empty()),
                site_prefix: Some(target.site_prefix.to_owned()),
                repository_id: Some(target.repository_id.to_owned()),
                ..RestCreateSite::default()
            })
            .await;
        let created = match submission {
            Ok(submission) => await_submission(rest, submission, reporter).await,
            Err(e) => Err(e.into()),
        };
        drop_template(rest, &template_id, target.template_name).await;
        return created;
    }

    with_relay(ctl.connection(), reporter, |s| async move {
        s.run(&IdcOperation::ImportTemplatePackage {
            file_id: target.file_id.to_owned(),
        })
        .await?;
        let template_id = imported_template(rest, target.template_name).await?;

        let created = s
            .run(&IdcOperation::CopySite(CopySiteForm {
                site_name: target.name.to_owned(),
                description: target.description.to_owned(),
                template_id: template_id.clone(),
                enterprise: Some(EnterpriseCopy {
                    repository: RepositoryRef {
                        prefix: s.repository_prefix(),
                        id: target.repository_id.to_owned(),
                    },
                    slug_prefix: target.site_prefix.to_owned(),
                    default_language: None,
                    localization_policy_id: None,
                }),
                preserve_content_ids: true,
            }))
            .await;
        drop_template(rest, &template_id, target.template_name).await;
        created.map(|_| ())
    })
    .await
}

async fn imported_template(rest: &RestClient, name: &str) -> Result<String, CoreError> {
    rest.get_template(name, &[])
        .await?
        .map(|t| t.id)
        .ok_or_else(|| CoreError::not_found("template", name))
}

async fn drop_template(rest: &RestClient, id: &str, name: &str) {
    if let Err(e) = rest.delete_template(id, true).await {
        warn!(template = name, error = %e, "could not delete imported template");
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::str::FromStr;

    use secrecy::SecretString;
    use tempfile::TempDir;
    use url::Url;

    use super::*;
    use crate::config::AuthCredentials;

    fn server(url: &str, env: ServerEnv) -> ServerConnection {
        ServerConnection::new(
            "test",
            Url::from_str(url).unwrap(),
            AuthCredentials::Bearer(SecretString::from("t".to_owned())),
        )
        .with_env(env)
    }

    fn request() -> MigrateSiteRequest {
        MigrateSiteRequest {
            site: "legacy".into(),
            repository: "Marketing".into(),
            ..MigrateSiteRequest::default()
        }
    }

    #[test]
    fn source_must_be_an_internal_pod() {
        let dest = server("https://dest.example.com", ServerEnv::PodEc);
        let mut req = request();
        req.source = Some(server("https://src.example.com", ServerEnv::DevEc));
        let err = check_request(&req, &dest, Path::new(".")).err().unwrap();
        assert!(err.to_string().contains("is not a valid source"));

        req.source = Some(server("https://src.example.com", ServerEnv::PodIc));
        assert!(matches!(
            check_request(&req, &dest, Path::new(".")),
            Ok(PackageSource::Server(_))
        ));
    }

    #[test]
    fn destination_cannot_be_an_internal_pod() {
        let dest = server("https://dest.example.com", ServerEnv::PodIc);
        let err = check_request(&request(), &dest, Path::new(".")).err().unwrap();
        assert!(err.to_string().contains("is not a valid destination"));
    }

    #[test]
    fn template_file_is_resolved_against_the_project() {
        let project = TempDir::new().unwrap();
        std::fs::write(project.path().join("Blog.v2.zip"), b"zip").unwrap();
        std::fs::create_dir(project.path().join("folder.zip")).unwrap();
        let dest = server("https://dest.example.com", ServerEnv::PodEc);

        let mut req = request();
        req.template_file = Some(PathBuf::from("Blog.v2.zip"));
        match check_request(&req, &dest, project.path()).unwrap() {
            PackageSource::File(path) => {
                assert_eq!(path, project.path().join("Blog.v2.zip"));
                assert_eq!(template_name_of(&path), "Blog");
            }
            PackageSource::Server(_) => panic!("expected a file"),
        }

        req.template_file = Some(PathBuf::from("folder.zip"));
        let err = check_request(&req, &dest, project.path()).err().unwrap();
        assert!(err.to_string().contains("is not a file"));

        req.template_file = Some(PathBuf::from("missing.zip"));
        let err = check_request(&req, &dest, project.path()).err().unwrap();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn needs_a_package_source() {
        let dest = server("https://dest.example.com", ServerEnv::PodEc);
        assert!(check_request(&request(), &dest, Path::new(".")).is_err());
    }
}
