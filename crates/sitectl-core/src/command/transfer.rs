// Clone a site from one server onto another.
//
// The source site is packaged as a template, the zip is imported on the
// destination and a site is copied from it. If the site already exists on
// the destination the package goes to the site updater instead.

use std::path::Path;

use tracing::{info, warn};

use sitectl_api::RestClient;
use sitectl_api::idc::{CopySiteForm, EnterpriseCopy, IdcOperation, RepositoryRef};
use sitectl_api::rest::HOME_FOLDER;
use sitectl_api::rest::types::{CreateSiteRequest as RestCreateSite, RestSite};

use crate::collab::Reporter;
use crate::command::await_submission;
use crate::command::create::{EnterpriseTarget, require_language};
use crate::command::requests::TransferSiteRequest;
use crate::config::ServerConnection;
use crate::controller::SiteController;
use crate::error::CoreError;
use crate::model::{default_site_prefix, transient_template_name};
use crate::session::with_relay;

pub(crate) async fn transfer_site(
    ctl: &SiteController,
    req: &TransferSiteRequest,
) -> Result<(), CoreError> {
    let reporter = ctl.reporter();
    let source = ctl.connection();
    let dest = &req.destination;
    if source.same_server(dest) {
        return Err(CoreError::validation(
            "source and destination server are the same",
        ));
    }

    let source_rest = source.rest_client()?;
    let dest_rest = dest.rest_client()?;

    let site = source_rest
        .get_site(&req.name, &["channel", "repository"])
        .await?
        .ok_or_else(|| CoreError::not_found("site", &req.name))?;
    reporter.step(&format!(
        "verify site (defaultLanguage: {})",
        site.default_language.as_deref().unwrap_or("")
    ));

    let create = !dest_rest.site_exists(&req.name).await?;
    reporter.step(&format!(
        "will {} site {} on {}",
        if create { "create" } else { "update" },
        req.name,
        dest.url
    ));

    let target = if create {
        Some(verify_target(&dest_rest, req, &site, reporter).await?)
    } else {
        None
    };

    let template_name = transient_template_name(&req.name);
    let zip = ctl
        .packager()
        .create_and_download(source, &template_name, &req.name, &ctl.scratch_dir())
        .await?;
    if !zip.is_file() {
        return Err(CoreError::Internal(format!(
            "failed to download template {template_name}"
        )));
    }

    match target {
        Some(target) => {
            create_on_destination(ctl, req, &site, &target, &template_name, &zip).await?;
            reporter.step(&format!("site {} created on {}", req.name, dest.url));
        }
        None => {
            let updater = ctl.updater().ok_or_else(|| CoreError::Unsupported {
                operation: "update site".into(),
                reason: format!("site {} already exists on {}", req.name, dest.url),
            })?;
            updater.update_site(dest, &req.name, &zip).await?;
            reporter.step("update site finished");
        }
    }
    info!(site = %req.name, destination = %dest.name, "site transferred");
    Ok(())
}

/// Check the repository and policy the new site goes into.
async fn verify_target(
    dest: &RestClient,
    req: &TransferSiteRequest,
    site: &RestSite,
    reporter: &dyn Reporter,
) -> Result<EnterpriseTarget, CoreError> {
    let repository = req
        .repository
        .as_deref()
        .ok_or_else(|| CoreError::validation("no repository is specified"))?;
    let policy_name = req
        .localization_policy
        .as_deref()
        .ok_or_else(|| CoreError::validation("no localization policy is specified"))?;

    let repo = dest
        .repository_by_name(repository)
        .await?
        .ok_or_else(|| CoreError::not_found("repository", repository))?;
    reporter.step("verify repository");

    let policy = dest
        .localization_policies()
        .await?
        .into_iter()
        .find(|p| p.name == policy_name)
        .ok_or_else(|| CoreError::not_found("localization policy", policy_name))?;
    let default_language = site.default_language.clone().unwrap_or_default();
    require_language(&policy, &default_language)?;
    reporter.step("verify localization policy");

    Ok(EnterpriseTarget {
        repository_id: repo.id,
        repository_name: repo.name,
        policy,
        default_language,
        site_prefix: req
            .site_prefix
            .clone()
            .or_else(|| site.site_prefix.clone())
            .unwrap_or_else(|| default_site_prefix(&req.name)),
    })
}

/// Upload and import the package, copy the site from it, then drop the
/// uploaded file and the imported template whatever the copy did.
async fn create_on_destination(
    ctl: &SiteController,
    req: &TransferSiteRequest,
    site: &RestSite,
    target: &EnterpriseTarget,
    template_name: &str,
    zip: &Path,
) -> Result<(), CoreError> {
    let reporter = ctl.reporter();
    let dest = &req.destination;
    let rest = dest.rest_client()?;

    let file = rest.upload_file(HOME_FOLDER, zip).await?;
    reporter.step(&format!(
        "file {} uploaded to Home folder (Id: {} version:{})",
        file.name,
        file.id,
        file.version
    ));

    let imported = import_template(&rest, template_name, &file.id, reporter).await;
    let copied = match imported {
        Ok(template_id) => {
            let template = (template_name, template_id.as_str());
            let copied = copy_site(dest, req, site, target, template, reporter).await;
            if let Err(e) = rest.delete_template(&template_id, true).await {
                warn!(template = template_name, error = %e, "could not delete imported template");
            }
            copied
        }
        Err(e) => Err(e),
    };
    if let Err(e) = rest.delete_file(&file.id).await {
        warn!(file_id = %file.id, error = %e, "could not delete uploaded template file");
    }
    copied
}

async fn import_template(
    rest: &RestClient,
    template_name: &str,
    file_id: &str,
    reporter: &dyn Reporter,
) -> Result<String, CoreError> {
    let submission = rest.import_template(template_name, file_id).await?;
    await_submission(rest, submission, reporter).await?;
    let template = rest
        .get_template(template_name, &[])
        .await?
        .ok_or_else(|| CoreError::not_found("template", template_name))?;
    Ok(template.id)
}

async fn copy_site(
    dest: &ServerConnection,
    req: &TransferSiteRequest,
    site: &RestSite,
    target: &EnterpriseTarget,
    (template_name, template_id): (&str, &str),
    reporter: &dyn Reporter,
) -> Result<(), CoreError> {
    if dest.uses_rest() {
        let rest = dest.rest_client()?;
        let submission = rest
            .create_site(&RestCreateSite {
                name: req.name.clone(),
                template: template_name.to_owned(),
                template_id: Some(template_id.to_owned()),
                description: site.description.clone(),
                site_prefix: Some(target.site_prefix.clone()),
                repository_id: Some(target.repository_id.clone()),
                localization_policy_id: Some(target.policy.id.clone()),
                default_language: Some(target.default_language.clone()),
            })
            .await?;
        return await_submission(&rest, submission, reporter).await;
    }

    with_relay(dest, reporter, |s| async move {
        s.run(&IdcOperation::CopySite(CopySiteForm {
            site_name: req.name.clone(),
            description: site.description.clone().unwrap_or_default(),
            template_id: template_id.to_owned(),
            enterprise: Some(EnterpriseCopy {
                repository: RepositoryRef {
                    prefix: s.repository_prefix(),
                    id: target.repository_id.clone(),
                },
                slug_prefix: target.site_prefix.clone(),
                default_language: Some(target.default_language.clone()),
                localization_policy_id: Some(target.policy.id.clone()),
            }),
            preserve_content_ids: true,
        }))
        .await?;
        Ok(())
    })
    .await
}
