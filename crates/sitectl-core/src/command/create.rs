// Create a site from a template.
//
// A repository turns the request into an enterprise site, which also needs
// a localization policy (explicit or the template's) and a default
// language that policy requires.

use sitectl_api::RestClient;
use sitectl_api::idc::{CopySiteForm, EnterpriseCopy, IdcOperation, RepositoryRef};
use sitectl_api::rest::types::{CreateSiteRequest as RestCreateSite, LocalizationPolicy};

use crate::collab::Reporter;
use crate::command::requests::CreateSiteRequest;
use crate::command::{await_submission, field_line};
use crate::controller::SiteController;
use crate::error::CoreError;
use crate::model::default_site_prefix;
use crate::session::with_relay;

/// Template facts that decide how the site is created.
#[derive(Debug, Clone)]
struct TemplateFacts {
    id: String,
    name: String,
    enterprise: bool,
    policy_id: Option<String>,
}

/// Resolved enterprise settings.
#[derive(Debug, Clone)]
pub(crate) struct EnterpriseTarget {
    pub repository_id: String,
    pub repository_name: String,
    pub policy: LocalizationPolicy,
    pub default_language: String,
    pub site_prefix: String,
}

pub(crate) async fn create_site(
    ctl: &SiteController,
    req: &CreateSiteRequest,
) -> Result<(), CoreError> {
    if ctl.connection().uses_rest() {
        create_site_rest(ctl, req).await
    } else {
        create_site_idc(ctl, req).await
    }
}

// ── Legacy path ──────────────────────────────────────────────────────

async fn create_site_idc(ctl: &SiteController, req: &CreateSiteRequest) -> Result<(), CoreError> {
    let reporter = ctl.reporter();
    let rest = ctl.connection().rest_client()?;

    with_relay(ctl.connection(), reporter, |s| async move {
        reporter.step("establish user session");

        if s.idc.find_site(&req.name).await?.is_some() {
            return Err(already_exists(&req.name));
        }
        let template = s
            .idc
            .find_template(&req.template)
            .await?
            .ok_or_else(|| CoreError::not_found("template", &req.template))?;

        let info = s.idc.template_info(&template.name).await?;
        if info.site_name.is_none() {
            return Err(CoreError::Api {
                message: "failed to get template info".into(),
                status: None,
            });
        }
        reporter.step("get template ");

        let facts = TemplateFacts {
            id: template.id,
            name: req.template.clone(),
            enterprise: info.is_enterprise,
            policy_id: info.localization_policy.filter(|p| !p.is_empty()),
        };
        check_requirements(req, &facts)?;

        let enterprise = match &req.repository {
            Some(repository) => {
                let target = resolve_enterprise(&rest, req, repository, &facts, reporter).await?;
                report_enterprise(reporter, &req.name, &facts.name, &target);
                Some(EnterpriseCopy {
                    repository: RepositoryRef {
                        prefix: s.repository_prefix(),
                        id: target.repository_id,
                    },
                    slug_prefix: target.site_prefix,
                    default_language: Some(target.default_language),
                    localization_policy_id: Some(target.policy.id),
                })
            }
            None => {
                report_standard(reporter, &req.name, &facts.name);
                None
            }
        };

        s.run(&IdcOperation::CopySite(CopySiteForm {
            site_name: req.name.clone(),
            description: req.description.clone().unwrap_or_default(),
            template_id: facts.id,
            enterprise,
            preserve_content_ids: req.update_content,
        }))
        .await?;
        reporter.step("site created");
        Ok(())
    })
    .await
}

// ── REST path ────────────────────────────────────────────────────────

async fn create_site_rest(ctl: &SiteController, req: &CreateSiteRequest) -> Result<(), CoreError> {
    let reporter = ctl.reporter();
    let rest = ctl.connection().rest_client()?;

    if rest.site_exists(&req.name).await? {
        return Err(already_exists(&req.name));
    }
    let template = rest
        .get_template(&req.template, &["localizationPolicy"])
        .await?
        .ok_or_else(|| CoreError::not_found("template", &req.template))?;

    let facts = TemplateFacts {
        id: template.id,
        name: template.name,
        enterprise: template.is_enterprise,
        policy_id: template.localization_policy.map(|p| p.id),
    };
    check_requirements(req, &facts)?;

    let mut body = RestCreateSite {
        name: req.name.clone(),
        template: facts.name.clone(),
        template_id: Some(facts.id.clone()),
        description: req.description.clone(),
        ..RestCreateSite::default()
    };
    match &req.repository {
        Some(repository) => {
            let target = resolve_enterprise(&rest, req, repository, &facts, reporter).await?;
            report_enterprise(reporter, &req.name, &facts.name, &target);
            body.site_prefix = Some(target.site_prefix);
            body.repository_id = Some(target.repository_id);
            body.localization_policy_id = Some(target.policy.id);
            body.default_language = Some(target.default_language);
        }
        None => report_standard(reporter, &req.name, &facts.name),
    }

    let submission = rest.create_site(&body).await?;
    await_submission(&rest, submission, reporter).await?;
    reporter.step("site created");
    Ok(())
}

// ── Shared steps ─────────────────────────────────────────────────────

fn already_exists(name: &str) -> CoreError {
    CoreError::AlreadyExists {
        entity_type: "site".into(),
        identifier: name.to_owned(),
    }
}

fn check_requirements(req: &CreateSiteRequest, template: &TemplateFacts) -> Result<(), CoreError> {
    if template.enterprise && req.repository.is_none() {
        return Err(CoreError::validation(
            "repository is required to create enterprise site",
        ));
    }
    if req.repository.is_some() {
        if template.policy_id.is_none() && req.localization_policy.is_none() {
            return Err(CoreError::validation(
                "localization policy is required to create enterprise site",
            ));
        }
        if req.default_language.is_none() {
            return Err(CoreError::validation(
                "default language is required to create enterprise site",
            ));
        }
    }
    Ok(())
}

/// Look up the repository and policy, and check the default language is
/// one the policy requires.
async fn resolve_enterprise(
    rest: &RestClient,
    req: &CreateSiteRequest,
    repository: &str,
    template: &TemplateFacts,
    reporter: &dyn Reporter,
) -> Result<EnterpriseTarget, CoreError> {
    let repo = rest
        .repository_by_name(repository)
        .await?
        .ok_or_else(|| CoreError::not_found("repository", repository))?;
    reporter.step("get repository");

    let policies = rest.localization_policies().await?;
    let policy = match &req.localization_policy {
        Some(name) => {
            let policy = policies
                .into_iter()
                .find(|p| &p.name == name)
                .ok_or_else(|| CoreError::not_found("localization policy", name))?;
            reporter.step("get localization policy");
            policy
        }
        None => {
            let policy = policies
                .into_iter()
                .find(|p| Some(&p.id) == template.policy_id.as_ref())
                .ok_or_else(|| {
                    CoreError::validation("localization policy in template does not exist")
                })?;
            reporter.step(&format!(
                "use localization policy from template: {}",
                policy.name
            ));
            policy
        }
    };

    let default_language = req.default_language.clone().unwrap_or_default();
    require_language(&policy, &default_language)?;

    Ok(EnterpriseTarget {
        repository_id: repo.id,
        repository_name: repo.name,
        policy,
        default_language,
        site_prefix: req
            .site_prefix
            .clone()
            .unwrap_or_else(|| default_site_prefix(&req.name)),
    })
}

/// The default language of an enterprise site must be a required language
/// of its policy.
pub(crate) fn require_language(
    policy: &LocalizationPolicy,
    language: &str,
) -> Result<(), CoreError> {
    if policy.required_values.iter().any(|l| l == language) {
        Ok(())
    } else {
        Err(CoreError::validation(format!(
            "language {language} is not in localization policy {}",
            policy.name
        )))
    }
}

fn report_standard(reporter: &dyn Reporter, name: &str, template: &str) {
    reporter.step("creating standard site ...");
    reporter.info(&field_line("name", name));
    reporter.info(&field_line("template", template));
}

fn report_enterprise(
    reporter: &dyn Reporter,
    name: &str,
    template: &str,
    target: &EnterpriseTarget,
) {
    reporter.step("creating enterprise site ...");
    reporter.info(&field_line("name", name));
    reporter.info(&field_line("template", template));
    reporter.info(&field_line("site prefix", &target.site_prefix));
    reporter.info(&field_line("repository", &target.repository_name));
    reporter.info(&field_line("localization policy", &target.policy.name));
    reporter.info(&field_line("default language", &target.default_language));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn facts(enterprise: bool, policy: Option<&str>) -> TemplateFacts {
        TemplateFacts {
            id: "T1".into(),
            name: "tpl".into(),
            enterprise,
            policy_id: policy.map(str::to_owned),
        }
    }

    #[test]
    fn enterprise_template_needs_a_repository() {
        let req = CreateSiteRequest {
            name: "s".into(),
            template: "tpl".into(),
            ..CreateSiteRequest::default()
        };
        let err = check_requirements(&req, &facts(true, Some("P1"))).unwrap_err();
        assert!(err.to_string().contains("repository is required"));
        assert!(check_requirements(&req, &facts(false, None)).is_ok());
    }

    #[test]
    fn enterprise_site_needs_policy_and_language() {
        let mut req = CreateSiteRequest {
            name: "s".into(),
            template: "tpl".into(),
            repository: Some("Repo".into()),
            ..CreateSiteRequest::default()
        };
        let err = check_requirements(&req, &facts(false, None)).unwrap_err();
        assert!(err.to_string().contains("localization policy is required"));

        let err = check_requirements(&req, &facts(false, Some("P1"))).unwrap_err();
        assert!(err.to_string().contains("default language is required"));

        req.default_language = Some("en-US".into());
        assert!(check_requirements(&req, &facts(false, Some("P1"))).is_ok());
    }

    #[test]
    fn language_must_be_required_by_policy() {
        let policy = LocalizationPolicy {
            id: "P1".into(),
            name: "Global".into(),
            required_values: vec!["en-US".into()],
            optional_values: vec!["fr-FR".into()],
            default_value: Some("en-US".into()),
        };
        assert!(require_language(&policy, "en-US").is_ok());
        let err = require_language(&policy, "fr-FR").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Validation failed: language fr-FR is not in localization policy Global"
        );
    }
}
