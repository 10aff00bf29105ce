// Sites management endpoints
//
// Base path: /sites/management/api/v1/
// Sites and templates are addressable by id or by `name:<name>`.

use serde_json::json;
use strum::{AsRefStr, Display};
use tracing::debug;

use crate::error::Error;
use crate::idc::models::SiteValidation;
use crate::poller::Submission;
use crate::rest::client::RestClient;
use crate::rest::types::{CreateSiteRequest, RestSite, RestTemplate, TemplateExport};

const SITES: &str = "/sites/management/api/v1/sites";
const TEMPLATES: &str = "/sites/management/api/v1/templates";

/// Runtime and publish transitions, named by their URL segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum SiteTransition {
    Publish,
    Unpublish,
    Activate,
    Deactivate,
}

fn expand_params(expand: &[&str]) -> Vec<(&'static str, String)> {
    if expand.is_empty() {
        Vec::new()
    } else {
        vec![("expand", expand.join(","))]
    }
}

impl RestClient {
    // ── Sites ────────────────────────────────────────────────────────

    /// Look a site up by name. `None` if the server has no such site.
    pub async fn get_site(&self, name: &str, expand: &[&str]) -> Result<Option<RestSite>, Error> {
        self.get_optional(&format!("{SITES}/name:{name}"), &expand_params(expand))
            .await
    }

    pub async fn get_site_by_id(&self, id: &str, expand: &[&str]) -> Result<RestSite, Error> {
        self.get_with_params(&format!("{SITES}/{id}"), &expand_params(expand))
            .await
    }

    pub async fn site_exists(&self, name: &str) -> Result<bool, Error> {
        Ok(self.get_site(name, &[]).await?.is_some())
    }

    /// `POST /sites`. Runs as a job on most servers.
    pub async fn create_site(&self, request: &CreateSiteRequest) -> Result<Submission, Error> {
        debug!(name = %request.name, template = %request.template, "creating site");
        self.post_operation(SITES, request).await
    }

    /// `POST /sites/{id}/{publish|unpublish|activate|deactivate}`
    pub async fn transition_site(
        &self,
        id: &str,
        transition: SiteTransition,
    ) -> Result<Submission, Error> {
        self.post_operation(&format!("{SITES}/{id}/{transition}"), &json!({}))
            .await
    }

    /// Replace the list of audiences allowed on the published site.
    pub async fn set_site_runtime_access(&self, id: &str, access: &[String]) -> Result<(), Error> {
        let _: serde_json::Value = self
            .put(&format!("{SITES}/{id}/security"), &json!({ "access": access }))
            .await?;
        Ok(())
    }

    /// Allow a named member (`user:<login>`) onto a secure site.
    pub async fn grant_site_access(&self, id: &str, member: &str) -> Result<(), Error> {
        let _: serde_json::Value = self
            .post(&format!("{SITES}/{id}/access"), &json!({ "member": member }))
            .await?;
        Ok(())
    }

    pub async fn remove_site_access(&self, id: &str, member: &str) -> Result<(), Error> {
        self.delete_with_params(&format!("{SITES}/{id}/access"), &[("member", member.to_owned())])
            .await
    }

    /// Page-by-language publish validation.
    pub async fn validate_site(&self, name: &str) -> Result<SiteValidation, Error> {
        self.get(&format!("{SITES}/name:{name}/validation")).await
    }

    /// Rebuild the site's pre-rendered page cache.
    pub async fn refresh_prerender_cache(&self, id: &str) -> Result<Submission, Error> {
        self.post_operation(&format!("{SITES}/{id}/refresh"), &json!({}))
            .await
    }

    // ── Templates ────────────────────────────────────────────────────

    pub async fn get_template(
        &self,
        name: &str,
        expand: &[&str],
    ) -> Result<Option<RestTemplate>, Error> {
        self.get_optional(&format!("{TEMPLATES}/name:{name}"), &expand_params(expand))
            .await
    }

    /// Package a site as a new template.
    pub async fn create_template_from_site(
        &self,
        template_name: &str,
        site_name: &str,
        include_unpublished_assets: bool,
    ) -> Result<Submission, Error> {
        let body = json!({
            "name": template_name,
            "siteName": site_name,
            "includeUnpublishedAssets": include_unpublished_assets,
        });
        self.post_operation(TEMPLATES, &body).await
    }

    /// Export a template to a zip in the caller's documents home.
    pub async fn export_template(&self, id: &str) -> Result<TemplateExport, Error> {
        self.post(&format!("{TEMPLATES}/{id}/export"), &json!({}))
            .await
    }

    /// Import a template zip that was uploaded to the documents store.
    pub async fn import_template(&self, name: &str, file_id: &str) -> Result<Submission, Error> {
        let body = json!({ "name": name, "file": { "id": file_id } });
        self.post_operation(&format!("{TEMPLATES}/import"), &body)
            .await
    }

    /// Delete a template. `hard` also purges it from the trash.
    pub async fn delete_template(&self, id: &str, hard: bool) -> Result<(), Error> {
        self.delete_with_params(&format!("{TEMPLATES}/{id}"), &[("hard", hard.to_string())])
            .await
    }
}
