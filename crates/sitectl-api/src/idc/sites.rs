// IDC site endpoints
//
// Read-only lookups used to verify sites and templates before a mutating
// service runs. All of them go through the relay's GET passthrough.

use strum::{AsRefStr, Display};
use tracing::debug;

use crate::error::Error;
use crate::idc::client::IdcClient;
use crate::idc::models::{IdcSite, SiteInfoFile, SiteProperties, SiteValidation};

const BROWSE_SITES: &str = "SCS_BROWSE_SITES";
const SITE_INFO_FILE: &str = "SCS_GET_SITE_INFO_FILE";
const VALIDATE_SITE_PUBLISH: &str = "SCS_VALIDATE_SITE_PUBLISH";
const SECURE_SITE_USERS: &str = "SCS_GET_SECURE_SITE_USERS";

const TEMPLATE_INFO_PREFIX: &str = "SCSTEMPLATE_";

/// Which kind of folder `SCS_BROWSE_SITES` lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
pub enum FolderKind {
    #[strum(serialize = "framework.site")]
    Site,
    #[strum(serialize = "framework.site.template")]
    Template,
}

impl IdcClient {
    /// List every site or template folder visible to the user.
    pub async fn browse_sites(&self, kind: FolderKind) -> Result<Vec<IdcSite>, Error> {
        debug!(kind = %kind, "browsing folders");
        let resp = self
            .get_service(BROWSE_SITES, &[("fApplication", kind.as_ref())])
            .await?;
        Ok(resp
            .records("SiteInfo")
            .iter()
            .filter_map(IdcSite::from_record)
            .collect())
    }

    /// Find a site by name, ignoring case.
    pub async fn find_site(&self, name: &str) -> Result<Option<IdcSite>, Error> {
        self.find(FolderKind::Site, name).await
    }

    /// Find a template by name, ignoring case.
    pub async fn find_template(&self, name: &str) -> Result<Option<IdcSite>, Error> {
        self.find(FolderKind::Template, name).await
    }

    async fn find(&self, kind: FolderKind, name: &str) -> Result<Option<IdcSite>, Error> {
        let folders = self.browse_sites(kind).await?;
        Ok(folders
            .into_iter()
            .find(|f| f.name.eq_ignore_ascii_case(name)))
    }

    /// `base.properties` from a site's info file.
    pub async fn site_info(&self, site_name: &str) -> Result<SiteProperties, Error> {
        self.info_file(site_name).await
    }

    /// `base.properties` from a template's info file.
    pub async fn template_info(&self, template_name: &str) -> Result<SiteProperties, Error> {
        self.info_file(&format!("{TEMPLATE_INFO_PREFIX}{template_name}"))
            .await
    }

    async fn info_file(&self, site_id: &str) -> Result<SiteProperties, Error> {
        let file: SiteInfoFile = self
            .get_json(SITE_INFO_FILE, &[("siteId", site_id), ("IsJson", "1")])
            .await?;
        file.base
            .and_then(|b| b.properties)
            .ok_or_else(|| Error::Idc {
                service: SITE_INFO_FILE.into(),
                message: format!("no site info for {site_id}"),
            })
    }

    /// Page-by-language publish validation of a site.
    pub async fn validate_site_publish(&self, site_id: &str) -> Result<SiteValidation, Error> {
        let item = format!("fFolderGUID:{site_id}");
        let resp = self
            .get_service(VALIDATE_SITE_PUBLISH, &[("item", &item)])
            .await?;
        let raw = resp
            .local_data
            .site_validation
            .filter(|v| !v.is_empty())
            .ok_or_else(|| Error::Idc {
                service: VALIDATE_SITE_PUBLISH.into(),
                message: "failed to get site validation".into(),
            })?;
        serde_json::from_str(&raw).map_err(|e| Error::Deserialization {
            message: format!("SiteValidation: {e}"),
            body: raw,
        })
    }

    /// Login names of the named users allowed on a secure site.
    pub async fn secure_site_users(&self, site_id: &str) -> Result<Vec<String>, Error> {
        let item = format!("fFolderGUID:{site_id}");
        let resp = self
            .get_service(SECURE_SITE_USERS, &[("item", &item)])
            .await?;
        Ok(resp
            .records("SecureSiteUsers")
            .into_iter()
            .filter_map(|mut r| r.remove("dUserIDLoginName"))
            .filter(|login| !login.is_empty())
            .collect())
    }
}
