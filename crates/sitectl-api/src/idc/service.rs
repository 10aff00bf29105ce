// Mutating IDC services reachable through the relay
//
// The relay only forwards POSTs for the services listed in `IdcService`.
// Callers describe what they want with an `IdcOperation`; the relay turns
// it into the form fields the service expects and adds the session token.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// The closed set of IDC services the relay will POST upstream.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, EnumIter,
)]
pub enum IdcService {
    #[strum(serialize = "SCS_COPY_SITES")]
    CopySites,
    #[strum(serialize = "SCS_PUBLISH_SITE")]
    PublishSite,
    #[strum(serialize = "SCS_UNPUBLISH_SITE")]
    UnpublishSite,
    #[strum(serialize = "SCS_ACTIVATE_SITE")]
    ActivateSite,
    #[strum(serialize = "SCS_DEACTIVATE_SITE")]
    DeactivateSite,
    #[strum(serialize = "SCS_IMPORT_TEMPLATE_PACKAGE")]
    ImportTemplatePackage,
    #[strum(serialize = "SCS_EDIT_SECURE_SITE")]
    EditSecureSite,
}

/// Which GUID namespace a repository reference lives in.
///
/// Servers from 19.4.3 on address repositories by `arCaaSGUID`; older
/// ones still expect the folder GUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RepositoryPrefix {
    #[serde(rename = "arCaaSGUID")]
    CaasGuid,
    #[serde(rename = "fFolderGUID")]
    FolderGuid,
}

const CAAS_GUID_SINCE: (u32, u32, u32) = (19, 4, 3);

impl RepositoryPrefix {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CaasGuid => "arCaaSGUID",
            Self::FolderGuid => "fFolderGUID",
        }
    }

    /// Pick the prefix for a server version string such as `"20.1.3-1234"`.
    /// Unknown or unparsable versions get the current prefix.
    pub fn for_version(version: Option<&str>) -> Self {
        match version.and_then(coerce_version) {
            Some(v) if v < CAAS_GUID_SINCE => Self::FolderGuid,
            _ => Self::CaasGuid,
        }
    }
}

/// Pull the first `major[.minor[.patch]]` run of digits out of a version string.
fn coerce_version(raw: &str) -> Option<(u32, u32, u32)> {
    let start = raw.find(|c: char| c.is_ascii_digit())?;
    let mut parts = raw[start..]
        .split(|c: char| !c.is_ascii_digit())
        .take(3)
        .map(str::parse::<u32>);
    let major = parts.next()?.ok()?;
    let minor = parts.next().and_then(Result::ok).unwrap_or(0);
    let patch = parts.next().and_then(Result::ok).unwrap_or(0);
    Some((major, minor, patch))
}

/// Repository reference sent to `SCS_COPY_SITES`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryRef {
    pub prefix: RepositoryPrefix,
    pub id: String,
}

/// Enterprise-only fields of a site copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnterpriseCopy {
    pub repository: RepositoryRef,
    pub slug_prefix: String,
    pub default_language: Option<String>,
    pub localization_policy_id: Option<String>,
}

/// Form for `SCS_COPY_SITES`: create a site from a template folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopySiteForm {
    pub site_name: String,
    pub description: String,
    pub template_id: String,
    pub enterprise: Option<EnterpriseCopy>,
    /// Keep content ids of the template's assets (`doPreserveCaaSGUID`).
    pub preserve_content_ids: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemberChange {
    Add,
    Delete,
}

/// One entry of the `userList` sent to `SCS_EDIT_SECURE_SITE`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecureSiteMember {
    pub login: String,
    pub change: MemberChange,
}

/// A mutating IDC operation, carrying exactly the fields its service needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum IdcOperation {
    CopySite(CopySiteForm),
    PublishSite {
        site_id: String,
    },
    UnpublishSite {
        site_id: String,
    },
    ActivateSite {
        site_id: String,
    },
    DeactivateSite {
        site_id: String,
    },
    ImportTemplatePackage {
        file_id: String,
    },
    EditSecureSite {
        site_id: String,
        access_code: u32,
        members: Vec<SecureSiteMember>,
    },
}

impl IdcOperation {
    pub fn service(&self) -> IdcService {
        match self {
            Self::CopySite(_) => IdcService::CopySites,
            Self::PublishSite { .. } => IdcService::PublishSite,
            Self::UnpublishSite { .. } => IdcService::UnpublishSite,
            Self::ActivateSite { .. } => IdcService::ActivateSite,
            Self::DeactivateSite { .. } => IdcService::DeactivateSite,
            Self::ImportTemplatePackage { .. } => IdcService::ImportTemplatePackage,
            Self::EditSecureSite { .. } => IdcService::EditSecureSite,
        }
    }

    /// Form fields for the upstream POST, excluding `idcToken`.
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        match self {
            Self::CopySite(form) => copy_site_fields(form),
            Self::PublishSite { site_id } | Self::UnpublishSite { site_id } => {
                vec![("item", folder_item(site_id))]
            }
            Self::ActivateSite { site_id } | Self::DeactivateSite { site_id } => vec![
                ("item", folder_item(site_id)),
                ("isSitePublishV2", "1".into()),
            ],
            Self::ImportTemplatePackage { file_id } => vec![
                ("item", format!("fFileGUID:{file_id}")),
                ("useBackgroundThread", "true".into()),
                ("ThemeConflictResolution", "overwrite".into()),
                ("TemplateConflictResolution", "overwrite".into()),
                ("DefaultComponentConflictResolution", "true".into()),
                ("allowCrossTenant", "true".into()),
            ],
            Self::EditSecureSite {
                site_id,
                access_code,
                members,
            } => {
                let mut fields = vec![
                    ("item", folder_item(site_id)),
                    ("xScsIsSecureSite", access_code.to_string()),
                ];
                if !members.is_empty() {
                    let list = members
                        .iter()
                        .map(|m| {
                            let flag = match m.change {
                                MemberChange::Add => 'A',
                                MemberChange::Delete => 'D',
                            };
                            format!("{}:{flag}", m.login)
                        })
                        .collect::<Vec<_>>()
                        .join(",");
                    fields.push(("userList", list));
                }
                fields
            }
        }
    }
}

fn folder_item(id: &str) -> String {
    format!("fFolderGUID:{id}")
}

fn copy_site_fields(form: &CopySiteForm) -> Vec<(&'static str, String)> {
    let mut fields = vec![
        ("names", form.site_name.clone()),
        ("descriptions", form.description.clone()),
        ("items", folder_item(&form.template_id)),
    ];
    if let Some(ent) = &form.enterprise {
        fields.push(("isEnterprise", "1".into()));
        fields.push((
            "repository",
            format!("{}:{}", ent.repository.prefix.as_str(), ent.repository.id),
        ));
        fields.push(("slugPrefix", ent.slug_prefix.clone()));
        if let Some(lang) = &ent.default_language {
            fields.push(("defaultLanguage", lang.clone()));
        }
        if let Some(policy) = &ent.localization_policy_id {
            fields.push(("localizationPolicy", policy.clone()));
        }
    }
    fields.push(("useBackgroundThread", "1".into()));
    if form.preserve_content_ids {
        fields.push(("doPreserveCaaSGUID", "1".into()));
    }
    fields
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::str::FromStr;

    use pretty_assertions::assert_eq;
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn service_names_round_trip_through_strum() {
        for service in IdcService::iter() {
            assert_eq!(IdcService::from_str(service.as_ref()).unwrap(), service);
        }
        assert!(IdcService::from_str("SCS_DELETE_EVERYTHING").is_err());
    }

    #[test]
    fn standard_copy_site_sends_minimal_form() {
        let op = IdcOperation::CopySite(CopySiteForm {
            site_name: "mysite".into(),
            description: String::new(),
            template_id: "T1".into(),
            enterprise: None,
            preserve_content_ids: false,
        });
        assert_eq!(op.service(), IdcService::CopySites);
        assert_eq!(
            op.form_fields(),
            vec![
                ("names", "mysite".to_owned()),
                ("descriptions", String::new()),
                ("items", "fFolderGUID:T1".to_owned()),
                ("useBackgroundThread", "1".to_owned()),
            ]
        );
    }

    #[test]
    fn enterprise_copy_site_carries_repository_and_policy() {
        let op = IdcOperation::CopySite(CopySiteForm {
            site_name: "Blog".into(),
            description: "d".into(),
            template_id: "T1".into(),
            enterprise: Some(EnterpriseCopy {
                repository: RepositoryRef {
                    prefix: RepositoryPrefix::CaasGuid,
                    id: "R1".into(),
                },
                slug_prefix: "blog".into(),
                default_language: Some("en-US".into()),
                localization_policy_id: Some("P1".into()),
            }),
            preserve_content_ids: true,
        });
        let fields = op.form_fields();
        assert!(fields.contains(&("isEnterprise", "1".to_owned())));
        assert!(fields.contains(&("repository", "arCaaSGUID:R1".to_owned())));
        assert!(fields.contains(&("localizationPolicy", "P1".to_owned())));
        assert!(fields.contains(&("doPreserveCaaSGUID", "1".to_owned())));
    }

    #[test]
    fn only_runtime_changes_use_publish_v2() {
        let activate = IdcOperation::ActivateSite { site_id: "S".into() }.form_fields();
        let publish = IdcOperation::PublishSite { site_id: "S".into() }.form_fields();
        assert!(activate.contains(&("isSitePublishV2", "1".to_owned())));
        assert_eq!(publish, vec![("item", "fFolderGUID:S".to_owned())]);
    }

    #[test]
    fn secure_site_encodes_member_changes() {
        let op = IdcOperation::EditSecureSite {
            site_id: "S".into(),
            access_code: 18,
            members: vec![
                SecureSiteMember {
                    login: "alice".into(),
                    change: MemberChange::Add,
                },
                SecureSiteMember {
                    login: "bob".into(),
                    change: MemberChange::Delete,
                },
            ],
        };
        let fields = op.form_fields();
        assert!(fields.contains(&("xScsIsSecureSite", "18".to_owned())));
        assert!(fields.contains(&("userList", "alice:A,bob:D".to_owned())));
    }

    #[test]
    fn repository_prefix_follows_server_version() {
        assert_eq!(
            RepositoryPrefix::for_version(Some("19.4.2")),
            RepositoryPrefix::FolderGuid
        );
        assert_eq!(
            RepositoryPrefix::for_version(Some("19.4.3")),
            RepositoryPrefix::CaasGuid
        );
        assert_eq!(
            RepositoryPrefix::for_version(Some("v20.1.1-build7")),
            RepositoryPrefix::CaasGuid
        );
        assert_eq!(RepositoryPrefix::for_version(Some("19")), RepositoryPrefix::FolderGuid);
        assert_eq!(RepositoryPrefix::for_version(None), RepositoryPrefix::CaasGuid);
    }
}
