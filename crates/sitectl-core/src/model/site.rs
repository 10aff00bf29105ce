// ── Site domain types ──
//
// A transport-neutral view of a site, built from either an IDC browse row
// or a REST site resource, plus the runtime/publish transitions and the
// ordering rules between them.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use sitectl_api::idc::{IdcOperation, IdcSite};
use sitectl_api::rest::SiteTransition;
use sitectl_api::rest::types::RestSite;

use crate::error::CoreError;

pub const SITE_PREFIX_MAX: usize = 15;
const TRANSIENT_TEMPLATE_MAX: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RuntimeStatus {
    Online,
    Offline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PublishStatus {
    Published,
    #[strum(serialize = "unpublished")]
    Draft,
}

/// Runtime and publish state of one site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SiteStatus {
    pub runtime: RuntimeStatus,
    pub publish: PublishStatus,
}

impl SiteStatus {
    pub fn new(runtime: RuntimeStatus, publish: PublishStatus) -> Self {
        Self { runtime, publish }
    }

    pub fn is_online(self) -> bool {
        self.runtime == RuntimeStatus::Online
    }

    pub fn is_published(self) -> bool {
        self.publish == PublishStatus::Published
    }
}

/// A site as this crate sees it, whichever surface it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Site {
    pub id: String,
    pub name: String,
    pub status: SiteStatus,
    pub enterprise: bool,
    /// Legacy access code; `None` or `0` for a public site.
    pub access_code: Option<u32>,
}

impl Site {
    pub fn is_secure(&self) -> bool {
        self.access_code.is_some_and(|c| c != 0)
    }
}

impl From<&IdcSite> for Site {
    fn from(site: &IdcSite) -> Self {
        Self {
            id: site.id.clone(),
            name: site.name.clone(),
            status: SiteStatus::new(
                if site.online {
                    RuntimeStatus::Online
                } else {
                    RuntimeStatus::Offline
                },
                if site.published {
                    PublishStatus::Published
                } else {
                    PublishStatus::Draft
                },
            ),
            enterprise: site.enterprise,
            access_code: site.secure_site.as_deref().and_then(|c| c.parse().ok()),
        }
    }
}

impl From<&RestSite> for Site {
    fn from(site: &RestSite) -> Self {
        let runtime = match site.runtime_status.as_deref() {
            Some(s) if s.eq_ignore_ascii_case("online") => RuntimeStatus::Online,
            _ => RuntimeStatus::Offline,
        };
        let publish = match site.publish_status.as_deref() {
            Some(s) if s.eq_ignore_ascii_case("published") => PublishStatus::Published,
            _ => PublishStatus::Draft,
        };
        Self {
            id: site.id.clone(),
            name: site.name.clone(),
            status: SiteStatus::new(runtime, publish),
            enterprise: site.is_enterprise,
            access_code: None,
        }
    }
}

// ── Control actions ─────────────────────────────────────────────────

/// A runtime or publish transition requested by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
#[serde(rename_all = "kebab-case")]
pub enum SiteAction {
    Publish,
    Unpublish,
    BringOnline,
    TakeOffline,
}

impl SiteAction {
    /// Check the ordering rules. A site must be published before it can go
    /// online and offline before it can be unpublished. A transition to the
    /// state the site is already in is rejected.
    pub fn check(self, site_name: &str, status: SiteStatus) -> Result<(), CoreError> {
        let reason = match self {
            Self::Publish => return Ok(()),
            Self::TakeOffline if !status.is_online() => "is already offline",
            Self::BringOnline if status.is_online() => "is already online",
            Self::BringOnline if !status.is_published() => "is draft, publish it first",
            Self::Unpublish if status.is_online() => "is online, take it offline first",
            Self::Unpublish if !status.is_published() => "is draft",
            Self::TakeOffline | Self::BringOnline | Self::Unpublish => return Ok(()),
        };
        Err(CoreError::invalid_state(format!("site {site_name} {reason}")))
    }

    pub fn idc_operation(self, site_id: &str) -> IdcOperation {
        let site_id = site_id.to_owned();
        match self {
            Self::Publish => IdcOperation::PublishSite { site_id },
            Self::Unpublish => IdcOperation::UnpublishSite { site_id },
            Self::BringOnline => IdcOperation::ActivateSite { site_id },
            Self::TakeOffline => IdcOperation::DeactivateSite { site_id },
        }
    }

    pub fn rest_transition(self) -> SiteTransition {
        match self {
            Self::Publish => SiteTransition::Publish,
            Self::Unpublish => SiteTransition::Unpublish,
            Self::BringOnline => SiteTransition::Activate,
            Self::TakeOffline => SiteTransition::Deactivate,
        }
    }

    /// Line printed once the transition has finished.
    pub fn finished_message(self, site_name: &str) -> String {
        match self {
            Self::BringOnline => format!("site {site_name} is online now"),
            Self::TakeOffline => format!("site {site_name} is offline now"),
            Self::Publish | Self::Unpublish => format!("{self} {site_name} finished"),
        }
    }
}

// ── Naming rules ────────────────────────────────────────────────────

/// Default `sitePrefix`: the lower-cased site name, at most 15 characters.
pub fn default_site_prefix(site_name: &str) -> String {
    site_name
        .to_lowercase()
        .chars()
        .take(SITE_PREFIX_MAX)
        .collect()
}

/// Name for a template that only lives while a site is being cloned.
pub fn transient_template_name(site_name: &str) -> String {
    format!("{site_name}{}", Uuid::new_v4().simple())
        .chars()
        .take(TRANSIENT_TEMPLATE_MAX)
        .collect()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::str::FromStr;

    use super::*;

    const STATES: [SiteStatus; 4] = [
        SiteStatus {
            runtime: RuntimeStatus::Online,
            publish: PublishStatus::Published,
        },
        SiteStatus {
            runtime: RuntimeStatus::Online,
            publish: PublishStatus::Draft,
        },
        SiteStatus {
            runtime: RuntimeStatus::Offline,
            publish: PublishStatus::Published,
        },
        SiteStatus {
            runtime: RuntimeStatus::Offline,
            publish: PublishStatus::Draft,
        },
    ];

    fn runs(action: SiteAction, status: SiteStatus) -> bool {
        action.check("s", status).is_ok()
    }

    #[test]
    fn bring_online_runs_only_for_offline_published_sites() {
        for status in STATES {
            let expected = !status.is_online() && status.is_published();
            assert_eq!(runs(SiteAction::BringOnline, status), expected, "{status:?}");
        }
    }

    #[test]
    fn take_offline_runs_only_for_online_sites() {
        for status in STATES {
            assert_eq!(
                runs(SiteAction::TakeOffline, status),
                status.is_online(),
                "{status:?}"
            );
        }
    }

    #[test]
    fn unpublish_runs_only_for_offline_published_sites() {
        for status in STATES {
            let expected = !status.is_online() && status.is_published();
            assert_eq!(runs(SiteAction::Unpublish, status), expected, "{status:?}");
        }
    }

    #[test]
    fn publish_always_runs() {
        assert!(STATES.iter().all(|s| runs(SiteAction::Publish, *s)));
    }

    #[test]
    fn rejections_name_the_required_step() {
        let draft = SiteStatus::new(RuntimeStatus::Offline, PublishStatus::Draft);
        let err = SiteAction::BringOnline.check("blog", draft).unwrap_err();
        assert_eq!(err.to_string(), "site blog is draft, publish it first");

        let online = SiteStatus::new(RuntimeStatus::Online, PublishStatus::Published);
        let err = SiteAction::Unpublish.check("blog", online).unwrap_err();
        assert_eq!(err.to_string(), "site blog is online, take it offline first");
    }

    #[test]
    fn repeating_the_current_runtime_state_is_rejected() {
        let online = SiteStatus::new(RuntimeStatus::Online, PublishStatus::Published);
        let err = SiteAction::BringOnline.check("blog", online).unwrap_err();
        assert_eq!(err.to_string(), "site blog is already online");

        let offline = SiteStatus::new(RuntimeStatus::Offline, PublishStatus::Published);
        let err = SiteAction::TakeOffline.check("blog", offline).unwrap_err();
        assert_eq!(err.to_string(), "site blog is already offline");
    }

    #[test]
    fn actions_parse_from_cli_verbs() {
        assert_eq!(
            SiteAction::from_str("bring-online").unwrap(),
            SiteAction::BringOnline
        );
        assert_eq!(SiteAction::TakeOffline.to_string(), "take-offline");
        assert!(SiteAction::from_str("delete").is_err());
    }

    #[test]
    fn naming_rules_truncate() {
        assert_eq!(default_site_prefix("MyVeryLongSiteNameHere"), "myverylongsiten");
        let name = transient_template_name("Blog");
        assert!(name.starts_with("Blog"));
        assert_eq!(name.chars().count(), 36);
        let long = transient_template_name("AnExtremelyLongSiteNameForTesting");
        assert_eq!(long.chars().count(), 40);
    }

    #[test]
    fn idc_rows_become_sites() {
        let row = IdcSite {
            id: "F1".into(),
            name: "blog".into(),
            online: true,
            published: true,
            enterprise: false,
            secure_site: Some("22".into()),
        };
        let site = Site::from(&row);
        assert!(site.status.is_online());
        assert!(site.is_secure());
        assert_eq!(site.access_code, Some(22));
    }
}
