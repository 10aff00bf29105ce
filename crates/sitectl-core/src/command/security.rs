// Set who must sign in to a site and who may view it once online.
//
// Security can only change while the site is offline. On the legacy
// surface the audience is one access code plus a user list delta; on
// REST it is a list of audience values plus per-member grants.

use futures::future::join_all;
use serde::Serialize;
use strum::IntoEnumIterator;
use tracing::warn;

use sitectl_api::RestClient;
use sitectl_api::idc::{IdcOperation, MemberChange, SecureSiteMember};
use sitectl_api::rest::types::RestSite;

use crate::collab::Reporter;
use crate::command::requests::SiteSecurityRequest;
use crate::controller::SiteController;
use crate::error::CoreError;
use crate::model::{AccessGroup, EVERYONE, PUBLIC_ACCESS_CODE, Site, SiteAccess};
use crate::principals::{Principal, resolve_users};
use crate::session::with_relay;

const NAMED_MEMBER_PREFIX: &str = "user:";

/// Security settings of a site after an update.
#[derive(Debug, Clone, Serialize)]
pub struct SecuritySummary {
    pub site: String,
    pub signin: bool,
    /// Audience labels allowed on the site once online.
    pub access: Vec<String>,
    /// Named viewers; only present when specific users are allowed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub viewers: Option<Vec<String>>,
}

impl SecuritySummary {
    fn new(site: &str, signin: bool, access: &SiteAccess, viewers: Vec<String>) -> Self {
        Self {
            site: site.to_owned(),
            signin,
            access: access.groups().iter().map(|g| g.label().to_owned()).collect(),
            viewers: (signin && access.contains(AccessGroup::SpecificUsers)).then_some(viewers),
        }
    }

    /// The settings table as printable lines.
    pub fn render(&self) -> Vec<String> {
        let field = |label: &str, value: &str| format!("   {label:<50} {value}");
        let mut lines = vec![
            " - site security settings updated:".to_owned(),
            field("Site", &self.site),
            field(
                "Require everyone to sign in to access",
                if self.signin { "yes" } else { "no" },
            ),
        ];
        if self.signin {
            lines.push(field("Who can access this site when it goes online", ""));
            for group in AccessGroup::iter() {
                let checked = if self.access.iter().any(|a| a == group.label()) {
                    "√"
                } else {
                    ""
                };
                lines.push(format!("           {checked:<2}  {}", group.label()));
            }
            if let Some(viewers) = &self.viewers {
                lines.push(field("Published site viewers", ""));
                lines.push(format!("           {}", viewers.join(", ")));
            }
        }
        lines.into_iter().map(|l| l.trim_end().to_owned()).collect()
    }
}

pub(crate) async fn set_site_security(
    ctl: &SiteController,
    req: &SiteSecurityRequest,
) -> Result<SecuritySummary, CoreError> {
    let reporter = ctl.reporter();
    let requested = check_request(req, reporter)?;

    if ctl.connection().uses_rest() {
        set_security_rest(ctl, req, requested).await
    } else {
        set_security_idc(ctl, req, requested).await
    }
}

/// Reject contradictory requests before touching the server. Returns the
/// requested audience, if any.
fn check_request(
    req: &SiteSecurityRequest,
    reporter: &dyn Reporter,
) -> Result<Option<SiteAccess>, CoreError> {
    if !req.signin {
        if req.access.is_some() {
            reporter.step("ignore argument <access>");
        }
        if !req.add_users.is_empty() {
            reporter.step("ignore argument <addusers>");
        }
        if !req.delete_users.is_empty() {
            reporter.step("ignore argument <deleteusers>");
        }
        return Ok(None);
    }

    if let Some(user) = req
        .delete_users
        .iter()
        .find(|d| req.add_users.iter().any(|a| a.eq_ignore_ascii_case(d)))
    {
        return Err(CoreError::validation(format!(
            "user {user} in both <addusers> and <deleteusers>"
        )));
    }

    match &req.access {
        Some(labels) => {
            let access = SiteAccess::from_labels(labels)?;
            access.code()?;
            Ok(Some(access))
        }
        None => Ok(None),
    }
}

fn check_site(
    req: &SiteSecurityRequest,
    runtime: &str,
    online: bool,
    secured: bool,
    reporter: &dyn Reporter,
) -> Result<(), CoreError> {
    reporter.step(&format!(
        "get site: runtimeStatus: {runtime} securityStatus: {}",
        if secured { "secured" } else { "public" }
    ));
    if !req.signin && !secured {
        return Err(CoreError::invalid_state(
            "site is already publicly available to anyone",
        ));
    }
    if online {
        return Err(CoreError::invalid_state(
            "site is currently online. In order to change the security setting you must first bring this site offline.",
        ));
    }
    Ok(())
}

/// Resolve the users to add and delete, reporting unknown names.
async fn resolve_members(
    rest: &RestClient,
    req: &SiteSecurityRequest,
    reporter: &dyn Reporter,
) -> (Vec<Principal>, Vec<Principal>, bool) {
    if !req.signin || (req.add_users.is_empty() && req.delete_users.is_empty()) {
        return (Vec::new(), Vec::new(), false);
    }
    let adds = resolve_users(rest, &req.add_users).await;
    let deletes = resolve_users(rest, &req.delete_users).await;
    reporter.step("verify users");

    let mut missing = false;
    for (_, name) in adds.missing.iter().chain(&deletes.missing) {
        reporter.error(&format!("user {name} does not exist"));
        missing = true;
    }
    (adds.found, deletes.found, missing)
}

// ── Legacy path ──────────────────────────────────────────────────────

async fn set_security_idc(
    ctl: &SiteController,
    req: &SiteSecurityRequest,
    requested: Option<SiteAccess>,
) -> Result<SecuritySummary, CoreError> {
    let reporter = ctl.reporter();
    let rest = ctl.connection().rest_client()?;

    with_relay(ctl.connection(), reporter, |s| async move {
        reporter.step("establish user session");
        let site = s
            .idc
            .find_site(&req.name)
            .await?
            .ok_or_else(|| CoreError::not_found("site", &req.name))?;
        let site = Site::from(&site);
        let secured = site.is_secure();
        check_site(
            req,
            &site.status.runtime.to_string(),
            site.status.is_online(),
            secured,
            reporter,
        )?;

        let (adds, deletes, _) = resolve_members(&rest, req, reporter).await;
        let members: Vec<SecureSiteMember> = adds
            .iter()
            .map(|p| (p, MemberChange::Add))
            .chain(deletes.iter().map(|p| (p, MemberChange::Delete)))
            .map(|(p, change)| SecureSiteMember {
                login: p.login.clone(),
                change,
            })
            .collect();
        if req.signin
            && members.is_empty()
            && !(req.add_users.is_empty() && req.delete_users.is_empty())
        {
            return Err(CoreError::validation("no valid user to add or delete"));
        }

        let access = if !req.signin {
            SiteAccess::default()
        } else if !secured || requested.is_some() {
            requested.unwrap_or_else(SiteAccess::all)
        } else {
            SiteAccess::from_code(site.access_code.unwrap_or(PUBLIC_ACCESS_CODE))?
        };
        let access_code = if req.signin {
            access.code()?
        } else {
            PUBLIC_ACCESS_CODE
        };

        s.run(&IdcOperation::EditSecureSite {
            site_id: site.id.clone(),
            access_code,
            members,
        })
        .await?;

        let viewers = if req.signin {
            s.idc.secure_site_users(&site.id).await?
        } else {
            Vec::new()
        };
        Ok(SecuritySummary::new(&req.name, req.signin, &access, viewers))
    })
    .await
}

// ── REST path ────────────────────────────────────────────────────────

async fn set_security_rest(
    ctl: &SiteController,
    req: &SiteSecurityRequest,
    requested: Option<SiteAccess>,
) -> Result<SecuritySummary, CoreError> {
    let reporter = ctl.reporter();
    let rest = ctl.connection().rest_client()?;

    let site = rest
        .get_site(&req.name, &["access"])
        .await?
        .ok_or_else(|| CoreError::not_found("site", &req.name))?;
    let current = site
        .security
        .as_ref()
        .map(|s| s.access.clone())
        .unwrap_or_default();
    let secured = !current.iter().any(|a| a == EVERYONE);
    let runtime = site.runtime_status.clone().unwrap_or_default();
    check_site(
        req,
        &runtime,
        runtime.eq_ignore_ascii_case("online"),
        secured,
        reporter,
    )?;

    let (adds, deletes, missing) = resolve_members(&rest, req, reporter).await;
    let existing = member_logins(&site);
    let adds: Vec<Principal> = adds
        .into_iter()
        .filter(|p| !existing.iter().any(|m| m.eq_ignore_ascii_case(&p.login)))
        .collect();
    let deletes: Vec<Principal> = deletes
        .into_iter()
        .filter(|p| existing.iter().any(|m| m.eq_ignore_ascii_case(&p.login)))
        .collect();
    if missing && adds.is_empty() && deletes.is_empty() {
        return Err(CoreError::validation("no valid user to add or delete"));
    }

    let values = if !req.signin {
        vec![EVERYONE.to_owned()]
    } else if let Some(access) = &requested {
        access.rest_values()
    } else if secured {
        current
    } else {
        SiteAccess::all().rest_values()
    };
    rest.set_site_runtime_access(&site.id, &values).await?;

    let named = values
        .iter()
        .any(|v| v == AccessGroup::SpecificUsers.rest_value());
    if named {
        let removals = deletes.iter().map(|p| {
            let member = format!("{NAMED_MEMBER_PREFIX}{}", p.login);
            let (rest, id) = (&rest, &site.id);
            async move { (p, rest.remove_site_access(id, &member).await) }
        });
        report_failures(join_all(removals).await, reporter);

        let grants = adds.iter().map(|p| {
            let member = format!("{NAMED_MEMBER_PREFIX}{}", p.login);
            let (rest, id) = (&rest, &site.id);
            async move { (p, rest.grant_site_access(id, &member).await) }
        });
        report_failures(join_all(grants).await, reporter);
    } else if !adds.is_empty() || !deletes.is_empty() {
        reporter.step(
            "add or remove member is not allowed when 'Specific users' is not selected for site",
        );
    }

    let site = rest.get_site_by_id(&site.id, &["access"]).await?;
    let access = SiteAccess::from_rest_values(
        &site
            .security
            .as_ref()
            .map(|s| s.access.clone())
            .unwrap_or_default(),
    );
    let viewers = site
        .access
        .iter()
        .flat_map(|a| a.items.iter())
        .map(|m| m.display_name.clone().unwrap_or_else(|| m.name.clone()))
        .collect();
    Ok(SecuritySummary::new(&req.name, req.signin, &access, viewers))
}

/// Login names of the named members of a site.
fn member_logins(site: &RestSite) -> Vec<String> {
    site.access
        .iter()
        .flat_map(|a| a.items.iter())
        .map(|m| {
            m.name
                .strip_prefix(NAMED_MEMBER_PREFIX)
                .unwrap_or(&m.name)
                .to_owned()
        })
        .collect()
}

fn report_failures(
    results: Vec<(&Principal, Result<(), sitectl_api::Error>)>,
    reporter: &dyn Reporter,
) {
    for (principal, result) in results {
        if let Err(e) = result {
            warn!(user = %principal.login, error = %e, "site access change failed");
            reporter.error(&format!("user {}: {e}", principal.login));
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::collab::MemoryReporter;

    fn request(signin: bool) -> SiteSecurityRequest {
        SiteSecurityRequest {
            name: "blog".into(),
            signin,
            ..SiteSecurityRequest::default()
        }
    }

    #[test]
    fn same_user_cannot_be_added_and_deleted() {
        let mut req = request(true);
        req.add_users = vec!["Alice".into()];
        req.delete_users = vec!["alice".into()];
        let err = check_request(&req, &MemoryReporter::new()).unwrap_err();
        assert!(err.to_string().contains("user alice in both"));
    }

    #[test]
    fn public_request_ignores_other_arguments() {
        let mut req = request(false);
        req.access = Some(vec!["Robots".into()]);
        req.add_users = vec!["alice".into()];
        let reporter = MemoryReporter::new();
        assert!(check_request(&req, &reporter).unwrap().is_none());
        assert!(reporter.contains("ignore argument <access>"));
        assert!(reporter.contains("ignore argument <addusers>"));
    }

    #[test]
    fn audience_outside_the_table_is_rejected_up_front() {
        let mut req = request(true);
        req.access = Some(vec!["Cloud users".into(), "Visitors".into()]);
        assert!(matches!(
            check_request(&req, &MemoryReporter::new()),
            Err(CoreError::InvalidAccessSet(_))
        ));
    }

    #[test]
    fn online_site_is_refused() {
        let reporter = MemoryReporter::new();
        let err = check_site(&request(true), "online", true, true, &reporter).unwrap_err();
        assert!(err.to_string().starts_with("site is currently online"));
        let err = check_site(&request(false), "offline", false, false, &reporter).unwrap_err();
        assert_eq!(err.to_string(), "site is already publicly available to anyone");
    }

    #[test]
    fn summary_table_marks_allowed_groups() {
        let access = SiteAccess::from_code(18).unwrap();
        let summary = SecuritySummary::new("blog", true, &access, vec!["Alice".into()]);
        assert_eq!(
            summary.render(),
            vec![
                " - site security settings updated:",
                "   Site                                               blog",
                "   Require everyone to sign in to access              yes",
                "   Who can access this site when it goes online",
                "               Cloud users",
                "           √   Visitors",
                "               Service users",
                "           √   Specific users",
                "   Published site viewers",
                "           Alice",
            ]
        );
    }
}
