// Share a site folder with users and groups, or take that access away.
//
// Names that do not resolve are reported and skipped. Grants and revokes
// run concurrently; each outcome is reported on its own and the command
// succeeds when at least one of them went through.

use futures::future::join_all;
use tracing::warn;

use sitectl_api::RestClient;
use sitectl_api::rest::types::{FolderMember, ShareResult};

use crate::collab::Reporter;
use crate::command::requests::{ShareSiteRequest, UnshareSiteRequest};
use crate::command::{CommandResult, verify_site};
use crate::controller::SiteController;
use crate::error::CoreError;
use crate::principals::{Principal, resolve_all};

pub(crate) async fn share_site(
    ctl: &SiteController,
    req: &ShareSiteRequest,
) -> Result<CommandResult, CoreError> {
    let reporter = ctl.reporter();
    let rest = ctl.connection().rest_client()?;

    let site = verify_site(&rest, &req.name, &[], reporter).await?;
    let principals = resolve(&rest, &req.groups, &req.users, reporter).await?;
    let members = rest.folder_members(&site.id).await?;

    let role = req.role.to_string();
    let grants = principals.iter().map(|p| {
        let create = !is_member(&members, p);
        let (rest, site_id, role) = (&rest, &site.id, &role);
        async move { (p, rest.share_folder(site_id, &p.id, role, create).await) }
    });

    let mut tally = Tally::default();
    for (principal, result) in join_all(grants).await {
        let granted = result.as_ref().ok().and_then(|r| r.role.clone());
        tally.record(principal, result, reporter, |p| {
            format!(
                "{} {} granted \"{}\" on site {}",
                p.kind.as_str(),
                p.login,
                granted.as_deref().unwrap_or(role.as_str()),
                req.name
            )
        });
    }
    tally.finish("share")
}

pub(crate) async fn unshare_site(
    ctl: &SiteController,
    req: &UnshareSiteRequest,
) -> Result<CommandResult, CoreError> {
    let reporter = ctl.reporter();
    let rest = ctl.connection().rest_client()?;

    let site = verify_site(&rest, &req.name, &[], reporter).await?;
    let principals = resolve(&rest, &req.groups, &req.users, reporter).await?;
    let members = rest.folder_members(&site.id).await?;

    let (current, outsiders): (Vec<&Principal>, Vec<&Principal>) =
        principals.iter().partition(|p| is_member(&members, p));
    for p in outsiders {
        reporter.step(&format!("{} {} has no access to the site", p.kind.as_str(), p.login));
    }

    let revokes = current.into_iter().map(|p| {
        let (rest, site_id) = (&rest, &site.id);
        async move { (p, rest.unshare_folder(site_id, &p.id).await) }
    });

    let mut tally = Tally::default();
    for (principal, result) in join_all(revokes).await {
        tally.record(principal, result, reporter, |p| {
            format!("{} {}'s access to the site removed", p.kind.as_str(), p.login)
        });
    }
    tally.finish("unshare")
}

/// Resolve groups then users, reporting the names that do not exist.
/// Fails only when nothing resolved.
async fn resolve(
    rest: &RestClient,
    groups: &[String],
    users: &[String],
    reporter: &dyn Reporter,
) -> Result<Vec<Principal>, CoreError> {
    let resolution = resolve_all(rest, groups, users).await?;
    if !groups.is_empty() {
        reporter.step("verify groups");
    }
    if !users.is_empty() {
        reporter.step("verify users");
    }
    for (kind, name) in &resolution.missing {
        reporter.error(&format!("{} {name} does not exist", kind.as_str()));
    }
    if resolution.found.is_empty() {
        return Err(CoreError::validation("no valid user or group"));
    }
    Ok(resolution.found)
}

fn is_member(members: &[FolderMember], principal: &Principal) -> bool {
    members.iter().any(|m| m.user.id == principal.id)
}

#[derive(Debug, Default)]
struct Tally {
    succeeded: usize,
    failed: usize,
}

impl Tally {
    fn record(
        &mut self,
        principal: &Principal,
        result: Result<ShareResult, sitectl_api::Error>,
        reporter: &dyn Reporter,
        success_line: impl FnOnce(&Principal) -> String,
    ) {
        match result {
            Ok(r) if r.is_success() => {
                self.succeeded += 1;
                reporter.step(&success_line(principal));
            }
            Ok(r) => {
                self.failed += 1;
                reporter.error(
                    r.title
                        .as_deref()
                        .unwrap_or("the server rejected the request"),
                );
            }
            Err(e) => {
                self.failed += 1;
                warn!(principal = %principal.login, error = %e, "share call failed");
                reporter.error(&format!("{} {}: {e}", principal.kind.as_str(), principal.login));
            }
        }
    }

    /// At least one member must have gone through.
    fn finish(self, verb: &str) -> Result<CommandResult, CoreError> {
        if self.succeeded == 0 {
            return Err(CoreError::validation(format!(
                "failed to {verb} site with any user or group"
            )));
        }
        Ok(CommandResult::Shared {
            succeeded: self.succeeded,
            failed: self.failed,
        })
    }
}
