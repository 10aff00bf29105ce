// ── Principal resolution ──
//
// Turn user and group names typed on the command line into documents
// principals. Names that do not resolve are collected rather than
// failing the batch; callers report them and carry on with the rest.

use futures::future::join_all;
use tracing::warn;

use sitectl_api::RestClient;
use sitectl_api::rest::types::{DocGroup, DocUser};

use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrincipalKind {
    User,
    Group,
}

impl PrincipalKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Group => "group",
        }
    }
}

/// A resolved user or group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub kind: PrincipalKind,
    pub id: String,
    /// The name as the user typed it.
    pub name: String,
    /// Login name for users, group name for groups.
    pub login: String,
}

/// Outcome of resolving a batch of names.
#[derive(Debug, Default)]
pub struct Resolution {
    pub found: Vec<Principal>,
    pub missing: Vec<(PrincipalKind, String)>,
}

impl Resolution {
    fn merge(&mut self, other: Resolution) {
        self.found.extend(other.found);
        self.missing.extend(other.missing);
    }
}

/// Resolve groups by name, ignoring case. One listing serves the batch.
pub async fn resolve_groups(rest: &RestClient, names: &[String]) -> Result<Resolution, CoreError> {
    let mut resolution = Resolution::default();
    if names.is_empty() {
        return Ok(resolution);
    }
    let groups = rest.groups().await?;
    for name in names {
        match find_group(&groups, name) {
            Some(group) => resolution.found.push(Principal {
                kind: PrincipalKind::Group,
                id: group.group_id.clone(),
                name: name.clone(),
                login: group.name.clone(),
            }),
            None => resolution.missing.push((PrincipalKind::Group, name.clone())),
        }
    }
    Ok(resolution)
}

/// Resolve users by login name, ignoring case. Lookups run concurrently;
/// a failed lookup counts as not found.
pub async fn resolve_users(rest: &RestClient, names: &[String]) -> Resolution {
    let lookups = names.iter().map(|name| async move {
        match rest.search_users(name).await {
            Ok(users) => (name, users),
            Err(e) => {
                warn!(user = %name, error = %e, "user lookup failed");
                (name, Vec::new())
            }
        }
    });

    let mut resolution = Resolution::default();
    for (name, users) in join_all(lookups).await {
        match find_user(&users, name) {
            Some(user) => resolution.found.push(Principal {
                kind: PrincipalKind::User,
                id: user.id.clone(),
                name: name.clone(),
                login: user.login_name.clone().unwrap_or_else(|| name.clone()),
            }),
            None => resolution.missing.push((PrincipalKind::User, name.clone())),
        }
    }
    resolution
}

/// Groups first, then users.
pub async fn resolve_all(
    rest: &RestClient,
    groups: &[String],
    users: &[String],
) -> Result<Resolution, CoreError> {
    let mut resolution = resolve_groups(rest, groups).await?;
    resolution.merge(resolve_users(rest, users).await);
    Ok(resolution)
}

fn find_group<'a>(groups: &'a [DocGroup], name: &str) -> Option<&'a DocGroup> {
    groups.iter().find(|g| g.name.eq_ignore_ascii_case(name))
}

fn find_user<'a>(users: &'a [DocUser], name: &str) -> Option<&'a DocUser> {
    users.iter().find(|u| {
        u.login_name
            .as_deref()
            .is_some_and(|login| login.eq_ignore_ascii_case(name))
    })
}
