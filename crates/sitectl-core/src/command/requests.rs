// ── Typed request structs for Command payloads ──

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::config::ServerConnection;

// ── Create / transfer / migrate ────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateSiteRequest {
    pub name: String,
    pub template: String,
    /// Giving a repository makes the new site an enterprise site.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub localization_policy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site_prefix: Option<String>,
    /// Keep the content ids of the template's assets.
    pub update_content: bool,
}

/// Clone a site from the controller's server onto `destination`.
#[derive(Debug, Clone)]
pub struct TransferSiteRequest {
    pub name: String,
    pub destination: ServerConnection,
    pub repository: Option<String>,
    pub localization_policy: Option<String>,
    pub site_prefix: Option<String>,
}

/// Create a site on the controller's server from a site on an
/// internal-only `source`, or from a template zip exported earlier.
#[derive(Debug, Clone, Default)]
pub struct MigrateSiteRequest {
    /// Site on the source server.
    pub site: String,
    pub source: Option<ServerConnection>,
    pub template_file: Option<PathBuf>,
    /// Name of the new site; defaults to `site`.
    pub name: Option<String>,
    pub repository: String,
    pub description: Option<String>,
    pub site_prefix: Option<String>,
}

// ── Sharing ────────────────────────────────────────────────────────

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum ShareRole {
    Manager,
    Contributor,
    Downloader,
    #[default]
    Viewer,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShareSiteRequest {
    pub name: String,
    #[serde(default)]
    pub users: Vec<String>,
    #[serde(default)]
    pub groups: Vec<String>,
    pub role: ShareRole,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnshareSiteRequest {
    pub name: String,
    #[serde(default)]
    pub users: Vec<String>,
    #[serde(default)]
    pub groups: Vec<String>,
}

// ── Security ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SiteSecurityRequest {
    pub name: String,
    /// `false` makes the site public.
    pub signin: bool,
    /// Access group labels; `None` keeps the current selection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access: Option<Vec<String>>,
    #[serde(default)]
    pub add_users: Vec<String>,
    #[serde(default)]
    pub delete_users: Vec<String>,
}

// ── Static files ───────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaticDownloadRequest {
    pub site: String,
    /// Existing local folder; defaults to the site's source folder in the
    /// project.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder: Option<PathBuf>,
}
