// ── Domain model ──

pub mod access;
pub mod site;

pub use access::{AccessGroup, EVERYONE, PUBLIC_ACCESS_CODE, SiteAccess};
pub use site::{
    PublishStatus, RuntimeStatus, SITE_PREFIX_MAX, Site, SiteAction, SiteStatus,
    default_site_prefix, transient_template_name,
};
