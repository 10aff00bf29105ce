//! Site command handlers.

use sitectl_core::{
    Command as CoreCommand, CommandResult, CreateSiteRequest, MigrateSiteRequest, ShareRole,
    ShareSiteRequest, SiteAction, SiteSecurityRequest, TransferSiteRequest, UnshareSiteRequest,
};

use crate::cli::{ControlAction, RoleArg, SiteArgs, SiteCommand, YesNo};
use crate::config;
use crate::error::CliError;

use super::Context;

pub async fn handle(ctx: &Context<'_>, args: SiteArgs) -> Result<CommandResult, CliError> {
    let cmd = match args.command {
        SiteCommand::Create(a) => CoreCommand::CreateSite(CreateSiteRequest {
            name: a.name,
            template: a.template,
            repository: a.repository,
            localization_policy: a.localization_policy,
            default_language: a.default_language,
            description: a.description,
            site_prefix: a.site_prefix,
            update_content: a.update,
        }),

        SiteCommand::Transfer(a) => {
            let destination = config::resolve_server(ctx.cfg, Some(&a.destination), ctx.global)?;
            CoreCommand::TransferSite(TransferSiteRequest {
                name: a.name,
                destination,
                repository: a.repository,
                localization_policy: a.localization_policy,
                site_prefix: a.site_prefix,
            })
        }

        SiteCommand::Migrate(a) => {
            let source = a
                .source
                .as_deref()
                .map(|name| config::resolve_server(ctx.cfg, Some(name), ctx.global))
                .transpose()?;
            CoreCommand::MigrateSite(MigrateSiteRequest {
                site: a.site,
                source,
                template_file: a.template_file,
                name: a.name,
                repository: a.repository,
                description: a.description,
                site_prefix: a.site_prefix,
            })
        }

        SiteCommand::Control { action, site } => CoreCommand::ControlSite {
            site,
            action: site_action(action),
        },

        SiteCommand::Share(a) => CoreCommand::ShareSite(ShareSiteRequest {
            name: a.site,
            users: a.users,
            groups: a.groups,
            role: share_role(a.role),
        }),

        SiteCommand::Unshare(a) => CoreCommand::UnshareSite(UnshareSiteRequest {
            name: a.site,
            users: a.users,
            groups: a.groups,
        }),

        SiteCommand::Security(a) => CoreCommand::SetSiteSecurity(SiteSecurityRequest {
            name: a.site,
            signin: matches!(a.signin, YesNo::Yes),
            access: a.access,
            add_users: a.add_users,
            delete_users: a.delete_users,
        }),

        SiteCommand::Validate { site } => CoreCommand::ValidateSite { site },
        SiteCommand::Prerender { site } => CoreCommand::RefreshPrerenderCache { site },
    };

    tracing::debug!(command = ?cmd, "dispatching site command");
    Ok(ctx.controller.execute(cmd).await?)
}

fn site_action(action: ControlAction) -> SiteAction {
    match action {
        ControlAction::Publish => SiteAction::Publish,
        ControlAction::Unpublish => SiteAction::Unpublish,
        ControlAction::BringOnline => SiteAction::BringOnline,
        ControlAction::TakeOffline => SiteAction::TakeOffline,
    }
}

fn share_role(role: RoleArg) -> ShareRole {
    match role {
        RoleArg::Manager => ShareRole::Manager,
        RoleArg::Contributor => ShareRole::Contributor,
        RoleArg::Downloader => ShareRole::Downloader,
        RoleArg::Viewer => ShareRole::Viewer,
    }
}
