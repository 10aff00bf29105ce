//! Static file command handlers.

use sitectl_core::{Command as CoreCommand, CommandResult, StaticDownloadRequest};

use crate::cli::{StaticArgs, StaticCommand};
use crate::error::CliError;

use super::{Context, confirm};

pub async fn handle(ctx: &Context<'_>, args: StaticArgs) -> Result<CommandResult, CliError> {
    let cmd = match args.command {
        StaticCommand::Upload { site, folder } => CoreCommand::UploadStaticFiles { site, folder },
        StaticCommand::Download { site, folder } => {
            CoreCommand::DownloadStaticFiles(StaticDownloadRequest { site, folder })
        }
        StaticCommand::Delete { site } => {
            let prompt = format!("Delete the static files of site '{site}'?");
            if !confirm(&prompt, "static delete", ctx.global.yes)? {
                return Ok(CommandResult::Ok);
            }
            CoreCommand::DeleteStaticFiles { site }
        }
    };
    Ok(ctx.controller.execute(cmd).await?)
}
