//! Command dispatch: bridges CLI args -> core Commands -> output formatting.

pub mod config_cmd;
pub mod site;
pub mod static_files;

use sitectl_config::Config;
use sitectl_core::{CommandResult, SiteController};

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;
use crate::output;

/// Everything a server-bound handler needs.
pub struct Context<'a> {
    pub cfg: &'a Config,
    pub global: &'a GlobalOpts,
    pub controller: &'a SiteController,
}

/// Dispatch a server-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, ctx: &Context<'_>) -> Result<(), CliError> {
    let result = match cmd {
        Command::Site(args) => site::handle(ctx, args).await?,
        Command::Static(args) => static_files::handle(ctx, args).await?,
        // Config and Completions are handled before a server is resolved
        Command::Config(_) | Command::Completions(_) => return Ok(()),
    };
    print_result(ctx.global, &result)
}

fn print_result(global: &GlobalOpts, result: &CommandResult) -> Result<(), CliError> {
    let out = output::render(global.output, result, |r| match r {
        CommandResult::Validation(report) => report.render(),
        CommandResult::Security(summary) => summary.render(),
        CommandResult::Shared { succeeded, failed } if *failed > 0 => {
            vec![format!(" - {succeeded} succeeded, {failed} failed")]
        }
        _ => Vec::new(),
    })?;
    output::print_output(&out);
    Ok(())
}

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, action: &str, yes_flag: bool) -> Result<bool, CliError> {
    use std::io::IsTerminal;

    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        });
    }
    dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))
}
