//! Config subcommand handlers.

use serde::Serialize;
use tabled::Tabled;

use sitectl_config::{self as cfgfile, Config, ServerProfile};

use crate::cli::{AddServerArgs, ConfigArgs, ConfigCommand, GlobalOpts, OutputFormat};
use crate::config::{available_servers, server_error};
use crate::error::CliError;
use crate::output;

#[derive(Clone, Serialize, Tabled)]
struct ServerRow {
    #[tabled(rename = "")]
    #[serde(skip)]
    marker: &'static str,
    name: String,
    url: String,
    env: String,
    mode: String,
    #[tabled(skip)]
    default: bool,
}

/// A server entry as shown by `config show`.
#[derive(Serialize)]
struct ServerView<'a> {
    name: &'a str,
    #[serde(flatten)]
    profile: ServerProfile,
}

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let path = cfgfile::config_path();
    let mut cfg = cfgfile::load_config_from(&path)?;

    match args.command {
        ConfigCommand::List => {
            let rows = server_rows(&cfg);
            if rows.is_empty() && global.output == OutputFormat::Text {
                eprintln!("No servers configured. Run: sitectl config add <name> --url <url>");
                return Ok(());
            }
            let out = output::render_list(global.output, &rows, ServerRow::clone)?;
            output::print_output(&out);
            Ok(())
        }

        ConfigCommand::Show { name } => {
            let (name, profile) = cfg
                .server(name.as_deref().or(global.server.as_deref()))
                .map_err(|e| server_error(e, &cfg))?;
            let view = ServerView {
                name,
                profile: profile.redacted(),
            };
            let out = output::render(global.output, &view, |v| {
                let body = toml_lines(&v.profile);
                std::iter::once(format!("[servers.{}]", v.name))
                    .chain(body)
                    .collect()
            })?;
            output::print_output(&out);
            Ok(())
        }

        ConfigCommand::Add(a) => {
            let name = a.name.clone();
            let make_default = a.default || cfg.default_server.is_none();
            let profile = new_profile(a);
            cfgfile::check_profile(&profile)?;
            cfg.servers.insert(name.clone(), profile);
            if make_default {
                cfg.default_server = Some(name.clone());
            }
            cfgfile::save_config_to(&cfg, &path)?;
            if !global.quiet {
                eprintln!("✓ Server '{name}' saved to {}", path.display());
            }
            Ok(())
        }

        ConfigCommand::Use { name } => {
            if !cfg.servers.contains_key(&name) {
                return Err(CliError::ServerNotFound {
                    name,
                    available: available_servers(&cfg),
                });
            }
            cfg.default_server = Some(name.clone());
            cfgfile::save_config_to(&cfg, &path)?;
            if !global.quiet {
                eprintln!("✓ Default server set to '{name}'");
            }
            Ok(())
        }

        ConfigCommand::SetSecret { name, token } => {
            if !cfg.servers.contains_key(&name) {
                return Err(CliError::ServerNotFound {
                    name,
                    available: available_servers(&cfg),
                });
            }
            let (kind, label) = if token { ("token", "Token") } else { ("password", "Password") };
            let secret = dialoguer::Password::new()
                .with_prompt(label)
                .interact()
                .map_err(|e| CliError::Validation {
                    field: "interactive".into(),
                    reason: format!("prompt failed: {e}"),
                })?;
            if secret.is_empty() {
                return Err(CliError::Validation {
                    field: kind.into(),
                    reason: "value cannot be empty".into(),
                });
            }
            cfgfile::store_secret(&name, kind, &secret)?;
            if !global.quiet {
                eprintln!("✓ {label} stored in system keyring for server '{name}'");
            }
            Ok(())
        }
    }
}

fn server_rows(cfg: &Config) -> Vec<ServerRow> {
    cfg.servers
        .iter()
        .map(|(name, profile)| {
            let default = cfg.default_server.as_deref() == Some(name.as_str());
            ServerRow {
                marker: if default { "*" } else { "" },
                name: name.clone(),
                url: profile.url.clone(),
                env: profile.env.clone(),
                mode: profile.mode.clone(),
                default,
            }
        })
        .collect()
}

fn new_profile(a: AddServerArgs) -> ServerProfile {
    ServerProfile {
        env: a.env,
        mode: a.mode,
        username: a.username,
        password_env: a.password_env,
        token_env: a.token_env,
        ca_cert: a.ca_cert,
        ..ServerProfile::new(a.url)
    }
}

fn toml_lines(profile: &ServerProfile) -> Vec<String> {
    toml::to_string_pretty(profile)
        .map(|s| s.lines().map(str::to_owned).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn shown_profile_has_no_plaintext_secret() {
        let mut profile = ServerProfile::new("https://dev.example.com");
        profile.password = Some("welcome1".into());
        let lines = toml_lines(&profile.redacted()).join("\n");
        assert!(lines.contains("url = \"https://dev.example.com\""));
        assert!(!lines.contains("welcome1"));
    }
}
