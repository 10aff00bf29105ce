//! Clap derive structures for the `sitectl` CLI.
//!
//! Only clap types live here so the build script can render man pages
//! from the same definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// sitectl -- manage content server sites from the command line
#[derive(Debug, Parser)]
#[command(
    name = "sitectl",
    version,
    about = "Manage content server sites from the command line",
    long_about = "Create, transfer, publish, share and secure sites on a content server.\n\n\
        Mutating calls go through the legacy IDC services (via a local relay)\n\
        or the REST management APIs, depending on the server's mode.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Named server from the config file
    #[arg(long, short = 's', env = "SITECTL_SERVER", global = true)]
    pub server: Option<String>,

    /// Local project root (holds src/sites/<site>/...)
    #[arg(long, env = "SITECTL_PROJECT", default_value = ".", global = true)]
    pub project: PathBuf,

    /// Output format for command results
    #[arg(
        long,
        short = 'o',
        env = "SITECTL_OUTPUT",
        default_value = "text",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress progress lines
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "SITECTL_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides the server profile)
    #[arg(long, env = "SITECTL_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable lines (default)
    Text,
    /// Pretty-printed JSON
    Json,
    /// YAML
    Yaml,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColorMode {
    /// Color when stderr is a terminal
    Auto,
    Always,
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create, move and administer sites
    Site(SiteArgs),

    /// Manage the static files of a site
    #[command(name = "static")]
    Static(StaticArgs),

    /// Manage named servers in the config file
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Site ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SiteArgs {
    #[command(subcommand)]
    pub command: SiteCommand,
}

#[derive(Debug, Subcommand)]
pub enum SiteCommand {
    /// Create a site from a template
    Create(CreateArgs),

    /// Copy a site to another server
    Transfer(TransferArgs),

    /// Recreate a site from an internal server or a template zip
    Migrate(MigrateArgs),

    /// Publish, unpublish, bring online or take offline
    Control {
        /// What to do with the site
        action: ControlAction,

        /// Site name
        site: String,
    },

    /// Share a site with users and groups
    Share(ShareArgs),

    /// Remove users and groups from a site
    Unshare(UnshareArgs),

    /// Change who may sign in to a site
    Security(SecurityArgs),

    /// Check that a site's pages and assets can be published
    Validate {
        /// Site name
        site: String,
    },

    /// Rebuild the pre-rendered pages of a site
    #[command(alias = "refresh-prerender-cache")]
    Prerender {
        /// Site name
        site: String,
    },
}

#[derive(Debug, Args)]
pub struct CreateArgs {
    /// Name of the new site
    pub name: String,

    /// Template to create the site from
    #[arg(long, short = 't')]
    pub template: String,

    /// Repository for an enterprise site
    #[arg(long, short = 'r')]
    pub repository: Option<String>,

    /// Localization policy (defaults to the template's)
    #[arg(long, short = 'l')]
    pub localization_policy: Option<String>,

    /// Default language (defaults to the template's)
    #[arg(long, short = 'd')]
    pub default_language: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    /// Site prefix (defaults to the lower-cased name, 15 characters max)
    #[arg(long, short = 'x')]
    pub site_prefix: Option<String>,

    /// Keep the content ids of the template's assets
    #[arg(long, short = 'u')]
    pub update: bool,
}

#[derive(Debug, Args)]
pub struct TransferArgs {
    /// Site to transfer
    pub name: String,

    /// Named server to transfer to
    #[arg(long)]
    pub destination: String,

    /// Repository on the destination server
    #[arg(long, short = 'r')]
    pub repository: Option<String>,

    /// Localization policy on the destination server
    #[arg(long, short = 'l')]
    pub localization_policy: Option<String>,

    #[arg(long, short = 'x')]
    pub site_prefix: Option<String>,
}

#[derive(Debug, Args)]
pub struct MigrateArgs {
    /// Site on the source server
    pub site: String,

    /// Named internal server to migrate from
    #[arg(long, conflicts_with = "template_file")]
    pub source: Option<String>,

    /// Template zip exported from the source site
    #[arg(long, short = 'f')]
    pub template_file: Option<PathBuf>,

    /// Repository for the new site
    #[arg(long, short = 'r')]
    pub repository: String,

    /// Name of the new site (defaults to the source site's)
    #[arg(long, short = 'n')]
    pub name: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    #[arg(long, short = 'x')]
    pub site_prefix: Option<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ControlAction {
    Publish,
    Unpublish,
    BringOnline,
    TakeOffline,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum RoleArg {
    Manager,
    Contributor,
    Downloader,
    Viewer,
}

#[derive(Debug, Args)]
pub struct ShareArgs {
    /// Site name
    pub site: String,

    /// Comma-separated user logins
    #[arg(long, value_delimiter = ',')]
    pub users: Vec<String>,

    /// Comma-separated group names
    #[arg(long, value_delimiter = ',')]
    pub groups: Vec<String>,

    /// Role granted to every principal
    #[arg(long, default_value = "viewer")]
    pub role: RoleArg,
}

#[derive(Debug, Args)]
pub struct UnshareArgs {
    /// Site name
    pub site: String,

    #[arg(long, value_delimiter = ',')]
    pub users: Vec<String>,

    #[arg(long, value_delimiter = ',')]
    pub groups: Vec<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum YesNo {
    Yes,
    No,
}

#[derive(Debug, Args)]
pub struct SecurityArgs {
    /// Site name
    pub site: String,

    /// Whether visitors must sign in
    #[arg(long)]
    pub signin: YesNo,

    /// Comma-separated groups allowed in, e.g. "Visitors,Specific users"
    #[arg(long, value_delimiter = ',')]
    pub access: Option<Vec<String>>,

    /// Comma-separated logins to add as site viewers
    #[arg(long, value_delimiter = ',')]
    pub add_users: Vec<String>,

    /// Comma-separated logins to remove from the site viewers
    #[arg(long, value_delimiter = ',')]
    pub delete_users: Vec<String>,
}

// ── Static files ─────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct StaticArgs {
    #[command(subcommand)]
    pub command: StaticCommand,
}

#[derive(Debug, Subcommand)]
pub enum StaticCommand {
    /// Replace the site's static files with a local folder
    Upload {
        /// Site name
        site: String,

        /// Local folder with the static files
        #[arg(long, short = 'f')]
        folder: PathBuf,
    },

    /// Save the site's static files locally
    Download {
        /// Site name
        site: String,

        /// Existing local folder (defaults to src/sites/<site>/static)
        #[arg(long, short = 'f')]
        folder: Option<PathBuf>,
    },

    /// Delete the site's static files
    Delete {
        /// Site name
        site: String,
    },
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// List configured servers
    #[command(alias = "ls")]
    List,

    /// Show one server with secrets redacted
    Show {
        /// Server name (defaults to the default server)
        name: Option<String>,
    },

    /// Add or replace a server entry
    Add(AddServerArgs),

    /// Make a server the default
    Use {
        name: String,
    },

    /// Store a server's password or token in the system keyring
    SetSecret {
        /// Server name
        name: String,

        /// Store a bearer token instead of a password
        #[arg(long)]
        token: bool,
    },
}

#[derive(Debug, Args)]
pub struct AddServerArgs {
    /// Server name
    pub name: String,

    /// Base URL
    #[arg(long)]
    pub url: String,

    /// Deployment tag
    #[arg(long, default_value = "pod_ec")]
    pub env: String,

    /// idc or rest
    #[arg(long, default_value = "idc")]
    pub mode: String,

    #[arg(long)]
    pub username: Option<String>,

    /// Environment variable holding the password
    #[arg(long)]
    pub password_env: Option<String>,

    /// Environment variable holding a bearer token
    #[arg(long)]
    pub token_env: Option<String>,

    /// Custom CA certificate
    #[arg(long)]
    pub ca_cert: Option<PathBuf>,

    /// Make this the default server
    #[arg(long)]
    pub default: bool,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
