use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

pub const SANDROOT_HELP_TEMPLATE: &str =
    "{before-help}\nUsage:\n    {usage}\n\nOptions:\n{options}\n\nCommands:\n{subcommands}\n";

pub const SANDROOT_BEFORE_HELP: &str = concat!(
    "sandroot ",
    env!("CARGO_PKG_VERSION"),
    " – provision and heal an app-private Unix root\n",
);

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    disable_help_subcommand = true,
    before_help = SANDROOT_BEFORE_HELP,
    help_template = SANDROOT_HELP_TEMPLATE
)]
#[allow(clippy::struct_excessive_bools)]
pub struct SandrootCli {
    #[arg(
        short,
        long,
        help = "Suppress human output (errors still print to stderr)",
        global = true
    )]
    pub quiet: bool,
    #[arg(
        short,
        long,
        action = ArgAction::Count,
        help = "Increase logging (-vv reaches trace)",
        global = true
    )]
    pub verbose: u8,
    #[arg(long, help = "Force trace logging regardless of -v/-q", global = true)]
    pub trace: bool,
    #[arg(long, help = "Emit {status,message,details} JSON envelopes", global = true)]
    pub json: bool,
    #[arg(long, help = "Disable colored human output", global = true)]
    pub no_color: bool,
    #[arg(
        long,
        value_name = "DIR",
        help = "Sandbox root (defaults to SANDROOT_ROOT, then the user data dir)",
        global = true
    )]
    pub root: Option<PathBuf>,
    #[arg(long, value_name = "DIR", help = "Download cache directory", global = true)]
    pub cache_dir: Option<PathBuf>,
    #[arg(long, value_name = "URL", help = "Bundle archive URL", global = true)]
    pub bundle_url: Option<String>,
    #[arg(
        long,
        value_name = "STR",
        help = "Version string recorded in the install marker",
        global = true
    )]
    pub bundle_version: Option<String>,
    #[command(subcommand)]
    pub command: CommandKind,
}

#[derive(Subcommand, Debug)]
pub enum CommandKind {
    #[command(about = "Download, extract, and configure the bundle unless already installed")]
    Install(InstallArgs),
    #[command(about = "Report marker, sentinel, and generated-command state")]
    Status,
    #[command(about = "Re-apply permissions and package-manager config on an installed tree")]
    Verify,
    #[command(about = "Regenerate generated commands if the sentinel was overwritten")]
    Heal,
    #[command(about = "Print the shell environment, one KEY=VALUE per line")]
    Env,
    #[command(about = "Send one request through the API spool and print the reply")]
    Call(CallArgs),
}

#[derive(Args, Debug)]
pub struct InstallArgs {
    #[arg(
        long,
        value_name = "ZIP",
        help = "Install from a local archive instead of downloading"
    )]
    pub bundle_file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct CallArgs {
    #[arg(value_name = "METHOD")]
    pub method: String,
    #[arg(long, value_name = "MS", default_value_t = 3000, help = "Reply timeout")]
    pub timeout_ms: u64,
    #[arg(
        value_name = "ARGS",
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub args: Vec<String>,
}
