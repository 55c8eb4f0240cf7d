use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

use crate::config::DEFAULT_MANIFEST;

#[derive(Parser)]
#[command(name = "iisctl")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Declarative IIS authentication settings", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Base URL of the IIS Administration API
    #[arg(long, env = "IIS_HOST", global = true)]
    pub host: Option<String>,

    /// Access token for the IIS Administration API
    #[arg(long, env = "IIS_ACCESS_KEY", global = true, hide_env_values = true)]
    pub access_key: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Make the server match the manifest
    Apply(ApplyArgs),

    /// Show which schemes apply would reconcile (no remote calls)
    Diff(ManifestArgs),

    /// Show the current authentication settings of an application
    Status {
        /// Web application id
        application: String,
    },

    /// Forget what was applied to an application (the server is not touched)
    Forget {
        /// Web application id
        application: String,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args)]
pub struct ManifestArgs {
    /// Manifest file
    #[arg(short, long, default_value = DEFAULT_MANIFEST)]
    pub manifest: PathBuf,

    /// Only this application
    #[arg(short, long)]
    pub application: Option<String>,
}

#[derive(Args)]
pub struct ApplyArgs {
    #[command(flatten)]
    pub manifest: ManifestArgs,

    /// Reconcile every declared scheme, ignoring recorded state
    #[arg(short, long)]
    pub force: bool,

    /// Fetch and show what would change without writing
    #[arg(long)]
    pub dry_run: bool,

    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_apply() {
        let cli = Cli::try_parse_from([
            "iisctl", "apply", "-m", "site.toml", "--application", "app1", "--force", "-y",
        ])
        .unwrap();
        let Command::Apply(args) = cli.command else {
            panic!("Expected apply");
        };
        assert_eq!(args.manifest.manifest, PathBuf::from("site.toml"));
        assert_eq!(args.manifest.application.as_deref(), Some("app1"));
        assert!(args.force);
        assert!(args.yes);
        assert!(!args.dry_run);
    }

    #[test]
    fn test_parse_diff_defaults() {
        let cli = Cli::try_parse_from(["iisctl", "-vv", "diff"]).unwrap();
        assert_eq!(cli.verbose, 2);
        let Command::Diff(args) = cli.command else {
            panic!("Expected diff");
        };
        assert_eq!(args.manifest, PathBuf::from(DEFAULT_MANIFEST));
        assert!(args.application.is_none());
    }

    #[test]
    fn test_parse_status_with_host() {
        let cli = Cli::try_parse_from([
            "iisctl",
            "status",
            "app1",
            "--host",
            "https://iis.example.com:55539",
        ])
        .unwrap();
        assert_eq!(cli.host.as_deref(), Some("https://iis.example.com:55539"));
        assert!(matches!(cli.command, Command::Status { ref application } if application == "app1"));
    }
}
