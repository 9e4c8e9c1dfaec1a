//! CLI argument parsing module for reqcheck

use crate::config::parse_duration;
use crate::error::ConfigError;
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

fn parse_age(s: &str) -> Result<Duration, String> {
    parse_duration(s).map_err(|e| e.to_string())
}

/// Validator and updater for pip requirements manifests
#[derive(Parser, Debug, Clone)]
#[command(
    name = "reqcheck",
    version,
    about = "Validator and updater for pip requirements manifests"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Flags accepted by every subcommand
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Enable verbose output
    #[arg(long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Enable quiet mode - minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output results in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Disable colored output (also honors NO_COLOR)
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Config file (default: reqcheck.toml in the target directory)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Validate manifests and report diagnostics
    Check(TargetArgs),

    /// Print every parsed declaration
    List(TargetArgs),

    /// Rewrite constraints to the newest eligible releases
    Update(UpdateArgs),
}

#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// Manifest file or directory (default: current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct UpdateArgs {
    /// Manifest file or directory (default: current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Dry run mode - show what would be updated without making changes
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Show changes in diff format
    #[arg(long)]
    pub diff: bool,

    /// Exclude specific packages from update (can be specified multiple times)
    #[arg(long, action = ArgAction::Append)]
    pub exclude: Vec<String>,

    /// Update only specific packages (can be specified multiple times)
    #[arg(long, action = ArgAction::Append)]
    pub only: Vec<String>,

    /// Include pinned versions in update
    #[arg(long)]
    pub include_pinned: bool,

    /// Only update to versions released at least this long ago (e.g., 2w, 10d, 1m)
    #[arg(long, value_parser = parse_age)]
    pub age: Option<Duration>,
}

impl Cli {
    /// The manifest path the command targets
    pub fn target(&self) -> &PathBuf {
        match &self.command {
            Command::Check(args) | Command::List(args) => &args.path,
            Command::Update(args) => &args.path,
        }
    }

    /// Combinations clap cannot express across the global flags
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Command::Update(update) = &self.command {
            if update.diff && self.global.json {
                return Err(ConfigError::ConflictingOptions {
                    message: "--diff cannot be combined with --json".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Whether colored output is allowed
    pub fn use_color(&self) -> bool {
        !self.global.no_color && std::env::var_os("NO_COLOR").is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update_args(cli: &Cli) -> &UpdateArgs {
        match &cli.command {
            Command::Update(args) => args,
            other => panic!("expected update, got {:?}", other),
        }
    }

    #[test]
    fn test_check_default_path() {
        let cli = Cli::parse_from(["reqcheck", "check"]);
        assert!(matches!(cli.command, Command::Check(_)));
        assert_eq!(cli.target(), &PathBuf::from("."));
        assert!(!cli.global.verbose);
        assert!(!cli.global.quiet);
        assert!(!cli.global.json);
        assert!(cli.global.config.is_none());
    }

    #[test]
    fn test_list_with_path() {
        let cli = Cli::parse_from(["reqcheck", "list", "requirements-dev.txt"]);
        assert!(matches!(cli.command, Command::List(_)));
        assert_eq!(cli.target(), &PathBuf::from("requirements-dev.txt"));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "reqcheck",
            "check",
            "--json",
            "--no-color",
            "-q",
            "--config",
            "ci.toml",
        ]);
        assert!(cli.global.json);
        assert!(cli.global.no_color);
        assert!(cli.global.quiet);
        assert_eq!(cli.global.config, Some(PathBuf::from("ci.toml")));
        assert!(!cli.use_color());
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        assert!(Cli::try_parse_from(["reqcheck", "check", "--verbose", "--quiet"]).is_err());
    }

    #[test]
    fn test_update_defaults() {
        let cli = Cli::parse_from(["reqcheck", "update"]);
        let args = update_args(&cli);
        assert_eq!(args.path, PathBuf::from("."));
        assert!(!args.dry_run);
        assert!(!args.diff);
        assert!(args.exclude.is_empty());
        assert!(args.only.is_empty());
        assert!(!args.include_pinned);
        assert!(args.age.is_none());
    }

    #[test]
    fn test_update_flags() {
        let cli = Cli::parse_from([
            "reqcheck",
            "update",
            "-n",
            "--diff",
            "--exclude",
            "pytz",
            "--exclude",
            "six",
            "--only",
            "requests",
            "--include-pinned",
            "--age",
            "2w",
            "reqs",
        ]);
        let args = update_args(&cli);
        assert!(args.dry_run);
        assert!(args.diff);
        assert_eq!(args.exclude, vec!["pytz", "six"]);
        assert_eq!(args.only, vec!["requests"]);
        assert!(args.include_pinned);
        assert_eq!(args.age, Some(Duration::from_secs(14 * 24 * 60 * 60)));
        assert_eq!(args.path, PathBuf::from("reqs"));
    }

    #[test]
    fn test_update_invalid_age() {
        let result = Cli::try_parse_from(["reqcheck", "update", "--age", "soon"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_update_only_flags_rejected_on_check() {
        assert!(Cli::try_parse_from(["reqcheck", "check", "--dry-run"]).is_err());
    }

    #[test]
    fn test_validate_diff_with_json() {
        let cli = Cli::parse_from(["reqcheck", "update", "--diff", "--json"]);
        assert!(matches!(
            cli.validate(),
            Err(ConfigError::ConflictingOptions { .. })
        ));
        let cli = Cli::parse_from(["reqcheck", "update", "--diff"]);
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn test_subcommand_required() {
        assert!(Cli::try_parse_from(["reqcheck"]).is_err());
    }
}
