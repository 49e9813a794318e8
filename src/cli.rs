use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "drf-stubs-dev")]
#[command(version)]
#[command(about = "Developer tooling for djangorestframework-stubs")]
pub struct Cli {
    /// Log debug diagnostics to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check out Django REST framework and regenerate stubs with stubgen
    Stubgen(VersionArgs),
    /// Check out Django REST framework into the source directory
    Checkout(VersionArgs),
    /// Print the source checkout and stubgen output directories
    Paths,
    /// Manage drf-stubs-dev configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Args, Debug, Clone, Default)]
pub struct VersionArgs {
    /// Branch or tag to check out (defaults to the upstream default branch)
    #[arg(long = "drf_version", value_name = "VERSION")]
    pub drf_version: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Set a key in the config file (e.g. checkout.depth)
    Set(ConfigSetArgs),
}

#[derive(Args, Debug)]
pub struct ConfigSetArgs {
    /// Config key path (e.g. tools.stubgen.path)
    pub key: String,
    /// Value to assign; integers and booleans are stored typed
    pub value: String,
    /// Override config file path (default: ./drf-stubs-dev.toml or $XDG_CONFIG_HOME/drf-stubs-dev/config.toml)
    #[arg(long = "file")]
    pub file: Option<PathBuf>,
}

/// Flags understood by the session runner (`cargo xtask`).
#[derive(Args, Debug, Clone, Default)]
pub struct SessionArgs {
    /// List available sessions and exit
    #[arg(short = 'l', long = "list")]
    pub list: bool,
    /// Sessions to run, by name or full parameterised name
    #[arg(short = 's', long = "sessions", num_args = 1..)]
    pub sessions: Vec<String>,
    /// Only run sessions carrying one of these tags
    #[arg(short = 't', long = "tags", num_args = 1..)]
    pub tags: Vec<String>,
    /// Only run sessions for these python versions
    #[arg(short = 'p', long = "pythons", num_args = 1..)]
    pub pythons: Vec<String>,
    /// Print the commands each session would run without running them
    #[arg(long = "dry-run")]
    pub dry_run: bool,
    /// Skip remaining sessions after the first failure
    #[arg(short = 'x', long = "stop-on-first-error")]
    pub stop_on_first_error: bool,
    /// Extra arguments forwarded to sessions that accept them
    #[arg(last = true, value_name = "POSARGS")]
    pub posargs: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn drf_version_uses_underscore_flag() {
        let cli = Cli::try_parse_from(["drf-stubs-dev", "stubgen", "--drf_version", "3.14.0"])
            .unwrap();
        match cli.command {
            Command::Stubgen(args) => assert_eq!(args.drf_version.as_deref(), Some("3.14.0")),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn drf_version_is_optional() {
        let cli = Cli::try_parse_from(["drf-stubs-dev", "checkout"]).unwrap();
        match cli.command {
            Command::Checkout(args) => assert!(args.drf_version.is_none()),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[derive(Parser, Debug)]
    struct Runner {
        #[command(flatten)]
        args: SessionArgs,
    }

    #[test]
    fn session_args_collect_selection_and_posargs() {
        let runner = Runner::try_parse_from([
            "xtask", "-s", "pytest", "typecheck", "-p", "3.10", "-x", "--", "-k", "views",
        ])
        .unwrap();
        assert_eq!(runner.args.sessions, vec!["pytest", "typecheck"]);
        assert_eq!(runner.args.pythons, vec!["3.10"]);
        assert!(runner.args.stop_on_first_error);
        assert_eq!(runner.args.posargs, vec!["-k", "views"]);
    }
}
