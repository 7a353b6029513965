use crate::connectivity::Verbosity;
use clap::{ArgGroup, Parser};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "certbridge")]
#[command(version = "1.0.0")]
#[command(about = "Import Windows host root certificates into the WSL guest trust store")]
#[command(long_about = None)]
#[command(group(
    ArgGroup::new("action")
        .required(true)
        .multiple(true)
        .args(["update", "reset", "test", "dry_run"])
))]
pub struct Cli {
    /// Export host root certificates and install them as trust anchors
    #[arg(short, long, conflicts_with = "test")]
    pub update: bool,

    /// Remove imported anchors and reinstall the distribution defaults (runs before --update)
    #[arg(short, long)]
    pub reset: bool,

    /// Check that an HTTPS connection to DOMAIN verifies against the guest trust bundle
    #[arg(short, long, value_name = "DOMAIN")]
    pub test: Option<String>,

    /// Show what --update would import without changing anything
    #[arg(short = 'n', long, conflicts_with_all = ["update", "reset"])]
    pub dry_run: bool,

    /// Debug output
    #[arg(short, long, conflicts_with = "verbose")]
    pub debug: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Config file path
    #[arg(long, env = "CERTBRIDGE_CONFIG")]
    pub config: Option<PathBuf>,
}

impl Cli {
    pub fn verbosity(&self) -> Verbosity {
        if self.debug {
            Verbosity::Debug
        } else if self.verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Normal
        }
    }

    /// Filter for the tracing subscriber
    pub fn log_filter(&self) -> &'static str {
        match self.verbosity() {
            Verbosity::Normal => "certbridge=warn",
            Verbosity::Verbose => "certbridge=info",
            Verbosity::Debug => "certbridge=debug",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("certbridge").chain(args.iter().copied()))
    }

    #[test]
    fn test_command_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_action_required() {
        let err = parse(&[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);

        let err = parse(&["-v"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_allowed_combinations() {
        let cli = parse(&["-r", "-u"]).unwrap();
        assert!(cli.reset && cli.update);

        let cli = parse(&["-r", "-t", "example.com", "-d"]).unwrap();
        assert_eq!(cli.test.as_deref(), Some("example.com"));
        assert_eq!(cli.verbosity(), Verbosity::Debug);

        let cli = parse(&["-n", "-t", "example.com"]).unwrap();
        assert!(cli.dry_run);

        let cli = parse(&["--update", "--verbose"]).unwrap();
        assert_eq!(cli.log_filter(), "certbridge=info");
    }

    #[test]
    fn test_conflicts() {
        for args in [
            &["-u", "-t", "example.com"][..],
            &["-n", "-u"][..],
            &["-n", "-r"][..],
            &["-u", "-d", "-v"][..],
        ] {
            let err = parse(args).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::ArgumentConflict, "{args:?}");
        }
    }

    #[test]
    fn test_help_and_version() {
        assert_eq!(parse(&["-h"]).unwrap_err().kind(), ErrorKind::DisplayHelp);
        assert_eq!(parse(&["-V"]).unwrap_err().kind(), ErrorKind::DisplayVersion);
    }
}
