use clap::{Parser, Subcommand, Args};

#[derive(Parser)]
#[command(name = "pocverify", version, about = "Verify vulnerabilities with declarative proof-of-check definitions")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log verbosity (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run POCs against one or more targets
    Verify(VerifyArgs),
    /// Load POC files and type-check them without sending requests
    Validate(ValidateArgs),
}

#[derive(Args, Clone, Debug)]
pub struct VerifyArgs {
    /// POC file, directory of *.yml/*.yaml files, or glob pattern
    #[arg(short, long)]
    pub poc: String,

    /// Target base URL (repeatable)
    #[arg(short, long = "target")]
    pub targets: Vec<String>,

    /// File with one target URL per line
    #[arg(long)]
    pub targets_file: Option<String>,

    /// YAML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Base URL for reverse callbacks (overrides reverse.url)
    #[arg(long)]
    pub reverse_url: Option<String>,

    /// Concurrent runs (overrides scan.workers)
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// User agent for probes (overrides http.user_agent)
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Print results as JSON instead of verdict lines
    #[arg(long)]
    pub json: bool,

    /// Also write the JSON results to this file
    #[arg(short, long)]
    pub output: Option<String>,
}

#[derive(Args, Clone, Debug)]
pub struct ValidateArgs {
    /// POC file, directory, or glob pattern
    pub poc: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_verify_with_repeated_targets() {
        let cli = Cli::try_parse_from([
            "pocverify", "-vv", "verify", "--poc", "pocs/", "-t", "http://a", "--target", "http://b", "--json",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Verify(args) => {
                assert_eq!(args.poc, "pocs/");
                assert_eq!(args.targets, vec!["http://a", "http://b"]);
                assert!(args.json);
                assert!(args.workers.is_none());
            }
            _ => panic!("expected verify"),
        }
    }

    #[test]
    fn test_parse_validate() {
        let cli = Cli::try_parse_from(["pocverify", "validate", "a.yml", "--no-color"]).unwrap();
        assert!(cli.no_color);
        assert!(matches!(cli.command, Commands::Validate(ValidateArgs { ref poc }) if poc == "a.yml"));
    }

    #[test]
    fn test_verify_requires_poc() {
        assert!(Cli::try_parse_from(["pocverify", "verify", "-t", "http://a"]).is_err());
    }
}
