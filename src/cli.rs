// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Command-line interface.

use clap::Parser;
use std::path::PathBuf;

/// Run a case-based reasoning experiment against the argumentation services
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "arguelauncher")]
#[command(version)]
pub struct Cli {
    /// Main configuration file (default: $ARGUELAUNCHER_CONFIG or config/app.yaml)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output folder (default: <output_root>/<date>/<time>)
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Print the resolved configuration as YAML and exit
    #[arg(long = "cfg")]
    pub print_config: bool,

    /// Log as JSON lines
    #[arg(long, env = "LOG_JSON")]
    pub log_json: bool,

    /// Configuration overrides such as `retrieval.limit=5` or `adaptation=null`
    #[arg(value_name = "KEY=VALUE")]
    pub overrides: Vec<String>,
}

/// Parse arguments (for testing)
pub fn parse_args<I, T>(args: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::try_parse_from(args)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = parse_args(["arguelauncher"]).unwrap();
        assert_eq!(cli.config, None);
        assert_eq!(cli.output_dir, None);
        assert!(!cli.print_config);
        assert!(cli.overrides.is_empty());
    }

    #[test]
    fn test_config_and_overrides() {
        let cli = parse_args([
            "arguelauncher",
            "-c",
            "config/experiment.yaml",
            "--cfg",
            "retrieval.mac=false",
            "adaptation.extras.type=openai-chat-hybrid",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("config/experiment.yaml")));
        assert!(cli.print_config);
        assert_eq!(
            cli.overrides,
            vec!["retrieval.mac=false", "adaptation.extras.type=openai-chat-hybrid"]
        );
    }

    #[test]
    fn test_output_dir() {
        let cli = parse_args(["arguelauncher", "--output-dir", "/tmp/run"]).unwrap();
        assert_eq!(cli.output_dir, Some(PathBuf::from("/tmp/run")));
    }

    #[test]
    fn test_unknown_flag_is_rejected() {
        assert!(parse_args(["arguelauncher", "--verbose"]).is_err());
    }
}
