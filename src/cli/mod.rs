//! Command-line entry point. This is a single long-running daemon, not a
//! multi-subcommand tool — the CLI surface only parameterizes startup.

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "shioaji-kafka-bridge")]
#[command(about = "Resilience supervisor for a Taiwan futures market-data bridge")]
#[command(version)]
pub struct Cli {
    /// Instrument code to subscribe to (vendor contract symbol).
    #[arg(long, default_value = "TXFF6")]
    pub instrument_code: String,

    /// Log level override (trace, debug, info, warn, error).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Validate configuration and exit without starting the supervisor loop.
    #[arg(long)]
    pub dry_run: bool,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_default_args() {
        let cli = Cli::try_parse_from(["shioaji-kafka-bridge"]).unwrap();
        assert_eq!(cli.instrument_code, "TXFF6");
        assert!(!cli.dry_run);
    }

    #[test]
    fn parses_overrides() {
        let cli = Cli::try_parse_from([
            "shioaji-kafka-bridge",
            "--instrument-code",
            "MXFF6",
            "--log-level",
            "debug",
            "--dry-run",
        ])
        .unwrap();
        assert_eq!(cli.instrument_code, "MXFF6");
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert!(cli.dry_run);
    }
}
