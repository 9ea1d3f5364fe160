//! CLI command definitions and subcommands

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

use crate::scheduler::SchedulerConfig;

/// SeatSniper - course seat acquisition scheduler
#[derive(Parser)]
#[command(
    name = "sn",
    about = "Keep trying to enroll in full course sections until a seat opens",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Save the target list from a JSON or YAML file
    Add {
        /// File holding a list of targets
        file: PathBuf,

        /// Merge into the saved list instead of replacing it
        #[arg(short, long)]
        append: bool,
    },

    /// List the saved targets
    Targets {
        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Show the last known status of every target
    Status {
        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Clear statuses and the saved target list
    Clear,

    /// Start acquiring seats for the saved targets
    Run(RunArgs),
}

/// Overrides for a single run
#[derive(Debug, Clone, Default, Args)]
pub struct RunArgs {
    /// Lower pacing bound in seconds
    #[arg(long)]
    pub interval_min: Option<f64>,

    /// Upper pacing bound in seconds
    #[arg(long)]
    pub interval_max: Option<f64>,

    /// Attempts per target before it is parked (0 = unbounded)
    #[arg(short, long)]
    pub max_attempts: Option<u32>,

    /// Attempt targets in list order every round
    #[arg(long)]
    pub no_randomize: bool,

    /// Pacing multiplier growth after a failed attempt
    #[arg(long)]
    pub backoff_factor: Option<f64>,

    /// Stop after this many seconds (0 = unbounded)
    #[arg(short = 'd', long)]
    pub max_duration: Option<u64>,

    /// Skip targets already acquired by an earlier run
    #[arg(short, long)]
    pub resume: bool,

    /// Seconds to count down before the first attempt
    #[arg(long, default_value = "3")]
    pub countdown: u64,

    /// Output format for the summary
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

impl RunArgs {
    /// Apply command-line overrides on top of the configured policy
    pub fn apply(&self, mut config: SchedulerConfig) -> SchedulerConfig {
        debug!(?self, "RunArgs::apply: called");
        if let Some(v) = self.interval_min {
            config.interval_min = v;
        }
        if let Some(v) = self.interval_max {
            config.interval_max = v;
        }
        if let Some(v) = self.max_attempts {
            config.max_attempts = v;
        }
        if self.no_randomize {
            config.randomize = false;
        }
        if let Some(v) = self.backoff_factor {
            config.backoff_factor = v;
        }
        if let Some(v) = self.max_duration {
            config.max_duration = v;
        }
        config
    }
}

/// Get the log file path
pub fn get_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("seatsniper")
        .join("logs")
        .join("seatsniper.log")
}

/// Generate the after_help text
pub fn generate_after_help() -> String {
    let mut help = String::new();
    help.push_str("The session cookie is read from $SEATSNIPER_COOKIE (see client.cookie-env).\n");
    help.push_str(&format!("Logs are written to: {}\n", get_log_path().display()));
    help
}

/// Output format for listing commands
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {}. Use: text or json", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_add() {
        let cli = Cli::parse_from(["sn", "add", "courses.json"]);
        match cli.command {
            Command::Add { file, append } => {
                assert_eq!(file, PathBuf::from("courses.json"));
                assert!(!append);
            }
            _ => panic!("Expected Add command"),
        }
    }

    #[test]
    fn test_cli_parse_status_json() {
        let cli = Cli::parse_from(["sn", "status", "--format", "json"]);
        assert!(matches!(
            cli.command,
            Command::Status {
                format: OutputFormat::Json
            }
        ));
    }

    #[test]
    fn test_cli_parse_run_defaults() {
        let cli = Cli::parse_from(["sn", "run"]);
        match cli.command {
            Command::Run(args) => {
                assert_eq!(args.countdown, 3);
                assert!(!args.resume);
                assert_eq!(args.apply(SchedulerConfig::default()), SchedulerConfig::default());
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_cli_parse_run_overrides() {
        let cli = Cli::parse_from([
            "sn",
            "--log-level",
            "debug",
            "run",
            "--interval-min",
            "0.5",
            "--interval-max",
            "2",
            "--max-attempts",
            "0",
            "--no-randomize",
            "--backoff-factor",
            "2.0",
            "--max-duration",
            "600",
            "--resume",
        ]);
        assert_eq!(cli.log_level.as_deref(), Some("debug"));

        let Command::Run(args) = cli.command else {
            panic!("Expected Run command");
        };
        assert!(args.resume);

        let config = args.apply(SchedulerConfig::default());
        assert_eq!(config.interval_min, 0.5);
        assert_eq!(config.interval_max, 2.0);
        assert_eq!(config.max_attempts, 0);
        assert!(!config.randomize);
        assert_eq!(config.backoff_factor, 2.0);
        assert_eq!(config.max_duration, 600);
    }

    #[test]
    fn test_cli_requires_command() {
        assert!(Cli::try_parse_from(["sn"]).is_err());
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("plain".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert!("table".parse::<OutputFormat>().is_err());
        assert_eq!(OutputFormat::Json.to_string(), "json");
    }

    #[test]
    fn test_log_path() {
        assert!(get_log_path().ends_with("seatsniper/logs/seatsniper.log"));
    }
}
