//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Fitcoach - conversational fitness assistant
#[derive(Parser)]
#[command(
    name = "fitcoach",
    about = "Conversational fitness assistant: LLM-backed workout and diet planning",
    version,
    after_help = "Logs are written to: ~/.local/share/fitcoach/logs/fitcoach.log"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Subcommand)]
pub enum Command {
    /// Start an interactive chat session
    Chat {
        /// Username for profile and saved-plan persistence
        #[arg(short, long, default_value = "default_user")]
        user: String,

        /// Optional first message to process before prompting
        message: Option<String>,
    },

    /// Generate a workout plan and print it
    Workout {
        /// Number of workout days
        #[arg(short, long, default_value_t = 4)]
        days: u32,

        /// Fitness level (beginner, intermediate, advanced)
        #[arg(short, long, default_value = "intermediate")]
        level: String,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Generate a diet plan and print it
    Diet {
        /// Daily calorie target
        #[arg(long, default_value_t = 2200)]
        calories: u32,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
}

/// Output format for one-shot plan commands
#[derive(Clone, Debug, Default)]
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
    fn test_cli_parse_no_command() {
        let cli = Cli::parse_from(["fitcoach"]);
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_cli_parse_chat_defaults() {
        let cli = Cli::parse_from(["fitcoach", "chat"]);
        if let Some(Command::Chat { user, message }) = cli.command {
            assert_eq!(user, "default_user");
            assert!(message.is_none());
        } else {
            panic!("Expected Chat command");
        }
    }

    #[test]
    fn test_cli_parse_chat_with_user_and_message() {
        let cli = Cli::parse_from(["fitcoach", "chat", "--user", "alice", "create workout plan"]);
        if let Some(Command::Chat { user, message }) = cli.command {
            assert_eq!(user, "alice");
            assert_eq!(message.as_deref(), Some("create workout plan"));
        } else {
            panic!("Expected Chat command");
        }
    }

    #[test]
    fn test_cli_parse_workout() {
        let cli = Cli::parse_from(["fitcoach", "workout", "--days", "5", "--level", "beginner"]);
        if let Some(Command::Workout { days, level, .. }) = cli.command {
            assert_eq!(days, 5);
            assert_eq!(level, "beginner");
        } else {
            panic!("Expected Workout command");
        }
    }

    #[test]
    fn test_cli_parse_diet() {
        let cli = Cli::parse_from(["fitcoach", "diet", "--calories", "1800", "--format", "json"]);
        if let Some(Command::Diet { calories, format }) = cli.command {
            assert_eq!(calories, 1800);
            assert!(matches!(format, OutputFormat::Json));
        } else {
            panic!("Expected Diet command");
        }
    }

    #[test]
    fn test_output_format_from_str() {
        assert!(matches!("text".parse::<OutputFormat>(), Ok(OutputFormat::Text)));
        assert!(matches!("json".parse::<OutputFormat>(), Ok(OutputFormat::Json)));
        assert!("yaml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_cli_with_config() {
        let cli = Cli::parse_from(["fitcoach", "-c", "/path/to/config.yml", "chat"]);
        assert_eq!(cli.config, Some(PathBuf::from("/path/to/config.yml")));
    }
}
