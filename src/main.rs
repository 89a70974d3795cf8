//! Fitcoach CLI entry point

use std::fs;
use std::path::PathBuf;

use clap::{CommandFactory, Parser};
use eyre::{Context, Result};
use tracing::info;

use fitcoach::chat;
use fitcoach::cli::{Cli, Command, OutputFormat};
use fitcoach::config::Config;
use fitcoach::llm::create_client;
use fitcoach::plan::PlanGenerator;

fn setup_logging(verbose: bool) -> Result<()> {
    // Log to a file, not stdout/stderr - the chat REPL owns the terminal
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("fitcoach")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    let log_file = fs::File::create(log_dir.join("fitcoach.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (verbose: {})", verbose);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    info!(
        "Fitcoach loaded config: provider={}, model={}",
        config.llm.provider, config.llm.model
    );

    match cli.command {
        Some(Command::Chat { user, message }) => chat::run_interactive(&config, &user, message).await,
        Some(Command::Workout { days, level, format }) => cmd_workout(&config, days, &level, format).await,
        Some(Command::Diet { calories, format }) => cmd_diet(&config, calories, format).await,
        None => {
            Cli::command().print_help()?;
            println!();
            Ok(())
        }
    }
}

/// Generate a workout plan and print it (batch mode)
async fn cmd_workout(config: &Config, days: u32, level: &str, format: OutputFormat) -> Result<()> {
    let llm = create_client(&config.llm).map_err(|e| eyre::eyre!("Failed to create LLM client: {}", e))?;
    let generator = PlanGenerator::new(llm);

    let plan = generator.generate_workout(days, level).await;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&plan)?);
        }
        OutputFormat::Text => {
            println!("Generated {}-day workout plan ({} level):\n", days, level);
            print!("{}", chat::format_workout_plan(&plan));

            let valid = generator.validate_workout(&plan).await;
            println!("Validation result: {}", if valid { "Valid" } else { "Invalid" });
        }
    }

    Ok(())
}

/// Generate a diet plan and print it (batch mode)
async fn cmd_diet(config: &Config, calories: u32, format: OutputFormat) -> Result<()> {
    let llm = create_client(&config.llm).map_err(|e| eyre::eyre!("Failed to create LLM client: {}", e))?;
    let generator = PlanGenerator::new(llm);

    let plan = generator.generate_diet(calories).await;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&plan)?);
        }
        OutputFormat::Text => {
            println!("Generated diet plan targeting {} calories per day:\n", calories);
            print!("{}", chat::format_diet_plan(&plan));
        }
    }

    Ok(())
}
