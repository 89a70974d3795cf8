//! Conversational chat interface
//!
//! The command interpreter, its session state, and the interactive loop.

pub mod commands;
mod context;
mod format;
mod session;

pub use context::SessionContext;
pub use format::{format_diet_plan, format_workout_plan};
pub use session::{ChatSession, Outcome};

use eyre::{Result, eyre};

use crate::calendar::CalendarExporter;
use crate::config::Config;
use crate::llm::create_client;
use crate::store::Database;

/// Run the interactive chat session
///
/// This is the main entry point for `fitcoach chat`.
pub async fn run_interactive(config: &Config, username: &str, initial_message: Option<String>) -> Result<()> {
    let llm = create_client(&config.llm).map_err(|e| eyre!("Failed to create LLM client: {}", e))?;
    let exporter = CalendarExporter::new(config.calendar.output_dir.clone())?;

    // An unreachable store degrades to a session without persistence
    let db = Database::open(&config.storage.database_path());

    let mut session = ChatSession::new(
        llm,
        exporter,
        db,
        username,
        config.chat.history_window,
        config.calendar.default_duration_minutes,
    );
    session.run(initial_message).await
}
