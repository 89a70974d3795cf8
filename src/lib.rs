//! Fitcoach - conversational fitness planning assistant
//!
//! Fitcoach accepts natural-language chat commands, delegates plan
//! generation to an LLM backend, persists results to SQLite, and can export
//! workout schedules as ICS calendar files.
//!
//! # Core pieces
//!
//! - [`chat`] - command interpreter, session state and the interactive REPL
//! - [`plan`] - typed plan records and the LLM-backed generator
//! - [`llm`] - LLM client trait and the Ollama implementation
//! - [`store`] - SQLite persistence gateway with sentinel error handling
//! - [`calendar`] - ICS calendar export
//! - [`config`] - configuration types and loading
//! - [`cli`] - command-line interface

pub mod calendar;
pub mod chat;
pub mod cli;
pub mod config;
pub mod llm;
pub mod plan;
pub mod store;

// Re-export commonly used types
pub use calendar::{CalendarExporter, EventSpec};
pub use chat::{ChatSession, Outcome, SessionContext, run_interactive};
pub use config::{CalendarConfig, ChatConfig, Config, LlmConfig, StorageConfig};
pub use llm::{
    ChatMessage, CompletionRequest, CompletionResponse, LlmClient, LlmError, MessageRole, OllamaClient,
    ResponseFormat, StreamChunk, TokenUsage, create_client,
};
pub use plan::{Exercise, Meal, PlanGenerator, WorkoutDay, fallback_diet_plan, fallback_workout_plan};
pub use store::{Database, Profile, SavedPlan};
