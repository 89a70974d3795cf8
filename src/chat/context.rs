//! Session state for the chat interpreter
//!
//! All mutable conversation state lives in one explicit struct that the
//! interpreter reads and updates per message; there is no ambient state.

use std::path::PathBuf;

use crate::llm::ChatMessage;
use crate::plan::{Meal, WorkoutDay};
use crate::store::{Profile, SavedPlan};

/// Everything the interpreter knows about the ongoing session
#[derive(Default)]
pub struct SessionContext {
    pub username: String,
    /// Store key; <= 0 means the store is unavailable this session
    pub user_id: i64,
    pub profile: Profile,
    pub current_workout: Option<Vec<WorkoutDay>>,
    pub current_diet: Option<Vec<Meal>>,
    pub saved_workout_plans: Vec<SavedPlan>,
    pub saved_diet_plans: Vec<SavedPlan>,
    pub calendar_files: Vec<PathBuf>,
    pub history: Vec<ChatMessage>,
}

impl SessionContext {
    pub fn new(username: impl Into<String>, user_id: i64) -> Self {
        Self {
            username: username.into(),
            user_id,
            ..Self::default()
        }
    }

    pub fn has_persistence(&self) -> bool {
        self.user_id > 0
    }

    pub fn record_user(&mut self, content: &str) {
        self.history.push(ChatMessage::user(content));
    }

    pub fn record_assistant(&mut self, content: &str) {
        self.history.push(ChatMessage::assistant(content));
    }

    /// The last `window` turns before the current message
    pub fn recent_history(&self, window: usize) -> &[ChatMessage] {
        let prior = &self.history[..self.history.len().saturating_sub(1)];
        let start = prior.len().saturating_sub(window);
        &prior[start..]
    }

    /// Context block appended to free-form chat messages
    pub fn context_block(&self) -> String {
        let profile = if self.profile.is_empty() {
            "No profile information yet".to_string()
        } else {
            serde_json::to_string_pretty(&self.profile).unwrap_or_else(|_| "No profile information yet".to_string())
        };

        let calendar_files = if self.calendar_files.is_empty() {
            "None".to_string()
        } else {
            self.calendar_files
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        };

        format!(
            "Current user profile:\n{}\n\n\
             Current workout plan: {}\n\
             Current diet plan: {}\n\
             Calendar files: {}\n\
             Saved workout plans: {}\n\
             Saved diet plans: {}",
            profile,
            if self.current_workout.is_some() { "Yes" } else { "None" },
            if self.current_diet.is_some() { "Yes" } else { "None" },
            calendar_files,
            self.saved_workout_plans.len(),
            self.saved_diet_plans.len(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recent_history_excludes_current_message() {
        let mut ctx = SessionContext::new("alice", 1);
        ctx.record_user("one");
        ctx.record_assistant("two");
        ctx.record_user("three");

        let recent = ctx.recent_history(10);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[1].content, "two");
    }

    #[test]
    fn test_recent_history_window() {
        let mut ctx = SessionContext::new("alice", 1);
        for i in 0..8 {
            ctx.record_user(&format!("msg {}", i));
        }

        let recent = ctx.recent_history(3);
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].content, "msg 4");
        assert_eq!(recent[2].content, "msg 6");
    }

    #[test]
    fn test_context_block_reflects_state() {
        let mut ctx = SessionContext::new("alice", 1);
        let block = ctx.context_block();
        assert!(block.contains("No profile information yet"));
        assert!(block.contains("Current workout plan: None"));

        ctx.profile.insert("age".to_string(), "31".to_string());
        ctx.current_workout = Some(crate::plan::fallback_workout_plan(2));
        let block = ctx.context_block();
        assert!(block.contains("\"age\": \"31\""));
        assert!(block.contains("Current workout plan: Yes"));
        assert!(block.contains("Current diet plan: None"));
    }

    #[test]
    fn test_has_persistence() {
        assert!(SessionContext::new("a", 1).has_persistence());
        assert!(!SessionContext::new("a", -1).has_persistence());
        assert!(!SessionContext::new("a", 0).has_persistence());
    }
}
