//! Chat session: ordered command dispatch plus the interactive REPL loop
//!
//! Dispatch is stateless per message: the lower-cased input is checked
//! against the command rules top to bottom and the first match wins.
//! Anything that matches no rule goes to the LLM as free-form chat.

use std::sync::Arc;

use chrono::{Duration, Local};
use colored::Colorize;
use eyre::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::calendar::CalendarExporter;
use crate::chat::commands;
use crate::chat::context::SessionContext;
use crate::chat::format::{format_diet_plan, format_workout_plan, help_text};
use crate::llm::{ChatMessage, CompletionRequest, LlmClient, ResponseFormat, StreamChunk};
use crate::plan::{Meal, PlanGenerator, WorkoutDay};
use crate::store::Database;

const CHAT_SYSTEM_PROMPT: &str = "You are a helpful fitness assistant. You can help users with:\n\
1. Creating personalized workout plans\n\
2. Creating diet plans\n\
3. Scheduling workouts\n\
4. Exporting workout plans to calendar (ICS) files\n\
5. Answering fitness-related questions\n\
6. Giving health and wellness advice\n\n\
Be conversational, friendly, and always prioritize the user's safety and health.\n\
DO NOT format your response as JSON. Return plain text only.";

const GENERIC_PROMPT: &str =
    "I'm here to help with your fitness journey! Try asking about workout plans, diet advice, or specific exercises.";

/// Result of handling one message
pub enum Outcome {
    Reply(String),
    Quit(String),
}

/// One user's conversation with the assistant
pub struct ChatSession {
    llm: Arc<dyn LlmClient>,
    generator: PlanGenerator,
    exporter: CalendarExporter,
    db: Database,
    pub ctx: SessionContext,
    history_window: usize,
    event_duration_minutes: u32,
}

impl ChatSession {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        exporter: CalendarExporter,
        db: Database,
        username: &str,
        history_window: usize,
        event_duration_minutes: u32,
    ) -> Self {
        let generator = PlanGenerator::new(llm.clone());

        let (user_id, created) = db.get_or_create_user(username);
        if created {
            info!(username, user_id, "new: created user");
        } else {
            info!(username, user_id, "new: resumed user");
        }

        let mut ctx = SessionContext::new(username, user_id);
        if ctx.has_persistence() {
            ctx.profile = db.get_profile(user_id);
        }

        let mut session = Self {
            llm,
            generator,
            exporter,
            db,
            ctx,
            history_window,
            event_duration_minutes,
        };
        session.reload_saved_plans();
        session
    }

    /// Dispatch one message and produce a reply
    pub async fn handle_message(&mut self, input: &str) -> Outcome {
        let input = input.trim();
        info!(input, "handle_message: called");
        self.ctx.record_user(input);
        let lower = input.to_lowercase();

        // exact matches, disjoint from every prefix rule below
        if lower == "exit" || lower == "quit" {
            return Outcome::Quit("Goodbye! Have a great workout!".to_string());
        }

        let reply = if lower.starts_with("create workout") {
            self.handle_create_workout(&lower).await
        } else if lower.starts_with("create diet") {
            self.handle_create_diet(&lower).await
        } else if lower.starts_with("save workout") {
            self.handle_save_workout(input)
        } else if lower.starts_with("save diet") {
            self.handle_save_diet(input)
        } else if lower.starts_with("list workout") || lower == "list workouts" {
            self.list_workout_plans()
        } else if lower.starts_with("list diet") || lower == "list diets" {
            self.list_diet_plans()
        } else if lower.starts_with("load workout") {
            self.handle_load_workout(input)
        } else if lower.starts_with("load diet") {
            self.handle_load_diet(input)
        } else if lower.starts_with("view profile") || lower == "profile" {
            self.view_profile()
        } else if lower.starts_with("update profile") {
            self.handle_update_profile(input)
        } else if lower.starts_with("export calendar") || lower.starts_with("create calendar") {
            self.handle_export_calendar(input, &lower)
        } else if lower.starts_with("schedule workout") {
            self.schedule_workout()
        } else if lower == "help" {
            help_text().to_string()
        } else {
            self.general_chat(input).await
        };

        self.ctx.record_assistant(&reply);
        Outcome::Reply(reply)
    }

    async fn handle_create_workout(&mut self, lower: &str) -> String {
        let days = commands::parse_days(lower);
        let level = commands::parse_level(lower);

        let plan = self.generator.generate_workout(days, &level).await;
        let details = format_workout_plan(&plan);
        self.ctx.current_workout = Some(plan);

        format!(
            "I've created a {}-day workout plan for {} fitness level:\n\n{}\
             You can ask me to schedule these workouts, save the plan, export to a calendar file, \
             or modify the plan if needed.",
            days, level, details
        )
    }

    async fn handle_create_diet(&mut self, lower: &str) -> String {
        let calories = commands::parse_calories(lower);

        let plan = self.generator.generate_diet(calories).await;
        let details = format_diet_plan(&plan);
        self.ctx.current_diet = Some(plan);

        format!(
            "I've created a diet plan targeting {} calories per day:\n\n{}\
             You can ask me to save this diet plan or modify it if needed.",
            calories, details
        )
    }

    fn handle_save_workout(&mut self, input: &str) -> String {
        let Some(plan) = self.ctx.current_workout.clone() else {
            return "You don't have a workout plan to save. Let's create one first! \
                    Try saying 'Create workout plan'."
                .to_string();
        };
        if !self.ctx.has_persistence() {
            return "I couldn't save your workout plan because there's no active user session. \
                    Please check your database connection."
                .to_string();
        }

        let plan_name = commands::extract_rest(input, "name:")
            .unwrap_or_else(|| format!("{}-Day Workout Plan", plan.len()));

        let plan_id = self.db.save_workout_plan(self.ctx.user_id, &plan_name, &plan);
        if plan_id > 0 {
            self.reload_saved_plans();
            format!(
                "✅ I've saved your workout plan as '{}' to your profile.\n\n\
                 You can access this plan in future sessions by logging in with the same username.",
                plan_name
            )
        } else {
            "❌ I couldn't save your workout plan. There might be an issue with the database connection."
                .to_string()
        }
    }

    fn handle_save_diet(&mut self, input: &str) -> String {
        let Some(plan) = self.ctx.current_diet.clone() else {
            return "You don't have a diet plan to save. Let's create one first! \
                    Try saying 'Create diet plan'."
                .to_string();
        };
        if !self.ctx.has_persistence() {
            return "I couldn't save your diet plan because there's no active user session. \
                    Please check your database connection."
                .to_string();
        }

        let plan_name = commands::extract_rest(input, "name:")
            .unwrap_or_else(|| format!("Diet Plan ({})", Local::now().format("%Y-%m-%d")));

        let plan_id = self.db.save_diet_plan(self.ctx.user_id, &plan_name, &plan);
        if plan_id > 0 {
            self.reload_saved_plans();
            format!(
                "✅ I've saved your diet plan as '{}' to your profile.\n\n\
                 You can access this plan in future sessions by logging in with the same username.",
                plan_name
            )
        } else {
            "❌ I couldn't save your diet plan. There might be an issue with the database connection.".to_string()
        }
    }

    fn list_workout_plans(&self) -> String {
        if self.ctx.saved_workout_plans.is_empty() {
            return "You don't have any saved workout plans yet. Create a plan and then say \
                    'save workout' to save it."
                .to_string();
        }

        let mut reply = String::from("Here are your saved workout plans:\n\n");
        for (i, plan) in self.ctx.saved_workout_plans.iter().enumerate() {
            reply.push_str(&format!(
                "{}. {} (Created: {})\n",
                i + 1,
                plan.plan_name,
                plan.created_at.format("%Y-%m-%d")
            ));
        }
        reply.push_str("\nTo load a specific plan, say 'load workout plan: 1' (using the number from the list).");
        reply
    }

    fn list_diet_plans(&self) -> String {
        if self.ctx.saved_diet_plans.is_empty() {
            return "You don't have any saved diet plans yet. Create a plan and then say \
                    'save diet' to save it."
                .to_string();
        }

        let mut reply = String::from("Here are your saved diet plans:\n\n");
        for (i, plan) in self.ctx.saved_diet_plans.iter().enumerate() {
            reply.push_str(&format!(
                "{}. {} (Created: {})\n",
                i + 1,
                plan.plan_name,
                plan.created_at.format("%Y-%m-%d")
            ));
        }
        reply.push_str("\nTo load a specific plan, say 'load diet plan: 1' (using the number from the list).");
        reply
    }

    fn handle_load_workout(&mut self, input: &str) -> String {
        if self.ctx.saved_workout_plans.is_empty() {
            return "You don't have any saved workout plans yet. Create a plan and then say \
                    'save workout' to save it."
                .to_string();
        }

        let Some(index) = commands::parse_plan_index(input) else {
            return "I couldn't understand which plan to load. Please say 'load workout plan: 1' \
                    (using the number from the list)."
                .to_string();
        };

        let Some(saved) = self.ctx.saved_workout_plans.get(index) else {
            return format!(
                "I couldn't find plan number {}. You have {} saved workout plan(s).",
                index + 1,
                self.ctx.saved_workout_plans.len()
            );
        };

        match serde_json::from_value::<Vec<WorkoutDay>>(saved.plan_data.clone()) {
            Ok(plan) => {
                let name = saved.plan_name.clone();
                let details = format_workout_plan(&plan);
                self.ctx.current_workout = Some(plan);
                format!("✅ Loaded workout plan: {}\n\n{}", name, details)
            }
            Err(e) => {
                warn!(error = %e, plan_id = saved.id, "handle_load_workout: unreadable payload");
                "❌ I couldn't load that plan: its stored data is unreadable.".to_string()
            }
        }
    }

    fn handle_load_diet(&mut self, input: &str) -> String {
        if self.ctx.saved_diet_plans.is_empty() {
            return "You don't have any saved diet plans yet. Create a plan and then say \
                    'save diet' to save it."
                .to_string();
        }

        let Some(index) = commands::parse_plan_index(input) else {
            return "I couldn't understand which plan to load. Please say 'load diet plan: 1' \
                    (using the number from the list)."
                .to_string();
        };

        let Some(saved) = self.ctx.saved_diet_plans.get(index) else {
            return format!(
                "I couldn't find plan number {}. You have {} saved diet plan(s).",
                index + 1,
                self.ctx.saved_diet_plans.len()
            );
        };

        match serde_json::from_value::<Vec<Meal>>(saved.plan_data.clone()) {
            Ok(plan) => {
                let name = saved.plan_name.clone();
                let details = format_diet_plan(&plan);
                self.ctx.current_diet = Some(plan);
                format!("✅ Loaded diet plan: {}\n\n{}", name, details)
            }
            Err(e) => {
                warn!(error = %e, plan_id = saved.id, "handle_load_diet: unreadable payload");
                "❌ I couldn't load that plan: its stored data is unreadable.".to_string()
            }
        }
    }

    fn view_profile(&self) -> String {
        if self.ctx.profile.is_empty() {
            return "You haven't set up your profile yet. Try 'update profile age: 30, \
                    weight: 70kg, goals: lose weight'."
                .to_string();
        }

        let mut reply = format!("Here's your current profile (User: {}):\n\n", self.ctx.username);
        for (key, value) in &self.ctx.profile {
            reply.push_str(&format!("- {}: {}\n", key, value));
        }
        reply.push_str("\nYou can update your profile anytime with 'update profile'.");
        reply
    }

    fn handle_update_profile(&mut self, input: &str) -> String {
        let updates = commands::parse_profile_updates(input);
        if updates.is_empty() {
            return "Please specify what to update, for example: \
                    update profile age: 30, weight: 70kg, goals: lose weight"
                .to_string();
        }

        for (key, value) in &updates {
            self.ctx.profile.insert(key.clone(), value.clone());
        }

        let mut reply = String::from("I've updated your profile with the following information:\n\n");
        for (key, value) in &updates {
            reply.push_str(&format!("- {}: {}\n", key, value));
        }
        reply.push_str("\nI'll use this information to better tailor your fitness recommendations.");

        if self.ctx.has_persistence() && self.db.save_profile(self.ctx.user_id, &self.ctx.profile) {
            reply.push_str("\nYour profile has been saved to the database.");
        }

        reply
    }

    fn handle_export_calendar(&mut self, input: &str, lower: &str) -> String {
        let Some(plan) = self.ctx.current_workout.clone() else {
            return "You don't have a workout plan to export. Please create or load a workout plan first!"
                .to_string();
        };

        let calendar_name =
            commands::extract_calendar_name(input).unwrap_or_else(|| "Workout Schedule".to_string());
        let start_date = commands::parse_start_date(lower).unwrap_or_else(|| Local::now().date_naive());

        match self
            .exporter
            .export_workouts(&plan, start_date, &calendar_name, self.event_duration_minutes)
        {
            Ok(path) => {
                let link = self.exporter.calendar_link(&path);
                self.ctx.calendar_files.push(path);
                format!(
                    "📆 I've created a calendar file with your workout schedule!\n\n\
                     File location: {}\n\n\
                     How to use this file:\n\
                     1. In Google Calendar: Click the '+' next to 'Other calendars' > 'Import' > Select this file\n\
                     2. In Apple Calendar: File > Import > Select this file\n\
                     3. In Outlook: File > Open & Export > Import/Export > Import an iCalendar (.ics) file\n\n\
                     This will add all your workouts to your calendar with detailed exercise instructions.",
                    link
                )
            }
            Err(e) => {
                error!(error = %e, "handle_export_calendar: export failed");
                format!("❌ I couldn't create the calendar file: {:#}", e)
            }
        }
    }

    fn schedule_workout(&self) -> String {
        let Some(plan) = &self.ctx.current_workout else {
            return "You don't have a workout plan yet. Let's create one first! \
                    Try saying 'Create workout plan'."
                .to_string();
        };

        let start = Local::now().date_naive();
        let mut reply = String::from("Here's a schedule for your workout plan:\n\n");
        for (i, workout) in plan.iter().enumerate() {
            let date = start + Duration::days(i as i64);
            reply.push_str(&format!("📅 {}: {}\n", date.format("%A, %B %d"), workout.day));
            reply.push_str(&format!(
                "⏱️ Duration: {} | 💪 Intensity: {}\n\n",
                workout.duration, workout.intensity
            ));
        }
        reply.push_str("To add this to your calendar, say 'export calendar' and I'll guide you.");
        reply
    }

    /// Free-form chat fallback: forward to the LLM with context and history
    async fn general_chat(&mut self, input: &str) -> String {
        let mut messages = vec![ChatMessage::system(CHAT_SYSTEM_PROMPT)];
        messages.extend_from_slice(self.ctx.recent_history(self.history_window));
        messages.push(ChatMessage::user(format!(
            "{}\n\nContext: {}",
            input,
            self.ctx.context_block()
        )));

        let request = CompletionRequest {
            messages,
            format: ResponseFormat::Text,
        };

        // Chunks are consumed to completion; the reply is the accumulated text
        let (chunk_tx, mut chunk_rx) = mpsc::channel::<StreamChunk>(100);
        let drain = tokio::spawn(async move { while chunk_rx.recv().await.is_some() {} });

        let response = self.llm.stream(request, chunk_tx).await;
        let _ = drain.await;

        match response {
            Ok(response) => {
                if let Some(usage) = response.usage {
                    info!(tokens = usage.total(), "general_chat: completed");
                }
                let answer = response.content.trim().to_string();
                if answer.is_empty() {
                    return GENERIC_PROMPT.to_string();
                }
                unwrap_json_reply(answer)
            }
            Err(e) => {
                error!(error = %e, "general_chat: backend call failed");
                GENERIC_PROMPT.to_string()
            }
        }
    }

    fn reload_saved_plans(&mut self) {
        if !self.ctx.has_persistence() {
            return;
        }
        self.ctx.saved_workout_plans = self.db.get_workout_plans(self.ctx.user_id);
        self.ctx.saved_diet_plans = self.db.get_diet_plans(self.ctx.user_id);
    }

    /// Run the interactive loop until exit
    pub async fn run(&mut self, initial_message: Option<String>) -> Result<()> {
        self.print_welcome();

        if let Some(message) = initial_message {
            println!("{} {}", ">".bright_green(), message);
            match self.handle_message(&message).await {
                Outcome::Reply(text) => println!("\n{}\n", text),
                Outcome::Quit(text) => {
                    println!("\n{}", text);
                    return Ok(());
                }
            }
        }

        let mut rl = DefaultEditor::new().map_err(|e| eyre::eyre!("Failed to initialize readline: {}", e))?;

        loop {
            let readline = rl.readline(&format!("{} ", ">".bright_green()));

            match readline {
                Ok(line) => {
                    let input = line.trim();
                    if input.is_empty() {
                        continue;
                    }
                    let _ = rl.add_history_entry(input);

                    match self.handle_message(input).await {
                        Outcome::Reply(text) => {
                            println!();
                            println!("{}", text);
                            println!();
                        }
                        Outcome::Quit(text) => {
                            println!();
                            println!("{}", text);
                            break;
                        }
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    // Ctrl+C - just show new prompt
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    // Ctrl+D - exit
                    println!();
                    break;
                }
                Err(err) => {
                    return Err(eyre::eyre!("Readline error: {}", err));
                }
            }
        }

        Ok(())
    }

    fn print_welcome(&self) {
        println!();
        println!("{}", "Fitness Chat Assistant".bright_cyan().bold());
        println!(
            "Hello, {}! I can help you create workout plans, diet plans, and answer fitness questions.",
            self.ctx.username
        );
        if !self.ctx.has_persistence() {
            println!(
                "{}",
                "Running without a database: your profile and plans won't be saved this session.".yellow()
            );
        }
        println!("Type {} to see what I can do, {} to quit", "help".yellow(), "exit".yellow());
        println!();
    }
}

/// Unwrap a chat reply the model wrapped in a JSON object despite instructions
fn unwrap_json_reply(answer: String) -> String {
    if !(answer.starts_with('{') && answer.ends_with('}')) {
        return answer;
    }
    match serde_json::from_str::<serde_json::Value>(&answer) {
        Ok(value) => value
            .get("message")
            .or_else(|| value.get("text"))
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .unwrap_or(answer),
        Err(_) => answer,
    }
}
