//! LLM-backed plan generation
//!
//! Every entry point here is infallible: when the backend returns something
//! unusable the generator logs and substitutes a deterministic fallback, so
//! callers always receive a usable plan. Malformed elements inside an
//! otherwise-parsable response are dropped one at a time.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::llm::{CompletionRequest, LlmClient};
use crate::plan::{Exercise, Meal, WorkoutDay};

const WORKOUT_SYSTEM_PROMPT: &str = "You are a professional fitness trainer. Create detailed workout plans that are safe and effective.\n\
Format your response as a JSON array of workout plans, where each plan includes:\n\
- day: string\n\
- exercises: array of objects with name (string), sets (string), reps (string), and rest_period (string)\n\
- duration: string\n\
- intensity: string";

const DIET_SYSTEM_PROMPT: &str = "You are a professional nutritionist. Create detailed diet plans that are balanced and healthy.\n\
Format your response as a JSON array of meal plans, where each plan includes:\n\
- meal_type: string\n\
- foods: array of strings\n\
- calories: integer\n\
- macros: object with protein, carbs, and fat values as floats";

const VALIDATE_SYSTEM_PROMPT: &str = "You are a fitness safety expert. Validate the workout plan for safety and effectiveness.\n\
Return a JSON object with:\n\
- is_valid: boolean\n\
- issues: array of strings (empty if valid)";

const REFINE_SYSTEM_PROMPT: &str = "You are a professional fitness trainer. Refine the workout plan based on user feedback.\n\
Format your response as a JSON array of refined workout plans, maintaining the same structure as the input.";

/// Plan generator over a text-generation backend
pub struct PlanGenerator {
    llm: Arc<dyn LlmClient>,
}

impl PlanGenerator {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// Create a workout plan of exactly `days` days
    pub async fn generate_workout(&self, days: u32, fitness_level: &str) -> Vec<WorkoutDay> {
        info!(days, fitness_level, "generate_workout: called");

        let user_prompt = format!(
            "Create a {}-day workout plan for someone with {} fitness level. \
             Include exercises, sets, reps, and rest periods for each day.",
            days, fitness_level
        );

        let content = match self.request_json(WORKOUT_SYSTEM_PROMPT, &user_prompt).await {
            Some(content) => content,
            None => return fallback_workout_plan(days),
        };

        let plans = parse_workout_days(&content);
        if plans.is_empty() {
            warn!("generate_workout: no valid days in response, using fallback");
            return fallback_workout_plan(days);
        }

        debug!(count = plans.len(), "generate_workout: parsed plan");
        plans
    }

    /// Create a diet plan targeting the given daily calories
    pub async fn generate_diet(&self, daily_calories: u32) -> Vec<Meal> {
        info!(daily_calories, "generate_diet: called");

        let user_prompt = format!(
            "Create a diet plan targeting {} calories per day. \
             Include meal breakdowns and macro distribution.",
            daily_calories
        );

        let content = match self.request_json(DIET_SYSTEM_PROMPT, &user_prompt).await {
            Some(content) => content,
            None => return fallback_diet_plan(),
        };

        let meals: Vec<Meal> = extract_json(&content)
            .and_then(|v| v.as_array().cloned())
            .map(|items| items.iter().filter_map(Meal::from_value).collect())
            .unwrap_or_default();

        if meals.is_empty() {
            warn!("generate_diet: no valid meals in response, using fallback");
            return fallback_diet_plan();
        }

        debug!(count = meals.len(), "generate_diet: parsed plan");
        meals
    }

    /// Ask the backend whether a workout plan is safe
    ///
    /// Anything unparsable counts as not validated.
    pub async fn validate_workout(&self, plan: &[WorkoutDay]) -> bool {
        info!(days = plan.len(), "validate_workout: called");

        let plan_json = serde_json::to_string(plan).unwrap_or_else(|_| "[]".to_string());
        let user_prompt = format!("Validate this workout plan: {}", plan_json);

        let content = match self.request_json(VALIDATE_SYSTEM_PROMPT, &user_prompt).await {
            Some(content) => content,
            None => return false,
        };

        let Some(verdict) = extract_json(&content) else {
            error!("validate_workout: unparsable validation response");
            return false;
        };

        let is_valid = verdict.get("is_valid").and_then(Value::as_bool).unwrap_or(false);
        if let Some(issues) = verdict.get("issues").and_then(Value::as_array)
            && !issues.is_empty()
        {
            debug!(?issues, "validate_workout: issues reported");
        }
        is_valid
    }

    /// Adjust a workout plan given free-text feedback
    ///
    /// Falls back to the original plan, unmodified, when the refined
    /// response cannot be used.
    pub async fn refine_workout(&self, feedback: &str, current: &[WorkoutDay]) -> Vec<WorkoutDay> {
        info!(feedback, "refine_workout: called");

        let plan_json = serde_json::to_string(current).unwrap_or_else(|_| "[]".to_string());
        let user_prompt = format!(
            "Based on the following feedback: {}\nRefine this workout plan: {}",
            feedback, plan_json
        );

        let content = match self.request_json(REFINE_SYSTEM_PROMPT, &user_prompt).await {
            Some(content) => content,
            None => return current.to_vec(),
        };

        let refined = parse_workout_days(&content);
        if refined.is_empty() {
            warn!("refine_workout: no valid days in refined response, keeping original");
            return current.to_vec();
        }
        refined
    }

    /// One JSON-mode completion; None on any backend error
    async fn request_json(&self, system_prompt: &str, user_prompt: &str) -> Option<String> {
        let request = CompletionRequest::new(system_prompt, user_prompt).json();
        match self.llm.complete(request).await {
            Ok(response) => {
                if let Some(usage) = response.usage {
                    info!(tokens = usage.total(), "request_json: completed");
                }
                Some(response.content)
            }
            Err(e) => {
                error!(error = %e, "request_json: backend call failed");
                None
            }
        }
    }
}

/// Parse a JSON-array response into workout days, dropping bad elements
fn parse_workout_days(content: &str) -> Vec<WorkoutDay> {
    extract_json(content)
        .and_then(|v| v.as_array().cloned())
        .map(|items| items.iter().filter_map(WorkoutDay::from_value).collect())
        .unwrap_or_default()
}

/// Best-effort extraction of a JSON document from model output
///
/// Strips markdown code fences, then falls back to slicing the outermost
/// array or object when the text carries prose around the payload.
fn extract_json(text: &str) -> Option<Value> {
    let trimmed = strip_code_fences(text.trim());

    if let Ok(value) = serde_json::from_str(trimmed) {
        return Some(value);
    }

    for (open, close) in [('[', ']'), ('{', '}')] {
        if let (Some(start), Some(end)) = (trimmed.find(open), trimmed.rfind(close))
            && end > start
            && let Ok(value) = serde_json::from_str(&trimmed[start..=end])
        {
            return Some(value);
        }
    }

    None
}

/// Remove a surrounding ``` fence, with or without a language tag
fn strip_code_fences(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Generic plan used when the backend cannot produce a usable workout
pub fn fallback_workout_plan(days: u32) -> Vec<WorkoutDay> {
    info!(days, "fallback_workout_plan: called");
    (1..=days)
        .map(|i| WorkoutDay {
            day: format!("Day {}", i),
            exercises: vec![
                Exercise {
                    name: "Push-ups".to_string(),
                    sets: "3".to_string(),
                    reps: "12".to_string(),
                    rest_period: Some("60s".to_string()),
                },
                Exercise {
                    name: "Squats".to_string(),
                    sets: "3".to_string(),
                    reps: "15".to_string(),
                    rest_period: Some("60s".to_string()),
                },
                Exercise {
                    name: "Plank".to_string(),
                    sets: "3".to_string(),
                    reps: "30s".to_string(),
                    rest_period: Some("60s".to_string()),
                },
            ],
            duration: "45 minutes".to_string(),
            intensity: "moderate".to_string(),
        })
        .collect()
}

/// Fixed four-meal plan used when the backend cannot produce a usable diet
pub fn fallback_diet_plan() -> Vec<Meal> {
    info!("fallback_diet_plan: called");

    fn macros(protein: f64, carbs: f64, fat: f64) -> BTreeMap<String, f64> {
        BTreeMap::from([
            ("protein".to_string(), protein),
            ("carbs".to_string(), carbs),
            ("fat".to_string(), fat),
        ])
    }

    vec![
        Meal {
            meal_type: "Breakfast".to_string(),
            foods: vec!["Oatmeal".to_string(), "Banana".to_string(), "Protein Shake".to_string()],
            calories: 500,
            macros: macros(30.0, 60.0, 10.0),
        },
        Meal {
            meal_type: "Lunch".to_string(),
            foods: vec![
                "Chicken Breast".to_string(),
                "Brown Rice".to_string(),
                "Broccoli".to_string(),
            ],
            calories: 700,
            macros: macros(40.0, 45.0, 15.0),
        },
        Meal {
            meal_type: "Dinner".to_string(),
            foods: vec![
                "Salmon".to_string(),
                "Sweet Potato".to_string(),
                "Asparagus".to_string(),
            ],
            calories: 600,
            macros: macros(35.0, 35.0, 30.0),
        },
        Meal {
            meal_type: "Snack".to_string(),
            foods: vec!["Greek Yogurt".to_string(), "Almonds".to_string(), "Berries".to_string()],
            calories: 300,
            macros: macros(20.0, 15.0, 15.0),
        },
    ]
}
