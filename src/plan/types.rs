//! Typed plan records
//!
//! Workout and diet plans are only ever constructed through the fallible
//! `from_value` constructors, which coerce the loosely-typed JSON a language
//! model returns into the record shape. A value that cannot be coerced drops
//! that record alone; the rest of the batch proceeds.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single exercise within a workout day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    pub name: String,
    pub sets: String,
    pub reps: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rest_period: Option<String>,
}

impl Exercise {
    /// Build from a JSON object, stringifying attribute values
    ///
    /// Models frequently return sets/reps as numbers; everything is forced
    /// to string. Returns None if the value is not an object or lacks a
    /// name, sets, or reps.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        Some(Self {
            name: coerce_string(obj.get("name")?)?,
            sets: coerce_string(obj.get("sets")?)?,
            reps: coerce_string(obj.get("reps")?)?,
            rest_period: obj.get("rest_period").and_then(coerce_string),
        })
    }
}

/// One day of a workout plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutDay {
    pub day: String,
    pub exercises: Vec<Exercise>,
    pub duration: String,
    pub intensity: String,
}

impl WorkoutDay {
    /// Build from a JSON object returned by the model
    ///
    /// day, exercises, duration and intensity are required; malformed
    /// entries inside the exercises array are skipped individually.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let exercises = obj
            .get("exercises")?
            .as_array()?
            .iter()
            .filter_map(Exercise::from_value)
            .collect();

        Some(Self {
            day: coerce_string(obj.get("day")?)?,
            exercises,
            duration: coerce_string(obj.get("duration")?)?,
            intensity: coerce_string(obj.get("intensity")?)?,
        })
    }
}

/// One meal of a diet plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meal {
    pub meal_type: String,
    pub foods: Vec<String>,
    pub calories: u32,
    pub macros: BTreeMap<String, f64>,
}

impl Meal {
    /// Build from a JSON object returned by the model
    ///
    /// Calories are forced to an integer (thousands separators stripped,
    /// floats truncated); macro values are forced to float. A single
    /// uncoercible field drops the whole meal.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;

        let foods = obj
            .get("foods")?
            .as_array()?
            .iter()
            .filter_map(coerce_string)
            .collect();

        let mut macros = BTreeMap::new();
        for (key, val) in obj.get("macros")?.as_object()? {
            macros.insert(key.clone(), coerce_f64(val)?);
        }

        Some(Self {
            meal_type: coerce_string(obj.get("meal_type")?)?,
            foods,
            calories: coerce_u32(obj.get("calories")?)?,
            macros,
        })
    }
}

/// Force a JSON value to a string
fn coerce_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Force a JSON value to a non-negative integer, stripping "1,200"-style separators
fn coerce_u32(value: &Value) -> Option<u32> {
    let n = coerce_f64(value)?;
    if n.is_finite() && n >= 0.0 {
        Some(n as u32)
    } else {
        None
    }
}

/// Force a JSON value to a float, stripping thousands separators from strings
fn coerce_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.replace(',', "").trim().parse::<f64>().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_exercise_stringifies_numbers() {
        let value = json!({ "name": "Squats", "sets": 3, "reps": 15, "rest_period": "60s" });
        let exercise = Exercise::from_value(&value).unwrap();
        assert_eq!(exercise.sets, "3");
        assert_eq!(exercise.reps, "15");
        assert_eq!(exercise.rest_period.as_deref(), Some("60s"));
    }

    #[test]
    fn test_exercise_missing_name_is_dropped() {
        let value = json!({ "sets": "3", "reps": "12" });
        assert!(Exercise::from_value(&value).is_none());
        assert!(Exercise::from_value(&json!("just a string")).is_none());
    }

    #[test]
    fn test_workout_day_skips_malformed_exercises() {
        let value = json!({
            "day": "Day 1",
            "exercises": [
                { "name": "Push-ups", "sets": "3", "reps": "12" },
                "not an object",
                { "sets": "3", "reps": "12" }
            ],
            "duration": "45 minutes",
            "intensity": "moderate"
        });
        let day = WorkoutDay::from_value(&value).unwrap();
        assert_eq!(day.exercises.len(), 1);
        assert_eq!(day.exercises[0].name, "Push-ups");
    }

    #[test]
    fn test_workout_day_missing_required_field() {
        let value = json!({
            "day": "Day 1",
            "exercises": [],
            "duration": "45 minutes"
        });
        assert!(WorkoutDay::from_value(&value).is_none());
    }

    #[test]
    fn test_meal_coerces_calories_and_macros() {
        let value = json!({
            "meal_type": "Lunch",
            "foods": ["Chicken Breast", "Brown Rice"],
            "calories": "1,200",
            "macros": { "protein": "40", "carbs": 45.5, "fat": 15 }
        });
        let meal = Meal::from_value(&value).unwrap();
        assert_eq!(meal.calories, 1200);
        assert_eq!(meal.macros["protein"], 40.0);
        assert_eq!(meal.macros["carbs"], 45.5);
    }

    #[test]
    fn test_meal_float_calories_truncated() {
        let value = json!({
            "meal_type": "Snack",
            "foods": ["Almonds"],
            "calories": 312.7,
            "macros": { "fat": 15.0 }
        });
        assert_eq!(Meal::from_value(&value).unwrap().calories, 312);
    }

    #[test]
    fn test_meal_uncoercible_macro_drops_meal() {
        let value = json!({
            "meal_type": "Dinner",
            "foods": ["Salmon"],
            "calories": 600,
            "macros": { "protein": "lots" }
        });
        assert!(Meal::from_value(&value).is_none());
    }

    #[test]
    fn test_serde_round_trip() {
        let value = json!({
            "day": "Day 2",
            "exercises": [{ "name": "Plank", "sets": "3", "reps": "30s", "rest_period": "60s" }],
            "duration": "30 minutes",
            "intensity": "low"
        });
        let day = WorkoutDay::from_value(&value).unwrap();
        let serialized = serde_json::to_value(&day).unwrap();
        let back: WorkoutDay = serde_json::from_value(serialized).unwrap();
        assert_eq!(back, day);
    }
}
