//! Reply formatting for the chat interpreter

use crate::plan::{Meal, WorkoutDay};

/// Multi-line rendering of a workout plan
pub fn format_workout_plan(plan: &[WorkoutDay]) -> String {
    let mut out = String::new();
    for day in plan {
        out.push_str(&format!("📅 {}:\n", day.day));
        out.push_str(&format!("⏱️ Duration: {}\n", day.duration));
        out.push_str(&format!("💪 Intensity: {}\n", day.intensity));
        out.push_str("Exercises:\n");
        for exercise in &day.exercises {
            out.push_str(&format!(
                "- {}: {} sets x {} reps",
                exercise.name, exercise.sets, exercise.reps
            ));
            if let Some(rest) = &exercise.rest_period {
                out.push_str(&format!(" (Rest: {})", rest));
            }
            out.push('\n');
        }
        out.push('\n');
    }
    out
}

/// Multi-line rendering of a diet plan
pub fn format_diet_plan(meals: &[Meal]) -> String {
    let mut out = String::new();
    for meal in meals {
        out.push_str(&format!("🍽️ {}:\n", meal.meal_type));
        out.push_str(&format!("Calories: {}\n", meal.calories));

        let macros = meal
            .macros
            .iter()
            .map(|(name, grams)| format!("{}: {}g", name, grams))
            .collect::<Vec<_>>()
            .join(", ");
        out.push_str(&format!("Macros: {}\n", macros));

        out.push_str("Foods:\n");
        for food in &meal.foods {
            out.push_str(&format!("- {}\n", food));
        }
        out.push('\n');
    }
    out
}

/// Static command reference
pub fn help_text() -> &'static str {
    "Here are the commands you can use:\n\n\
     1. 'create workout plan [days: 5] [level: beginner]' - Create a new workout plan\n\
     2. 'create diet plan [calories: 2000]' - Create a new diet plan\n\
     3. 'save workout [name: My Workout]' - Save the current workout plan to your profile\n\
     4. 'save diet [name: My Diet]' - Save the current diet plan to your profile\n\
     5. 'list workout plans' - Show your saved workout plans\n\
     6. 'list diet plans' - Show your saved diet plans\n\
     7. 'load workout plan: 1' - Load a saved workout plan\n\
     8. 'load diet plan: 1' - Load a saved diet plan\n\
     9. 'view profile' - See your current profile information\n\
     10. 'update profile age: 30, weight: 70kg, goals: lose weight' - Update your profile\n\
     11. 'export calendar [name: My Workouts] [date: 2024-06-01]' - Export workout schedule to a calendar file\n\
     12. 'schedule workout' - Preview a schedule for your current workout plan\n\
     13. 'help' - Show this help information\n\
     14. 'exit' or 'quit' - Exit the chat\n\n\
     You can also just chat with me normally about fitness topics!"
}
