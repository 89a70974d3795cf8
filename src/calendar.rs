//! ICS calendar export
//!
//! Maps workout plans (or arbitrary event specs) to calendar events and
//! writes them as an iCalendar document. Filenames are deterministic, so a
//! second export with the same name and start date overwrites the first.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use eyre::{Context, Result, eyre};
use icalendar::{Calendar, Component, Event, EventLike};
use tracing::{debug, info};
use uuid::Uuid;

use crate::plan::WorkoutDay;

/// An ephemeral event used for custom exports and appends
#[derive(Debug, Clone)]
pub struct EventSpec {
    pub name: String,
    pub description: String,
    pub begin: DateTime<Utc>,
    pub duration_minutes: u32,
    pub location: Option<String>,
}

/// Writes workout schedules as ICS files under a fixed output directory
pub struct CalendarExporter {
    output_dir: PathBuf,
}

impl CalendarExporter {
    /// Create an exporter, ensuring the output directory exists
    pub fn new(output_dir: impl Into<PathBuf>) -> Result<Self> {
        let output_dir = output_dir.into();
        fs::create_dir_all(&output_dir).context("Failed to create calendar output directory")?;
        debug!(dir = %output_dir.display(), "CalendarExporter ready");
        Ok(Self { output_dir })
    }

    /// Export a workout plan, one event per day starting at `start_date`
    ///
    /// Event `i` begins at midnight of `start_date + i days` and runs for
    /// `duration_minutes`. Returns the path of the written file.
    pub fn export_workouts(
        &self,
        plans: &[WorkoutDay],
        start_date: NaiveDate,
        calendar_name: &str,
        duration_minutes: u32,
    ) -> Result<PathBuf> {
        info!(workouts = plans.len(), calendar_name, "export_workouts: called");

        let mut calendar = Calendar::new();
        calendar.name(calendar_name);

        for (i, workout) in plans.iter().enumerate() {
            let begin = (start_date + Duration::days(i as i64))
                .and_time(NaiveTime::MIN)
                .and_utc();

            let event = Event::new()
                .uid(&Uuid::new_v4().to_string())
                .summary(&format!("Workout: {}", workout.day))
                .description(&workout_description(workout))
                .starts(begin)
                .ends(begin + Duration::minutes(i64::from(duration_minutes)))
                .done();

            calendar.push(event);
            debug!(day = %workout.day, date = %begin.date_naive(), "export_workouts: added event");
        }

        let filename = ics_filename(calendar_name, start_date);
        self.write_calendar(&calendar, &filename)
    }

    /// Export arbitrary events to a new calendar file
    pub fn export_events(&self, events: &[EventSpec], calendar_name: &str) -> Result<PathBuf> {
        info!(events = events.len(), calendar_name, "export_events: called");

        let mut calendar = Calendar::new();
        calendar.name(calendar_name);
        for spec in events {
            calendar.push(build_event(spec));
        }

        let date = events
            .first()
            .map(|e| e.begin.date_naive())
            .unwrap_or_else(|| Utc::now().date_naive());
        let filename = ics_filename(calendar_name, date);
        self.write_calendar(&calendar, &filename)
    }

    /// Append events to an existing calendar file, rewriting it in place
    ///
    /// No conflict detection between old and new events.
    pub fn append_events(&self, calendar_path: &Path, events: &[EventSpec]) -> Result<PathBuf> {
        info!(events = events.len(), path = %calendar_path.display(), "append_events: called");

        let contents = fs::read_to_string(calendar_path)
            .context(format!("Failed to read calendar file {}", calendar_path.display()))?;
        let mut calendar: Calendar = contents
            .parse()
            .map_err(|e: String| eyre!("Failed to parse calendar file: {}", e))?;

        for spec in events {
            calendar.push(build_event(spec));
        }

        fs::write(calendar_path, calendar.to_string())
            .context(format!("Failed to write calendar file {}", calendar_path.display()))?;
        Ok(calendar_path.to_path_buf())
    }

    /// Shareable reference for an exported file (a file:// URL)
    pub fn calendar_link(&self, calendar_path: &Path) -> String {
        let absolute = std::path::absolute(calendar_path).unwrap_or_else(|_| calendar_path.to_path_buf());
        format!("file://{}", absolute.display())
    }

    fn write_calendar(&self, calendar: &Calendar, filename: &str) -> Result<PathBuf> {
        let path = self.output_dir.join(filename);
        fs::write(&path, calendar.to_string()).context(format!("Failed to write calendar file {}", path.display()))?;
        info!(path = %path.display(), "write_calendar: saved");
        Ok(path)
    }
}

/// Event body: intensity line plus one line per exercise
fn workout_description(workout: &WorkoutDay) -> String {
    let mut description = format!("Intensity: {}\nExercises:\n", workout.intensity);
    for exercise in &workout.exercises {
        description.push_str(&format!(
            "- {}: {} sets x {} reps",
            exercise.name, exercise.sets, exercise.reps
        ));
        if let Some(rest) = &exercise.rest_period {
            description.push_str(&format!(" (Rest: {})", rest));
        }
        description.push('\n');
    }
    description
}

fn build_event(spec: &EventSpec) -> Event {
    let mut event = Event::new();
    event
        .uid(&Uuid::new_v4().to_string())
        .summary(&spec.name)
        .description(&spec.description)
        .starts(spec.begin)
        .ends(spec.begin + Duration::minutes(i64::from(spec.duration_minutes)));
    if let Some(location) = &spec.location {
        event.location(location);
    }
    event.done()
}

/// `<name with spaces replaced by underscores>_<YYYYMMDD>.ics`
fn ics_filename(calendar_name: &str, date: NaiveDate) -> String {
    format!("{}_{}.ics", calendar_name.replace(' ', "_"), date.format("%Y%m%d"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::fallback_workout_plan;
    use chrono::TimeZone;
    use tempfile::tempdir;

    #[test]
    fn test_export_workouts_one_event_per_day() {
        let dir = tempdir().unwrap();
        let exporter = CalendarExporter::new(dir.path()).unwrap();

        let plan = fallback_workout_plan(3);
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let path = exporter.export_workouts(&plan, start, "Workout Schedule", 60).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents.matches("BEGIN:VEVENT").count(), 3);
        assert!(contents.contains("SUMMARY:Workout: Day 1"));
        assert!(contents.contains("20240101"));
        assert!(contents.contains("20240102"));
        assert!(contents.contains("20240103"));
        // 60-minute duration: first event ends at 01:00
        assert!(contents.contains("20240101T010000"));
    }

    #[test]
    fn test_filename_rule() {
        let dir = tempdir().unwrap();
        let exporter = CalendarExporter::new(dir.path()).unwrap();

        let start = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        let path = exporter
            .export_workouts(&fallback_workout_plan(1), start, "My Workout Schedule", 45)
            .unwrap();

        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "My_Workout_Schedule_20240305.ics"
        );
    }

    #[test]
    fn test_same_name_and_date_overwrites() {
        let dir = tempdir().unwrap();
        let exporter = CalendarExporter::new(dir.path()).unwrap();
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

        let first = exporter
            .export_workouts(&fallback_workout_plan(5), start, "Schedule", 60)
            .unwrap();
        let second = exporter
            .export_workouts(&fallback_workout_plan(2), start, "Schedule", 60)
            .unwrap();

        assert_eq!(first, second);
        let contents = fs::read_to_string(&second).unwrap();
        assert_eq!(contents.matches("BEGIN:VEVENT").count(), 2);
    }

    #[test]
    fn test_append_events_keeps_existing() {
        let dir = tempdir().unwrap();
        let exporter = CalendarExporter::new(dir.path()).unwrap();
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

        let path = exporter
            .export_workouts(&fallback_workout_plan(2), start, "Schedule", 60)
            .unwrap();

        let extra = EventSpec {
            name: "Stretching".to_string(),
            description: "Cooldown session".to_string(),
            begin: Utc.with_ymd_and_hms(2024, 1, 4, 18, 0, 0).unwrap(),
            duration_minutes: 30,
            location: Some("Home".to_string()),
        };
        exporter.append_events(&path, &[extra]).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents.matches("BEGIN:VEVENT").count(), 3);
        assert!(contents.contains("SUMMARY:Stretching"));
        assert!(contents.contains("LOCATION:Home"));
        // original events survived the rewrite
        assert!(contents.contains("Workout: Day 1"));
    }

    #[test]
    fn test_append_missing_file_errors_with_reason() {
        let dir = tempdir().unwrap();
        let exporter = CalendarExporter::new(dir.path()).unwrap();

        let err = exporter
            .append_events(&dir.path().join("nope.ics"), &[])
            .unwrap_err();
        assert!(err.to_string().contains("nope.ics"));
    }

    #[test]
    fn test_calendar_link_is_file_url() {
        let dir = tempdir().unwrap();
        let exporter = CalendarExporter::new(dir.path()).unwrap();
        let link = exporter.calendar_link(Path::new("calendars/a.ics"));
        assert!(link.starts_with("file://"));
        assert!(link.ends_with("a.ics"));
    }

    #[test]
    fn test_description_includes_rest_period() {
        let plan = fallback_workout_plan(1);
        let description = workout_description(&plan[0]);
        assert!(description.starts_with("Intensity: moderate"));
        assert!(description.contains("- Push-ups: 3 sets x 12 reps (Rest: 60s)"));
    }
}
