//! SQLite persistence gateway
//!
//! Users, profiles and saved plans live in four tables. Every operation is
//! defensive: on any underlying failure it logs and returns the documented
//! sentinel (`-1`, `false`, empty) instead of propagating. A database that
//! cannot be opened degrades to "no persistence this session" rather than
//! failing the process.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, params};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::plan::{Meal, WorkoutDay};

/// User profile attributes, free-form key/value
pub type Profile = BTreeMap<String, String>;

/// A stored plan row
#[derive(Debug, Clone)]
pub struct SavedPlan {
    pub id: i64,
    pub plan_name: String,
    /// Serialized list of WorkoutDay or Meal records
    pub plan_data: Value,
    pub created_at: DateTime<Utc>,
}

/// Persistence gateway over a single SQLite connection
pub struct Database {
    conn: Option<Connection>,
}

impl Database {
    /// Open (or create) the database at the given path
    ///
    /// Open failures are not fatal: the returned gateway answers every
    /// operation with its sentinel value.
    pub fn open(path: &Path) -> Self {
        if let Some(parent) = path.parent()
            && let Err(e) = fs::create_dir_all(parent)
        {
            warn!(error = %e, dir = %parent.display(), "open: cannot create data directory");
            return Self { conn: None };
        }

        match Connection::open(path).and_then(|conn| {
            setup_tables(&conn)?;
            Ok(conn)
        }) {
            Ok(conn) => {
                info!(path = %path.display(), "open: database ready");
                Self { conn: Some(conn) }
            }
            Err(e) => {
                warn!(error = %e, path = %path.display(), "open: database unavailable, running without persistence");
                Self { conn: None }
            }
        }
    }

    /// In-memory database, used by tests
    pub fn open_in_memory() -> Self {
        match Connection::open_in_memory().and_then(|conn| {
            setup_tables(&conn)?;
            Ok(conn)
        }) {
            Ok(conn) => Self { conn: Some(conn) },
            Err(e) => {
                warn!(error = %e, "open_in_memory: failed");
                Self { conn: None }
            }
        }
    }

    /// Gateway with no backing store; every operation returns its sentinel
    pub fn unavailable() -> Self {
        Self { conn: None }
    }

    pub fn is_available(&self) -> bool {
        self.conn.is_some()
    }

    /// Look up a user by name, creating it on first sight
    ///
    /// Returns (user_id, created). An id <= 0 means the store is
    /// unavailable and the session runs without persistence.
    pub fn get_or_create_user(&self, username: &str) -> (i64, bool) {
        let Some(conn) = &self.conn else {
            warn!("get_or_create_user: no database connection");
            return (-1, false);
        };

        let existing = conn
            .query_row("SELECT id FROM users WHERE username = ?1", params![username], |row| {
                row.get::<_, i64>(0)
            })
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(other),
            });

        match existing {
            Ok(Some(id)) => {
                debug!(username, id, "get_or_create_user: found existing user");
                (id, false)
            }
            Ok(None) => {
                match conn.execute(
                    "INSERT INTO users (username, created_at) VALUES (?1, ?2)",
                    params![username, Utc::now().to_rfc3339()],
                ) {
                    Ok(_) => {
                        let id = conn.last_insert_rowid();
                        info!(username, id, "get_or_create_user: created user");
                        (id, true)
                    }
                    Err(e) => {
                        warn!(error = %e, username, "get_or_create_user: insert failed");
                        (-1, false)
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, username, "get_or_create_user: lookup failed");
                (-1, false)
            }
        }
    }

    /// Fetch a user profile; empty when none exists or the store fails
    pub fn get_profile(&self, user_id: i64) -> Profile {
        let Some(conn) = &self.conn else {
            warn!("get_profile: no database connection");
            return Profile::new();
        };

        let raw = conn
            .query_row(
                "SELECT profile_data FROM profiles WHERE user_id = ?1",
                params![user_id],
                |row| row.get::<_, String>(0),
            )
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(other),
            });

        match raw {
            Ok(Some(json)) => serde_json::from_str(&json).unwrap_or_else(|e| {
                warn!(error = %e, user_id, "get_profile: corrupt profile payload");
                Profile::new()
            }),
            Ok(None) => Profile::new(),
            Err(e) => {
                warn!(error = %e, user_id, "get_profile: query failed");
                Profile::new()
            }
        }
    }

    /// Save a user profile, replacing any existing row (upsert)
    pub fn save_profile(&self, user_id: i64, profile: &Profile) -> bool {
        let Some(conn) = &self.conn else {
            warn!("save_profile: no database connection");
            return false;
        };

        let json = match serde_json::to_string(profile) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, user_id, "save_profile: serialization failed");
                return false;
            }
        };
        let now = Utc::now().to_rfc3339();

        let updated = conn.execute(
            "UPDATE profiles SET profile_data = ?1, updated_at = ?2 WHERE user_id = ?3",
            params![json, now, user_id],
        );

        match updated {
            Ok(0) => {
                match conn.execute(
                    "INSERT INTO profiles (user_id, profile_data, updated_at) VALUES (?1, ?2, ?3)",
                    params![user_id, json, now],
                ) {
                    Ok(_) => {
                        info!(user_id, "save_profile: created profile");
                        true
                    }
                    Err(e) => {
                        warn!(error = %e, user_id, "save_profile: insert failed");
                        false
                    }
                }
            }
            Ok(_) => {
                info!(user_id, "save_profile: updated profile");
                true
            }
            Err(e) => {
                warn!(error = %e, user_id, "save_profile: update failed");
                false
            }
        }
    }

    /// Save a workout plan; returns the new row id, or -1 on failure
    ///
    /// Plans are append-only: saving under an existing name creates a new
    /// row rather than replacing it.
    pub fn save_workout_plan(&self, user_id: i64, plan_name: &str, plan: &[WorkoutDay]) -> i64 {
        self.save_plan("workout_plans", user_id, plan_name, serde_json::to_value(plan))
    }

    /// Save a diet plan; returns the new row id, or -1 on failure
    pub fn save_diet_plan(&self, user_id: i64, plan_name: &str, plan: &[Meal]) -> i64 {
        self.save_plan("diet_plans", user_id, plan_name, serde_json::to_value(plan))
    }

    /// All workout plans for a user, newest first
    pub fn get_workout_plans(&self, user_id: i64) -> Vec<SavedPlan> {
        self.get_plans("workout_plans", user_id)
    }

    /// All diet plans for a user, newest first
    pub fn get_diet_plans(&self, user_id: i64) -> Vec<SavedPlan> {
        self.get_plans("diet_plans", user_id)
    }

    fn save_plan(&self, table: &str, user_id: i64, plan_name: &str, payload: serde_json::Result<Value>) -> i64 {
        let Some(conn) = &self.conn else {
            warn!(table, "save_plan: no database connection");
            return -1;
        };

        let json = match payload.map(|v| v.to_string()) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, table, "save_plan: serialization failed");
                return -1;
            }
        };

        let sql = format!(
            "INSERT INTO {} (user_id, plan_name, plan_data, created_at) VALUES (?1, ?2, ?3, ?4)",
            table
        );
        match conn.execute(&sql, params![user_id, plan_name, json, Utc::now().to_rfc3339()]) {
            Ok(_) => {
                let id = conn.last_insert_rowid();
                info!(table, user_id, plan_name, id, "save_plan: saved");
                id
            }
            Err(e) => {
                warn!(error = %e, table, user_id, "save_plan: insert failed");
                -1
            }
        }
    }

    fn get_plans(&self, table: &str, user_id: i64) -> Vec<SavedPlan> {
        let Some(conn) = &self.conn else {
            warn!(table, "get_plans: no database connection");
            return Vec::new();
        };

        let sql = format!(
            "SELECT id, plan_name, plan_data, created_at FROM {} \
             WHERE user_id = ?1 ORDER BY created_at DESC, id DESC",
            table
        );

        let result = conn.prepare(&sql).and_then(|mut stmt| {
            let rows = stmt.query_map(params![user_id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
        });

        match result {
            Ok(rows) => rows
                .into_iter()
                .filter_map(|(id, plan_name, data, created_at)| {
                    let plan_data = serde_json::from_str(&data)
                        .map_err(|e| warn!(error = %e, id, "get_plans: corrupt plan payload"))
                        .ok()?;
                    let created_at = DateTime::parse_from_rfc3339(&created_at)
                        .map_err(|e| warn!(error = %e, id, "get_plans: bad timestamp"))
                        .ok()?
                        .with_timezone(&Utc);
                    Some(SavedPlan {
                        id,
                        plan_name,
                        plan_data,
                        created_at,
                    })
                })
                .collect(),
            Err(e) => {
                warn!(error = %e, table, user_id, "get_plans: query failed");
                Vec::new()
            }
        }
    }
}

fn setup_tables(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT UNIQUE NOT NULL,
            created_at TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS profiles (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL REFERENCES users(id),
            profile_data TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS workout_plans (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL REFERENCES users(id),
            plan_name TEXT,
            plan_data TEXT NOT NULL,
            created_at TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS diet_plans (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL REFERENCES users(id),
            plan_name TEXT,
            plan_data TEXT NOT NULL,
            created_at TEXT NOT NULL
        );",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::fallback_workout_plan;

    #[test]
    fn test_get_or_create_user() {
        let db = Database::open_in_memory();

        let (id, created) = db.get_or_create_user("alice");
        assert!(id > 0);
        assert!(created);

        let (same_id, created_again) = db.get_or_create_user("alice");
        assert_eq!(same_id, id);
        assert!(!created_again);

        let (other_id, _) = db.get_or_create_user("bob");
        assert_ne!(other_id, id);
    }

    #[test]
    fn test_profile_round_trip_and_upsert() {
        let db = Database::open_in_memory();
        let (id, _) = db.get_or_create_user("alice");

        assert!(db.get_profile(id).is_empty());

        let mut profile = Profile::new();
        profile.insert("age".to_string(), "31".to_string());
        profile.insert("goals".to_string(), "lose fat".to_string());
        assert!(db.save_profile(id, &profile));
        assert_eq!(db.get_profile(id), profile);

        // upsert replaces the row wholesale
        profile.insert("weight".to_string(), "70kg".to_string());
        assert!(db.save_profile(id, &profile));
        let loaded = db.get_profile(id);
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded["weight"], "70kg");
    }

    #[test]
    fn test_plan_round_trip() {
        let db = Database::open_in_memory();
        let (id, _) = db.get_or_create_user("alice");

        let plan = fallback_workout_plan(3);
        let plan_id = db.save_workout_plan(id, "3-Day Plan", &plan);
        assert!(plan_id > 0);

        let saved = db.get_workout_plans(id);
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].plan_name, "3-Day Plan");

        // the stored payload deep-equals the original records
        let restored: Vec<WorkoutDay> = serde_json::from_value(saved[0].plan_data.clone()).unwrap();
        assert_eq!(restored, plan);
    }

    #[test]
    fn test_plans_listed_newest_first() {
        let db = Database::open_in_memory();
        let (id, _) = db.get_or_create_user("alice");

        db.save_workout_plan(id, "first", &fallback_workout_plan(1));
        db.save_workout_plan(id, "second", &fallback_workout_plan(2));

        let saved = db.get_workout_plans(id);
        assert_eq!(saved.len(), 2);
        assert_eq!(saved[0].plan_name, "second");
        assert_eq!(saved[1].plan_name, "first");
    }

    #[test]
    fn test_name_collision_appends() {
        let db = Database::open_in_memory();
        let (id, _) = db.get_or_create_user("alice");

        let a = db.save_workout_plan(id, "mine", &fallback_workout_plan(1));
        let b = db.save_workout_plan(id, "mine", &fallback_workout_plan(1));
        assert!(a > 0 && b > 0 && a != b);
        assert_eq!(db.get_workout_plans(id).len(), 2);
    }

    #[test]
    fn test_plans_scoped_to_user() {
        let db = Database::open_in_memory();
        let (alice, _) = db.get_or_create_user("alice");
        let (bob, _) = db.get_or_create_user("bob");

        db.save_diet_plan(alice, "cut", &crate::plan::fallback_diet_plan());
        assert_eq!(db.get_diet_plans(alice).len(), 1);
        assert!(db.get_diet_plans(bob).is_empty());
    }

    #[test]
    fn test_unavailable_store_returns_sentinels() {
        let db = Database::unavailable();
        assert!(!db.is_available());

        let (id, created) = db.get_or_create_user("alice");
        assert_eq!(id, -1);
        assert!(!created);

        assert!(db.get_profile(1).is_empty());
        assert!(!db.save_profile(1, &Profile::new()));
        assert_eq!(db.save_workout_plan(1, "x", &fallback_workout_plan(1)), -1);
        assert!(db.get_workout_plans(1).is_empty());
    }
}
