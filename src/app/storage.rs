// Communication with SQLite
// The database is a plain key-value table; the whole task collection is one
// JSON snapshot stored under STORAGE_KEY.
// Based on https://github.com/rusqlite/rusqlite/blob/master/examples/persons/main.rs
use rusqlite::{Connection, OptionalExtension};
use serde_json::Value;
use std::path::Path;
use tracing::{debug, error, warn};

use crate::app::models::Task;
use crate::error::Result;

pub const STORAGE_KEY: &str = "todo_app_tasks_v1";

pub struct Storage {
    pub(crate) db_con: Connection,
}

impl Storage {
    pub fn open(path: impl AsRef<Path>) -> Result<Storage> {
        Storage::with_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Storage> {
        Storage::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(db_con: Connection) -> Result<Storage> {
        let storage = Storage { db_con };
        storage.create_table_if_not_exists()?;
        Ok(storage)
    }

    fn create_table_if_not_exists(&self) -> Result<()> {
        self.db_con.execute(
            "CREATE TABLE IF NOT EXISTS local_storage (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
            (),
        )?;
        Ok(())
    }

    // READ a raw slot
    pub fn get_item(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .db_con
            .query_row(
                "SELECT value FROM local_storage WHERE key = ?1;",
                [key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    // WRITE a raw slot, replacing whatever was there
    pub fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.db_con.execute(
            "INSERT INTO local_storage (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value;",
            (key, value),
        )?;
        Ok(())
    }

    // DELETE a raw slot
    pub fn remove_item(&self, key: &str) -> Result<()> {
        self.db_con
            .execute("DELETE FROM local_storage WHERE key = ?1;", [key])?;
        Ok(())
    }

    /// Writes the full collection as one snapshot.
    ///
    /// Returns whether the snapshot became durable. Failures are logged and
    /// swallowed: the in-memory collection stays the source of truth.
    pub fn save(&self, tasks: &[Task]) -> bool {
        let result = serde_json::to_string(tasks)
            .map_err(crate::error::Error::from)
            .and_then(|snapshot| self.set_item(STORAGE_KEY, &snapshot));

        match result {
            Ok(()) => {
                debug!(count = tasks.len(), "saved task snapshot");
                true
            }
            Err(err) => {
                error!(error = %err, "failed to save tasks");
                false
            }
        }
    }

    /// Reads the snapshot back. Never fails: a missing or unreadable slot
    /// yields an empty collection.
    pub fn load(&self) -> Vec<Task> {
        let raw = match self.get_item(STORAGE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(err) => {
                error!(error = %err, "failed to read tasks");
                return Vec::new();
            }
        };

        let records = match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Array(records)) => records,
            Ok(_) => {
                warn!("stored tasks are not a JSON array, starting empty");
                return Vec::new();
            }
            Err(err) => {
                warn!(error = %err, "stored tasks are not valid JSON, starting empty");
                return Vec::new();
            }
        };

        records
            .into_iter()
            .enumerate()
            .filter_map(|(index, record)| match serde_json::from_value::<Task>(record) {
                Ok(task) => Some(task),
                Err(err) => {
                    warn!(index, error = %err, "skipping unreadable task record");
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::models::{Priority, TaskStatus};
    use chrono::{DateTime, Utc};
    use pretty_assertions::assert_eq;

    fn task(id: &str, title: &str) -> Task {
        Task {
            id: id.to_string(),
            title: title.to_string(),
            description: String::new(),
            status: TaskStatus::Pending,
            priority: Priority::Medium,
            deadline: String::new(),
            created_at: DateTime::parse_from_rfc3339("2024-06-01T08:30:00.123Z")
                .unwrap()
                .with_timezone(&Utc),
        }
    }

    #[test]
    fn load_from_empty_slot_is_empty() {
        let storage = Storage::open_in_memory().unwrap();
        assert!(storage.load().is_empty());
    }

    #[test]
    fn save_then_load_preserves_every_field_and_order() {
        let storage = Storage::open_in_memory().unwrap();
        let mut second = task("b", "Second");
        second.description = "details".to_string();
        second.status = TaskStatus::InProgress;
        second.priority = Priority::High;
        second.deadline = "2025-01-01T00:00".to_string();
        let tasks = vec![task("c", "Third"), second, task("a", "First")];

        assert!(storage.save(&tasks));
        assert_eq!(storage.load(), tasks);
    }

    #[test]
    fn save_overwrites_previous_snapshot() {
        let storage = Storage::open_in_memory().unwrap();
        storage.save(&[task("a", "First"), task("b", "Second")]);
        storage.save(&[task("c", "Third")]);

        assert_eq!(storage.load(), vec![task("c", "Third")]);
    }

    #[test]
    fn corrupted_snapshot_loads_as_empty() {
        let storage = Storage::open_in_memory().unwrap();

        storage.set_item(STORAGE_KEY, "{not json").unwrap();
        assert!(storage.load().is_empty());

        storage.set_item(STORAGE_KEY, r#"{"id":"a"}"#).unwrap();
        assert!(storage.load().is_empty());
    }

    #[test]
    fn unreadable_records_are_skipped_and_partial_ones_repaired() {
        let storage = Storage::open_in_memory().unwrap();
        storage
            .set_item(
                STORAGE_KEY,
                r#"[42, {"id":"a","title":"Kept","priority":"urgent"}, {"title":"no id"}]"#,
            )
            .unwrap();

        let tasks = storage.load();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "Kept");
        assert_eq!(tasks[0].priority, Priority::Medium);
    }

    #[test]
    fn non_string_status_and_priority_fall_back_to_defaults() {
        let storage = Storage::open_in_memory().unwrap();
        storage
            .set_item(
                STORAGE_KEY,
                r#"[{"id":"a","title":"Numbers","status":3,"priority":{"level":"high"}},
                    {"id":"b","title":"Lists","status":["completed"],"priority":true}]"#,
            )
            .unwrap();

        let tasks = storage.load();
        assert_eq!(tasks.len(), 2);
        assert!(tasks.iter().all(|task| task.status == TaskStatus::Pending));
        assert!(tasks.iter().all(|task| task.priority == Priority::Medium));
    }

    #[test]
    fn failed_write_is_reported_not_raised() {
        let storage = Storage::open_in_memory().unwrap();
        storage
            .db_con
            .execute("DROP TABLE local_storage;", ())
            .unwrap();

        assert!(!storage.save(&[task("a", "First")]));
        assert!(storage.load().is_empty());
    }

    #[test]
    fn snapshot_survives_reopening_the_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.db");
        let tasks = vec![task("a", "First")];

        Storage::open(&path).unwrap().save(&tasks);

        assert_eq!(Storage::open(&path).unwrap().load(), tasks);
    }

    #[test]
    fn raw_slots_are_independent_of_the_task_key() {
        let storage = Storage::open_in_memory().unwrap();
        storage.set_item("other", "x").unwrap();
        storage.save(&[task("a", "First")]);

        assert_eq!(storage.get_item("other").unwrap().as_deref(), Some("x"));
        storage.remove_item(STORAGE_KEY).unwrap();
        assert_eq!(storage.get_item(STORAGE_KEY).unwrap(), None);
        assert!(storage.load().is_empty());
    }
}
