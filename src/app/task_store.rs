use chrono::{DateTime, Duration, Local, SubsecRound, Utc};
use now::DateTimeNow;
use tracing::{debug, info};

use crate::app::models::{generate_task_id, Task, TaskExtra, TaskStatus};
use crate::app::storage::Storage;

/// Owner of the canonical task collection.
///
/// Every mutation keeps the collection consistent (unique ids, non-empty
/// titles) and writes a fresh snapshot through the storage right after it
/// is applied. Operations never fail: bad input and unknown ids are no-ops.
pub struct TaskStore<'a> {
    tasks: Vec<Task>,
    storage: &'a Storage,
}

// Counters shown in the statistics box
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TaskStats {
    pub total: usize,
    pub completed: usize,
    pub in_progress: usize,
    pub pending: usize,
    pub overdue: usize,
    pub due_next_week: usize,
}

impl<'a> TaskStore<'a> {
    // Initialize the store with the snapshot found in the storage
    pub fn with_items_from_storage(storage: &'a Storage) -> TaskStore<'a> {
        let tasks = storage.load();
        info!(count = tasks.len(), "loaded tasks");
        TaskStore { tasks, storage }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    // CREATE
    // Returns the new task, or None when the title is blank
    pub fn create(&mut self, title_raw: &str, deadline_raw: &str, extra: TaskExtra) -> Option<&Task> {
        let title = title_raw.trim();
        if title.is_empty() {
            debug!("ignoring task with empty title");
            return None;
        }

        let created_at = Utc::now().trunc_subsecs(3);
        let task = Task {
            id: self.fresh_id(created_at),
            title: title.to_string(),
            description: extra.description.unwrap_or_default(),
            status: TaskStatus::Pending,
            priority: extra.priority.unwrap_or_default(),
            deadline: deadline_raw.trim().to_string(),
            created_at,
        };
        debug!(id = %task.id, "created task");

        self.tasks.push(task);
        self.persist();
        self.tasks.last()
    }

    // UPDATE
    // Whole-record replacement. The creation time of the stored task is kept.
    pub fn update(&mut self, task: Task) -> bool {
        let title = task.title.trim().to_string();
        if title.is_empty() {
            debug!(id = %task.id, "ignoring update with empty title");
            return false;
        }

        let Some(existing) = self.tasks.iter_mut().find(|existing| existing.id == task.id) else {
            return false;
        };
        let created_at = existing.created_at;
        *existing = Task {
            title,
            created_at,
            ..task
        };
        debug!(id = %existing.id, "updated task");

        self.persist();
        true
    }

    // DELETE
    pub fn delete(&mut self, id: &str) -> bool {
        let Some(position) = self.tasks.iter().position(|task| task.id == id) else {
            return false;
        };
        self.tasks.remove(position);
        debug!(id, "deleted task");

        self.persist();
        true
    }

    // Completed tasks go back to pending, any other status completes
    pub fn toggle_status(&mut self, id: &str) -> bool {
        let Some(task) = self.tasks.iter_mut().find(|task| task.id == id) else {
            return false;
        };
        task.status = task.status.toggled();
        debug!(id, status = %task.status, "toggled task");

        self.persist();
        true
    }

    pub fn stats(&self) -> TaskStats {
        let start_of_today = Local::now().beginning_of_day().with_timezone(&Utc);
        self.stats_as_of(start_of_today, Utc::now())
    }

    fn stats_as_of(&self, start_of_today: DateTime<Utc>, now: DateTime<Utc>) -> TaskStats {
        let next_week = now + Duration::weeks(1);
        let mut stats = TaskStats {
            total: self.tasks.len(),
            ..TaskStats::default()
        };

        for task in &self.tasks {
            match task.status {
                TaskStatus::Completed => stats.completed += 1,
                TaskStatus::InProgress => stats.in_progress += 1,
                TaskStatus::Pending => stats.pending += 1,
            }

            if task.is_completed() {
                continue;
            }
            if let Some(deadline) = task.deadline_at() {
                if deadline < start_of_today {
                    stats.overdue += 1;
                } else if deadline < next_week {
                    stats.due_next_week += 1;
                }
            }
        }

        stats
    }

    fn fresh_id(&self, now: DateTime<Utc>) -> String {
        loop {
            let id = generate_task_id(now);
            if self.get(&id).is_none() {
                return id;
            }
        }
    }

    fn persist(&self) {
        self.storage.save(&self.tasks);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::models::Priority;
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;

    fn add(store: &mut TaskStore, title: &str) -> String {
        store
            .create(title, "", TaskExtra::default())
            .map(|task| task.id.clone())
            .unwrap()
    }

    #[test]
    fn create_fills_defaults_and_trims_title() {
        let storage = Storage::open_in_memory().unwrap();
        let mut store = TaskStore::with_items_from_storage(&storage);

        let task = store
            .create("  Buy milk  ", "2025-01-01T00:00", TaskExtra::default())
            .cloned()
            .unwrap();

        assert_eq!(task.title, "Buy milk");
        assert_eq!(task.description, "");
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.priority, Priority::Medium);
        assert_eq!(task.deadline, "2025-01-01T00:00");
        assert!(task.id.starts_with("task-"));
        assert_eq!(store.tasks().len(), 1);
    }

    #[test]
    fn create_uses_extra_fields() {
        let storage = Storage::open_in_memory().unwrap();
        let mut store = TaskStore::with_items_from_storage(&storage);

        let extra = TaskExtra {
            description: Some("two litres".to_string()),
            priority: Some(Priority::High),
        };
        let task = store.create("Buy milk", "", extra).unwrap();

        assert_eq!(task.description, "two litres");
        assert_eq!(task.priority, Priority::High);
        assert_eq!(task.deadline, "");
    }

    #[test]
    fn blank_titles_are_rejected() {
        let storage = Storage::open_in_memory().unwrap();
        let mut store = TaskStore::with_items_from_storage(&storage);

        assert!(store.create("", "2025-01-01T00:00", TaskExtra::default()).is_none());
        assert!(store.create("   ", "2025-01-01T00:00", TaskExtra::default()).is_none());
        assert!(store.tasks().is_empty());
        assert!(storage.load().is_empty());
    }

    #[test]
    fn ids_are_unique_across_many_creates() {
        let storage = Storage::open_in_memory().unwrap();
        let mut store = TaskStore::with_items_from_storage(&storage);

        for i in 0..200 {
            add(&mut store, &format!("task {i}"));
        }

        let ids: HashSet<&str> = store.tasks().iter().map(|task| task.id.as_str()).collect();
        assert_eq!(ids.len(), 200);
    }

    #[test]
    fn every_mutation_is_persisted() {
        let storage = Storage::open_in_memory().unwrap();
        let mut store = TaskStore::with_items_from_storage(&storage);

        let first = add(&mut store, "First");
        let second = add(&mut store, "Second");
        assert_eq!(storage.load(), store.tasks());

        store.toggle_status(&first);
        assert_eq!(storage.load(), store.tasks());

        store.delete(&second);
        assert_eq!(storage.load(), store.tasks());

        let mut edited = store.get(&first).cloned().unwrap();
        edited.title = "First, edited".to_string();
        store.update(edited);
        assert_eq!(storage.load(), store.tasks());

        let reloaded = TaskStore::with_items_from_storage(&storage);
        assert_eq!(reloaded.tasks(), store.tasks());
    }

    #[test]
    fn failed_save_keeps_the_change_in_memory() {
        let storage = Storage::open_in_memory().unwrap();
        let mut store = TaskStore::with_items_from_storage(&storage);
        storage
            .db_con
            .execute("DROP TABLE local_storage;", ())
            .unwrap();

        let id = add(&mut store, "Unsaved");
        assert_eq!(store.tasks().len(), 1);

        store.toggle_status(&id);
        assert!(store.get(&id).unwrap().is_completed());
        assert!(storage.load().is_empty());
    }

    #[test]
    fn update_replaces_the_whole_record_but_keeps_creation_time() {
        let storage = Storage::open_in_memory().unwrap();
        let mut store = TaskStore::with_items_from_storage(&storage);
        let id = add(&mut store, "Draft");
        let original = store.get(&id).cloned().unwrap();

        let replacement = Task {
            title: "  Final  ".to_string(),
            description: "notes".to_string(),
            status: TaskStatus::InProgress,
            priority: Priority::Low,
            deadline: "2024-06-01T00:00".to_string(),
            created_at: original.created_at + Duration::days(3),
            ..original.clone()
        };
        assert!(store.update(replacement));

        let stored = store.get(&id).unwrap();
        assert_eq!(stored.title, "Final");
        assert_eq!(stored.description, "notes");
        assert_eq!(stored.status, TaskStatus::InProgress);
        assert_eq!(stored.priority, Priority::Low);
        assert_eq!(stored.deadline, "2024-06-01T00:00");
        assert_eq!(stored.created_at, original.created_at);
    }

    #[test]
    fn update_with_unknown_id_or_blank_title_is_a_no_op() {
        let storage = Storage::open_in_memory().unwrap();
        let mut store = TaskStore::with_items_from_storage(&storage);
        let id = add(&mut store, "Keep me");
        let before = store.tasks().to_vec();

        let mut stranger = before[0].clone();
        stranger.id = "task-0-missing".to_string();
        assert!(!store.update(stranger));

        let mut blank = before[0].clone();
        blank.title = "  ".to_string();
        assert!(!store.update(blank));

        assert_eq!(store.tasks(), before.as_slice());
        assert_eq!(store.get(&id).unwrap().title, "Keep me");
    }

    #[test]
    fn delete_removes_only_the_matching_task() {
        let storage = Storage::open_in_memory().unwrap();
        let mut store = TaskStore::with_items_from_storage(&storage);
        let first = add(&mut store, "First");
        let second = add(&mut store, "Second");

        assert!(!store.delete("task-0-missing"));
        assert!(store.delete(&first));
        assert!(!store.delete(&first));

        let ids: Vec<&str> = store.tasks().iter().map(|task| task.id.as_str()).collect();
        assert_eq!(ids, vec![second.as_str()]);
    }

    #[test]
    fn toggling_twice_restores_pending_and_collapses_in_progress() {
        let storage = Storage::open_in_memory().unwrap();
        let mut store = TaskStore::with_items_from_storage(&storage);
        let id = add(&mut store, "Toggle me");

        store.toggle_status(&id);
        assert_eq!(store.get(&id).unwrap().status, TaskStatus::Completed);
        store.toggle_status(&id);
        assert_eq!(store.get(&id).unwrap().status, TaskStatus::Pending);

        let mut working = store.get(&id).cloned().unwrap();
        working.status = TaskStatus::InProgress;
        store.update(working);
        store.toggle_status(&id);
        assert_eq!(store.get(&id).unwrap().status, TaskStatus::Completed);
        store.toggle_status(&id);
        assert_eq!(store.get(&id).unwrap().status, TaskStatus::Pending);

        assert!(!store.toggle_status("task-0-missing"));
    }

    #[test]
    fn stats_count_statuses_and_deadlines() {
        let storage = Storage::open_in_memory().unwrap();
        let mut store = TaskStore::with_items_from_storage(&storage);
        store.create("Late", "2024-05-01T00:00:00Z", TaskExtra::default());
        store.create("Soon", "2024-06-03T00:00:00Z", TaskExtra::default());
        store.create("Later", "2024-09-01T00:00:00Z", TaskExtra::default());
        let done = store
            .create("Done but late", "2024-05-01T00:00:00Z", TaskExtra::default())
            .map(|task| task.id.clone())
            .unwrap();
        store.toggle_status(&done);

        let today = DateTime::parse_from_rfc3339("2024-06-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let stats = store.stats_as_of(today, today + Duration::hours(12));

        assert_eq!(
            stats,
            TaskStats {
                total: 4,
                completed: 1,
                in_progress: 0,
                pending: 3,
                overdue: 1,
                due_next_week: 1,
            }
        );
    }
}
