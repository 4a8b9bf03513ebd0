// Mutations submitted from the UI wait out a short cosmetic delay while the
// loading indicator is shown. Only one may be in flight; it is applied in
// full (mutation + save) before another one is accepted.
use std::time::{Duration, Instant};
use tracing::debug;

use crate::app::models::{Task, TaskExtra};
use crate::app::task_store::TaskStore;

#[derive(Debug, Clone, PartialEq)]
pub enum TaskAction {
    Create {
        title: String,
        deadline: String,
        extra: TaskExtra,
    },
    Update(Task),
    Delete(String),
}

impl TaskAction {
    pub fn name(&self) -> &'static str {
        match self {
            TaskAction::Create { .. } => "create",
            TaskAction::Update(_) => "update",
            TaskAction::Delete(_) => "delete",
        }
    }

    // Returns whether the collection changed
    pub fn apply(self, store: &mut TaskStore) -> bool {
        match self {
            TaskAction::Create {
                title,
                deadline,
                extra,
            } => store.create(&title, &deadline, extra).is_some(),
            TaskAction::Update(task) => store.update(task),
            TaskAction::Delete(id) => store.delete(&id),
        }
    }
}

struct PendingAction {
    action: TaskAction,
    due: Instant,
}

pub struct ActionQueue {
    delay: Duration,
    in_flight: Option<PendingAction>,
}

impl ActionQueue {
    pub fn new(delay: Duration) -> ActionQueue {
        ActionQueue {
            delay,
            in_flight: None,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    // Refuses the action while another one is still in flight
    pub fn submit(&mut self, action: TaskAction, now: Instant) -> bool {
        if self.is_busy() {
            debug!(action = action.name(), "refusing action, another one is in flight");
            return false;
        }
        self.in_flight = Some(PendingAction {
            action,
            due: now + self.delay,
        });
        true
    }

    // Hands out the in-flight action once its delay has passed
    pub fn take_due(&mut self, now: Instant) -> Option<TaskAction> {
        let is_due = self
            .in_flight
            .as_ref()
            .is_some_and(|pending| pending.due <= now);
        if !is_due {
            return None;
        }
        self.in_flight.take().map(|pending| pending.action)
    }

    // Hands out the in-flight action without waiting, used when shutting down
    pub fn take_now(&mut self) -> Option<TaskAction> {
        self.in_flight.take().map(|pending| pending.action)
    }

    pub fn time_until_due(&self, now: Instant) -> Option<Duration> {
        self.in_flight
            .as_ref()
            .map(|pending| pending.due.saturating_duration_since(now))
    }
}
