// Derives the list the user sees from the canonical collection.
// search -> status filter -> priority filter -> sort; nothing here mutates
// the collection, so the same inputs always give the same output.
use chrono::{DateTime, Utc};
use std::cmp::Reverse;
use std::fmt;
use std::str::FromStr;

use crate::app::models::{ParseEnumError, Priority, Task, TaskStatus};

const ALL: &str = "all";

// Either the sentinel "all" or one concrete value to keep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Filter<T> {
    #[default]
    All,
    Only(T),
}

impl<T: PartialEq> Filter<T> {
    pub fn matches(&self, value: &T) -> bool {
        match self {
            Filter::All => true,
            Filter::Only(expected) => expected == value,
        }
    }
}

impl<T: Copy + PartialEq> Filter<T> {
    // All -> first value -> ... -> last value -> All
    pub fn next_in(self, values: &[T]) -> Filter<T> {
        let next_index = match self {
            Filter::All => 0,
            Filter::Only(current) => match values.iter().position(|value| *value == current) {
                Some(index) => index + 1,
                None => values.len(),
            },
        };
        values.get(next_index).copied().map_or(Filter::All, Filter::Only)
    }
}

impl<T: FromStr<Err = ParseEnumError>> FromStr for Filter<T> {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == ALL {
            Ok(Filter::All)
        } else {
            s.parse().map(Filter::Only)
        }
    }
}

impl<T: fmt::Display> fmt::Display for Filter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::All => f.write_str(ALL),
            Filter::Only(value) => value.fmt(f),
        }
    }
}

// Possible task list sorting orders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortBy {
    #[default]
    Deadline,
    Priority,
    CreatedAt,
    // Keeps the collection order
    Unsorted,
}

impl SortBy {
    pub fn next(self) -> SortBy {
        match self {
            SortBy::Deadline => SortBy::Priority,
            SortBy::Priority => SortBy::CreatedAt,
            SortBy::CreatedAt => SortBy::Unsorted,
            SortBy::Unsorted => SortBy::Deadline,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortBy::Deadline => "deadline",
            SortBy::Priority => "priority",
            SortBy::CreatedAt => "createdAt",
            SortBy::Unsorted => "none",
        }
    }
}

// Unknown keys are not an error, they just leave the order alone
impl From<&str> for SortBy {
    fn from(value: &str) -> Self {
        match value {
            "deadline" => SortBy::Deadline,
            "priority" => SortBy::Priority,
            "createdAt" => SortBy::CreatedAt,
            _ => SortBy::Unsorted,
        }
    }
}

impl fmt::Display for SortBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ViewCriteria {
    pub search_query: String,
    pub filter_status: Filter<TaskStatus>,
    pub filter_priority: Filter<Priority>,
    pub sort_by: SortBy,
}

impl ViewCriteria {
    pub fn sorted_by(sort_by: SortBy) -> ViewCriteria {
        ViewCriteria {
            sort_by,
            ..ViewCriteria::default()
        }
    }
}

pub fn get_view<'t>(tasks: &'t [Task], criteria: &ViewCriteria) -> Vec<&'t Task> {
    let query = criteria.search_query.trim().to_lowercase();

    let mut view: Vec<&Task> = tasks
        .iter()
        .filter(|task| query.is_empty() || matches_query(task, &query))
        .filter(|task| criteria.filter_status.matches(&task.status))
        .filter(|task| criteria.filter_priority.matches(&task.priority))
        .collect();

    // sort_by_key is stable, ties keep their collection order
    match criteria.sort_by {
        SortBy::Deadline => view.sort_by_key(|task| deadline_key(task)),
        SortBy::Priority => view.sort_by_key(|task| task.priority.rank()),
        SortBy::CreatedAt => view.sort_by_key(|task| Reverse(task.created_at)),
        SortBy::Unsorted => {}
    }

    view
}

fn matches_query(task: &Task, query: &str) -> bool {
    task.title.to_lowercase().contains(query) || task.description.to_lowercase().contains(query)
}

// Tasks without a usable deadline go after every dated one
fn deadline_key(task: &Task) -> (bool, Option<DateTime<Utc>>) {
    let deadline = task.deadline_at();
    (deadline.is_none(), deadline)
}
