use ratatui::style::{Color, Style, Stylize};
use ratatui::text::{Line, Span};
use ratatui::widgets::*;

use crate::app::models::{Priority, Task, TaskStatus};
use crate::app::task_store::TaskStats;
use crate::app::view::ViewCriteria;

// The derived view currently on screen plus the list selection.
// Holds copies of the tasks so that drawing never recomputes the view.
#[derive(Default)]
pub struct TaskList {
    pub state: ListState,
    pub items: Vec<Task>,
}

impl TaskList {
    // Replace the rows, keeping the selection on the same task when it is still visible
    pub fn set_items(&mut self, items: Vec<Task>) {
        let selected_id = self.get_selected().map(|task| task.id.clone());
        self.items = items;

        let selection = match selected_id {
            Some(id) => self
                .items
                .iter()
                .position(|task| task.id == id)
                .or_else(|| self.state.selected().map(|i| i.min(self.items.len().saturating_sub(1)))),
            None => None,
        };
        self.state.select(if self.items.is_empty() { None } else { selection });
    }

    // Move the selection to the next item
    // Copied from the ratatui list example
    pub fn next(&mut self) {
        let i = match self.state.selected() {
            Some(i) => {
                if self.items.is_empty() || i >= self.items.len() - 1 {
                    0
                } else {
                    i + 1
                }
            }
            None => 0,
        };
        self.state.select(Some(i));
    }

    // Move the selection to the previous item
    // Copied from the ratatui list example
    pub fn previous(&mut self) {
        let i = match self.state.selected() {
            Some(i) => {
                if self.items.is_empty() {
                    0
                } else if i == 0 {
                    self.items.len() - 1
                } else {
                    i - 1
                }
            }
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn unselect(&mut self) {
        self.state.select(None);
    }

    pub fn get_selected(&self) -> Option<&Task> {
        self.state.selected().and_then(|i| self.items.get(i))
    }
}

fn status_marker(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Completed => "[✓] ",
        TaskStatus::InProgress => "[~] ",
        TaskStatus::Pending => "[ ] ",
    }
}

fn deadline_label(task: &Task) -> String {
    if task.deadline.trim().is_empty() {
        return "no deadline".to_string();
    }
    match task.deadline_at() {
        Some(deadline) => deadline
            .with_timezone(&chrono::Local)
            .format("%d.%m.%Y %H:%M")
            .to_string(),
        None => task.deadline.clone(),
    }
}

// Build the UI (list) for the task list
pub fn get_list_items_ui(tasks: &[Task]) -> Vec<ListItem<'_>> {
    tasks
        .iter()
        .map(|task| {
            let title_color = match task.priority {
                Priority::Medium => Color::Yellow,
                Priority::High => Color::Red,
                Priority::Low => Color::White,
            };
            let mut title = Span::from(task.title.as_str()).fg(title_color);
            if task.is_completed() {
                title = title.crossed_out();
            }

            let mut lines = vec![Line::from(vec![Span::from(status_marker(task.status)), title])];

            let mut details = format!("    Due: {}  {}", deadline_label(task), task.priority);
            if !task.description.is_empty() {
                details.push_str(&format!("  {}", task.description));
            }
            lines.push(Line::from(details));

            ListItem::new(lines).style(Style::default().fg(Color::White))
        })
        .collect()
}

// Build the UI (line) describing the active search, filters and sort
pub fn get_criteria_ui<'a>(criteria: &'a ViewCriteria, search_active: bool) -> Line<'a> {
    let search = if search_active {
        Span::styled(
            format!("/{}_", criteria.search_query),
            Style::new().fg(Color::Black).bg(Color::White),
        )
    } else if criteria.search_query.is_empty() {
        Span::styled("(no search)", Style::new().fg(Color::DarkGray))
    } else {
        Span::from(format!("\"{}\"", criteria.search_query))
    };

    Line::from(vec![
        Span::from("Search: "),
        search,
        Span::from(format!(
            "  Status: {}  Priority: {}  Sort: {}",
            criteria.filter_status, criteria.filter_priority, criteria.sort_by
        )),
    ])
}

// Build the UI (lines) for statistics infobox
pub fn get_statistics_ui<'a>(stats: &TaskStats) -> Vec<Line<'a>> {
    vec![
        Line::from(format!("Total tasks: {}", stats.total)),
        Line::from(format!("Completed: {}", stats.completed)),
        Line::from(format!("In progress: {}", stats.in_progress)),
        Line::from(format!("Pending: {}", stats.pending)),
        Line::from(format!("Due next week: {}", stats.due_next_week)),
        Line::from(format!("Late: {}", stats.overdue)),
    ]
}

// Build the UI (lines) for instructions infobox
pub fn get_instructions_ui<'a>() -> Vec<Line<'a>> {
    vec![
        "Enter - toggle do/done".into(),
        "a - add a task".into(),
        "e - edit a task".into(),
        "x - delete a task".into(),
        "/ - search".into(),
        "s - filter by status".into(),
        "p - filter by priority".into(),
        "o - change sort order".into(),
        "c - clear search and filters".into(),
        "l - log out".into(),
        "q - quit".into(),
    ]
}
