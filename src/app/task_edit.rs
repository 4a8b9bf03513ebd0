use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};

use crate::app::models::{parse_deadline, Priority, Task, TaskExtra, TaskStatus};
use crate::app::pending::TaskAction;
use derivative::Derivative;

// State object for the task add/edit dialog
// Keeps track of the state of the dialog and the content of the task being edited
#[derive(Derivative)]
#[derivative(Default)]
pub struct TaskEditDialogState {
    pub dialog_active: bool,
    // The task being edited; None while adding a new one
    editing: Option<Task>,
    content: TaskEditDialogContent,
    error_message: Option<String>,
    // (char column, field row)
    cursor_position: (usize, usize),
}

// Current content of the task being edited/created
#[derive(Derivative, Clone)]
#[derivative(Default)]
struct TaskEditDialogContent {
    title: String,
    description: String,
    deadline: String,
    #[derivative(Default(value = "Priority::Medium"))]
    priority: Priority,
    #[derivative(Default(value = "TaskStatus::Pending"))]
    status: TaskStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Description,
    Deadline,
    Priority,
    Status,
}

const ADD_FIELDS: [Field; 4] = [Field::Title, Field::Description, Field::Deadline, Field::Priority];
const EDIT_FIELDS: [Field; 5] = [
    Field::Title,
    Field::Description,
    Field::Deadline,
    Field::Priority,
    Field::Status,
];

impl Field {
    fn is_choice(&self) -> bool {
        matches!(self, Field::Priority | Field::Status)
    }
}

impl TaskEditDialogState {
    // Opens the dialog and prepares to accept an input for the new task
    pub fn create_a_new_task(&mut self) {
        *self = TaskEditDialogState {
            dialog_active: true,
            ..TaskEditDialogState::default()
        };
    }

    // Opens the dialog and prepares to accept an input for the existing task
    pub fn edit_task(&mut self, task: &Task) {
        *self = TaskEditDialogState {
            dialog_active: true,
            editing: Some(task.clone()),
            content: TaskEditDialogContent {
                title: task.title.clone(),
                description: task.description.clone(),
                deadline: task.deadline.clone(),
                priority: task.priority,
                status: task.status,
            },
            error_message: None,
            cursor_position: (0, 0),
        };
    }

    pub fn close(&mut self) {
        self.dialog_active = false;
        self.error_message = None;
    }

    pub fn is_editing(&self) -> bool {
        self.editing.is_some()
    }

    fn fields(&self) -> &'static [Field] {
        if self.is_editing() {
            &EDIT_FIELDS
        } else {
            &ADD_FIELDS
        }
    }

    fn current_field(&self) -> Field {
        let fields = self.fields();
        fields[self.cursor_position.1.min(fields.len() - 1)]
    }

    // Move the cursor one line BELOW the current one.
    // The horizontal cursor position is preserved if possible
    pub fn move_cursor_down(&mut self) {
        let (x, y) = self.cursor_position;
        let future_y = (y + 1).min(self.fields().len() - 1);
        self.cursor_position = (x.min(self.text_len(self.fields()[future_y])), future_y);
    }

    // Move the cursor one line ABOVE the current one.
    pub fn move_cursor_up(&mut self) {
        let (x, y) = self.cursor_position;
        let future_y = y.saturating_sub(1);
        self.cursor_position = (x.min(self.text_len(self.fields()[future_y])), future_y);
    }

    // Move the cursor one char LEFT; on a choice field pick the previous value
    pub fn move_cursor_left(&mut self) {
        if self.current_field().is_choice() {
            self.cycle_choice(false);
            return;
        }
        let (x, y) = self.cursor_position;
        self.cursor_position = (x.saturating_sub(1), y);
    }

    // Move the cursor one char RIGHT; on a choice field pick the next value
    pub fn move_cursor_right(&mut self) {
        if self.current_field().is_choice() {
            self.cycle_choice(true);
            return;
        }
        let (x, y) = self.cursor_position;
        self.cursor_position = ((x + 1).min(self.text_len(self.current_field())), y);
    }

    pub fn cycle_choice(&mut self, forward: bool) {
        match self.current_field() {
            Field::Priority => {
                self.content.priority = cycle(&Priority::ALL, self.content.priority, forward)
            }
            Field::Status => self.content.status = cycle(&TaskStatus::ALL, self.content.status, forward),
            _ => {}
        }
    }

    // Delete the char before the cursor
    pub fn delete_char(&mut self) {
        let (x, y) = self.cursor_position;
        if x == 0 {
            return;
        }
        let field = self.current_field();
        if let Some(text) = self.text_mut(field) {
            let at = byte_index(text, x - 1);
            text.remove(at);
            self.cursor_position = (x - 1, y);
        }
    }

    // Handles the input of a char by inserting it into the currently active field
    pub fn input(&mut self, to_insert: char) {
        let field = self.current_field();
        if field.is_choice() {
            self.input_choice(field, to_insert);
            return;
        }

        let (x, y) = self.cursor_position;
        let x = x.min(self.text_len(field));
        if let Some(text) = self.text_mut(field) {
            let at = byte_index(text, x);
            text.insert(at, to_insert);
            self.cursor_position = (x + 1, y);
        }
    }

    // Initials pick a value directly: l/m/h and p/i/c
    fn input_choice(&mut self, field: Field, key: char) {
        match (field, key.to_ascii_lowercase()) {
            (Field::Priority, 'l') => self.content.priority = Priority::Low,
            (Field::Priority, 'm') => self.content.priority = Priority::Medium,
            (Field::Priority, 'h') => self.content.priority = Priority::High,
            (Field::Status, 'p') => self.content.status = TaskStatus::Pending,
            (Field::Status, 'i') => self.content.status = TaskStatus::InProgress,
            (Field::Status, 'c') => self.content.status = TaskStatus::Completed,
            (_, ' ') => self.cycle_choice(true),
            _ => {}
        }
    }

    fn text_mut(&mut self, field: Field) -> Option<&mut String> {
        match field {
            Field::Title => Some(&mut self.content.title),
            Field::Description => Some(&mut self.content.description),
            Field::Deadline => Some(&mut self.content.deadline),
            Field::Priority | Field::Status => None,
        }
    }

    fn text_len(&self, field: Field) -> usize {
        match field {
            Field::Title => self.content.title.chars().count(),
            Field::Description => self.content.description.chars().count(),
            Field::Deadline => self.content.deadline.chars().count(),
            Field::Priority | Field::Status => 0,
        }
    }

    // Validates the input and turns it into an action for the store.
    // Keeps the dialog open with an error message when the input is not acceptable.
    pub fn save_task(&mut self) -> Option<TaskAction> {
        let content = self.content.clone();
        let title = content.title.trim();
        let deadline = content.deadline.trim();

        if title.is_empty() {
            self.error_message = Some("Title cannot be empty".to_string());
            return None;
        }
        if !deadline.is_empty() && parse_deadline(deadline).is_none() {
            self.error_message = Some("Deadline should look like 2025-01-31T18:00".to_string());
            return None;
        }

        let action = match &self.editing {
            Some(task) => TaskAction::Update(Task {
                title: title.to_string(),
                description: content.description,
                deadline: deadline.to_string(),
                priority: content.priority,
                status: content.status,
                ..task.clone()
            }),
            None => TaskAction::Create {
                title: title.to_string(),
                deadline: deadline.to_string(),
                extra: TaskExtra {
                    description: Some(content.description),
                    priority: Some(content.priority),
                },
            },
        };

        self.close();
        Some(action)
    }
}

fn cycle<T: Copy + PartialEq>(values: &[T], current: T, forward: bool) -> T {
    let position = values.iter().position(|value| *value == current).unwrap_or(0);
    let next = if forward {
        (position + 1) % values.len()
    } else {
        (position + values.len() - 1) % values.len()
    };
    values[next]
}

fn byte_index(text: &str, char_index: usize) -> usize {
    text.char_indices()
        .nth(char_index)
        .map(|(index, _)| index)
        .unwrap_or(text.len())
}

// Returns the UI content for the task edit dialog
pub fn get_task_edit_ui<'a>(state: &'a TaskEditDialogState) -> Vec<Line<'a>> {
    const GRAY_TEXT: Style = Style::new().fg(Color::Rgb(62, 62, 62));
    const WHITE_TEXT: Style = Style::new().fg(Color::White);
    const BLACK_ON_WHITE: Style = Style::new().fg(Color::Black).bg(Color::White);
    let mut text = Vec::new();

    let (cursor_x, cursor_y) = state.cursor_position;

    for (i, field) in state.fields().iter().enumerate() {
        let selected = cursor_y == i;
        let (prefix, placeholder, value) = match field {
            Field::Title => ("Title:       ", "My task name", state.content.title.clone()),
            Field::Description => ("Description: ", "Optional notes", state.content.description.clone()),
            Field::Deadline => ("Deadline:    ", "2025-01-31T18:00", state.content.deadline.clone()),
            Field::Priority => ("Priority:    ", "", state.content.priority.to_string()),
            Field::Status => ("Status:      ", "", state.content.status.to_string()),
        };

        let mut spans = vec![Span::styled(prefix, WHITE_TEXT)];

        if field.is_choice() {
            // Choice fields show their value between arrows when selected
            if selected {
                spans.push(Span::styled(format!("< {value} >"), BLACK_ON_WHITE));
            } else {
                spans.push(Span::styled(format!("  {value}"), WHITE_TEXT));
            }
        } else if value.is_empty() {
            if selected {
                // First char of the placeholder is highlighted, the rest is gray
                spans.push(Span::styled(placeholder.chars().take(1).collect::<String>(), BLACK_ON_WHITE));
                spans.push(Span::styled(placeholder.chars().skip(1).collect::<String>(), GRAY_TEXT));
            } else {
                spans.push(Span::styled(placeholder, GRAY_TEXT));
            }
        } else if selected {
            // All chars are white, except for the one at the cursor position which is highlighted
            spans.push(Span::styled(value.chars().take(cursor_x).collect::<String>(), WHITE_TEXT));
            spans.push(Span::styled(
                value.chars().skip(cursor_x).take(1).collect::<String>(),
                BLACK_ON_WHITE,
            ));
            spans.push(Span::styled(value.chars().skip(cursor_x + 1).collect::<String>(), WHITE_TEXT));

            if cursor_x >= value.chars().count() {
                spans.push(Span::styled(" ", BLACK_ON_WHITE));
            }
        } else {
            spans.push(Span::styled(value, WHITE_TEXT));
        }

        text.push(Line::from(spans));
    }

    text.push(Line::raw(""));

    if let Some(ref error_message) = state.error_message {
        text.push(Line::from(vec![Span::styled(
            error_message.as_str(),
            Style::new().fg(Color::Red),
        )]));
        text.push(Line::raw(""));
    }

    text.push(Line::from(vec![Span::styled(
        "Enter - save, Esc - cancel, ←/→ - change choice",
        WHITE_TEXT,
    )]));

    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    fn type_text(state: &mut TaskEditDialogState, text: &str) {
        text.chars().for_each(|c| state.input(c));
    }

    fn existing_task() -> Task {
        Task {
            id: "task-1-abcdefg".to_string(),
            title: "Old".to_string(),
            description: String::new(),
            status: TaskStatus::InProgress,
            priority: Priority::Low,
            deadline: String::new(),
            created_at: DateTime::<Utc>::default(),
        }
    }

    #[test]
    fn new_task_dialog_produces_a_create_action() {
        let mut state = TaskEditDialogState::default();
        state.create_a_new_task();
        type_text(&mut state, "  Buy milk ");
        state.move_cursor_down();
        type_text(&mut state, "two litres");
        state.move_cursor_down();
        type_text(&mut state, "2025-01-01T00:00");
        state.move_cursor_down();
        state.input('h');

        let action = state.save_task();

        assert_eq!(
            action,
            Some(TaskAction::Create {
                title: "Buy milk".to_string(),
                deadline: "2025-01-01T00:00".to_string(),
                extra: TaskExtra {
                    description: Some("two litres".to_string()),
                    priority: Some(Priority::High),
                },
            })
        );
        assert!(!state.dialog_active);
    }

    #[test]
    fn blank_title_keeps_the_dialog_open() {
        let mut state = TaskEditDialogState::default();
        state.create_a_new_task();
        type_text(&mut state, "   ");

        assert_eq!(state.save_task(), None);
        assert!(state.dialog_active);
        assert_eq!(state.error_message.as_deref(), Some("Title cannot be empty"));
    }

    #[test]
    fn unreadable_deadline_is_refused() {
        let mut state = TaskEditDialogState::default();
        state.create_a_new_task();
        type_text(&mut state, "Task");
        state.move_cursor_down();
        state.move_cursor_down();
        type_text(&mut state, "tomorrow");

        assert_eq!(state.save_task(), None);
        assert!(state.error_message.is_some());
    }

    #[test]
    fn editing_replaces_fields_and_keeps_identity() {
        let task = existing_task();
        let mut state = TaskEditDialogState::default();
        state.edit_task(&task);

        state.move_cursor_right();
        state.move_cursor_right();
        state.move_cursor_right();
        state.delete_char();
        state.delete_char();
        state.delete_char();
        type_text(&mut state, "New");
        for _ in 0..4 {
            state.move_cursor_down();
        }
        state.input('c');

        match state.save_task() {
            Some(TaskAction::Update(updated)) => {
                assert_eq!(updated.id, task.id);
                assert_eq!(updated.title, "New");
                assert_eq!(updated.status, TaskStatus::Completed);
                assert_eq!(updated.priority, Priority::Low);
                assert_eq!(updated.created_at, task.created_at);
            }
            other => panic!("expected an update, got {other:?}"),
        }
    }

    #[test]
    fn status_row_only_exists_while_editing() {
        let mut state = TaskEditDialogState::default();
        state.create_a_new_task();
        for _ in 0..10 {
            state.move_cursor_down();
        }
        assert_eq!(state.current_field(), Field::Priority);

        state.edit_task(&existing_task());
        for _ in 0..10 {
            state.move_cursor_down();
        }
        assert_eq!(state.current_field(), Field::Status);
    }

    #[test]
    fn choices_cycle_in_both_directions() {
        let mut state = TaskEditDialogState::default();
        state.create_a_new_task();
        for _ in 0..3 {
            state.move_cursor_down();
        }

        state.move_cursor_right();
        assert_eq!(state.content.priority, Priority::Low);
        state.move_cursor_left();
        state.move_cursor_left();
        assert_eq!(state.content.priority, Priority::High);
    }

    #[test]
    fn editing_handles_multibyte_text() {
        let mut state = TaskEditDialogState::default();
        state.create_a_new_task();
        type_text(&mut state, "Mua sữa");
        state.delete_char();
        state.move_cursor_left();
        state.delete_char();
        state.input('s');

        assert_eq!(state.content.title, "Mua sữ");
        assert_eq!(state.cursor_position, (5, 0));
    }
}
