use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use ratatui::{prelude::*, widgets::*};
use std::{
    io,
    time::{Duration, Instant},
};
use tracing::{debug, info};

use crate::app::models::{Priority, TaskStatus};
use crate::app::pending::{ActionQueue, TaskAction};
use crate::app::storage::Storage;
use crate::app::task_store::{TaskStats, TaskStore};
use crate::app::view::{get_view, ViewCriteria};
use crate::app::{task_edit::*, task_list::*};
use crate::config::Config;

// The sign-in gate is only a screen switch, nothing is checked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Login,
    Tasks,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Search,
}

pub struct App<'a> {
    pub store: TaskStore<'a>,
    pub criteria: ViewCriteria,
    pub items: TaskList,
    pub stats: TaskStats,
    pub task_edit_dialog_state: TaskEditDialogState,
    pub actions: ActionQueue,
    pub screen: Screen,
    pub input_mode: InputMode,
    pub notice: Option<String>,
}

impl<'a> App<'a> {
    pub fn new(storage: &'a Storage, config: &Config) -> App<'a> {
        let mut app = App {
            store: TaskStore::with_items_from_storage(storage),
            criteria: ViewCriteria::sorted_by(config.default_sort()),
            items: TaskList::default(),
            stats: TaskStats::default(),
            task_edit_dialog_state: TaskEditDialogState::default(),
            actions: ActionQueue::new(config.action_delay()),
            screen: Screen::Login,
            input_mode: InputMode::Normal,
            notice: None,
        };
        app.refresh_view();
        app
    }

    // Recompute the derived view and the counters.
    // Only called after the collection or the criteria changed, never while drawing.
    pub fn refresh_view(&mut self) {
        let view = get_view(self.store.tasks(), &self.criteria)
            .into_iter()
            .cloned()
            .collect();
        self.items.set_items(view);
        self.stats = self.store.stats();
    }

    pub fn submit(&mut self, action: TaskAction, now: Instant) {
        if self.actions.submit(action, now) {
            self.notice = None;
        } else {
            self.refuse_while_saving();
        }
    }

    fn refuse_while_saving(&mut self) {
        self.notice = Some("Still saving the previous change".to_string());
    }

    // Applies the in-flight action once its delay is over
    pub fn on_tick(&mut self, now: Instant) {
        if let Some(action) = self.actions.take_due(now) {
            self.apply(action);
        }
    }

    // Lands whatever is still in flight, so nothing is lost on quit
    pub fn finish_pending(&mut self) {
        if let Some(action) = self.actions.take_now() {
            self.apply(action);
        }
    }

    fn apply(&mut self, action: TaskAction) {
        let name = action.name();
        if action.apply(&mut self.store) {
            debug!(action = name, "applied action");
            self.refresh_view();
        }
    }

    // Change the state of the selected task to completed/to do.
    // Refused while an action is in flight, it may carry an older copy of the task.
    pub fn toggle_selected(&mut self) {
        if self.actions.is_busy() {
            self.refuse_while_saving();
            return;
        }
        let Some(id) = self.items.get_selected().map(|task| task.id.clone()) else {
            return;
        };
        if self.store.toggle_status(&id) {
            self.refresh_view();
        }
    }

    pub fn delete_selected(&mut self, now: Instant) {
        if let Some(id) = self.items.get_selected().map(|task| task.id.clone()) {
            self.submit(TaskAction::Delete(id), now);
        }
    }

    fn update_criteria(&mut self, change: impl FnOnce(&mut ViewCriteria)) {
        change(&mut self.criteria);
        self.refresh_view();
    }

    // Returns true when the app should quit
    pub fn handle_key(&mut self, key: KeyEvent, now: Instant) -> bool {
        match self.screen {
            Screen::Login => self.handle_login_key(key),
            Screen::Tasks if self.task_edit_dialog_state.dialog_active => {
                self.handle_dialog_key(key, now);
                false
            }
            Screen::Tasks if self.input_mode == InputMode::Search => {
                self.handle_search_key(key);
                false
            }
            Screen::Tasks => self.handle_list_key(key, now),
        }
    }

    fn handle_login_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Enter => {
                info!("signed in");
                self.screen = Screen::Tasks;
                false
            }
            KeyCode::Char('q') | KeyCode::Esc => {
                self.finish_pending();
                true
            }
            _ => false,
        }
    }

    // Handle input for the task edit dialog
    fn handle_dialog_key(&mut self, key: KeyEvent, now: Instant) {
        let dialog = &mut self.task_edit_dialog_state;
        match key.code {
            KeyCode::Down | KeyCode::Tab => dialog.move_cursor_down(),
            KeyCode::Up | KeyCode::BackTab => dialog.move_cursor_up(),
            KeyCode::Esc => dialog.close(),
            KeyCode::Enter => {
                if self.actions.is_busy() {
                    self.refuse_while_saving();
                } else if let Some(action) = dialog.save_task() {
                    self.submit(action, now);
                }
            }
            KeyCode::Left => dialog.move_cursor_left(),
            KeyCode::Right => dialog.move_cursor_right(),
            KeyCode::Backspace => dialog.delete_char(),
            KeyCode::Char(to_insert) => dialog.input(to_insert),
            _ => {}
        }
    }

    fn handle_search_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char(c) => self.update_criteria(|criteria| criteria.search_query.push(c)),
            KeyCode::Backspace => self.update_criteria(|criteria| {
                criteria.search_query.pop();
            }),
            KeyCode::Enter => self.input_mode = InputMode::Normal,
            KeyCode::Esc => {
                self.input_mode = InputMode::Normal;
                self.update_criteria(|criteria| criteria.search_query.clear());
            }
            _ => {}
        }
    }

    // Handle input for the task list navigation, criteria and state change
    fn handle_list_key(&mut self, key: KeyEvent, now: Instant) -> bool {
        match key.code {
            KeyCode::Char('q') => {
                self.finish_pending();
                return true;
            }
            KeyCode::Char('l') => {
                info!("signed out");
                self.screen = Screen::Login;
            }
            KeyCode::Char('x') => self.delete_selected(now),
            KeyCode::Left => self.items.unselect(),
            KeyCode::Down => self.items.next(),
            KeyCode::Up => self.items.previous(),
            KeyCode::Char('a') => self.task_edit_dialog_state.create_a_new_task(),
            KeyCode::Char('e') => {
                if let Some(task) = self.items.get_selected() {
                    self.task_edit_dialog_state.edit_task(task);
                }
            }
            KeyCode::Char('/') => self.input_mode = InputMode::Search,
            KeyCode::Char('s') => self.update_criteria(|criteria| {
                criteria.filter_status = criteria.filter_status.next_in(&TaskStatus::ALL)
            }),
            KeyCode::Char('p') => self.update_criteria(|criteria| {
                criteria.filter_priority = criteria.filter_priority.next_in(&Priority::ALL)
            }),
            KeyCode::Char('o') => {
                self.update_criteria(|criteria| criteria.sort_by = criteria.sort_by.next())
            }
            KeyCode::Char('c') => self.update_criteria(|criteria| {
                *criteria = ViewCriteria::sorted_by(criteria.sort_by)
            }),
            KeyCode::Enter => self.toggle_selected(),
            _ => {}
        }
        false
    }
}

pub fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    mut app: App,
    tick_rate: Duration,
) -> io::Result<()> {
    let mut last_tick = Instant::now();
    loop {
        terminal.draw(|f| draw_ui(f, &mut app))?;

        let mut timeout = tick_rate.saturating_sub(last_tick.elapsed());
        if let Some(due_in) = app.actions.time_until_due(Instant::now()) {
            timeout = timeout.min(due_in);
        }

        if crossterm::event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press && app.handle_key(key, Instant::now()) {
                    return Ok(());
                }
            }
        }

        app.on_tick(Instant::now());
        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }
    }
}

// Draws the whole user interface
fn draw_ui(f: &mut Frame, app: &mut App) {
    match app.screen {
        Screen::Login => draw_login(f),
        Screen::Tasks => draw_tasks(f, app),
    }

    if app.actions.is_busy() {
        let area = centered_rect(24, 3, f.size());
        let loading = Paragraph::new("Saving…")
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL))
            .style(Style::new().light_magenta());
        f.render_widget(Clear, area);
        f.render_widget(loading, area);
    }
}

fn draw_login(f: &mut Frame) {
    let area = centered_rect(44, 7, f.size());
    let text = vec![
        Line::from("Task Manager".bold()),
        Line::raw(""),
        Line::from("Enter - sign in"),
        Line::from("q - quit"),
    ];
    let login = Paragraph::new(text)
        .alignment(Alignment::Center)
        .block(Block::new().title("Sign in").borders(Borders::ALL))
        .style(Style::new().white());
    f.render_widget(login, area);
}

fn draw_tasks(f: &mut Frame, app: &mut App) {
    // Create two chunks of screen in 60-40 ratio
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(f.size());

    // DRAW LEFT PART
    let left_side = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Min(0)])
        .split(chunks[0]);

    let mut criteria_lines = vec![get_criteria_ui(
        &app.criteria,
        app.input_mode == InputMode::Search,
    )];
    if let Some(ref notice) = app.notice {
        criteria_lines.push(Line::from(Span::styled(
            notice.as_str(),
            Style::new().fg(Color::Red),
        )));
    }
    let criteria = Paragraph::new(criteria_lines)
        .block(Block::default().borders(Borders::ALL).title("View"));
    f.render_widget(criteria, left_side[0]);

    if app.items.items.is_empty() {
        let message = if app.store.tasks().is_empty() {
            "No tasks yet. Add your first task!"
        } else {
            "No tasks match the current search and filters."
        };
        let empty = Paragraph::new(message)
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title("List"))
            .style(Style::new().gray());
        f.render_widget(empty, left_side[1]);
    } else {
        // Create a List from the derived view and highlight the currently selected one
        let task_list = List::new(get_list_items_ui(app.items.items.as_slice()))
            .block(Block::default().borders(Borders::ALL).title("List"))
            .highlight_style(
                Style::default()
                    .bg(Color::LightGreen)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol(">> ");

        f.render_stateful_widget(task_list, left_side[1], &mut app.items.state);
    }

    // DRAW RIGHT PART
    if app.task_edit_dialog_state.dialog_active {
        let title = if app.task_edit_dialog_state.is_editing() {
            "Edit Task"
        } else {
            "Add Task"
        };
        let create_or_edit_task = Paragraph::new(get_task_edit_ui(&app.task_edit_dialog_state))
            .block(Block::new().title(title).borders(Borders::ALL))
            .style(Style::new().white());

        f.render_widget(create_or_edit_task, chunks[1]);
    } else {
        // If not editing, display instructions and statistics in vertically split layout
        let right_side = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(chunks[1]);

        let instructions = Paragraph::new(get_instructions_ui())
            .block(Block::new().title("Commands").borders(Borders::ALL))
            .style(Style::new().white());

        let statistics = Paragraph::new(get_statistics_ui(&app.stats))
            .block(Block::new().title("Statistics").borders(Borders::ALL))
            .style(Style::new().white());

        f.render_widget(instructions, right_side[0]);
        f.render_widget(statistics, right_side[1]);
    }
}

// A fixed-size rectangle in the middle of `area`
fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}
