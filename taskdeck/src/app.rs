//! Application state and event handling.
//!
//! [`App`] holds only view state. Each frame it copies what it renders out
//! of the [`Store`] with [`App::sync`]; key presses that need the server
//! come back out of [`App::handle_key_event`] as [`Command`]s for the host
//! to dispatch.

pub mod input;

use std::collections::{BTreeMap, VecDeque};
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use taskdeck_proto::auth::{Credentials, Registration};
use taskdeck_proto::filter::{FilterPatch, FilterSet};
use taskdeck_proto::task::{Task, TaskDraft, TaskId, TaskListMeta, TaskPatch, TaskStatus};

use crate::dragdrop::{DragState, DropEffect, StatusChange};
use crate::filter::FilterController;
use crate::store::{AuthState, Notification, Store, Surface, UiEvent};

pub use input::{Form, FormField, TextInput};

/// How long a toast stays on screen.
pub const TOAST_TTL: Duration = Duration::from_secs(4);

const MAX_TOASTS: usize = 4;

/// Work the host must hand to the engine or the auth controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Login(Credentials),
    Register(Registration),
    /// Dismiss the auth error when switching between login and register.
    ClearAuthError,
    Logout,
    Refresh,
    Open(TaskId),
    Create(TaskDraft),
    Update { id: TaskId, patch: TaskPatch },
    ChangeStatus(StatusChange),
    Delete(TaskId),
    ApplyFilters(FilterPatch),
    ResetFilters,
}

/// Top-level surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    Login(Form),
    Register(Form),
    Board,
}

/// Create/edit dialog state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskEditor {
    /// The task being edited; `None` when creating.
    pub target: Option<Task>,
    pub form: Form,
    pub status: TaskStatus,
}

impl TaskEditor {
    fn fields(name: &str, description: &str, due: &str) -> Form {
        Form::new(vec![
            FormField::text("name", "Name").filled(name),
            FormField::text("description", "Description").filled(description),
            FormField::text("due_date", "Due date (YYYY-MM-DD)").filled(due),
        ])
        .with_extra_slots(1)
    }

    #[must_use]
    pub fn create(status: TaskStatus) -> Self {
        Self {
            target: None,
            form: Self::fields("", "", ""),
            status,
        }
    }

    #[must_use]
    pub fn edit(task: &Task) -> Self {
        let due = task.due_date.map(|d| d.to_string()).unwrap_or_default();
        Self {
            form: Self::fields(&task.name, task.description.as_deref().unwrap_or(""), &due),
            status: task.status,
            target: Some(task.clone()),
        }
    }

    /// Whether the status selector has focus.
    #[must_use]
    pub fn status_focused(&self) -> bool {
        self.form.focus == self.form.fields.len()
    }

    fn description(&self) -> Option<String> {
        Some(self.form.value("description"))
            .filter(|d| !d.is_empty())
            .map(str::to_string)
    }

    /// Builds the command for the dialog's contents, or a message for the
    /// form when they are invalid. `Ok(None)` means nothing changed.
    fn submit(&self) -> Result<Option<Command>, String> {
        let due_date = parse_optional_date(self.form.value("due_date"))?;
        let name = self.form.value("name").to_string();
        match &self.target {
            None => {
                let draft = TaskDraft {
                    name,
                    description: self.description(),
                    status: self.status,
                    due_date,
                };
                draft.validate().map_err(|e| e.to_string())?;
                Ok(Some(Command::Create(draft)))
            }
            Some(task) => {
                let mut patch = TaskPatch::default();
                if name != task.name {
                    patch.name = Some(name);
                }
                let description = self.description();
                if description != task.description {
                    patch = patch.with_description(description);
                }
                if due_date != task.due_date {
                    patch = patch.with_due_date(due_date);
                }
                if self.status != task.status {
                    patch = patch.with_status(self.status);
                }
                if patch.is_empty() {
                    return Ok(None);
                }
                patch.validate().map_err(|e| e.to_string())?;
                Ok(Some(Command::Update {
                    id: task.id.clone(),
                    patch,
                }))
            }
        }
    }
}

/// Board interaction mode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Normal,
    /// Typing into the search box.
    Search,
    /// Due-date range dialog.
    DateRange(Form),
    Editor(TaskEditor),
    ConfirmDelete(TaskId),
    /// Showing the current task.
    Detail,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub notification: Notification,
    pub shown_at: Instant,
}

/// Main application state.
pub struct App {
    pub screen: Screen,
    pub mode: Mode,
    /// Selected column, 0..3.
    pub column: usize,
    /// Selected row within the column.
    pub row: usize,
    selected: Option<TaskId>,
    pub drag: DragState,
    pub filters: FilterController,
    pub search: TextInput,
    pub toasts: VecDeque<Toast>,
    pub should_quit: bool,

    pub auth: AuthState,
    pub columns: [Vec<Task>; 3],
    pub meta: TaskListMeta,
    pub applied: FilterSet,
    pub current: Option<Task>,
    pub loading: bool,
    pub task_error: Option<String>,
    pub task_field_errors: BTreeMap<String, String>,
}

impl App {
    /// Starts on the login screen; the search debounce window comes from
    /// configuration.
    #[must_use]
    pub fn new(search_debounce: Duration) -> Self {
        Self {
            screen: Screen::Login(Form::login()),
            mode: Mode::Normal,
            column: 0,
            row: 0,
            selected: None,
            drag: DragState::default(),
            filters: FilterController::new(search_debounce),
            search: TextInput::default(),
            toasts: VecDeque::new(),
            should_quit: false,
            auth: AuthState::default(),
            columns: Default::default(),
            meta: TaskListMeta::default(),
            applied: FilterSet::default(),
            current: None,
            loading: false,
            task_error: None,
            task_field_errors: BTreeMap::new(),
        }
    }

    /// Copies the renderable parts of the store.
    pub fn sync(&mut self, store: &Store) {
        self.auth = store.auth();
        let tasks = store.tasks();
        self.columns = tasks.columns();
        self.meta = tasks.meta().clone();
        self.applied = tasks.filters().clone();
        self.current = tasks.current().cloned();
        self.loading = tasks.is_loading();
        self.task_error = tasks.error().map(str::to_string);
        self.task_field_errors = tasks.field_errors().clone();
        self.follow_selection();
    }

    /// Keeps the cursor on the selected task when it moves between
    /// columns, and in bounds otherwise.
    fn follow_selection(&mut self) {
        if let Some(id) = &self.selected {
            for (column, tasks) in self.columns.iter().enumerate() {
                if let Some(row) = tasks.iter().position(|t| &t.id == id) {
                    self.column = column;
                    self.row = row;
                    return;
                }
            }
        }
        self.row = self.row.min(self.columns[self.column].len().saturating_sub(1));
        self.selected = self.selected_task().map(|t| t.id.clone());
    }

    /// The task under the cursor.
    #[must_use]
    pub fn selected_task(&self) -> Option<&Task> {
        self.columns[self.column].get(self.row)
    }

    fn select(&mut self, column: usize, row: usize) {
        self.column = column.min(TaskStatus::ALL.len() - 1);
        self.row = row.min(self.columns[self.column].len().saturating_sub(1));
        self.selected = self.selected_task().map(|t| t.id.clone());
    }

    /// Handles an event from the store's notification channel.
    pub fn on_event(&mut self, event: UiEvent, now: Instant) -> Option<Command> {
        match event {
            UiEvent::Notify(notification) => {
                self.push_toast(notification, now);
                None
            }
            UiEvent::Redirect(Surface::Login) => {
                self.screen = Screen::Login(Form::login());
                self.mode = Mode::Normal;
                self.drag.cancel();
                self.filters.reset();
                self.search.clear();
                None
            }
            UiEvent::Redirect(Surface::Board) => {
                self.screen = Screen::Board;
                self.mode = Mode::Normal;
                Some(Command::Refresh)
            }
        }
    }

    pub fn push_toast(&mut self, notification: Notification, now: Instant) {
        if self.toasts.len() == MAX_TOASTS {
            self.toasts.pop_front();
        }
        self.toasts.push_back(Toast {
            notification,
            shown_at: now,
        });
    }

    /// Expires toasts and fires a due search.
    pub fn tick(&mut self, now: Instant) -> Option<Command> {
        self.toasts
            .retain(|toast| now.duration_since(toast.shown_at) < TOAST_TTL);
        if self.screen != Screen::Board {
            return None;
        }
        self.filters.poll(now).map(Command::ApplyFilters)
    }

    /// Handles a key press.
    pub fn handle_key_event(&mut self, key: KeyEvent, now: Instant) -> Option<Command> {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return None;
        }
        match self.screen {
            Screen::Login(_) | Screen::Register(_) => self.handle_auth_key(key),
            Screen::Board => self.handle_board_key(key, now),
        }
    }

    fn handle_auth_key(&mut self, key: KeyEvent) -> Option<Command> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let on_login = matches!(self.screen, Screen::Login(_));
        match key.code {
            KeyCode::Char('r') if ctrl && on_login => {
                self.screen = Screen::Register(Form::register());
                return Some(Command::ClearAuthError);
            }
            KeyCode::Char('l') if ctrl && !on_login => {
                self.screen = Screen::Login(Form::login());
                return Some(Command::ClearAuthError);
            }
            KeyCode::Esc => {
                self.should_quit = true;
                return None;
            }
            _ => {}
        }

        let busy = self.auth.is_loading();
        let (form, registering) = match &mut self.screen {
            Screen::Login(form) => (form, false),
            Screen::Register(form) => (form, true),
            Screen::Board => return None,
        };
        match key.code {
            KeyCode::Tab | KeyCode::Down => form.next(),
            KeyCode::BackTab | KeyCode::Up => form.prev(),
            KeyCode::Enter if !busy => return Some(auth_command(form, registering)),
            _ => {
                form.handle_key(key);
            }
        }
        None
    }

    fn handle_board_key(&mut self, key: KeyEvent, now: Instant) -> Option<Command> {
        match std::mem::take(&mut self.mode) {
            Mode::Normal => self.handle_normal_key(key),
            Mode::Search => self.handle_search_key(key, now),
            Mode::DateRange(form) => self.handle_date_range_key(form, key),
            Mode::Editor(editor) => self.handle_editor_key(editor, key),
            Mode::ConfirmDelete(id) => match key.code {
                KeyCode::Char('y' | 'Y') => Some(Command::Delete(id)),
                KeyCode::Char('n' | 'N') | KeyCode::Esc => None,
                _ => {
                    self.mode = Mode::ConfirmDelete(id);
                    None
                }
            },
            Mode::Detail => {
                match key.code {
                    KeyCode::Char('e') => {
                        if let Some(task) = &self.current {
                            self.mode = Mode::Editor(TaskEditor::edit(task));
                        }
                    }
                    KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q') => {}
                    _ => self.mode = Mode::Detail,
                }
                None
            }
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent) -> Option<Command> {
        let dragging = self.drag.item().is_some();
        match key.code {
            KeyCode::Char('q') => {
                self.should_quit = true;
                None
            }
            KeyCode::Esc => {
                self.drag.cancel();
                None
            }
            KeyCode::Left | KeyCode::Char('h') => {
                self.move_column(self.column.saturating_sub(1));
                None
            }
            KeyCode::Right | KeyCode::Char('l') => {
                self.move_column(self.column + 1);
                None
            }
            KeyCode::Up | KeyCode::Char('k') if !dragging => {
                self.select(self.column, self.row.saturating_sub(1));
                None
            }
            KeyCode::Down | KeyCode::Char('j') if !dragging => {
                self.select(self.column, self.row + 1);
                None
            }
            KeyCode::Char(' ') => self.toggle_drag(),
            _ if dragging => None,
            KeyCode::Enter => {
                let id = self.selected_task()?.id.clone();
                self.mode = Mode::Detail;
                Some(Command::Open(id))
            }
            KeyCode::Char('n') => {
                self.mode = Mode::Editor(TaskEditor::create(TaskStatus::ALL[self.column]));
                None
            }
            KeyCode::Char('e') => {
                let editor = TaskEditor::edit(self.selected_task()?);
                self.mode = Mode::Editor(editor);
                None
            }
            KeyCode::Char('d') => {
                self.mode = Mode::ConfirmDelete(self.selected_task()?.id.clone());
                None
            }
            KeyCode::Char('/') => {
                self.filters.sync_from(&self.applied);
                self.search = TextInput::with_value(self.filters.draft().search.clone());
                self.mode = Mode::Search;
                None
            }
            KeyCode::Char('s') => {
                self.filters.sync_from(&self.applied);
                let status = match self.applied.status {
                    None => Some(TaskStatus::Todo),
                    Some(TaskStatus::Done) => None,
                    Some(status) => Some(status.next()),
                };
                self.filters.set_status(status);
                Some(Command::ApplyFilters(self.filters.submit()))
            }
            KeyCode::Char('o') => {
                self.filters.sync_from(&self.applied);
                self.filters.set_sort_by(self.applied.sort_by.cycle());
                Some(Command::ApplyFilters(self.filters.submit()))
            }
            KeyCode::Char('O') => {
                self.filters.sync_from(&self.applied);
                self.filters
                    .set_sort_direction(self.applied.sort_direction.flipped());
                Some(Command::ApplyFilters(self.filters.submit()))
            }
            KeyCode::Char('f') => {
                let date = |d: Option<NaiveDate>| d.map(|d| d.to_string()).unwrap_or_default();
                self.mode = Mode::DateRange(Form::new(vec![
                    FormField::text("due_date_from", "Due from (YYYY-MM-DD)")
                        .filled(date(self.applied.due_date_from)),
                    FormField::text("due_date_to", "Due to (YYYY-MM-DD)")
                        .filled(date(self.applied.due_date_to)),
                ]));
                None
            }
            KeyCode::Char('x') => {
                self.filters.reset();
                self.search.clear();
                Some(Command::ResetFilters)
            }
            KeyCode::Char('[') if self.meta.current_page > 1 => {
                let page = u32::try_from(self.meta.current_page - 1).unwrap_or(1);
                Some(Command::ApplyFilters(FilterPatch::page(page)))
            }
            KeyCode::Char(']') if self.meta.current_page < self.meta.total_pages => {
                let page = u32::try_from(self.meta.current_page + 1).unwrap_or(u32::MAX);
                Some(Command::ApplyFilters(FilterPatch::page(page)))
            }
            KeyCode::Char('r') => Some(Command::Refresh),
            KeyCode::Char('L') => Some(Command::Logout),
            _ => None,
        }
    }

    /// Moves the cursor (or, mid-drag, the hovered column) to `column`.
    fn move_column(&mut self, column: usize) {
        let column = column.min(TaskStatus::ALL.len() - 1);
        if self.drag.item().is_some() {
            self.drag.drag_enter(TaskStatus::ALL[column]);
            match self.drag.drag_over() {
                DropEffect::Move => self.column = column,
            }
        } else {
            self.selected = None;
            self.select(column, self.row);
        }
    }

    /// Space lifts the selected card or drops the lifted one.
    fn toggle_drag(&mut self) -> Option<Command> {
        if self.drag.item().is_some() {
            return self.drag.drag_end().map(Command::ChangeStatus);
        }
        let task = self.selected_task()?;
        let (id, status) = (task.id.clone(), task.status);
        self.drag.drag_start(id, status);
        None
    }

    fn handle_search_key(&mut self, key: KeyEvent, now: Instant) -> Option<Command> {
        match key.code {
            KeyCode::Enter => Some(Command::ApplyFilters(self.filters.submit())),
            KeyCode::Esc => None,
            _ => {
                if self.search.handle_key(key) {
                    self.filters.edit_search(self.search.value(), now);
                }
                self.mode = Mode::Search;
                None
            }
        }
    }

    fn handle_date_range_key(&mut self, mut form: Form, key: KeyEvent) -> Option<Command> {
        match key.code {
            KeyCode::Esc => None,
            KeyCode::Tab | KeyCode::Down => {
                form.next();
                self.mode = Mode::DateRange(form);
                None
            }
            KeyCode::BackTab | KeyCode::Up => {
                form.prev();
                self.mode = Mode::DateRange(form);
                None
            }
            KeyCode::Enter => {
                let parsed = parse_optional_date(form.value("due_date_from"))
                    .and_then(|from| Ok((from, parse_optional_date(form.value("due_date_to"))?)));
                match parsed {
                    Ok((from, to)) => {
                        self.filters.sync_from(&self.applied);
                        self.filters.set_due_date_from(from);
                        self.filters.set_due_date_to(to);
                        Some(Command::ApplyFilters(self.filters.submit()))
                    }
                    Err(message) => {
                        form.error = Some(message);
                        self.mode = Mode::DateRange(form);
                        None
                    }
                }
            }
            _ => {
                form.handle_key(key);
                self.mode = Mode::DateRange(form);
                None
            }
        }
    }

    fn handle_editor_key(&mut self, mut editor: TaskEditor, key: KeyEvent) -> Option<Command> {
        match key.code {
            KeyCode::Esc => return None,
            KeyCode::Tab | KeyCode::Down => editor.form.next(),
            KeyCode::BackTab | KeyCode::Up => editor.form.prev(),
            KeyCode::Left if editor.status_focused() => editor.status = editor.status.prev(),
            KeyCode::Right if editor.status_focused() => editor.status = editor.status.next(),
            KeyCode::Enter => match editor.submit() {
                Ok(command) => return command,
                Err(message) => editor.form.error = Some(message),
            },
            _ => {
                editor.form.handle_key(key);
            }
        }
        self.mode = Mode::Editor(editor);
        None
    }
}

fn auth_command(form: &Form, registering: bool) -> Command {
    if registering {
        Command::Register(Registration {
            name: form.value("name").to_string(),
            email: form.value("email").to_string(),
            password: form.raw("password").to_string(),
            password_confirmation: form.raw("password_confirmation").to_string(),
        })
    } else {
        Command::Login(Credentials {
            email: form.value("email").to_string(),
            password: form.raw("password").to_string(),
        })
    }
}

/// Blank is `None`; anything else must be `YYYY-MM-DD`.
fn parse_optional_date(text: &str) -> Result<Option<NaiveDate>, String> {
    if text.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| format!("\"{text}\" is not a date (YYYY-MM-DD)"))
}
