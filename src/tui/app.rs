//! Main application logic for the terminal user interface.
//!
//! This module contains the `App` struct which manages the TUI state,
//! handles user input, renders the interface, and coordinates between the
//! task list, the detail view and the edit screen with its subtask section.

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{Local, Utc};
use crossterm::event::{self, Event, KeyCode, KeyModifiers};
use ratatui::{
    backend::Backend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Row, Table, TableState, Wrap},
    Frame, Terminal,
};

use crate::db::{
    build_children_map, collect_ancestors, collect_descendants, depth_of, format_due_relative,
    format_priority, parse_due_input, split_and_normalise_tags, subtask_views, Database,
    SubtaskView,
};
use crate::list::Filter;
use crate::task::Task;
use crate::tui::colors::priority_color;
use crate::tui::enums::{AppState, InputMode};
use crate::tui::input::InputField;
use crate::tui::subtasks::{PanelOutcome, ParentContext, SubtaskAction, SubtaskPanel};
use crate::tui::task_form::{TaskForm, LIST_SELECTOR_FIELD, PRIORITY_SELECTOR_FIELD};
use crate::tui::utils::centered_rect;

/// Main application state for the terminal user interface.
///
/// Manages all TUI state including the current screen, database operations,
/// task filtering, the edit form and its subtask section.
pub struct App {
    state: AppState,
    db: Database,
    db_path: PathBuf,
    task_list_state: TableState,
    filtered_tasks: Vec<u64>,
    selected_task: Option<u64>,
    task_form: TaskForm,
    subtask_panel: SubtaskPanel,
    input_mode: InputMode,
    status_message: String,
    show_completed: bool,
    filter_text: String,
    filter_active: bool,
    confirm_action: Option<String>,
    filter: Filter,
    desaturate: bool,
}

impl App {
    /// Create a new App instance, loading the database from the specified path.
    pub fn new(db_path: &Path, filter: Filter, desaturate: bool) -> io::Result<Self> {
        let db = Database::load(db_path);
        let task_form = TaskForm::new(&db);
        let mut app = App {
            state: AppState::TaskList,
            db,
            db_path: db_path.to_path_buf(),
            task_list_state: TableState::default(),
            filtered_tasks: Vec::new(),
            selected_task: None,
            task_form,
            subtask_panel: SubtaskPanel::new(ParentContext::default()),
            input_mode: InputMode::None,
            status_message: String::new(),
            show_completed: false,
            filter_text: String::new(),
            filter_active: false,
            confirm_action: None,
            filter,
            desaturate,
        };
        app.update_filtered_tasks();
        Ok(app)
    }

    /// Reload the database from disk and refresh the filtered task list.
    fn refresh_tasks(&mut self) {
        self.db = Database::load(&self.db_path);
        self.update_filtered_tasks();
    }

    /// Update the filtered task list based on current filters.
    ///
    /// Applies the view filter, completion and hidden-state filters, collapse
    /// pruning and the search text. Attempts to preserve selection.
    fn update_filtered_tasks(&mut self) {
        let old_selected_id = self
            .task_list_state
            .selected()
            .and_then(|idx| self.filtered_tasks.get(idx))
            .copied();

        let today = Local::now().date_naive();
        self.filtered_tasks = self
            .db
            .tasks
            .iter()
            .filter(|t| {
                if !self.show_completed && (t.completed || t.is_hidden(today)) {
                    return false;
                }
                if !self.filter.matches(t, &self.db.lists) {
                    return false;
                }
                // Skip tasks folded away under a collapsed ancestor.
                if collect_ancestors(t.id, &self.db)
                    .iter()
                    .any(|&a| self.db.get(a).map_or(false, |p| p.collapsed))
                {
                    return false;
                }
                if !self.filter_text.is_empty() {
                    let filter_lower = self.filter_text.to_lowercase();
                    if !t.title.to_lowercase().contains(&filter_lower)
                        && !t
                            .tags
                            .iter()
                            .any(|tag| tag.to_lowercase().contains(&filter_lower))
                    {
                        return false;
                    }
                }
                true
            })
            .map(|t| t.id)
            .collect();

        if let Some(old_id) = old_selected_id {
            if let Some(new_idx) = self.filtered_tasks.iter().position(|&id| id == old_id) {
                self.task_list_state.select(Some(new_idx));
            } else {
                self.task_list_state
                    .select(if self.filtered_tasks.is_empty() {
                        None
                    } else {
                        Some(0)
                    });
            }
        } else if !self.filtered_tasks.is_empty() && self.task_list_state.selected().is_none() {
            self.task_list_state.select(Some(0));
        } else if self.filtered_tasks.is_empty() {
            self.task_list_state.select(None);
        }
    }

    /// Save the database to disk and refresh the task list.
    fn save_db(&mut self) -> io::Result<()> {
        self.db.save(&self.db_path)?;
        self.update_filtered_tasks();
        Ok(())
    }

    fn set_status_message(&mut self, msg: String) {
        self.status_message = msg;
    }

    fn clear_status_message(&mut self) {
        self.status_message.clear();
    }

    /// ID of the task currently highlighted in the list, if any.
    fn highlighted_task(&self) -> Option<u64> {
        self.task_list_state
            .selected()
            .and_then(|idx| self.filtered_tasks.get(idx))
            .copied()
    }

    /// Stored-subtask snapshots for the task being edited. Empty while a new
    /// task is being created: it has nothing persisted yet.
    fn edit_subtask_views(&self) -> Vec<SubtaskView> {
        match (self.state, self.selected_task) {
            (AppState::EditTask, Some(id)) => {
                subtask_views(&self.db, id, Local::now().date_naive())
            }
            _ => Vec::new(),
        }
    }

    /// Open a specific task for editing.
    pub fn open_task_for_edit(&mut self, task_id: u64) {
        let Some(task) = self.db.get(task_id) else {
            return;
        };
        let remote = task.remote.clone();
        self.task_form = TaskForm::from_task(&self.db, task);
        self.task_form.update_active_field();
        self.subtask_panel =
            SubtaskPanel::new(ParentContext::new(Some(self.filter.clone()), remote));
        self.selected_task = Some(task_id);
        self.state = AppState::EditTask;
        self.input_mode = InputMode::Text;
        self.clear_status_message();
    }

    /// Open the creation form, optionally pre-parented.
    fn open_task_for_add(&mut self, parent: Option<u64>) {
        self.task_form = match parent {
            Some(pid) => TaskForm::new_for_parent(&self.db, pid),
            None => TaskForm::new(&self.db),
        };
        self.task_form.update_active_field();
        // A task being created carries no synced-list linkage yet.
        self.subtask_panel = SubtaskPanel::new(ParentContext::new(Some(self.filter.clone()), None));
        self.selected_task = None;
        self.state = AppState::AddTask;
        self.input_mode = InputMode::Text;
        self.clear_status_message();
    }

    /// Handle keyboard input when in the task list view.
    ///
    /// Returns true if the application should quit.
    fn handle_task_list_input(&mut self, key: KeyCode, modifiers: KeyModifiers) -> io::Result<bool> {
        if self.filter_active {
            match key {
                KeyCode::Esc => {
                    self.filter_active = false;
                    self.filter_text.clear();
                    self.input_mode = InputMode::None;
                    self.update_filtered_tasks();
                    self.clear_status_message();
                }
                KeyCode::Enter => {
                    self.filter_active = false;
                    self.input_mode = InputMode::None;
                    self.set_status_message(format!(
                        "Filter applied: '{}' ({} tasks)",
                        self.filter_text,
                        self.filtered_tasks.len()
                    ));
                }
                KeyCode::Backspace => {
                    if !self.filter_text.is_empty() {
                        self.filter_text.pop();
                        self.update_filtered_tasks();
                    }
                }
                KeyCode::Char(c) => {
                    self.filter_text.push(c);
                    self.update_filtered_tasks();
                }
                _ => {}
            }
            return Ok(false);
        }

        match key {
            KeyCode::Char('q') if modifiers.contains(KeyModifiers::CONTROL) => return Ok(true),
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => return Ok(true),
            KeyCode::Esc => {
                if !self.filter_text.is_empty() {
                    self.filter_text.clear();
                    self.update_filtered_tasks();
                    self.clear_status_message();
                } else {
                    return Ok(true);
                }
            }
            KeyCode::Up => {
                if let Some(selected) = self.task_list_state.selected() {
                    if selected > 0 {
                        self.task_list_state.select(Some(selected - 1));
                    }
                } else if !self.filtered_tasks.is_empty() {
                    self.task_list_state.select(Some(0));
                }
            }
            KeyCode::Down => {
                if let Some(selected) = self.task_list_state.selected() {
                    if selected + 1 < self.filtered_tasks.len() {
                        self.task_list_state.select(Some(selected + 1));
                    }
                } else if !self.filtered_tasks.is_empty() {
                    self.task_list_state.select(Some(0));
                }
            }
            KeyCode::Enter => {
                if let Some(task_id) = self.highlighted_task() {
                    self.selected_task = Some(task_id);
                    self.state = AppState::TaskDetail;
                }
            }
            KeyCode::Char('a') => {
                self.open_task_for_add(None);
            }
            KeyCode::Char('A') => {
                // Add a subtask under the highlighted task.
                if let Some(task_id) = self.highlighted_task() {
                    self.open_task_for_add(Some(task_id));
                }
            }
            KeyCode::Char('e') => {
                if let Some(task_id) = self.highlighted_task() {
                    self.open_task_for_edit(task_id);
                }
            }
            KeyCode::Char('d') => {
                if let Some(task_id) = self.highlighted_task() {
                    self.selected_task = Some(task_id);
                    self.confirm_action = Some(format!("Delete task #{} and its subtasks", task_id));
                    self.state = AppState::Confirm;
                }
            }
            KeyCode::Char('c') => {
                if let Some(task_id) = self.highlighted_task() {
                    if let Some(task) = self.db.get_mut(task_id) {
                        task.completed = !task.completed;
                        task.updated_at_utc = Utc::now().timestamp();
                        if let Err(e) = self.save_db() {
                            self.set_status_message(format!("Error saving: {}", e));
                        } else {
                            self.set_status_message("Task completion updated".to_string());
                        }
                    }
                }
            }
            KeyCode::Char('z') => {
                if let Some(task_id) = self.highlighted_task() {
                    let has_children = build_children_map(&self.db.tasks)
                        .get(&task_id)
                        .map_or(false, |c| !c.is_empty());
                    if !has_children {
                        self.set_status_message("Task has no subtasks to fold".to_string());
                    } else if let Some(task) = self.db.get_mut(task_id) {
                        task.collapsed = !task.collapsed;
                        if let Err(e) = self.save_db() {
                            self.set_status_message(format!("Error saving: {}", e));
                        }
                    }
                }
            }
            KeyCode::Char('t') => {
                self.show_completed = !self.show_completed;
                self.update_filtered_tasks();
                self.set_status_message(if self.show_completed {
                    format!("Showing all tasks ({} total)", self.filtered_tasks.len())
                } else {
                    format!(
                        "Hiding completed and scheduled tasks ({} visible)",
                        self.filtered_tasks.len()
                    )
                });
            }
            KeyCode::Char('/') => {
                self.filter_active = true;
                self.input_mode = InputMode::Text;
                self.set_status_message(
                    "Filter mode: Type to search title/tags, Enter to apply, Esc to cancel"
                        .to_string(),
                );
            }
            KeyCode::Char('h') => {
                self.state = AppState::Help;
            }
            KeyCode::Char('r') => {
                self.refresh_tasks();
                self.set_status_message("Tasks refreshed".to_string());
            }
            _ => {}
        }
        Ok(false)
    }

    /// Handle keyboard input when viewing task details.
    fn handle_detail_input(&mut self, key: KeyCode, _modifiers: KeyModifiers) -> io::Result<bool> {
        match key {
            KeyCode::Esc | KeyCode::Char('q') => {
                self.state = AppState::TaskList;
            }
            KeyCode::Char('e') => {
                if let Some(task_id) = self.selected_task {
                    self.open_task_for_edit(task_id);
                }
            }
            KeyCode::Char('d') => {
                if let Some(task_id) = self.selected_task {
                    self.confirm_action = Some(format!("Delete task #{} and its subtasks", task_id));
                    self.state = AppState::Confirm;
                }
            }
            KeyCode::Char('p') => {
                if let Some(task_id) = self.selected_task {
                    match self.db.get(task_id).and_then(|t| t.parent) {
                        Some(parent_id) => {
                            self.selected_task = Some(parent_id);
                            self.set_status_message(format!("Viewing parent task #{}", parent_id));
                        }
                        None => self.set_status_message("No parent task".to_string()),
                    }
                }
            }
            _ => {}
        }
        Ok(false)
    }

    /// Handle keyboard input in the task creation or editing screen.
    fn handle_form_input(&mut self, key: KeyCode, modifiers: KeyModifiers) -> io::Result<bool> {
        let is_edit = self.state == AppState::EditTask;

        // Save and cancel work from anywhere on the screen, including the
        // subtask section.
        if key == KeyCode::Char('s') && modifiers.contains(KeyModifiers::CONTROL) {
            self.submit_form(is_edit);
            return Ok(false);
        }
        if key == KeyCode::Esc {
            self.state = AppState::TaskList;
            self.input_mode = InputMode::None;
            return Ok(false);
        }

        if self.subtask_panel.focused {
            let views = self.edit_subtask_views();
            match self.subtask_panel.handle_key(key, modifiers, &views) {
                PanelOutcome::Action(action) => self.apply_subtask_action(action),
                PanelOutcome::FocusForm => self.task_form.focus_last(),
                PanelOutcome::Handled | PanelOutcome::Ignored => {}
            }
            return Ok(false);
        }

        match key {
            KeyCode::Tab | KeyCode::Down => {
                if !self.task_form.next_field() {
                    self.subtask_panel.focus_first();
                }
            }
            KeyCode::BackTab | KeyCode::Up => {
                self.task_form.prev_field();
            }
            KeyCode::Left => {
                self.task_form.handle_left_right(false);
            }
            KeyCode::Right => {
                self.task_form.handle_left_right(true);
            }
            KeyCode::Backspace => {
                self.task_form.handle_backspace();
            }
            KeyCode::Enter => {
                self.submit_form(is_edit);
            }
            KeyCode::Char(c) => {
                self.task_form.handle_char(c);
            }
            _ => {}
        }
        Ok(false)
    }

    /// Validate and save the form, returning to the task list on success.
    fn submit_form(&mut self, is_edit: bool) {
        if self.task_form.title.is_blank() {
            self.set_status_message("Title is required".to_string());
            return;
        }
        match self.save_task(is_edit) {
            Ok(_) => {
                self.state = AppState::TaskList;
                self.input_mode = InputMode::None;
                self.set_status_message(
                    if is_edit { "Task updated" } else { "Task created" }.to_string(),
                );
            }
            Err(e) => {
                self.set_status_message(format!("Error: {}", e));
            }
        }
    }

    /// Execute an action raised by the subtask section.
    ///
    /// The section itself never mutates storage; everything lands here.
    fn apply_subtask_action(&mut self, action: SubtaskAction) {
        let existing_count = self.edit_subtask_views().len();
        match action {
            SubtaskAction::Open(id) => {
                // Commit what is on screen first so nothing is silently lost.
                if self.task_form.title.is_blank() {
                    self.set_status_message(
                        "Title is required before opening a subtask".to_string(),
                    );
                    return;
                }
                let is_edit = self.state == AppState::EditTask;
                match self.save_task(is_edit) {
                    Ok(_) => self.open_task_for_edit(id),
                    Err(e) => self.set_status_message(format!("Error: {}", e)),
                }
            }
            SubtaskAction::SetCompleted { id, completed } => {
                if let Some(task) = self.db.get_mut(id) {
                    task.completed = completed;
                    task.updated_at_utc = Utc::now().timestamp();
                    if let Err(e) = self.save_db() {
                        self.set_status_message(format!("Error saving: {}", e));
                    }
                }
            }
            SubtaskAction::SetCollapsed { id, collapsed } => {
                if let Some(task) = self.db.get_mut(id) {
                    task.collapsed = collapsed;
                    if let Err(e) = self.save_db() {
                        self.set_status_message(format!("Error saving: {}", e));
                    }
                }
            }
            SubtaskAction::ToggleDraftCompleted(index) => {
                self.subtask_panel.apply_toggle_draft(index);
            }
            SubtaskAction::AddDraft => {
                self.subtask_panel.apply_add_draft(existing_count);
            }
            SubtaskAction::DeleteDraft(index) => {
                self.subtask_panel.apply_delete_draft(index, existing_count);
            }
        }
    }

    /// Create or update a task from the current form data, then promote the
    /// non-blank subtask drafts into persisted subtasks of it.
    fn save_task(&mut self, is_edit: bool) -> io::Result<u64> {
        let now_utc = Utc::now().timestamp();
        let task_id = if is_edit {
            self.selected_task
                .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "No task selected"))?
        } else {
            self.db.next_id()
        };

        let parent = if self.task_form.parent.is_blank() {
            None
        } else {
            match self.task_form.parent.value.trim().parse::<u64>() {
                Ok(pid) => {
                    if pid == task_id {
                        return Err(io::Error::new(
                            io::ErrorKind::InvalidInput,
                            "Task cannot be its own parent",
                        ));
                    }
                    if self.db.get(pid).is_none() {
                        return Err(io::Error::new(
                            io::ErrorKind::InvalidInput,
                            format!("Parent ID {} does not exist", pid),
                        ));
                    }
                    Some(pid)
                }
                Err(_) => {
                    return Err(io::Error::new(io::ErrorKind::InvalidInput, "Invalid parent ID"))
                }
            }
        };

        let due = if self.task_form.due.is_blank() {
            None
        } else {
            parse_due_input(&self.task_form.due.value)
        };
        let hide_until = if self.task_form.hide_until.is_blank() {
            None
        } else {
            parse_due_input(&self.task_form.hide_until.value)
        };

        let title = self.task_form.title.value.trim().to_string();
        let notes = if self.task_form.notes.is_blank() {
            None
        } else {
            Some(self.task_form.notes.value.trim().to_string())
        };
        let tags = split_and_normalise_tags(&[self.task_form.tags.value.clone()]);
        let list = self.task_form.selected_list();
        let priority = self.task_form.selected_priority();

        if is_edit {
            let task = self
                .db
                .get_mut(task_id)
                .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "Task not found"))?;
            task.title = title;
            task.notes = notes;
            task.tags = tags;
            task.list = list.clone();
            task.due = due;
            task.hide_until = hide_until;
            task.parent = parent;
            task.priority = priority;
            task.updated_at_utc = now_utc;
        } else {
            self.db.tasks.push(Task {
                id: task_id,
                title,
                notes,
                tags,
                list: list.clone(),
                due,
                hide_until,
                parent,
                priority,
                completed: false,
                collapsed: false,
                remote: None,
                created_at_utc: now_utc,
                updated_at_utc: now_utc,
            });
        }

        // Draft promotion: each surviving draft becomes a stored subtask of
        // the task just saved, inheriting its list.
        for (title, completed) in self.subtask_panel.take_drafts() {
            let id = self.db.next_id();
            self.db.tasks.push(Task {
                id,
                title,
                notes: None,
                tags: Vec::new(),
                list: list.clone(),
                due: None,
                hide_until: None,
                parent: Some(task_id),
                priority: None,
                completed,
                collapsed: false,
                remote: None,
                created_at_utc: now_utc,
                updated_at_utc: now_utc,
            });
        }

        self.save_db()?;
        Ok(task_id)
    }

    /// Delete the selected task together with its descendants.
    fn delete_selected_task(&mut self) -> io::Result<()> {
        let Some(task_id) = self.selected_task else {
            return Ok(());
        };
        let child_map = build_children_map(&self.db.tasks);
        let mut ids: HashSet<u64> = HashSet::new();
        ids.insert(task_id);
        collect_descendants(task_id, &child_map, &mut ids);
        let count = ids.len();
        self.db.remove_ids(&ids);
        self.selected_task = None;
        self.save_db()?;
        self.set_status_message(format!("Deleted {} task(s)", count));
        Ok(())
    }

    /// Handle keyboard input in the delete confirmation dialog.
    fn handle_confirm_input(&mut self, key: KeyCode, _modifiers: KeyModifiers) -> io::Result<bool> {
        match key {
            KeyCode::Char('y') | KeyCode::Char('Y') => {
                if let Err(e) = self.delete_selected_task() {
                    self.set_status_message(format!("Error deleting: {}", e));
                }
                self.confirm_action = None;
                self.state = AppState::TaskList;
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                self.confirm_action = None;
                self.state = AppState::TaskList;
            }
            _ => {}
        }
        Ok(false)
    }

    fn handle_help_input(&mut self, key: KeyCode, _modifiers: KeyModifiers) -> io::Result<bool> {
        match key {
            KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('h') => {
                self.state = AppState::TaskList;
            }
            _ => {}
        }
        Ok(false)
    }

    /// Poll for and dispatch one keyboard event.
    fn handle_input(&mut self) -> io::Result<bool> {
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                return match self.state {
                    AppState::TaskList => self.handle_task_list_input(key.code, key.modifiers),
                    AppState::TaskDetail => self.handle_detail_input(key.code, key.modifiers),
                    AppState::AddTask | AppState::EditTask => {
                        self.handle_form_input(key.code, key.modifiers)
                    }
                    AppState::Help => self.handle_help_input(key.code, key.modifiers),
                    AppState::Confirm => self.handle_confirm_input(key.code, key.modifiers),
                };
            }
        }
        Ok(false)
    }

    /// Render the task list table.
    fn render_task_list(&mut self, f: &mut Frame, area: Rect) {
        let today = Local::now().date_naive();

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(0)])
            .split(area);

        let context_display = format!("View: {}", self.filter.display_name(&self.db.lists));
        let header_text = vec![Line::from(vec![
            Span::styled("TASKTREE", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw("  "),
            Span::styled(
                context_display,
                Style::default().fg(Color::Cyan).add_modifier(Modifier::ITALIC),
            ),
        ])];
        let header_block = Paragraph::new(header_text)
            .block(Block::default().borders(Borders::ALL))
            .alignment(Alignment::Center);
        f.render_widget(header_block, chunks[0]);

        let header_cells = ["ID", "Done", "Pri", "Due", "List", "Title"].iter().map(|h| {
            ratatui::widgets::Cell::from(*h).style(Style::default().add_modifier(Modifier::BOLD))
        });
        let header = Row::new(header_cells)
            .style(Style::default().bg(Color::Blue).fg(Color::White))
            .height(1);

        let child_map = build_children_map(&self.db.tasks);
        let rows: Vec<Row> = self
            .filtered_tasks
            .iter()
            .filter_map(|&id| self.db.get(id))
            .map(|task| {
                let due_str = format_due_relative(task.due, today);
                let list_str = task.list.as_deref().unwrap_or("-");
                let tags_str = if task.tags.is_empty() {
                    String::new()
                } else {
                    format!(" [{}]", task.tags.join(","))
                };
                let style = if task.completed || task.is_hidden(today) {
                    Style::default().fg(Color::DarkGray)
                } else {
                    Style::default().fg(priority_color(task.priority, self.desaturate))
                };
                let depth = depth_of(task.id, &self.db);
                let indent_str = "  ".repeat(depth);
                let chip = if child_map.get(&task.id).map_or(false, |c| !c.is_empty()) {
                    if task.collapsed {
                        " ▸"
                    } else {
                        " ▾"
                    }
                } else {
                    ""
                };

                Row::new(vec![
                    ratatui::widgets::Cell::from(task.id.to_string()),
                    ratatui::widgets::Cell::from(if task.completed { "x" } else { " " }),
                    ratatui::widgets::Cell::from(format_priority(task.priority)),
                    ratatui::widgets::Cell::from(due_str),
                    ratatui::widgets::Cell::from(list_str.to_string()),
                    ratatui::widgets::Cell::from(format!(
                        "{}{}{}{}",
                        indent_str, task.title, tags_str, chip
                    )),
                ])
                .style(style)
            })
            .collect();

        let widths = [
            Constraint::Length(4),
            Constraint::Length(5),
            Constraint::Length(7),
            Constraint::Length(10),
            Constraint::Length(14),
            Constraint::Min(25),
        ];

        let table = Table::new(rows, widths)
            .header(header)
            .block(Block::default().borders(Borders::ALL).title(format!(
                "Tasks ({}/{}) - Press 'h' for help",
                self.filtered_tasks.len(),
                self.db.tasks.len()
            )))
            .row_highlight_style(Style::default().bg(Color::Gray).fg(Color::Black))
            .highlight_symbol(">> ");

        f.render_stateful_widget(table, chunks[1], &mut self.task_list_state);
    }

    /// Render the detailed view of a single task.
    fn render_task_detail(&mut self, f: &mut Frame, area: Rect) {
        let Some(task) = self.selected_task.and_then(|id| self.db.get(id)) else {
            return;
        };
        let today = Local::now().date_naive();

        let parent_name = task
            .parent
            .and_then(|pid| self.db.get(pid).map(|p| format!("#{} - {}", p.id, p.title)));
        let subtasks = subtask_views(&self.db, task.id, today);

        let mut text = vec![
            Line::from(vec![
                Span::styled("ID: ", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(task.id.to_string()),
            ]),
            Line::from(vec![
                Span::styled("Title: ", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(&task.title),
            ]),
            Line::from(vec![
                Span::styled("Done: ", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(if task.completed { "yes" } else { "no" }),
            ]),
            Line::from(vec![
                Span::styled("Priority: ", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(format_priority(task.priority)),
            ]),
            Line::from(vec![
                Span::styled("Due: ", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(format_due_relative(task.due, today)),
            ]),
            Line::from(vec![
                Span::styled("List: ", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(task.list.clone().unwrap_or_else(|| "-".into())),
            ]),
        ];
        if let Some(remote) = &task.remote {
            text.push(Line::from(vec![
                Span::styled("Synced: ", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(format!(
                    "list {}{}",
                    remote.list_id,
                    if remote.parent > 0 { " (nested)" } else { "" }
                )),
            ]));
        }
        if let Some(parent) = parent_name {
            text.push(Line::from(vec![
                Span::styled("Parent: ", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(parent),
            ]));
        }
        if !task.tags.is_empty() {
            text.push(Line::from(vec![
                Span::styled("Tags: ", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(task.tags.join(", ")),
            ]));
        }
        if let Some(notes) = &task.notes {
            text.push(Line::from(""));
            text.push(Line::from(notes.as_str()));
        }
        if !subtasks.is_empty() {
            text.push(Line::from(""));
            text.push(Line::from(Span::styled(
                "Subtasks:",
                Style::default().add_modifier(Modifier::BOLD),
            )));
            for v in &subtasks {
                text.push(Line::from(format!(
                    "{}[{}] {}",
                    "  ".repeat(v.indent + 1),
                    if v.completed { "x" } else { " " },
                    v.title
                )));
            }
        }

        let detail = Paragraph::new(text)
            .block(Block::default().borders(Borders::ALL).title(
                "Task Detail - e: edit, d: delete, p: parent, Esc: back",
            ))
            .wrap(Wrap { trim: false });
        f.render_widget(detail, area);
    }

    /// Render one bordered input field.
    fn render_input_field(&self, f: &mut Frame, area: Rect, label: &str, field: &InputField) {
        let border_style = if field.active {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        };
        let input = Paragraph::new(field.value.as_str())
            .block(Block::default().borders(Borders::ALL).title(label).border_style(border_style));
        f.render_widget(input, area);
        let typing = matches!(self.input_mode, InputMode::Text);
        if field.active && typing && !self.subtask_panel.focused {
            f.set_cursor_position((area.x + field.cursor as u16 + 1, area.y + 1));
        }
    }

    /// Render one bordered selector field.
    fn render_selector(&self, f: &mut Frame, area: Rect, label: &str, value: &str, active: bool) {
        let border_style = if active && !self.subtask_panel.focused {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        };
        let selector = Paragraph::new(format!("< {} >", value))
            .block(Block::default().borders(Borders::ALL).title(label).border_style(border_style));
        f.render_widget(selector, area);
    }

    /// Render the task creation/editing screen: form fields on top, the
    /// subtask section below.
    fn render_task_form(&mut self, f: &mut Frame, area: Rect, is_edit: bool) {
        let title = if is_edit { "Edit Task" } else { "New Task" };
        let outer = Block::default().borders(Borders::ALL).title(format!(
            "{} - Enter/Ctrl+S: save, Tab: next field, Esc: cancel",
            title
        ));
        let inner = outer.inner(area);
        f.render_widget(outer, area);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Min(4),
            ])
            .split(inner);

        let pair = |area: Rect| {
            Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
                .split(area)
        };

        let r0 = pair(rows[0]);
        self.render_input_field(f, r0[0], "Title", &self.task_form.title);
        self.render_input_field(f, r0[1], "Due", &self.task_form.due);

        let r1 = pair(rows[1]);
        self.render_input_field(f, r1[0], "Notes", &self.task_form.notes);
        self.render_input_field(f, r1[1], "Hide until", &self.task_form.hide_until);

        let r2 = pair(rows[2]);
        self.render_input_field(f, r2[0], "Tags", &self.task_form.tags);
        self.render_input_field(f, r2[1], "Parent ID", &self.task_form.parent);

        let r3 = pair(rows[3]);
        let list_label = self
            .task_form
            .list_choices
            .get(self.task_form.list)
            .map(|(_, label)| label.clone())
            .unwrap_or_else(|| "(none)".to_string());
        self.render_selector(
            f,
            r3[0],
            "List",
            &list_label,
            self.task_form.current_field == LIST_SELECTOR_FIELD,
        );
        self.render_selector(
            f,
            r3[1],
            "Priority",
            format_priority(self.task_form.selected_priority()),
            self.task_form.current_field == PRIORITY_SELECTOR_FIELD,
        );

        let views = self.edit_subtask_views();
        self.subtask_panel.render(f, rows[4], &views, self.desaturate);
    }

    /// Render the help overlay.
    fn render_help(&mut self, f: &mut Frame, area: Rect) {
        let help_text = vec![
            Line::from(Span::styled(
                "Task list",
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from("  Up/Down: navigate   Enter: details   a: add   A: add subtask"),
            Line::from("  e: edit   c: complete   z: fold subtree   d: delete"),
            Line::from("  t: show/hide completed   /: search   r: refresh   Esc: quit"),
            Line::from(""),
            Line::from(Span::styled(
                "Edit screen",
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from("  Tab/Up/Down: move between fields   Left/Right: cursor/selector"),
            Line::from("  Enter or Ctrl+S: save   Esc: cancel"),
            Line::from(""),
            Line::from(Span::styled(
                "Subtask section",
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from("  Up/Down: move between rows"),
            Line::from("  On a stored subtask: Space toggle done, Enter open, z fold"),
            Line::from("  On a draft: type the title, Enter adds the next one,"),
            Line::from("  Ctrl+T toggle done, Ctrl+D discard"),
            Line::from("  On '+ Add subtask': Enter starts a draft"),
            Line::from(""),
            Line::from("Press Esc to return"),
        ];
        let help = Paragraph::new(help_text)
            .block(Block::default().borders(Borders::ALL).title("Help"))
            .wrap(Wrap { trim: false });
        f.render_widget(help, area);
    }

    /// Render the delete confirmation dialog.
    fn render_confirm(&mut self, f: &mut Frame, area: Rect) {
        let area = centered_rect(60, 30, area);
        f.render_widget(Clear, area);
        let action = self.confirm_action.clone().unwrap_or_default();
        let text = vec![
            Line::from(""),
            Line::from(Span::styled(
                action,
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from("Press Y to confirm, N or Esc to cancel"),
        ];
        let confirm = Paragraph::new(text)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("Confirm")
                    .border_style(Style::default().fg(Color::Red)),
            )
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        f.render_widget(confirm, area);
    }

    /// Render the status bar with context-appropriate help text.
    fn render_status_bar(&mut self, f: &mut Frame, area: Rect) {
        let status_text = if !self.status_message.is_empty() {
            self.status_message.clone()
        } else if self.filter_active {
            format!("Search: {}", self.filter_text)
        } else {
            match self.state {
                AppState::TaskList => {
                    "a: add, e: edit, c: complete, d: delete, h: help, Esc: quit".to_string()
                }
                AppState::TaskDetail => "e: edit, d: delete, p: parent, Esc: back".to_string(),
                AppState::AddTask | AppState::EditTask => {
                    if self.subtask_panel.focused {
                        "Subtasks - Space/Enter/z on rows, Ctrl+S: save, Esc: cancel".to_string()
                    } else {
                        "Tab: next field, Enter: save, Esc: cancel".to_string()
                    }
                }
                AppState::Help => "Esc: back".to_string(),
                AppState::Confirm => "Y: confirm, N/Esc: cancel".to_string(),
            }
        };
        let status = Paragraph::new(status_text)
            .style(Style::default().bg(Color::Blue).fg(Color::White))
            .alignment(Alignment::Left);
        f.render_widget(status, area);
    }

    /// Main render dispatch.
    fn render(&mut self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(1)])
            .split(f.area());

        match self.state {
            AppState::TaskList => self.render_task_list(f, chunks[0]),
            AppState::TaskDetail => self.render_task_detail(f, chunks[0]),
            AppState::AddTask => self.render_task_form(f, chunks[0], false),
            AppState::EditTask => self.render_task_form(f, chunks[0], true),
            AppState::Help => self.render_help(f, chunks[0]),
            AppState::Confirm => {
                self.render_task_list(f, chunks[0]);
                self.render_confirm(f, chunks[0]);
            }
        }

        self.render_status_bar(f, chunks[1]);
    }

    /// Main event loop.
    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()> {
        loop {
            terminal.draw(|f| self.render(f))?;
            if self.handle_input()? {
                break;
            }
        }
        Ok(())
    }
}
