//! Task form handling for the terminal user interface.
//!
//! The `TaskForm` holds the editable fields of the task edit screen above the
//! subtask section: free-text fields plus the list and priority selectors.

use crate::db::Database;
use crate::fields::Priority;
use crate::task::Task;
use crate::tui::input::InputField;

/// Global order constants for task editing view fields.
pub const TITLE_FIELD: usize = 0;
pub const NOTES_FIELD: usize = 1;
pub const TAGS_FIELD: usize = 2;
pub const DUE_FIELD: usize = 3;
pub const HIDE_UNTIL_FIELD: usize = 4;
pub const PARENT_FIELD: usize = 5;
pub const LIST_SELECTOR_FIELD: usize = 6;
pub const PRIORITY_SELECTOR_FIELD: usize = 7;

/// Task form for editing fields.
pub struct TaskForm {
    pub title: InputField,
    pub notes: InputField,
    pub tags: InputField,
    pub due: InputField,
    pub hide_until: InputField,
    pub parent: InputField,
    pub list: usize,
    pub priority: usize,
    pub current_field: usize,
    /// Selectable lists: storage name (None = no list) and display label.
    pub list_choices: Vec<(Option<String>, String)>,
    pub priorities: Vec<Option<Priority>>,
}

impl TaskForm {
    /// Create a new empty form offering the database's lists.
    pub fn new(db: &Database) -> Self {
        let mut list_choices = vec![(None, "(none)".to_string())];
        for l in &db.lists {
            let label = if l.is_synced() {
                format!("{} (synced)", l.display_name)
            } else {
                l.display_name.clone()
            };
            list_choices.push((Some(l.name.clone()), label));
        }
        Self {
            title: InputField::new(),
            notes: InputField::new(),
            tags: InputField::new(),
            due: InputField::new(),
            hide_until: InputField::new(),
            parent: InputField::new(),
            list: 0,
            priority: 0,
            current_field: 0,
            list_choices,
            priorities: vec![
                None,
                Some(Priority::High),
                Some(Priority::Medium),
                Some(Priority::Low),
            ],
        }
    }

    /// Create a form pre-filled for a subtask of `parent_id`, defaulting to
    /// the parent's list.
    pub fn new_for_parent(db: &Database, parent_id: u64) -> Self {
        let mut form = Self::new(db);
        form.parent = InputField::with_value(&parent_id.to_string());
        if let Some(list_name) = db.get(parent_id).and_then(|t| t.list.clone()) {
            if let Some(idx) = form
                .list_choices
                .iter()
                .position(|(name, _)| name.as_deref() == Some(list_name.as_str()))
            {
                form.list = idx;
            }
        }
        form
    }

    /// Create a task form populated from an existing task.
    pub fn from_task(db: &Database, task: &Task) -> Self {
        let mut form = Self::new(db);
        form.title = InputField::with_value(&task.title);
        form.notes = InputField::with_value(&task.notes.clone().unwrap_or_default());
        form.tags = InputField::with_value(&task.tags.join(","));
        form.due = InputField::with_value(&task.due.map(|d| d.to_string()).unwrap_or_default());
        form.hide_until =
            InputField::with_value(&task.hide_until.map(|d| d.to_string()).unwrap_or_default());
        form.parent =
            InputField::with_value(&task.parent.map(|p| p.to_string()).unwrap_or_default());
        if let Some(idx) = form
            .list_choices
            .iter()
            .position(|(name, _)| name.as_deref() == task.list.as_deref() && name.is_some())
        {
            form.list = idx;
        }
        form.priority = form
            .priorities
            .iter()
            .position(|&p| p == task.priority)
            .unwrap_or(0);
        form
    }

    /// Get mutable references to all input fields in visual order.
    fn fields_mut(&mut self) -> Vec<&mut InputField> {
        vec![
            &mut self.title,
            &mut self.notes,
            &mut self.tags,
            &mut self.due,
            &mut self.hide_until,
            &mut self.parent,
        ]
    }

    /// Get the total number of fields (input fields + selectors).
    pub fn field_count(&self) -> usize {
        8
    }

    /// Move to the next field, returning false when moving past the last one
    /// (the caller shifts focus to the subtask section).
    pub fn next_field(&mut self) -> bool {
        if self.current_field + 1 >= self.field_count() {
            return false;
        }
        self.current_field += 1;
        self.update_active_field();
        true
    }

    /// Move to the previous field in the form.
    pub fn prev_field(&mut self) {
        if self.current_field > 0 {
            self.current_field -= 1;
        }
        self.update_active_field();
    }

    /// Put the cursor on the last field, entering the form from below.
    pub fn focus_last(&mut self) {
        self.current_field = self.field_count() - 1;
        self.update_active_field();
    }

    /// Update which field is currently active for editing.
    pub fn update_active_field(&mut self) {
        let current = self.current_field;
        for field in self.fields_mut() {
            field.active = false;
        }
        match current {
            TITLE_FIELD => self.title.active = true,
            NOTES_FIELD => self.notes.active = true,
            TAGS_FIELD => self.tags.active = true,
            DUE_FIELD => self.due.active = true,
            HIDE_UNTIL_FIELD => self.hide_until.active = true,
            PARENT_FIELD => self.parent.active = true,
            _ => {} // selectors have no cursor
        }
    }

    /// Handle character input for the currently active field.
    pub fn handle_char(&mut self, c: char) {
        match self.current_field {
            TITLE_FIELD => self.title.handle_char(c),
            NOTES_FIELD => self.notes.handle_char(c),
            TAGS_FIELD => self.tags.handle_char(c),
            DUE_FIELD => self.due.handle_char(c),
            HIDE_UNTIL_FIELD => self.hide_until.handle_char(c),
            PARENT_FIELD => self.parent.handle_char(c),
            _ => {}
        }
    }

    /// Handle backspace input for the currently active field.
    pub fn handle_backspace(&mut self) {
        match self.current_field {
            TITLE_FIELD => self.title.handle_backspace(),
            NOTES_FIELD => self.notes.handle_backspace(),
            TAGS_FIELD => self.tags.handle_backspace(),
            DUE_FIELD => self.due.handle_backspace(),
            HIDE_UNTIL_FIELD => self.hide_until.handle_backspace(),
            PARENT_FIELD => self.parent.handle_backspace(),
            _ => {}
        }
    }

    /// Handle left/right arrow keys for cursor movement or selector changes.
    pub fn handle_left_right(&mut self, right: bool) {
        let field = match self.current_field {
            TITLE_FIELD => Some(&mut self.title),
            NOTES_FIELD => Some(&mut self.notes),
            TAGS_FIELD => Some(&mut self.tags),
            DUE_FIELD => Some(&mut self.due),
            HIDE_UNTIL_FIELD => Some(&mut self.hide_until),
            PARENT_FIELD => Some(&mut self.parent),
            _ => None,
        };
        if let Some(field) = field {
            if right {
                field.move_cursor_right();
            } else {
                field.move_cursor_left();
            }
            return;
        }
        match self.current_field {
            LIST_SELECTOR_FIELD => {
                self.list = cycle(self.list, self.list_choices.len(), right);
            }
            PRIORITY_SELECTOR_FIELD => {
                self.priority = cycle(self.priority, self.priorities.len(), right);
            }
            _ => {}
        }
    }

    /// Get the currently selected list storage name.
    pub fn selected_list(&self) -> Option<String> {
        self.list_choices
            .get(self.list)
            .and_then(|(name, _)| name.clone())
    }

    /// Get the currently selected priority.
    pub fn selected_priority(&self) -> Option<Priority> {
        self.priorities.get(self.priority).copied().flatten()
    }
}

fn cycle(current: usize, len: usize, forward: bool) -> usize {
    if len == 0 {
        return 0;
    }
    if forward {
        (current + 1) % len
    } else if current == 0 {
        len - 1
    } else {
        current - 1
    }
}
