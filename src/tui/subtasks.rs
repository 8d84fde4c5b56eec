//! Subtask section of the task edit screen.
//!
//! This module decides which subtask rows are shown, in what order, with what
//! affordances, and maps key presses on those rows to actions. Two sources
//! feed it: read-only snapshots of stored subtasks ([`SubtaskView`], supplied
//! by the database) and unsaved drafts typed straight into the section
//! ([`DraftSubtask`], owned by the panel until the edit screen saves).
//!
//! The section never touches the database itself: every mutation surfaces as
//! a [`SubtaskAction`] that the hosting `App` executes.

use crossterm::event::{KeyCode, KeyModifiers};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::db::SubtaskView;
use crate::list::Filter;
use crate::task::RemoteLink;
use crate::tui::colors::priority_color;
use crate::tui::input::InputField;

/// Notice shown instead of the subtask list when nesting is unsupported.
const NESTING_BLOCKED_NOTICE: &str = "This synced list does not support multi-level subtasks";

/// What the edit screen knows about the task whose subtasks are shown: the
/// grouping it was opened from and the task's own synced-list linkage.
#[derive(Debug, Clone, Default)]
pub struct ParentContext {
    pub filter: Option<Filter>,
    pub remote: Option<RemoteLink>,
}

impl ParentContext {
    pub fn new(filter: Option<Filter>, remote: Option<RemoteLink>) -> Self {
        ParentContext { filter, remote }
    }

    /// True when the edited task is itself a child row inside the synced list
    /// being viewed. Synced lists support a single level of nesting, so no
    /// subtask rows may be offered at all.
    pub fn nesting_blocked(&self) -> bool {
        match (&self.filter, &self.remote) {
            (Some(Filter::Synced { remote_id }), Some(remote)) => {
                remote.parent > 0 && remote.list_id == *remote_id
            }
            _ => false,
        }
    }

    /// Synced-list groupings render flat: stored depth is ignored.
    pub fn flat_indent(&self) -> bool {
        matches!(self.filter, Some(Filter::Synced { .. }))
    }
}

/// An unsaved subtask being typed into the section.
#[derive(Clone)]
pub struct DraftSubtask {
    pub title: InputField,
    pub completed: bool,
}

impl DraftSubtask {
    fn new() -> Self {
        DraftSubtask {
            title: InputField::new(),
            completed: false,
        }
    }
}

/// One display row of the subtask section, in render order.
#[derive(Debug, Clone, PartialEq)]
pub enum SubtaskRow {
    /// Single disabled notice replacing the whole list.
    Blocked,
    /// A stored subtask, indent already resolved against the context.
    Existing(SubtaskView),
    /// An unsaved draft; `index` addresses the panel's draft vector.
    Draft {
        index: usize,
        title: String,
        completed: bool,
    },
    /// Trailing add-subtask affordance.
    AddPrompt,
}

/// A mutation or navigation request raised by the section and executed by the
/// hosting screen.
#[derive(Debug, Clone, PartialEq)]
pub enum SubtaskAction {
    /// Open the stored subtask for full editing.
    Open(u64),
    /// Set the completion flag of a stored subtask.
    SetCompleted { id: u64, completed: bool },
    /// Fold or unfold the subtree below a stored subtask.
    SetCollapsed { id: u64, collapsed: bool },
    /// Toggle the completion flag of a draft.
    ToggleDraftCompleted(usize),
    /// Append a new empty draft and focus it.
    AddDraft,
    /// Discard a draft.
    DeleteDraft(usize),
}

/// Result of feeding one key press to the panel.
#[derive(Debug, Clone, PartialEq)]
pub enum PanelOutcome {
    /// Key is not for the section; the caller may handle it globally.
    Ignored,
    /// Key was consumed by local editing or cursor movement.
    Handled,
    /// Key maps to an action for the host to execute.
    Action(SubtaskAction),
    /// Cursor moved above the first row; focus returns to the form fields.
    FocusForm,
}

/// Build the display rows for the section.
///
/// The blocked case short-circuits to a single disabled notice. Otherwise the
/// order is: stored subtasks (indent flattened to 0 under a synced-list
/// grouping), then drafts (never indented), then the add affordance.
pub fn build_rows(
    context: &ParentContext,
    existing: &[SubtaskView],
    drafts: &[DraftSubtask],
) -> Vec<SubtaskRow> {
    if context.nesting_blocked() {
        return vec![SubtaskRow::Blocked];
    }
    let mut rows = Vec::with_capacity(existing.len() + drafts.len() + 1);
    for view in existing {
        let mut view = view.clone();
        if context.flat_indent() {
            view.indent = 0;
        }
        rows.push(SubtaskRow::Existing(view));
    }
    for (index, draft) in drafts.iter().enumerate() {
        rows.push(SubtaskRow::Draft {
            index,
            title: draft.title.value.clone(),
            completed: draft.completed,
        });
    }
    rows.push(SubtaskRow::AddPrompt);
    rows
}

/// Interactive state of the subtask section: the drafts being typed, the
/// cursored row, and whether the section currently holds keyboard focus.
pub struct SubtaskPanel {
    pub context: ParentContext,
    pub drafts: Vec<DraftSubtask>,
    pub cursor: usize,
    pub focused: bool,
}

impl SubtaskPanel {
    pub fn new(context: ParentContext) -> Self {
        SubtaskPanel {
            context,
            drafts: Vec::new(),
            cursor: 0,
            focused: false,
        }
    }

    /// Display rows for the current frame.
    pub fn rows(&self, existing: &[SubtaskView]) -> Vec<SubtaskRow> {
        build_rows(&self.context, existing, &self.drafts)
    }

    /// Number of rows the cursor can land on.
    fn row_count(&self, existing: &[SubtaskView]) -> usize {
        self.rows(existing).len()
    }

    /// Move the cursor onto the first row, entering the section from above.
    pub fn focus_first(&mut self) {
        self.cursor = 0;
        self.focused = true;
    }

    /// Append an empty draft and move the cursor onto it, pre-focused for
    /// typing. Executed by the host in response to [`SubtaskAction::AddDraft`].
    pub fn apply_add_draft(&mut self, existing_count: usize) {
        self.drafts.push(DraftSubtask::new());
        self.cursor = existing_count + self.drafts.len() - 1;
        self.focused = true;
    }

    /// Discard a draft and keep the cursor on a sensible row.
    pub fn apply_delete_draft(&mut self, index: usize, existing_count: usize) {
        if index < self.drafts.len() {
            self.drafts.remove(index);
        }
        let last = existing_count + self.drafts.len(); // the add affordance
        if self.cursor > last {
            self.cursor = last;
        }
    }

    /// Toggle a draft's completion flag.
    pub fn apply_toggle_draft(&mut self, index: usize) {
        if let Some(draft) = self.drafts.get_mut(index) {
            draft.completed = !draft.completed;
        }
    }

    /// Drain the drafts for promotion when the edit screen saves. Blank
    /// titles are discarded.
    pub fn take_drafts(&mut self) -> Vec<(String, bool)> {
        self.cursor = 0;
        self.drafts
            .drain(..)
            .filter(|d| !d.title.is_blank())
            .map(|d| (d.title.value.trim().to_string(), d.completed))
            .collect()
    }

    /// Feed one key press to the section.
    ///
    /// Draft rows swallow printable characters into their text field, so the
    /// caller must route keys here before treating them as shortcuts whenever
    /// the section is focused.
    pub fn handle_key(
        &mut self,
        key: KeyCode,
        modifiers: KeyModifiers,
        existing: &[SubtaskView],
    ) -> PanelOutcome {
        let rows = self.rows(existing);
        if self.cursor >= rows.len() {
            self.cursor = rows.len().saturating_sub(1);
        }

        match key {
            KeyCode::Up => {
                if self.cursor == 0 {
                    self.focused = false;
                    return PanelOutcome::FocusForm;
                }
                self.cursor -= 1;
                return PanelOutcome::Handled;
            }
            KeyCode::Down => {
                if self.cursor + 1 < self.row_count(existing) {
                    self.cursor += 1;
                }
                return PanelOutcome::Handled;
            }
            _ => {}
        }

        match &rows[self.cursor] {
            SubtaskRow::Blocked => PanelOutcome::Ignored,
            SubtaskRow::Existing(view) => match key {
                KeyCode::Enter => PanelOutcome::Action(SubtaskAction::Open(view.id)),
                KeyCode::Char(' ') => PanelOutcome::Action(SubtaskAction::SetCompleted {
                    id: view.id,
                    completed: !view.completed,
                }),
                KeyCode::Char('z') if view.has_children => {
                    PanelOutcome::Action(SubtaskAction::SetCollapsed {
                        id: view.id,
                        collapsed: !view.collapsed,
                    })
                }
                _ => PanelOutcome::Ignored,
            },
            SubtaskRow::Draft { index, .. } => {
                let index = *index;
                match key {
                    KeyCode::Char('d') if modifiers.contains(KeyModifiers::CONTROL) => {
                        PanelOutcome::Action(SubtaskAction::DeleteDraft(index))
                    }
                    KeyCode::Char('t') if modifiers.contains(KeyModifiers::CONTROL) => {
                        PanelOutcome::Action(SubtaskAction::ToggleDraftCompleted(index))
                    }
                    KeyCode::Enter => {
                        // Quick-add chaining: a non-blank submit opens the
                        // next empty draft, a blank one stays put.
                        if self.drafts[index].title.is_blank() {
                            PanelOutcome::Handled
                        } else {
                            PanelOutcome::Action(SubtaskAction::AddDraft)
                        }
                    }
                    KeyCode::Char(c) if !modifiers.contains(KeyModifiers::CONTROL) => {
                        self.drafts[index].title.handle_char(c);
                        PanelOutcome::Handled
                    }
                    KeyCode::Backspace => {
                        self.drafts[index].title.handle_backspace();
                        PanelOutcome::Handled
                    }
                    KeyCode::Delete => {
                        self.drafts[index].title.handle_delete();
                        PanelOutcome::Handled
                    }
                    KeyCode::Left => {
                        self.drafts[index].title.move_cursor_left();
                        PanelOutcome::Handled
                    }
                    KeyCode::Right => {
                        self.drafts[index].title.move_cursor_right();
                        PanelOutcome::Handled
                    }
                    _ => PanelOutcome::Ignored,
                }
            }
            SubtaskRow::AddPrompt => match key {
                KeyCode::Enter | KeyCode::Char(' ') => {
                    PanelOutcome::Action(SubtaskAction::AddDraft)
                }
                _ => PanelOutcome::Ignored,
            },
        }
    }

    /// Render the section into `area`. `desaturate` is forwarded straight to
    /// the colour table.
    pub fn render(&self, f: &mut Frame, area: Rect, existing: &[SubtaskView], desaturate: bool) {
        let rows = self.rows(existing);
        let mut lines: Vec<Line> = Vec::with_capacity(rows.len());
        let mut cursor_pos: Option<(u16, u16)> = None;

        for (i, row) in rows.iter().enumerate() {
            let selected = self.focused && i == self.cursor;
            let line = match row {
                SubtaskRow::Blocked => Line::from(Span::styled(
                    NESTING_BLOCKED_NOTICE,
                    Style::default()
                        .fg(Color::DarkGray)
                        .add_modifier(Modifier::ITALIC),
                )),
                SubtaskRow::Existing(view) => {
                    let checkbox = if view.completed { "[x] " } else { "[ ] " };
                    let mut title_style = if view.completed || view.hidden {
                        Style::default().fg(Color::DarkGray)
                    } else {
                        Style::default()
                    };
                    if view.completed {
                        title_style = title_style.add_modifier(Modifier::CROSSED_OUT);
                    }
                    let mut spans = vec![
                        Span::raw("  ".repeat(view.indent)),
                        Span::styled(
                            checkbox,
                            Style::default().fg(priority_color(view.priority, desaturate)),
                        ),
                        Span::styled(view.title.clone(), title_style),
                    ];
                    if view.has_children {
                        let chip = if view.collapsed { " ▸" } else { " ▾" };
                        spans.push(Span::styled(chip, Style::default().fg(Color::Cyan)));
                    }
                    Line::from(spans)
                }
                SubtaskRow::Draft {
                    index,
                    title,
                    completed,
                } => {
                    let checkbox = if *completed { "[x] " } else { "[ ] " };
                    let title_style = if *completed {
                        Style::default()
                            .fg(Color::DarkGray)
                            .add_modifier(Modifier::CROSSED_OUT)
                    } else {
                        Style::default()
                    };
                    if selected {
                        let field_cursor = self.drafts[*index].title.cursor;
                        cursor_pos = Some((
                            area.x + 1 + checkbox.len() as u16 + field_cursor as u16,
                            area.y + 1 + i as u16,
                        ));
                    }
                    Line::from(vec![
                        Span::styled(
                            checkbox,
                            Style::default().fg(priority_color(None, desaturate)),
                        ),
                        Span::styled(title.clone(), title_style),
                    ])
                }
                SubtaskRow::AddPrompt => Line::from(Span::styled(
                    "+ Add subtask",
                    Style::default().fg(Color::DarkGray),
                )),
            };
            let line = if selected && !matches!(row, SubtaskRow::Blocked) {
                line.style(Style::default().bg(Color::Gray).fg(Color::Black))
            } else {
                line
            };
            lines.push(line);
        }

        let block = Block::default().borders(Borders::ALL).title("Subtasks");
        f.render_widget(Paragraph::new(lines).block(block), area);
        if let Some((x, y)) = cursor_pos {
            f.set_cursor_position((x, y));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(id: u64, title: &str, indent: usize) -> SubtaskView {
        SubtaskView {
            id,
            title: title.to_string(),
            completed: false,
            priority: None,
            indent,
            hidden: false,
            collapsed: false,
            has_children: false,
        }
    }

    fn draft(title: &str) -> DraftSubtask {
        DraftSubtask {
            title: InputField::with_value(title),
            completed: false,
        }
    }

    fn synced_filter() -> Filter {
        Filter::Synced {
            remote_id: "remote-1".into(),
        }
    }

    fn blocked_context() -> ParentContext {
        ParentContext::new(
            Some(synced_filter()),
            Some(RemoteLink {
                list_id: "remote-1".into(),
                parent: 7,
            }),
        )
    }

    #[test]
    fn blocked_context_yields_single_disabled_row() {
        let existing = vec![view(1, "A", 0), view(2, "B", 1)];
        let drafts = vec![draft("C")];
        let rows = build_rows(&blocked_context(), &existing, &drafts);
        assert_eq!(rows, vec![SubtaskRow::Blocked]);
    }

    #[test]
    fn remote_top_level_task_is_not_blocked() {
        // parent == 0 means the task sits at the remote list's top level.
        let ctx = ParentContext::new(
            Some(synced_filter()),
            Some(RemoteLink {
                list_id: "remote-1".into(),
                parent: 0,
            }),
        );
        assert!(!ctx.nesting_blocked());
        // A link into a different synced list does not block either.
        let ctx = ParentContext::new(
            Some(synced_filter()),
            Some(RemoteLink {
                list_id: "remote-2".into(),
                parent: 7,
            }),
        );
        assert!(!ctx.nesting_blocked());
    }

    #[test]
    fn row_count_is_existing_plus_drafts_plus_add() {
        let existing = vec![view(1, "A", 0), view(2, "B", 0), view(3, "C", 1)];
        let drafts = vec![draft("x"), draft("")];
        let rows = build_rows(&ParentContext::default(), &existing, &drafts);
        assert_eq!(rows.len(), existing.len() + drafts.len() + 1);
        assert_eq!(rows.last(), Some(&SubtaskRow::AddPrompt));
    }

    #[test]
    fn empty_inputs_degrade_to_add_only() {
        let rows = build_rows(&ParentContext::default(), &[], &[]);
        assert_eq!(rows, vec![SubtaskRow::AddPrompt]);
    }

    #[test]
    fn indent_is_flattened_under_synced_grouping() {
        let existing = vec![view(1, "A", 2)];
        let ctx = ParentContext::new(Some(synced_filter()), None);
        match &build_rows(&ctx, &existing, &[])[0] {
            SubtaskRow::Existing(v) => assert_eq!(v.indent, 0),
            other => panic!("unexpected row {:?}", other),
        }
        // Stored depth is kept for every other grouping.
        let ctx = ParentContext::new(Some(Filter::All), None);
        match &build_rows(&ctx, &existing, &[])[0] {
            SubtaskRow::Existing(v) => assert_eq!(v.indent, 2),
            other => panic!("unexpected row {:?}", other),
        }
    }

    #[test]
    fn ordering_matches_sources() {
        let existing = vec![view(1, "A", 1)];
        let drafts = vec![draft("B")];
        let rows = build_rows(&ParentContext::default(), &existing, &drafts);
        match &rows[0] {
            SubtaskRow::Existing(v) => {
                assert_eq!(v.title, "A");
                assert_eq!(v.indent, 1);
            }
            other => panic!("unexpected row {:?}", other),
        }
        assert_eq!(
            rows[1],
            SubtaskRow::Draft {
                index: 0,
                title: "B".into(),
                completed: false
            }
        );
        assert_eq!(rows[2], SubtaskRow::AddPrompt);
    }

    #[test]
    fn nonblank_submit_chains_a_new_draft() {
        let mut panel = SubtaskPanel::new(ParentContext::default());
        panel.apply_add_draft(0);
        for c in "Buy milk".chars() {
            panel.handle_key(KeyCode::Char(c), KeyModifiers::NONE, &[]);
        }
        let outcome = panel.handle_key(KeyCode::Enter, KeyModifiers::NONE, &[]);
        assert_eq!(outcome, PanelOutcome::Action(SubtaskAction::AddDraft));
        panel.apply_add_draft(0);
        assert_eq!(panel.drafts.len(), 2);
        // Focus lands on the fresh draft.
        assert_eq!(panel.cursor, 1);
        assert_eq!(panel.drafts[0].title.value, "Buy milk");
        assert!(panel.drafts[1].title.value.is_empty());
    }

    #[test]
    fn blank_submit_creates_nothing() {
        let mut panel = SubtaskPanel::new(ParentContext::default());
        panel.apply_add_draft(0);
        panel.handle_key(KeyCode::Char(' '), KeyModifiers::NONE, &[]);
        let outcome = panel.handle_key(KeyCode::Enter, KeyModifiers::NONE, &[]);
        assert_eq!(outcome, PanelOutcome::Handled);
        assert_eq!(panel.drafts.len(), 1);
    }

    #[test]
    fn fold_key_only_acts_on_rows_with_children() {
        let leaf = view(1, "Leaf", 0);
        let mut branch = view(2, "Branch", 0);
        branch.has_children = true;
        let existing = vec![leaf, branch];

        let mut panel = SubtaskPanel::new(ParentContext::default());
        panel.focus_first();
        let outcome = panel.handle_key(KeyCode::Char('z'), KeyModifiers::NONE, &existing);
        assert_eq!(outcome, PanelOutcome::Ignored);

        panel.handle_key(KeyCode::Down, KeyModifiers::NONE, &existing);
        let outcome = panel.handle_key(KeyCode::Char('z'), KeyModifiers::NONE, &existing);
        assert_eq!(
            outcome,
            PanelOutcome::Action(SubtaskAction::SetCollapsed {
                id: 2,
                collapsed: true
            })
        );
    }

    #[test]
    fn space_toggles_existing_completion() {
        let mut done = view(1, "Done", 0);
        done.completed = true;
        let existing = vec![done];
        let mut panel = SubtaskPanel::new(ParentContext::default());
        panel.focus_first();
        let outcome = panel.handle_key(KeyCode::Char(' '), KeyModifiers::NONE, &existing);
        assert_eq!(
            outcome,
            PanelOutcome::Action(SubtaskAction::SetCompleted {
                id: 1,
                completed: false
            })
        );
    }

    #[test]
    fn enter_opens_existing_row() {
        let existing = vec![view(9, "Open me", 0)];
        let mut panel = SubtaskPanel::new(ParentContext::default());
        panel.focus_first();
        let outcome = panel.handle_key(KeyCode::Enter, KeyModifiers::NONE, &existing);
        assert_eq!(outcome, PanelOutcome::Action(SubtaskAction::Open(9)));
    }

    #[test]
    fn draft_controls_delete_and_toggle() {
        let mut panel = SubtaskPanel::new(ParentContext::default());
        panel.apply_add_draft(0);
        let outcome = panel.handle_key(KeyCode::Char('t'), KeyModifiers::CONTROL, &[]);
        assert_eq!(
            outcome,
            PanelOutcome::Action(SubtaskAction::ToggleDraftCompleted(0))
        );
        panel.apply_toggle_draft(0);
        assert!(panel.drafts[0].completed);

        let outcome = panel.handle_key(KeyCode::Char('d'), KeyModifiers::CONTROL, &[]);
        assert_eq!(outcome, PanelOutcome::Action(SubtaskAction::DeleteDraft(0)));
        panel.apply_delete_draft(0, 0);
        assert!(panel.drafts.is_empty());
        assert_eq!(panel.cursor, 0);
    }

    #[test]
    fn up_from_first_row_returns_focus_to_form() {
        let existing = vec![view(1, "A", 0)];
        let mut panel = SubtaskPanel::new(ParentContext::default());
        panel.focus_first();
        let outcome = panel.handle_key(KeyCode::Up, KeyModifiers::NONE, &existing);
        assert_eq!(outcome, PanelOutcome::FocusForm);
        assert!(!panel.focused);
    }

    #[test]
    fn add_prompt_enter_requests_a_draft() {
        let mut panel = SubtaskPanel::new(ParentContext::default());
        panel.focus_first();
        let outcome = panel.handle_key(KeyCode::Enter, KeyModifiers::NONE, &[]);
        assert_eq!(outcome, PanelOutcome::Action(SubtaskAction::AddDraft));
    }

    #[test]
    fn take_drafts_discards_blank_titles() {
        let mut panel = SubtaskPanel::new(ParentContext::default());
        panel.drafts = vec![draft("  "), draft("Keep me"), draft("")];
        panel.drafts[1].completed = true;
        let promoted = panel.take_drafts();
        assert_eq!(promoted, vec![("Keep me".to_string(), true)]);
        assert!(panel.drafts.is_empty());
    }
}
