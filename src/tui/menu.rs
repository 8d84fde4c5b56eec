//! Main menu for picking and managing task lists.
//!
//! This module provides a terminal-based menu for opening a list (or the
//! all-tasks view), creating local lists, linking synced lists and deleting
//! lists.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode};
use ratatui::{
    backend::Backend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame, Terminal,
};

use crate::db::Database;
use crate::list::{Filter, TaskList};
use crate::tui::utils::centered_rect;

/// Main menu application state.
pub struct MenuApp {
    db_path: PathBuf,
    db: Database,
    state: MenuState,
    list_state: ListState,
    menu_items: Vec<String>,
    input_buffer: String,
    status_message: String,
    should_exit: bool,
    selected_filter: Option<Filter>,
    list_to_delete: Option<String>,
}

#[derive(Debug, Clone)]
enum MenuState {
    MainMenu,
    ListPicker,
    NewList,
    LinkList,
    DeleteListPicker,
    DeleteConfirmation,
    About,
}

impl MenuApp {
    /// Create a new menu application.
    pub fn new(db_path: PathBuf) -> io::Result<Self> {
        let db = Database::load(&db_path);
        let menu_items = vec![
            "Open List".to_string(),
            "All Tasks".to_string(),
            "New List".to_string(),
            "Link Synced List".to_string(),
            "Delete List".to_string(),
            "About".to_string(),
            "Exit".to_string(),
        ];
        let mut app = MenuApp {
            db_path,
            db,
            state: MenuState::MainMenu,
            list_state: ListState::default(),
            menu_items,
            input_buffer: String::new(),
            status_message: String::new(),
            should_exit: false,
            selected_filter: None,
            list_to_delete: None,
        };
        app.list_state.select(Some(0));
        Ok(app)
    }

    /// Get the filter chosen by the user, if any.
    pub fn selected_filter(&self) -> Option<&Filter> {
        self.selected_filter.as_ref()
    }

    fn save_db(&mut self) {
        if let Err(e) = self.db.save(&self.db_path) {
            self.status_message = format!("Error saving: {}", e);
        }
    }

    /// Handle keyboard input based on current state.
    fn handle_input(&mut self) -> io::Result<()> {
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                self.status_message.clear();
                match self.state {
                    MenuState::MainMenu => self.handle_main_menu_input(key.code),
                    MenuState::ListPicker => self.handle_list_picker_input(key.code, false),
                    MenuState::NewList => self.handle_text_input(key.code, false),
                    MenuState::LinkList => self.handle_text_input(key.code, true),
                    MenuState::DeleteListPicker => self.handle_list_picker_input(key.code, true),
                    MenuState::DeleteConfirmation => self.handle_delete_confirmation_input(key.code),
                    MenuState::About => self.handle_about_input(key.code),
                }
            }
        }
        Ok(())
    }

    fn move_selection(&mut self, down: bool, len: usize) {
        if let Some(selected) = self.list_state.selected() {
            if down && selected + 1 < len {
                self.list_state.select(Some(selected + 1));
            } else if !down && selected > 0 {
                self.list_state.select(Some(selected - 1));
            }
        }
    }

    /// Handle input for the main menu state.
    fn handle_main_menu_input(&mut self, key: KeyCode) {
        match key {
            KeyCode::Up => self.move_selection(false, self.menu_items.len()),
            KeyCode::Down => self.move_selection(true, self.menu_items.len()),
            KeyCode::Enter => {
                if let Some(selected) = self.list_state.selected() {
                    match selected {
                        0 => {
                            if self.db.lists.is_empty() {
                                self.status_message =
                                    "No lists yet. Create a new list first.".to_string();
                            } else {
                                self.state = MenuState::ListPicker;
                                self.list_state.select(Some(0));
                            }
                        }
                        1 => {
                            self.selected_filter = Some(Filter::All);
                            self.should_exit = true;
                        }
                        2 => {
                            self.state = MenuState::NewList;
                            self.input_buffer.clear();
                        }
                        3 => {
                            self.state = MenuState::LinkList;
                            self.input_buffer.clear();
                        }
                        4 => {
                            if self.db.lists.is_empty() {
                                self.status_message = "No lists to delete.".to_string();
                            } else {
                                self.state = MenuState::DeleteListPicker;
                                self.list_state.select(Some(0));
                            }
                        }
                        5 => {
                            self.state = MenuState::About;
                        }
                        6 => {
                            self.should_exit = true;
                        }
                        _ => {}
                    }
                }
            }
            KeyCode::Esc | KeyCode::Char('q') => {
                self.should_exit = true;
            }
            _ => {}
        }
    }

    /// Handle input for the list picker, in open or delete mode.
    fn handle_list_picker_input(&mut self, key: KeyCode, for_delete: bool) {
        match key {
            KeyCode::Up => self.move_selection(false, self.db.lists.len()),
            KeyCode::Down => self.move_selection(true, self.db.lists.len()),
            KeyCode::Enter => {
                if let Some(selected) = self.list_state.selected() {
                    if let Some(list) = self.db.lists.get(selected) {
                        if for_delete {
                            self.list_to_delete = Some(list.name.clone());
                            self.state = MenuState::DeleteConfirmation;
                        } else {
                            self.selected_filter = Some(Filter::for_list(list));
                            self.should_exit = true;
                        }
                    }
                }
            }
            KeyCode::Esc => {
                self.state = MenuState::MainMenu;
                self.list_state.select(Some(0));
            }
            _ => {}
        }
    }

    /// Handle text entry for the new-list and link-list dialogs.
    ///
    /// Link input format: `<remote-id> <display name>`.
    fn handle_text_input(&mut self, key: KeyCode, linking: bool) {
        match key {
            KeyCode::Esc => {
                self.state = MenuState::MainMenu;
                self.input_buffer.clear();
                self.list_state.select(Some(0));
            }
            KeyCode::Enter => {
                let input = self.input_buffer.trim().to_string();
                if input.is_empty() {
                    return;
                }
                let list = if linking {
                    match input.split_once(char::is_whitespace) {
                        Some((remote_id, name)) if !name.trim().is_empty() => {
                            TaskList::synced(name.trim(), remote_id)
                        }
                        _ => {
                            self.status_message =
                                "Format: <remote-id> <display name>".to_string();
                            return;
                        }
                    }
                } else {
                    TaskList::new(&input)
                };
                if self.db.find_list(&list.name).is_some() {
                    self.status_message = format!("List '{}' already exists", list.display_name);
                    return;
                }
                self.selected_filter = Some(Filter::for_list(&list));
                self.db.lists.push(list);
                self.save_db();
                self.should_exit = true;
            }
            KeyCode::Backspace => {
                self.input_buffer.pop();
            }
            KeyCode::Char(c) => {
                self.input_buffer.push(c);
            }
            _ => {}
        }
    }

    /// Handle input for the delete confirmation dialog.
    fn handle_delete_confirmation_input(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char('y') | KeyCode::Char('Y') => {
                if let Some(name) = self.list_to_delete.take() {
                    self.db.lists.retain(|l| l.name != name);
                    // Tasks survive; they just lose their list assignment.
                    for t in self.db.tasks.iter_mut() {
                        if t.list.as_deref() == Some(name.as_str()) {
                            t.list = None;
                        }
                    }
                    self.save_db();
                    self.status_message = format!("List '{}' deleted.", name);
                }
                self.state = MenuState::MainMenu;
                self.list_state.select(Some(0));
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                self.list_to_delete = None;
                self.state = MenuState::MainMenu;
                self.list_state.select(Some(0));
            }
            _ => {}
        }
    }

    fn handle_about_input(&mut self, key: KeyCode) {
        match key {
            KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q') => {
                self.state = MenuState::MainMenu;
                self.list_state.select(Some(0));
            }
            _ => {}
        }
    }

    /// Main render function that dispatches to state-specific renderers.
    fn render(&mut self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(1)].as_ref())
            .split(f.area());

        match self.state {
            MenuState::MainMenu => self.render_main_menu(f, chunks[0]),
            MenuState::ListPicker => self.render_list_picker(f, chunks[0], "Select List"),
            MenuState::NewList => self.render_text_dialog(f, chunks[0], "New List", "List name:"),
            MenuState::LinkList => self.render_text_dialog(
                f,
                chunks[0],
                "Link Synced List",
                "Remote id and name:",
            ),
            MenuState::DeleteListPicker => {
                self.render_list_picker(f, chunks[0], "Select List to Delete")
            }
            MenuState::DeleteConfirmation => self.render_delete_confirmation(f, chunks[0]),
            MenuState::About => self.render_about(f, chunks[0]),
        }

        self.render_status_bar(f, chunks[1]);
    }

    /// Render the main menu.
    fn render_main_menu(&mut self, f: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(0)])
            .split(area);

        let header_text = vec![Line::from(vec![Span::styled(
            "TASKTREE",
            Style::default().add_modifier(Modifier::BOLD),
        )])];
        let header = Paragraph::new(header_text)
            .block(Block::default().borders(Borders::ALL))
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::White));
        f.render_widget(header, chunks[0]);

        let menu_items: Vec<ListItem> = self
            .menu_items
            .iter()
            .map(|item| ListItem::new(Line::from(format!("  {}", item))))
            .collect();
        let menu = List::new(menu_items)
            .block(Block::default().borders(Borders::ALL).title("Menu"))
            .highlight_style(Style::default().bg(Color::Gray).fg(Color::Black))
            .highlight_symbol("► ");
        f.render_stateful_widget(menu, chunks[1], &mut self.list_state);
    }

    /// Render the list picker.
    fn render_list_picker(&mut self, f: &mut Frame, area: Rect, title: &str) {
        let items: Vec<ListItem> = self
            .db
            .lists
            .iter()
            .map(|list| {
                let line = if list.is_synced() {
                    Line::from(format!("  {} (synced)", list.display_name))
                } else {
                    Line::from(format!("  {}", list.display_name))
                };
                ListItem::new(line)
            })
            .collect();
        let lists = List::new(items)
            .block(Block::default().borders(Borders::ALL).title(title.to_string()))
            .highlight_style(Style::default().bg(Color::Gray).fg(Color::Black))
            .highlight_symbol("► ");
        f.render_stateful_widget(lists, area, &mut self.list_state);
    }

    /// Render a single-field text dialog.
    fn render_text_dialog(&mut self, f: &mut Frame, area: Rect, title: &str, prompt: &str) {
        let area = centered_rect(60, 30, area);
        f.render_widget(Clear, area);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Length(3), Constraint::Min(0)])
            .split(area);

        let instructions = Paragraph::new(prompt.to_string())
            .block(Block::default().borders(Borders::ALL).title(title.to_string()))
            .alignment(Alignment::Left);
        f.render_widget(instructions, chunks[0]);

        let input = Paragraph::new(self.input_buffer.as_str()).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Yellow)),
        );
        f.render_widget(input, chunks[1]);

        f.set_cursor_position((
            chunks[1].x + self.input_buffer.len() as u16 + 1,
            chunks[1].y + 1,
        ));
    }

    /// Render the about screen.
    fn render_about(&mut self, f: &mut Frame, area: Rect) {
        let about_text = vec![
            Line::from(""),
            Line::from(vec![Span::styled(
                "tasktree",
                Style::default().add_modifier(Modifier::BOLD),
            )]),
            Line::from(""),
            Line::from("A file-backed to-do manager with nested subtasks,"),
            Line::from("synced-list awareness and a terminal UI."),
            Line::from(""),
            Line::from(concat!("Version: ", env!("CARGO_PKG_VERSION"))),
            Line::from(""),
            Line::from("Press any key to return to the menu"),
        ];
        let about = Paragraph::new(about_text)
            .block(Block::default().borders(Borders::ALL).title("About"))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        f.render_widget(about, area);
    }

    /// Render the delete confirmation dialog.
    fn render_delete_confirmation(&mut self, f: &mut Frame, area: Rect) {
        let area = centered_rect(70, 40, area);
        f.render_widget(Clear, area);

        let display_name = self
            .list_to_delete
            .as_ref()
            .and_then(|name| self.db.find_list(name))
            .map(|l| l.display_name.clone())
            .unwrap_or_else(|| "Unknown".to_string());

        let confirmation_text = vec![
            Line::from(""),
            Line::from(vec![Span::styled(
                "Are you sure?",
                Style::default().add_modifier(Modifier::BOLD).fg(Color::Red),
            )]),
            Line::from(""),
            Line::from(format!("This will delete the list: {}", display_name)),
            Line::from("Its tasks are kept and moved out of the list."),
            Line::from(""),
            Line::from("Press Y to confirm deletion, N or Esc to cancel"),
        ];
        let confirmation = Paragraph::new(confirmation_text)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("Delete List")
                    .border_style(Style::default().fg(Color::Red)),
            )
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        f.render_widget(confirmation, area);
    }

    /// Render the status bar with context-appropriate help text.
    fn render_status_bar(&mut self, f: &mut Frame, area: Rect) {
        let status_text = if !self.status_message.is_empty() {
            self.status_message.clone()
        } else {
            match self.state {
                MenuState::MainMenu => {
                    "Use ↑↓ to navigate, Enter to select, q/Esc to quit".to_string()
                }
                MenuState::ListPicker | MenuState::DeleteListPicker => {
                    "Use ↑↓ to navigate, Enter to select, Esc to go back".to_string()
                }
                MenuState::NewList => "Type list name, Enter to create, Esc to cancel".to_string(),
                MenuState::LinkList => {
                    "Type <remote-id> <name>, Enter to link, Esc to cancel".to_string()
                }
                MenuState::DeleteConfirmation => "Press Y to confirm, N or Esc to cancel".to_string(),
                MenuState::About => "Press any key to return".to_string(),
            }
        };
        let status = Paragraph::new(status_text)
            .style(Style::default().bg(Color::Blue).fg(Color::White))
            .alignment(Alignment::Left);
        f.render_widget(status, area);
    }

    /// Main event loop for the menu application.
    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()> {
        loop {
            terminal.draw(|f| self.render(f))?;
            self.handle_input()?;
            if self.should_exit {
                break;
            }
        }
        Ok(())
    }
}
