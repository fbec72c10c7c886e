//! Application state and logic

use std::time::{Duration, Instant};

use namesync_core::{LiveStatus, NameRecord, Session, SessionEvent};

/// How long a status message stays visible
const STATUS_TIMEOUT: Duration = Duration::from_secs(3);

/// Input mode for the application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    /// Normal navigation mode
    Normal,
    /// Typing into the add-name field
    Add,
    /// Revising the name of the record in edit mode
    Edit,
}

/// Application state
pub struct App {
    /// The running session (cache, buffers, edit mode)
    pub session: Session,
    /// Whether the app should exit
    pub should_quit: bool,
    /// Current input mode
    pub input_mode: InputMode,
    /// Cursor position (in characters) in the active input
    pub cursor: usize,
    /// Selected row in the sorted list
    pub selected: usize,
    /// Status message to display temporarily
    pub status_message: Option<String>,
    /// When the status message was set (for auto-dismiss)
    pub status_message_time: Option<Instant>,
    /// Whether help overlay is visible
    pub show_help: bool,
}

impl App {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            should_quit: false,
            input_mode: InputMode::Normal,
            cursor: 0,
            selected: 0,
            status_message: None,
            status_message_time: None,
            show_help: false,
        }
    }

    /// Records in display order
    pub fn records(&self) -> Vec<&NameRecord> {
        self.session.state().sorted()
    }

    /// Currently selected record
    pub fn selected_record(&self) -> Option<&NameRecord> {
        self.records().get(self.selected).copied()
    }

    pub fn live_status(&self) -> LiveStatus {
        self.session.live_status()
    }

    /// Apply a session event and keep the view consistent with it
    pub fn handle_session_event(&mut self, event: SessionEvent) {
        self.session.handle(event);
        self.clamp_selection();

        // A successful save ends edit mode in the state
        if self.input_mode == InputMode::Edit && self.session.state().editing_id().is_none() {
            self.input_mode = InputMode::Normal;
            self.cursor = 0;
        }
    }

    fn clamp_selection(&mut self) {
        let len = self.session.state().cache().len();
        self.selected = self.selected.min(len.saturating_sub(1));
    }

    /// Set a status message (will auto-dismiss after 3 seconds)
    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some(message.into());
        self.status_message_time = Some(Instant::now());
    }

    /// Check and clear expired status message
    pub fn check_status_timeout(&mut self) {
        if let Some(time) = self.status_message_time {
            if time.elapsed() > STATUS_TIMEOUT {
                self.status_message = None;
                self.status_message_time = None;
            }
        }
    }

    /// Toggle help overlay
    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    pub fn move_up(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn move_down(&mut self) {
        let len = self.session.state().cache().len();
        if self.selected + 1 < len {
            self.selected += 1;
        }
    }

    /// Focus the add-name field, keeping whatever was typed before
    pub fn enter_add_mode(&mut self) {
        self.input_mode = InputMode::Add;
        self.cursor = self.session.state().pending_submission().chars().count();
    }

    /// Put the selected record into edit mode
    pub fn edit_selected(&mut self) {
        let Some(id) = self.selected_record().map(|r| r.id.clone()) else {
            self.set_status("Nothing to edit");
            return;
        };
        if self.session.start_edit(&id) {
            self.input_mode = InputMode::Edit;
            self.cursor = self.session.state().draft().chars().count();
        }
    }

    /// Text of the active input field
    pub fn current_input(&self) -> &str {
        match self.input_mode {
            InputMode::Add => self.session.state().pending_submission(),
            InputMode::Edit => self.session.state().draft(),
            InputMode::Normal => "",
        }
    }

    /// Replace the active input field; the field's error is cleared
    fn set_input(&mut self, text: String) {
        match self.input_mode {
            InputMode::Add => self.session.set_pending_submission(text),
            InputMode::Edit => self.session.set_draft(text),
            InputMode::Normal => {}
        }
    }

    /// Insert character at cursor
    pub fn insert_char(&mut self, c: char) {
        let mut chars: Vec<char> = self.current_input().chars().collect();
        let at = self.cursor.min(chars.len());
        chars.insert(at, c);
        self.cursor = at + 1;
        self.set_input(chars.into_iter().collect());
    }

    /// Delete character before cursor
    pub fn delete_char(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let mut chars: Vec<char> = self.current_input().chars().collect();
        if self.cursor > chars.len() {
            self.cursor = chars.len();
            return;
        }
        self.cursor -= 1;
        chars.remove(self.cursor);
        self.set_input(chars.into_iter().collect());
    }

    /// Move cursor left
    pub fn cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    /// Move cursor right
    pub fn cursor_right(&mut self) {
        if self.cursor < self.current_input().chars().count() {
            self.cursor += 1;
        }
    }

    /// Enter in an input field: submit the name or save the edit
    ///
    /// The field stays focused; a failed validation shows its error in place.
    pub fn confirm_input(&mut self) {
        match self.input_mode {
            InputMode::Add => {
                if self.session.submit() {
                    self.set_status("Sending...");
                }
            }
            InputMode::Edit => {
                if self.session.save_edit() {
                    self.set_status("Saving...");
                } else if self.session.state().editing_record().is_none() {
                    self.set_status("This name is no longer on the server");
                }
            }
            InputMode::Normal => {}
        }
    }

    /// Esc in an input field: leave it, abandoning any edit
    pub fn cancel_input(&mut self) {
        if self.input_mode == InputMode::Edit {
            self.session.cancel_edit();
        }
        self.input_mode = InputMode::Normal;
        self.cursor = 0;
    }

    pub fn refresh(&mut self) {
        self.session.refresh();
        self.set_status("Refreshing...");
    }

    pub fn delete_all(&mut self) {
        self.session.delete_all();
        self.set_status("Deleting all names...");
    }

    pub fn fetch_greeting(&mut self) {
        self.session.fetch_greeting();
    }

    pub fn cycle_sort(&mut self) {
        let mode = self.session.cycle_sort_mode();
        self.selected = 0;
        self.set_status(format!("Sort: {}", mode.label()));
    }
}
