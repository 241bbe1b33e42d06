// TUI application state and event handling
use errwatch_core::{time::parse_day_as, Dashboard, ErrorRecord, RecordId};
use ratatui::widgets::TableState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,      // Navigating records
    Searching,   // Typing in the search box, filter applies as you type
    EditingStart, // Typing the first day of the range
    EditingEnd,   // Typing the last day of the range
}

pub struct App {
    pub dashboard: Dashboard,
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub search_input: String,
    pub date_input: String,
    pub selected_index: usize,
    pub table_state: TableState,
    /// Record whose detail panel is open
    pub expanded: Option<RecordId>,
    pub error_message: Option<String>,
    /// chrono format for dates shown and typed by the operator
    pub date_format: String,
}

impl App {
    pub fn new(dashboard: Dashboard, date_format: impl Into<String>) -> Self {
        let mut table_state = TableState::default();
        table_state.select(Some(0));
        let search_input = dashboard.criteria().query.clone();

        Self {
            dashboard,
            should_quit: false,
            input_mode: InputMode::Normal,
            search_input,
            date_input: String::new(),
            selected_index: 0,
            table_state,
            expanded: None,
            error_message: None,
            date_format: date_format.into(),
        }
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    pub fn enter_search_mode(&mut self) {
        self.search_input = self.dashboard.criteria().query.clone();
        self.input_mode = InputMode::Searching;
    }

    pub fn enter_normal_mode(&mut self) {
        self.input_mode = InputMode::Normal;
    }

    pub fn push_search_char(&mut self, c: char) {
        self.search_input.push(c);
        self.apply_search();
    }

    pub fn pop_search_char(&mut self) {
        self.search_input.pop();
        self.apply_search();
    }

    pub fn clear_search(&mut self) {
        self.search_input.clear();
        self.apply_search();
    }

    fn apply_search(&mut self) {
        self.dashboard.set_query(self.search_input.clone());
        self.reset_selection();
    }

    /// Start typing a range bound, prefilled with the current one
    pub fn enter_date_mode(&mut self, mode: InputMode) {
        let current = match mode {
            InputMode::EditingStart => self.dashboard.criteria().start,
            InputMode::EditingEnd => self.dashboard.criteria().end,
            _ => return,
        };
        self.date_input = current
            .map(|d| d.format(&self.date_format).to_string())
            .unwrap_or_default();
        self.input_mode = mode;
    }

    /// Commit the typed bound. An empty input clears it.
    pub fn save_date_edit(&mut self) {
        let input = self.date_input.trim();
        let day = if input.is_empty() {
            None
        } else {
            match parse_day_as(input, &self.date_format) {
                Some(day) => Some(day),
                None => {
                    self.error_message = Some(format!("Not a date: {}", input));
                    return;
                }
            }
        };

        match self.input_mode {
            InputMode::EditingStart => self.dashboard.set_start(day),
            InputMode::EditingEnd => self.dashboard.set_end(day),
            _ => {}
        }

        self.date_input.clear();
        self.error_message = None;
        self.input_mode = InputMode::Normal;
        self.reset_selection();
    }

    pub fn cancel_date_edit(&mut self) {
        self.date_input.clear();
        self.input_mode = InputMode::Normal;
    }

    pub fn clear_dates(&mut self) {
        self.dashboard.clear_dates();
        self.reset_selection();
    }

    pub fn request_refresh(&mut self) {
        if self.dashboard.manual_refresh() {
            self.clear_error();
        }
    }

    pub fn next_record(&mut self) {
        let len = self.dashboard.records().len();
        if len > 0 {
            self.selected_index = (self.selected_index + 1).min(len - 1);
            self.table_state.select(Some(self.selected_index));
        }
    }

    pub fn previous_record(&mut self) {
        if self.selected_index > 0 {
            self.selected_index -= 1;
            self.table_state.select(Some(self.selected_index));
        }
    }

    pub fn first_record(&mut self) {
        self.reset_selection();
    }

    pub fn last_record(&mut self) {
        let len = self.dashboard.records().len();
        self.selected_index = len.saturating_sub(1);
        self.table_state.select(Some(self.selected_index));
    }

    pub fn selected_record(&self) -> Option<&ErrorRecord> {
        self.dashboard.records().get(self.selected_index)
    }

    /// Open or close the detail panel for the selected record
    pub fn toggle_expanded(&mut self) {
        let Some(id) = self.selected_record().map(|r| r.id.clone()) else {
            return;
        };
        self.expanded = if self.expanded.as_ref() == Some(&id) {
            None
        } else {
            Some(id)
        };
    }

    /// The expanded record, if it is still in the active view
    pub fn expanded_record(&self) -> Option<&ErrorRecord> {
        let id = self.expanded.as_ref()?;
        self.dashboard.records().iter().find(|r| &r.id == id)
    }

    /// Keep the selection inside the view after it changed underneath us
    pub fn clamp_selection(&mut self) {
        let len = self.dashboard.records().len();
        if self.selected_index >= len {
            self.selected_index = len.saturating_sub(1);
        }
        self.table_state.select(Some(self.selected_index));
    }

    pub fn clear_error(&mut self) {
        self.error_message = None;
    }

    fn reset_selection(&mut self) {
        self.selected_index = 0;
        self.table_state.select(Some(0));
    }
}
