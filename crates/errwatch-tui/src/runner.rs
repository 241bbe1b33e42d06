// TUI event loop and terminal management
use crate::{App, InputMode};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::time::Duration;
use tracing::info;

/// How long to wait for a key before redrawing, so refresh results and the
/// relative timestamps show up without input
const FRAME_TIMEOUT: Duration = Duration::from_millis(100);

pub async fn run_tui(mut app: App) -> anyhow::Result<()> {
    app.dashboard.start();

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = event_loop(&mut terminal, &mut app);

    // Stop polling before handing the terminal back
    app.dashboard.dispose();

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    info!("Dashboard closed");
    result
}

fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> anyhow::Result<()> {
    loop {
        if app.dashboard.pump() {
            app.clamp_selection();
        }

        terminal.draw(|f| crate::ui::render(f, app))?;

        if event::poll(FRAME_TIMEOUT)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    handle_key(app, key);
                }
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

pub fn handle_key(app: &mut App, key: KeyEvent) {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        app.quit();
        return;
    }

    match app.input_mode {
        InputMode::Searching => match key.code {
            KeyCode::Enter | KeyCode::Esc => {
                app.enter_normal_mode();
            }
            KeyCode::Char(c) => {
                app.push_search_char(c);
            }
            KeyCode::Backspace => {
                app.pop_search_char();
            }
            _ => {}
        },
        InputMode::EditingStart | InputMode::EditingEnd => match key.code {
            KeyCode::Enter => {
                app.save_date_edit();
            }
            KeyCode::Esc => {
                app.clear_error();
                app.cancel_date_edit();
            }
            KeyCode::Char(c) => {
                app.date_input.push(c);
            }
            KeyCode::Backspace => {
                app.date_input.pop();
            }
            _ => {}
        },
        InputMode::Normal => {
            app.clear_error();
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => app.quit(),
                KeyCode::Char('/') => app.enter_search_mode(),
                KeyCode::Char('x') => app.clear_search(),
                KeyCode::Char('s') => app.enter_date_mode(InputMode::EditingStart),
                KeyCode::Char('e') => app.enter_date_mode(InputMode::EditingEnd),
                KeyCode::Char('c') => app.clear_dates(),
                KeyCode::Char('r') | KeyCode::Char('R') => app.request_refresh(),
                KeyCode::Char('j') | KeyCode::Down => app.next_record(),
                KeyCode::Char('k') | KeyCode::Up => app.previous_record(),
                KeyCode::Char('g') | KeyCode::Home => app.first_record(),
                KeyCode::Char('G') | KeyCode::End => app.last_record(),
                KeyCode::Enter => app.toggle_expanded(),
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use errwatch_core::{Dashboard, ErrorSource, FetchedRecords, FilterCriteria, RefreshConfig};
    use std::sync::Arc;

    struct EmptySource;

    #[async_trait::async_trait]
    impl ErrorSource for EmptySource {
        async fn fetch_recent(&self, _limit: u32) -> errwatch_core::Result<FetchedRecords> {
            Ok(FetchedRecords::default())
        }
    }

    fn app() -> App {
        let dashboard = Dashboard::new(
            Arc::new(EmptySource),
            RefreshConfig::default(),
            FilterCriteria::default(),
        );
        App::new(dashboard, "%d/%m/%Y")
    }

    fn press(app: &mut App, code: KeyCode) {
        handle_key(app, KeyEvent::new(code, KeyModifiers::NONE));
    }

    #[test]
    fn test_typing_in_search_mode_does_not_trigger_shortcuts() {
        let mut app = app();
        press(&mut app, KeyCode::Char('/'));
        for c in "qrs".chars() {
            press(&mut app, KeyCode::Char(c));
        }

        assert!(!app.should_quit);
        assert_eq!(app.dashboard.criteria().query, "qrs");

        press(&mut app, KeyCode::Enter);
        assert_eq!(app.input_mode, InputMode::Normal);
        press(&mut app, KeyCode::Char('x'));
        assert_eq!(app.dashboard.criteria().query, "");
    }

    #[test]
    fn test_date_keys() {
        let mut app = app();
        press(&mut app, KeyCode::Char('e'));
        assert_eq!(app.input_mode, InputMode::EditingEnd);
        for c in "2024-05-03".chars() {
            press(&mut app, KeyCode::Char(c));
        }
        press(&mut app, KeyCode::Enter);

        assert_eq!(app.input_mode, InputMode::Normal);
        assert!(app.dashboard.criteria().end.is_some());

        press(&mut app, KeyCode::Char('c'));
        assert!(app.dashboard.criteria().end.is_none());
    }

    #[test]
    fn test_quit_keys() {
        let mut app = app();
        press(&mut app, KeyCode::Char('q'));
        assert!(app.should_quit);

        let mut app = self::app();
        handle_key(&mut app, KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(app.should_quit);
    }

    #[test]
    fn test_refresh_before_start_is_ignored() {
        let mut app = app();
        press(&mut app, KeyCode::Char('r'));
        assert!(!app.dashboard.is_refreshing());
    }
}
