// Terminal dashboard for the error log, built on ratatui

pub mod app;
pub mod runner;
pub mod sparkline;
pub mod ui;

pub use app::{App, InputMode};
pub use runner::run_tui;
