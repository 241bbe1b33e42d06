// UI rendering logic
use crate::sparkline::{daily_sparkline, share_bar};
use crate::{App, InputMode};
use chrono::Utc;
use errwatch_core::{time::format_time_from_now, ColorToken, ErrorRecord, LoadState, SourceGroup};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, Wrap},
    Frame,
};

pub fn render(frame: &mut Frame, app: &mut App) {
    let show_banner = app.dashboard.is_filtered() || app.dashboard.criteria().is_active();
    let show_detail = app.expanded_record().is_some();

    let mut constraints = vec![
        Constraint::Length(3), // Header
        Constraint::Length(3), // Search and date inputs
    ];
    if show_banner {
        constraints.push(Constraint::Length(1));
    }
    constraints.push(Constraint::Min(8)); // Body
    constraints.push(Constraint::Length(1)); // Status bar

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(frame.area());

    render_header(frame, app, chunks[0]);
    render_inputs(frame, app, chunks[1]);

    let mut next = 2;
    if show_banner {
        render_filter_banner(frame, app, chunks[next]);
        next += 1;
    }
    let body = chunks[next];
    let status_area = chunks[next + 1];

    match app.dashboard.state().clone() {
        LoadState::Loading => render_loading(frame, body),
        LoadState::Failed { reason } => render_failed(frame, &reason, body),
        LoadState::Ready => render_dashboard(frame, app, body, show_detail),
    }

    render_status_bar(frame, app, status_area);
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let header_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(25),
            Constraint::Percentage(40),
            Constraint::Percentage(35),
        ])
        .split(area);

    let logo = Paragraph::new(Line::from(vec![Span::styled(
        "errwatch",
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    )]))
    .block(Block::default().borders(Borders::ALL));
    frame.render_widget(logo, header_chunks[0]);

    let state = app.dashboard.state();
    let state_color = match state {
        LoadState::Loading => Color::Yellow,
        LoadState::Ready => Color::Green,
        LoadState::Failed { .. } => Color::Red,
    };
    let mut state_spans = vec![Span::styled(
        format!(" {} ", state.label()),
        Style::default()
            .fg(Color::Black)
            .bg(state_color)
            .add_modifier(Modifier::BOLD),
    )];
    if app.dashboard.is_refreshing() {
        state_spans.push(Span::raw(" "));
        state_spans.push(Span::styled(
            "⟳ Refreshing...",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ));
    }
    let state_widget = Paragraph::new(Line::from(state_spans))
        .block(Block::default().borders(Borders::ALL))
        .alignment(Alignment::Center);
    frame.render_widget(state_widget, header_chunks[1]);

    let updated = match app.dashboard.last_refreshed() {
        Some(at) => format!("Updated {}", format_time_from_now(at, Utc::now())),
        None => "Never updated".to_string(),
    };
    let mut right = vec![Span::styled(updated, Style::default().fg(Color::Gray))];
    if let Some(origin) = app.dashboard.snapshot().origin() {
        right.push(Span::styled(
            format!(" ({})", origin),
            Style::default().fg(Color::DarkGray),
        ));
    }
    let right_widget = Paragraph::new(Line::from(right))
        .block(Block::default().borders(Borders::ALL))
        .alignment(Alignment::Right);
    frame.render_widget(right_widget, header_chunks[2]);
}

fn render_inputs(frame: &mut Frame, app: &App, area: Rect) {
    let input_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(60),
            Constraint::Percentage(20),
            Constraint::Percentage(20),
        ])
        .split(area);

    let active = Style::default().fg(Color::Yellow);
    let idle = Style::default();

    let search_text = if app.input_mode == InputMode::Searching {
        format!("{}█", app.search_input)
    } else {
        app.dashboard.criteria().query.clone()
    };
    let search = Paragraph::new(search_text)
        .style(if app.input_mode == InputMode::Searching { active } else { idle })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Search type, node or message (/) "),
        );
    frame.render_widget(search, input_chunks[0]);

    let date_box = |mode: InputMode, title: &'static str, value: Option<chrono::NaiveDate>| {
        let text = if app.input_mode == mode {
            format!("{}█", app.date_input)
        } else {
            value
                .map(|d| d.format(&app.date_format).to_string())
                .unwrap_or_else(|| "-".to_string())
        };
        Paragraph::new(text)
            .style(if app.input_mode == mode { active } else { idle })
            .block(Block::default().borders(Borders::ALL).title(title))
    };

    let criteria = app.dashboard.criteria();
    frame.render_widget(
        date_box(InputMode::EditingStart, " From (s) ", criteria.start),
        input_chunks[1],
    );
    frame.render_widget(
        date_box(InputMode::EditingEnd, " To (e) ", criteria.end),
        input_chunks[2],
    );
}

fn render_filter_banner(frame: &mut Frame, app: &App, area: Rect) {
    let criteria = app.dashboard.criteria();
    let mut spans = vec![Span::styled(
        format!(
            " Showing {} of {} records",
            app.dashboard.records().len(),
            app.dashboard.total_records()
        ),
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
    )];

    if !criteria.query.is_empty() {
        spans.push(Span::raw(format!(" | matching \"{}\"", criteria.query)));
    }
    if let Some(dates) = criteria.describe_dates(&app.date_format) {
        spans.push(Span::raw(format!(" | {}", dates)));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_loading(frame: &mut Frame, area: Rect) {
    let loading_text = vec![
        Line::from(""),
        Line::from(vec![Span::styled(
            "Loading error logs...",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )]),
    ];
    let paragraph = Paragraph::new(loading_text)
        .block(Block::default().borders(Borders::ALL))
        .alignment(Alignment::Center);
    frame.render_widget(paragraph, area);
}

fn render_failed(frame: &mut Frame, reason: &str, area: Rect) {
    let lines = vec![
        Line::from(""),
        Line::from(vec![Span::styled(
            "Could not load error logs",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )]),
        Line::from(""),
        Line::from(Span::styled(reason.to_string(), Style::default().fg(Color::Gray))),
        Line::from(""),
        Line::from(Span::styled(
            "Press r to try again",
            Style::default().fg(Color::DarkGray),
        )),
    ];
    let paragraph = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(" Error "))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

fn render_dashboard(frame: &mut Frame, app: &mut App, area: Rect, show_detail: bool) {
    let mut constraints = vec![
        Constraint::Length(4), // Stat cards
        Constraint::Length(6), // Daily trend and source shares
        Constraint::Min(5),    // Records table
    ];
    if show_detail {
        constraints.push(Constraint::Length(8));
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    render_stat_cards(frame, app, chunks[0]);

    let chart_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(chunks[1]);
    render_daily_trend(frame, app, chart_chunks[0]);
    render_source_shares(frame, app, chart_chunks[1]);

    render_records_table(frame, app, chunks[2]);

    if show_detail {
        if let Some(record) = app.expanded_record() {
            render_detail(frame, app, record, chunks[3]);
        }
    }
}

fn render_stat_cards(frame: &mut Frame, app: &App, area: Rect) {
    let stats = app.dashboard.statistics();
    let card_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(34),
            Constraint::Percentage(33),
            Constraint::Percentage(33),
        ])
        .split(area);

    let suffix = if app.dashboard.is_filtered() { " (filtered)" } else { "" };
    let cards = [
        ("Total Errors", stats.total, Color::Red),
        ("Affected Nodes", stats.unique_node_count, Color::Cyan),
        ("Error Types", stats.unique_category_count, Color::Magenta),
    ];

    for ((title, value, color), chunk) in cards.into_iter().zip(card_chunks.iter()) {
        let card = Paragraph::new(vec![Line::from(Span::styled(
            value.to_string(),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ))])
        .block(Block::default().borders(Borders::ALL).title(format!(" {}{} ", title, suffix)))
        .alignment(Alignment::Center);
        frame.render_widget(card, *chunk);
    }
}

fn render_daily_trend(frame: &mut Frame, app: &App, area: Rect) {
    let stats = app.dashboard.statistics();
    let width = (area.width.saturating_sub(2) as usize).max(1);

    let lines = if stats.daily_buckets.is_empty() {
        vec![Line::from(Span::styled(
            "No errors in view",
            Style::default().fg(Color::DarkGray),
        ))]
    } else {
        let first = stats.daily_buckets.len().saturating_sub(width);
        let mut lines = vec![
            Line::from(Span::styled(
                daily_sparkline(&stats.daily_buckets, width),
                Style::default().fg(Color::Red),
            )),
            Line::from(Span::styled(
                format!(
                    "{} .. {}",
                    stats.daily_buckets[first].day_key,
                    stats.daily_buckets[stats.daily_buckets.len() - 1].day_key
                ),
                Style::default().fg(Color::DarkGray),
            )),
        ];
        if let Some(peak) = stats.peak_day() {
            lines.push(Line::from(vec![
                Span::raw("Peak: "),
                Span::styled(
                    format!("{} errors on {}", peak.count, peak.day_key),
                    Style::default().fg(Color::Yellow),
                ),
            ]));
        }
        lines
    };

    let widget = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Errors per day "),
    );
    frame.render_widget(widget, area);
}

fn render_source_shares(frame: &mut Frame, app: &App, area: Rect) {
    let stats = app.dashboard.statistics();
    let bar_width = area.width.saturating_sub(22).max(4) as usize;

    let lines: Vec<Line> = if stats.source_buckets.is_empty() {
        vec![Line::from(Span::styled(
            "No errors in view",
            Style::default().fg(Color::DarkGray),
        ))]
    } else {
        stats
            .source_buckets
            .iter()
            .map(|bucket| {
                let percent = bucket.percent_of(stats.total);
                Line::from(vec![
                    Span::styled(
                        format!("{:<6}", bucket.source_key),
                        Style::default().add_modifier(Modifier::BOLD),
                    ),
                    Span::styled(
                        share_bar(percent, bar_width),
                        Style::default().fg(source_color(bucket.group)),
                    ),
                    Span::raw(format!(" {:>4} {:>5.1}%", bucket.count, percent)),
                ])
            })
            .collect()
    };

    let widget = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(" Sources "));
    frame.render_widget(widget, area);
}

fn render_records_table(frame: &mut Frame, app: &mut App, area: Rect) {
    let offset = app.dashboard.criteria().offset;
    let now = Utc::now();
    let time_format = format!("{} %H:%M:%S", app.date_format);

    let rows: Vec<Row> = app
        .dashboard
        .records()
        .iter()
        .map(|record| {
            let assignment = record.category();
            let local = record.created_at.with_timezone(&offset);
            Row::new(vec![
                Cell::from(local.format(&time_format).to_string()),
                Cell::from(format_time_from_now(record.created_at, now))
                    .style(Style::default().fg(Color::DarkGray)),
                Cell::from(assignment.display_label)
                    .style(Style::default().fg(token_color(assignment.color))),
                Cell::from(record.node_display().to_string()),
                Cell::from(first_line(record.message_display()).to_string()),
            ])
        })
        .collect();

    let empty = rows.is_empty();
    let title = format!(" Error log ({}) ", app.dashboard.records().len());

    let header = Row::new(vec!["Time", "When", "Type", "Node", "Message"])
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD));

    let table = Table::new(
        rows,
        [
            Constraint::Length(20),
            Constraint::Length(16),
            Constraint::Length(22),
            Constraint::Length(14),
            Constraint::Min(10),
        ],
    )
    .header(header)
    .block(Block::default().borders(Borders::ALL).title(title.clone()))
    .row_highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
    .highlight_symbol("▶ ");

    if empty {
        let message = if app.dashboard.total_records() == 0 {
            "No errors recorded"
        } else {
            "No records match the current filters"
        };
        let paragraph = Paragraph::new(message)
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title(title));
        frame.render_widget(paragraph, area);
        return;
    }

    frame.render_stateful_widget(table, area, &mut app.table_state);
}

fn render_detail(frame: &mut Frame, app: &App, record: &ErrorRecord, area: Rect) {
    let assignment = record.category();
    let offset = app.dashboard.criteria().offset;
    let local = record.created_at.with_timezone(&offset);
    let label = Style::default().fg(Color::Gray);

    let lines = vec![
        Line::from(vec![
            Span::styled("Id:       ", label),
            Span::raw(record.id.to_string()),
        ]),
        Line::from(vec![
            Span::styled("Time:     ", label),
            Span::raw(local.format(&format!("{} %H:%M:%S %:z", app.date_format)).to_string()),
        ]),
        Line::from(vec![
            Span::styled("Type:     ", label),
            Span::styled(
                assignment.display_label,
                Style::default().fg(token_color(assignment.color)),
            ),
            Span::styled(
                format!("  [{}]", assignment.category.name()),
                Style::default().fg(Color::DarkGray),
            ),
        ]),
        Line::from(vec![
            Span::styled("Node:     ", label),
            Span::raw(record.node_display().to_string()),
        ]),
        Line::from(vec![
            Span::styled("Message:  ", label),
            Span::raw(record.message_display().to_string()),
        ]),
    ];

    let widget = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(" Details (Enter to close) "))
        .wrap(Wrap { trim: false });
    frame.render_widget(widget, area);
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let status = if let Some(error) = &app.error_message {
        vec![Span::styled(error.as_str(), Style::default().fg(Color::Red))]
    } else {
        vec![match app.input_mode {
            InputMode::Searching => Span::styled(
                "SEARCH | type to filter | ENTER/ESC: done",
                Style::default().fg(Color::Yellow),
            ),
            InputMode::EditingStart | InputMode::EditingEnd => Span::styled(
                "DATE | dd/mm/yyyy or yyyy-mm-dd, empty clears | ENTER: save | ESC: cancel",
                Style::default().fg(Color::Green),
            ),
            InputMode::Normal => Span::raw(
                "j/k: navigate | ENTER: details | /: search | x: clear search | s/e: from/to | c: clear dates | r: refresh | q: quit",
            ),
        }]
    };

    let paragraph = Paragraph::new(Line::from(status));
    frame.render_widget(paragraph, area);
}

fn token_color(token: ColorToken) -> Color {
    let (r, g, b) = token.rgb();
    Color::Rgb(r, g, b)
}

fn source_color(group: SourceGroup) -> Color {
    match group {
        SourceGroup::N8n => token_color(ColorToken::Purple),
        SourceGroup::Http => token_color(ColorToken::Red),
        SourceGroup::Other => token_color(ColorToken::Slate),
    }
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or("")
}
