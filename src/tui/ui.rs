//! Rendering.

use chrono::Utc;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState, Wrap},
    Frame,
};

use super::app::{App, View};
use crate::cli::format::{format_duration, format_timestamp, truncate};
use crate::experiment::log::display_value;
use crate::experiment::{Experiment, ExperimentStatus, LogKind};

/// Draw the whole screen.
pub fn draw(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(f.area());

    draw_header(f, app, chunks[0]);
    match app.log_experiment() {
        Some(experiment) => draw_logs(f, app, experiment, chunks[1]),
        None => draw_experiments(f, app, chunks[1]),
    }
    draw_footer(f, app, chunks[2]);
}

const fn status_color(status: ExperimentStatus) -> Color {
    match status {
        ExperimentStatus::Running => Color::Blue,
        ExperimentStatus::Completed => Color::Green,
        ExperimentStatus::Error => Color::Red,
        ExperimentStatus::Interrupted => Color::Yellow,
    }
}

fn draw_header(f: &mut Frame, app: &App, area: Rect) {
    let subtitle = match &app.view {
        View::Experiments if app.running_only => "running only",
        View::Experiments => "all experiments",
        View::Logs { .. } => "event log",
    };
    let title = Paragraph::new(Line::from(vec![
        Span::styled(
            "Kepler Experiments",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!("  ({subtitle})")),
    ]))
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::ALL));
    f.render_widget(title, area);
}

fn draw_experiments(f: &mut Frame, app: &App, area: Rect) {
    let visible = app.visible();
    if visible.is_empty() {
        let empty = Paragraph::new("No experiments found. Press 'r' to reload.")
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title("Experiments"));
        f.render_widget(empty, area);
        return;
    }

    let now = Utc::now();
    let rows = visible.iter().map(|exp| {
        let status = exp.status();
        let progress = exp
            .progress()
            .map_or_else(String::new, |p| format!("{:.0}%", p.percentage));
        Row::new(vec![
            Cell::from(truncate(exp.id(), 24)),
            Cell::from(truncate(exp.name(), 24)),
            Cell::from(status.as_str()).style(Style::default().fg(status_color(status))),
            Cell::from(
                exp.start_time()
                    .map_or_else(|_| "N/A".to_string(), format_timestamp),
            ),
            Cell::from(format_duration(exp.duration_at(now))),
            Cell::from(progress),
            Cell::from(exp.tags().join(", ")),
        ])
    });

    let header = Row::new(vec![
        "ID", "Name", "Status", "Started", "Duration", "Progress", "Tags",
    ])
    .style(Style::default().add_modifier(Modifier::BOLD));

    let table = Table::new(
        rows,
        [
            Constraint::Length(24),
            Constraint::Length(24),
            Constraint::Length(11),
            Constraint::Length(19),
            Constraint::Length(9),
            Constraint::Length(8),
            Constraint::Min(10),
        ],
    )
    .header(header)
    .block(Block::default().borders(Borders::ALL).title("Experiments"))
    .row_highlight_style(
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("> ");

    let mut state = TableState::default().with_selected(Some(app.selected));
    f.render_stateful_widget(table, area, &mut state);
}

fn draw_logs(f: &mut Frame, app: &App, exp: &Experiment, area: Rect) {
    let status = exp.status();
    let mut lines = vec![
        Line::from(vec![
            Span::raw("Status: "),
            Span::styled(
                status.as_str(),
                Style::default()
                    .fg(status_color(status))
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!(
                "   Duration: {}",
                format_duration(exp.duration_at(Utc::now()))
            )),
        ]),
    ];
    if let Some(error) = exp.error() {
        lines.push(Line::styled(
            format!("Error: {error}"),
            Style::default().fg(Color::Red),
        ));
    }
    let metrics = exp.metrics();
    if !metrics.is_empty() {
        let rendered: Vec<String> = metrics
            .iter()
            .map(|(k, v)| format!("{k}={}", display_value(v)))
            .collect();
        lines.push(Line::from(format!("Metrics: {}", rendered.join(", "))));
    }
    lines.push(Line::from(""));

    for event in exp.events() {
        let kind = event.kind();
        lines.push(Line::from(vec![
            Span::styled(
                format_timestamp(event.created_at()),
                Style::default().fg(Color::DarkGray),
            ),
            Span::raw(" "),
            Span::styled(format!("{:<8}", kind.as_str()), kind_style(kind)),
            Span::raw(" "),
            Span::raw(event.message().to_string()),
        ]));
    }

    let logs = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("{} ({})", exp.name(), exp.id())),
        )
        .wrap(Wrap { trim: false })
        .scroll((app.log_scroll, 0));
    f.render_widget(logs, area);
}

fn kind_style(kind: LogKind) -> Style {
    let color = match kind {
        LogKind::Start | LogKind::End => Color::Cyan,
        LogKind::Error => Color::Red,
        LogKind::Warning => Color::Yellow,
        LogKind::Metric | LogKind::Progress => Color::Green,
        LogKind::Artifact | LogKind::Config | LogKind::Tag => Color::Magenta,
        LogKind::Info | LogKind::Resource => Color::Gray,
    };
    Style::default().fg(color)
}

fn draw_footer(f: &mut Frame, app: &App, area: Rect) {
    let collection = &app.collection;
    let summary = format!(
        "Total: {} | Running: {} | Completed: {} | Failed: {}",
        collection.count(),
        collection.count_by_status(ExperimentStatus::Running),
        collection.count_by_status(ExperimentStatus::Completed),
        collection.count_by_status(ExperimentStatus::Error),
    );
    let hints = match app.view {
        View::Experiments => "q quit | r reload | f filter | ↑/↓ select | enter logs",
        View::Logs { .. } => "q quit | r reload | ↑/↓ scroll | b back",
    };
    let text = app.status_line.as_ref().map_or_else(
        || format!("{summary}   {hints}"),
        |status| format!("{summary}   {status}"),
    );
    let footer = Paragraph::new(text)
        .style(Style::default().fg(Color::Gray))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(footer, area);
}
