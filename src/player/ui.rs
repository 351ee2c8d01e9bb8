use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Gauge, Paragraph, Wrap},
};

use super::app::App;
use quran_lounge::config::TextMode;
use quran_lounge::sync::SyncState;

pub fn draw(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(2), // Collection name
            Constraint::Length(2), // Status line
            Constraint::Length(1), // Entry progress
            Constraint::Min(3),    // Recited text
            Constraint::Length(3), // Controls
        ])
        .split(f.area());

    let title = Paragraph::new(if app.collection_name.is_empty() {
        "Lounge".to_string()
    } else {
        app.collection_name.clone()
    })
    .style(
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    )
    .alignment(Alignment::Center);
    f.render_widget(title, chunks[0]);

    draw_status(f, chunks[1], app);

    let progress = Gauge::default()
        .gauge_style(Style::default().fg(Color::Green).bg(Color::Black))
        .ratio(app.progress())
        .label("");
    f.render_widget(progress, chunks[2]);

    draw_text(f, chunks[3], app);
    draw_controls(f, chunks[4], app);
}

fn state_label(state: SyncState) -> (&'static str, Color) {
    match state {
        SyncState::Idle => ("idle", Color::DarkGray),
        SyncState::Loading => ("loading…", Color::Yellow),
        SyncState::Playing => ("▶ playing", Color::Green),
        SyncState::Paused => ("⏸ paused", Color::Yellow),
        SyncState::Ended => ("ended", Color::DarkGray),
    }
}

fn draw_status(f: &mut Frame, area: Rect, app: &App) {
    let (label, color) = state_label(app.state);
    let position = app
        .entry
        .map(|k| format!("{}/{}", k.local_position, app.entry_count()))
        .unwrap_or_else(|| "-".to_string());

    let status = vec![
        Span::styled(label, Style::default().fg(color)),
        Span::raw("  "),
        Span::styled(app.source.as_str(), Style::default().fg(Color::Magenta)),
        Span::raw(format!("  {position}  ")),
        Span::styled(
            format!("vol {:>3}%", (app.volume() * 100.0).round() as u32),
            Style::default().fg(Color::Blue),
        ),
    ];

    let widget = Paragraph::new(Line::from(status))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::BOTTOM));
    f.render_widget(widget, area);
}

fn draw_text(f: &mut Frame, area: Rect, app: &App) {
    if !app.show_text {
        return;
    }

    let primary = Line::styled(
        app.text.primary.as_str(),
        Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::BOLD),
    );
    let secondary = Line::styled(
        app.text.secondary.as_str(),
        Style::default().fg(Color::Gray),
    );

    let lines = match app.text_mode {
        TextMode::Primary => vec![primary],
        TextMode::Secondary => vec![secondary],
        TextMode::Both => vec![primary, Line::raw(""), secondary],
    };

    let widget = Paragraph::new(Text::from(lines))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    f.render_widget(widget, area);
}

fn draw_controls(f: &mut Frame, area: Rect, app: &App) {
    let controls = vec![
        if app.is_playing() {
            Span::styled("[space]", Style::default().fg(Color::Yellow))
        } else {
            Span::styled("[space]", Style::default().fg(Color::Green))
        },
        Span::raw(if app.is_playing() { " pause  " } else { " play  " }),
        Span::styled("[s]", Style::default().fg(Color::Yellow)),
        Span::raw(" stop  "),
        Span::styled("[n]", Style::default().fg(Color::Magenta)),
        Span::raw(" next collection  "),
        Span::styled("[+/-]", Style::default().fg(Color::Blue)),
        Span::raw(" volume  "),
        Span::styled("[t]", Style::default().fg(Color::Cyan)),
        Span::raw(format!(" {}  ", app.text_mode)),
        Span::styled("[h]", Style::default().fg(Color::Cyan)),
        Span::raw(if app.show_text { " hide  " } else { " show  " }),
        Span::styled("[q]", Style::default().fg(Color::Red)),
        Span::raw(" quit"),
    ];

    let widget = Paragraph::new(Line::from(controls))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::TOP));
    f.render_widget(widget, area);
}
