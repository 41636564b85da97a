use std::time::Instant;

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Gauge, Paragraph, Widget, Wrap},
};
use unicode_width::UnicodeWidthStr;

use crate::app::{App, NoticeLevel};
use crate::session::CalibrationState;

const HORIZONTAL_MARGIN: u16 = 2;
const TITLE: &str = " Round Counter ";
const GOAL_BLESSING: &str = "Tvamasmin Kārya Niryoge Pramānam Hari Sattama";

/// Seconds with two decimals, the way the round length is shown to the user.
pub fn format_seconds(millis: u64) -> String {
    format!("{:.2}", millis as f64 / 1000.0)
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let outer = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .title(Span::styled(
                TITLE,
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            ))
            .title_alignment(Alignment::Center);
        let inner = outer.inner(area);
        outer.render(area, buf);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .constraints([
                Constraint::Min(1),    // body
                Constraint::Length(1), // notice
                Constraint::Length(1), // key help + visitors
            ])
            .split(inner);

        match self.timer.calibration() {
            CalibrationState::Idle | CalibrationState::Calibrating { .. } => {
                render_calibration(self, chunks[0], buf)
            }
            CalibrationState::Calibrated => render_counter(self, chunks[0], buf),
        }
        render_notice(self, chunks[1], buf);
        render_footer(self, chunks[2], buf);
    }
}

fn centered_rows(area: Rect, rows: u16) -> Rect {
    let rows = rows.min(area.height);
    let top = (area.height - rows) / 2;
    Rect {
        x: area.x,
        y: area.y + top,
        width: area.width,
        height: rows,
    }
}

fn render_calibration(app: &App, area: Rect, buf: &mut Buffer) {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let dim = Style::default().add_modifier(Modifier::DIM);

    let mut lines = match app.timer.calibration() {
        CalibrationState::Calibrating { started_at } => {
            let elapsed = Instant::now().saturating_duration_since(started_at);
            vec![
                Line::from(Span::styled(
                    "Perform one round, then press space to set your pace.",
                    bold,
                )),
                Line::from(""),
                Line::from(Span::styled(
                    format!("{} s", format_seconds(elapsed.as_millis() as u64)),
                    Style::default().fg(Color::Cyan).patch(bold),
                )),
                Line::from(""),
                Line::from(Span::styled("[space] stop calibration", dim)),
            ]
        }
        _ => vec![
            Line::from(Span::styled("First, let's time one round.", bold)),
            Line::from(""),
            Line::from(Span::styled("[space] start calibration", dim)),
        ],
    };
    lines.push(Line::from(""));
    lines.push(goal_line(app));

    let height = lines.len() as u16;
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .render(centered_rows(area, height), buf);
}

fn goal_line(app: &App) -> Line<'static> {
    let label = Style::default().add_modifier(Modifier::BOLD);
    let value = if app.goal_editable() {
        Style::default()
            .fg(Color::Green)
            .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
    } else {
        Style::default().add_modifier(Modifier::DIM)
    };
    let shown = if app.goal_input.is_empty() {
        " ".to_string()
    } else {
        app.goal_input.clone()
    };
    Line::from(vec![
        Span::styled("Goal (rounds): ", label),
        Span::styled(shown, value),
    ])
}

fn render_counter(app: &App, area: Rect, buf: &mut Buffer) {
    let timer = &app.timer;
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let dim = Style::default().add_modifier(Modifier::DIM);

    let reached = timer.goal_reached();
    let banner_rows = if reached { 3 } else { 0 };
    let body = centered_rows(area, 9 + banner_rows);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // label
            Constraint::Length(1), // count
            Constraint::Length(1),
            Constraint::Length(1), // progress
            Constraint::Length(1), // goal
            Constraint::Length(1), // pace
            Constraint::Length(1), // hint
            Constraint::Length(1),
            Constraint::Length(banner_rows),
            Constraint::Min(0),
        ])
        .split(body);

    Paragraph::new(Span::styled("Rounds finished", dim))
        .alignment(Alignment::Center)
        .render(chunks[0], buf);

    Paragraph::new(Span::styled(
        timer.round_count().to_string(),
        Style::default().fg(Color::Yellow).patch(bold),
    ))
    .alignment(Alignment::Center)
    .render(chunks[1], buf);

    let goal = timer.goal_rounds();
    if goal > 0 {
        let ratio = (timer.round_count() as f64 / goal as f64).clamp(0.0, 1.0);
        let width = chunks[3].width.min(40);
        let gauge_area = Rect {
            x: chunks[3].x + (chunks[3].width - width) / 2,
            width,
            ..chunks[3]
        };
        Gauge::default()
            .gauge_style(Style::default().fg(if reached { Color::Green } else { Color::Cyan }))
            .ratio(ratio)
            .label(format!("{}/{}", timer.round_count().min(goal), goal))
            .render(gauge_area, buf);
    }

    Paragraph::new(goal_line(app))
        .alignment(Alignment::Center)
        .render(chunks[4], buf);

    if let Some(millis) = timer.round_duration_millis() {
        Paragraph::new(Span::styled(
            format!("Time for each round: {} seconds", format_seconds(millis)),
            dim,
        ))
        .alignment(Alignment::Center)
        .render(chunks[5], buf);
    }

    let hint = if timer.is_counting() {
        "The counter advances automatically."
    } else if app.goal_staged() {
        "[space] apply the new goal and start counting"
    } else if timer.can_start_counting() {
        "[space] start counting"
    } else if reached {
        "[r] reset to begin again"
    } else {
        "Set a goal to start counting."
    };
    Paragraph::new(Span::styled(hint, dim))
        .alignment(Alignment::Center)
        .render(chunks[6], buf);

    if reached {
        let style = Style::default().fg(Color::Green).patch(bold);
        let banner = vec![
            Line::from(Span::styled("Goal reached!", style)),
            Line::from(Span::styled(
                GOAL_BLESSING,
                Style::default().add_modifier(Modifier::ITALIC),
            )),
            Line::from(if timer.cue_pending() {
                Span::styled("♪", dim)
            } else {
                Span::raw("")
            }),
        ];
        Paragraph::new(banner)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .render(chunks[8], buf);
    }
}

fn render_notice(app: &App, area: Rect, buf: &mut Buffer) {
    let Some(notice) = &app.notice else {
        return;
    };
    let color = match notice.level {
        NoticeLevel::Info => Color::Cyan,
        NoticeLevel::Warning => Color::Red,
    };
    Paragraph::new(Span::styled(notice.text.clone(), Style::default().fg(color)))
        .alignment(Alignment::Center)
        .render(area, buf);
}

fn render_footer(app: &App, area: Rect, buf: &mut Buffer) {
    let dim = Style::default().add_modifier(Modifier::DIM);
    let help = "[space] next  [0-9] goal  [r] reset  [q] quit";

    let visitors = app
        .visitor_count
        .map(|count| format!("visitors: {count}"))
        .unwrap_or_default();
    let visitors_width = (visitors.width() as u16).min(area.width);

    Paragraph::new(Span::styled(help, dim)).render(
        Rect {
            width: area.width.saturating_sub(visitors_width),
            ..area
        },
        buf,
    );

    if !visitors.is_empty() {
        Paragraph::new(Span::styled(visitors, Style::default().fg(Color::Magenta)))
            .alignment(Alignment::Right)
            .render(area, buf);
    }
}
