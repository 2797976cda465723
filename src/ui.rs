pub mod screen;

use itertools::Itertools;
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Gauge, Paragraph, Widget, Wrap},
};
use typist::{
    metrics::{accuracy_band, wpm_band, Tier},
    session::Snapshot,
    Mode, RoundRecord, SessionState,
};
use unicode_width::UnicodeWidthStr;

use crate::App;

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;

const LEGEND: &str = "(enter) start/next / (^t) mode / (^l) time limit / (^s) stats / (esc)ape";

pub fn tier_color(tier: Tier) -> Color {
    match tier {
        Tier::Excellent => Color::Green,
        Tier::Good => Color::Yellow,
        Tier::Practicing => Color::Red,
    }
}

fn bold() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

fn dim_bold() -> Style {
    bold().add_modifier(Modifier::DIM)
}

fn italic() -> Style {
    Style::default().add_modifier(Modifier::ITALIC)
}

/// Settings summary shown above the prompt and on the stats screen.
pub fn settings_line(app: &App) -> String {
    let config = app.engine.config();
    let mut parts = vec![
        format!("round {}", app.engine.round()),
        format!("{} mode", config.mode),
        config.correction.to_string(),
    ];
    if config.mode == Mode::Timed {
        parts.push(format!("{}s", config.time_limit.secs()));
    }
    parts.push(app.engine.bank().name().to_string());
    parts.iter().join("  ·  ")
}

/// Target sentence with the typed prefix coloured per character.
fn prompt_spans(snapshot: &Snapshot) -> Vec<Span<'static>> {
    let typed: Vec<char> = snapshot.buffer.chars().collect();
    let cursor = typed.len();

    snapshot
        .target
        .chars()
        .enumerate()
        .map(|(idx, expected)| match typed.get(idx) {
            Some(&got) if got == expected => {
                Span::styled(expected.to_string(), bold().fg(Color::Green))
            }
            Some(&got) => Span::styled(
                match got {
                    ' ' => "·".to_owned(),
                    c => c.to_string(),
                },
                bold().fg(Color::Red),
            ),
            None if idx == cursor => Span::styled(
                expected.to_string(),
                dim_bold().add_modifier(Modifier::UNDERLINED),
            ),
            None => Span::styled(expected.to_string(), dim_bold()),
        })
        .collect()
}

fn live_figures(snapshot: &Snapshot) -> Line<'static> {
    let mut spans = vec![
        Span::styled(
            format!("{:.1} wpm", snapshot.wpm),
            bold().fg(tier_color(wpm_band(snapshot.wpm))),
        ),
        Span::raw("   "),
        Span::styled(format!("{:.1} cps", snapshot.cps), bold()),
    ];
    if let Some(accuracy) = snapshot.accuracy_percent {
        spans.push(Span::raw("   "));
        spans.push(Span::styled(
            format!("{accuracy:.1}% acc"),
            bold().fg(tier_color(accuracy_band(accuracy))),
        ));
    }
    spans.push(Span::raw("   "));
    spans.push(Span::styled(
        format!("{:.1}s", snapshot.elapsed_secs),
        dim_bold(),
    ));
    Line::from(spans)
}

fn hint(app: &App, snapshot: &Snapshot) -> String {
    if let Some(status) = &app.status {
        return status.clone();
    }
    match (snapshot.state, snapshot.mode) {
        (SessionState::Armed, Mode::Sentence) => "start typing to begin".to_string(),
        (SessionState::Armed, Mode::Timed) => "press enter to start the clock".to_string(),
        (SessionState::Idle, _) | (SessionState::Completed, _) => {
            "press enter for a new sentence".to_string()
        }
        (SessionState::Active, _) => String::new(),
    }
}

pub fn render_typing(app: &App, area: Rect, buf: &mut Buffer) {
    let snapshot = app.engine.snapshot();

    let max_chars_per_line = area.width.saturating_sub(HORIZONTAL_MARGIN * 2).max(1);
    let prompt_width = snapshot.target.width() as u16;
    let prompt_occupied_lines = if prompt_width <= max_chars_per_line {
        1
    } else {
        prompt_width.div_ceil(max_chars_per_line) + 1
    };
    let timer_lines = if snapshot.remaining_secs.is_some() { 2 } else { 0 };
    let padding = area
        .height
        .saturating_sub(prompt_occupied_lines + timer_lines + 6)
        / 2;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .constraints([
            Constraint::Length(1), // settings
            Constraint::Length(padding),
            Constraint::Length(timer_lines),
            Constraint::Length(prompt_occupied_lines),
            Constraint::Length(1), // padding
            Constraint::Length(1), // progress
            Constraint::Length(1), // live figures
            Constraint::Min(1),
            Constraint::Length(1), // hint
            Constraint::Length(1), // legend
        ])
        .split(area);

    Paragraph::new(Span::styled(settings_line(app), italic().fg(Color::Gray)))
        .alignment(Alignment::Center)
        .render(chunks[0], buf);

    if let Some(remaining) = snapshot.remaining_secs {
        let sentences = snapshot.sentences_completed.unwrap_or(0);
        Paragraph::new(Span::styled(
            format!("{remaining}s left   {sentences} sentences"),
            dim_bold(),
        ))
        .alignment(Alignment::Center)
        .render(chunks[2], buf);
    }

    Paragraph::new(Line::from(prompt_spans(&snapshot)))
        .alignment(if prompt_occupied_lines == 1 {
            Alignment::Center
        } else {
            Alignment::Left
        })
        .wrap(Wrap { trim: true })
        .render(chunks[3], buf);

    Gauge::default()
        .gauge_style(Style::default().fg(Color::Magenta))
        .ratio((snapshot.progress_percent / 100.0).clamp(0.0, 1.0))
        .label(format!("{:.0}%", snapshot.progress_percent))
        .render(chunks[5], buf);

    Paragraph::new(live_figures(&snapshot))
        .alignment(Alignment::Center)
        .render(chunks[6], buf);

    Paragraph::new(Span::styled(
        hint(app, &snapshot),
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD | Modifier::ITALIC),
    ))
    .alignment(Alignment::Center)
    .render(chunks[8], buf);

    Paragraph::new(Span::styled(LEGEND, italic())).render(chunks[9], buf);
}

fn record_details(record: &RoundRecord) -> Vec<Line<'static>> {
    match record {
        RoundRecord::Sentence(r) => {
            let mut lines = vec![
                Line::from(format!("time taken   {:.2}s", r.elapsed_secs)),
                Line::from(format!("speed        {:.1} wpm   {:.1} cps", r.wpm, r.cps)),
            ];
            if let Some(accuracy) = r.accuracy {
                lines.push(Line::from(format!("accuracy     {accuracy:.1}%")));
            }
            lines
        }
        RoundRecord::Timed(r) => vec![
            Line::from(format!("duration     {}s", r.duration_secs)),
            Line::from(format!("speed        {:.1} wpm   {:.1} cps", r.wpm, r.cps)),
            Line::from(format!(
                "typed        {} chars   {:.1} words   {} sentences",
                r.chars, r.words, r.sentences
            )),
        ],
    }
}

pub fn render_results(app: &App, area: Rect, buf: &mut Buffer) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(1), // tier
            Constraint::Length(1), // message
            Constraint::Length(1), // padding
            Constraint::Min(3),    // details
            Constraint::Length(1), // legend
        ])
        .split(area);

    let Some(record) = app.engine.last_record() else {
        Paragraph::new(Span::styled("no results yet", italic()))
            .alignment(Alignment::Center)
            .render(chunks[3], buf);
        return;
    };

    let tier = record.tier();
    Paragraph::new(Span::styled(
        format!("ROUND {}: {}", record.round(), tier.title()),
        bold().fg(tier_color(tier)),
    ))
    .alignment(Alignment::Center)
    .render(chunks[0], buf);

    Paragraph::new(Span::styled(tier.message(), italic().fg(Color::Cyan)))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .render(chunks[1], buf);

    Paragraph::new(record_details(record))
        .alignment(Alignment::Center)
        .render(chunks[3], buf);

    Paragraph::new(Span::styled(LEGEND, italic())).render(chunks[4], buf);
}

pub fn render_stats(app: &App, area: Rect, buf: &mut Buffer) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(1), // title
            Constraint::Length(1), // padding
            Constraint::Length(5), // aggregate
            Constraint::Length(1), // padding
            Constraint::Min(1),    // recent rounds
            Constraint::Length(1), // legend
        ])
        .split(area);

    Paragraph::new(Span::styled("SESSION STATISTICS", bold()))
        .alignment(Alignment::Center)
        .render(chunks[0], buf);

    let log = app.engine.log();
    let Some(agg) = log.aggregate() else {
        Paragraph::new(Span::styled("No rounds completed yet!", italic()))
            .alignment(Alignment::Center)
            .render(chunks[2], buf);
        Paragraph::new(Span::styled("(^s) back / (esc)ape", italic())).render(chunks[5], buf);
        return;
    };

    let mut summary = vec![
        Line::from(format!("rounds       {}", agg.count)),
        Line::from(vec![
            Span::raw("wpm          "),
            Span::styled(
                format!("{:.1} avg", agg.avg_wpm),
                bold().fg(tier_color(wpm_band(agg.avg_wpm))),
            ),
            Span::raw(format!("   {:.1} best   {:.2} sd", agg.best_wpm, agg.wpm_std_dev)),
        ]),
        Line::from(format!(
            "cps          {:.1} avg   {:.1} best",
            agg.avg_cps, agg.best_cps
        )),
    ];
    if let (Some(avg), Some(best)) = (agg.avg_accuracy, agg.best_accuracy) {
        summary.push(Line::from(vec![
            Span::raw("accuracy     "),
            Span::styled(
                format!("{avg:.1}% avg"),
                bold().fg(tier_color(accuracy_band(avg))),
            ),
            Span::raw(format!("   {best:.1}% best")),
        ]));
    }
    Paragraph::new(summary)
        .alignment(Alignment::Center)
        .render(chunks[2], buf);

    let recent: Vec<Line> = log
        .recent(5)
        .iter()
        .rev()
        .map(|r| {
            let accuracy = r
                .accuracy()
                .map(|a| format!("   {a:.1}%"))
                .unwrap_or_default();
            Line::from(vec![
                Span::styled(format!("round {:>3}  ", r.round()), dim_bold()),
                Span::styled(
                    format!("{:.1} wpm", r.wpm()),
                    Style::default().fg(tier_color(r.tier())),
                ),
                Span::raw(accuracy),
                Span::styled(
                    format!("   {}", r.timestamp().format("%H:%M:%S")),
                    italic(),
                ),
            ])
        })
        .collect();
    Paragraph::new(recent)
        .alignment(Alignment::Center)
        .render(chunks[4], buf);

    Paragraph::new(Span::styled("(^s) back / (esc)ape", italic())).render(chunks[5], buf);
}
