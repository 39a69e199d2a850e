use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Cell, Gauge, Paragraph, Row, Table, TableState};

use crate::api::TrackerBackend;
use crate::mods::TRAINING_MODS;
use crate::session::StatusLine;

use super::super::listing::{
    beatmap_difficulty, beatmap_title, bpm_text, judgements_text, stars_text, truncate,
};
use super::{FormField, TrainerState};

const ACCENT: Color = Color::Rgb(110, 170, 255);
const MUTED: Color = Color::Rgb(185, 195, 210);

pub(super) fn draw_tui<B: TrackerBackend>(frame: &mut Frame, state: &TrainerState<B>) {
    let bg = Block::default().style(Style::default().bg(Color::Black));
    frame.render_widget(bg, frame.area());

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(10),
            Constraint::Length(3),
            Constraint::Length(3),
        ])
        .split(frame.area());

    frame.render_widget(header(state), chunks[0]);

    let body_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(chunks[1]);
    draw_queue(frame, state, body_chunks[0]);

    let side_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(8), Constraint::Length(3)])
        .split(body_chunks[1]);
    if state.controller.planner().is_active() {
        let map = Paragraph::new(current_map_text(state))
            .style(Style::default().fg(Color::Rgb(230, 230, 230)))
            .block(panel_block("Current Map"));
        frame.render_widget(map, side_chunks[0]);
    } else {
        let form = Paragraph::new(form_lines(state)).block(panel_block("Add Step"));
        frame.render_widget(form, side_chunks[0]);
    }
    if let Some(progress) = state.controller.scan_progress() {
        let gauge = Gauge::default()
            .block(panel_block("Scan"))
            .gauge_style(
                Style::default()
                    .fg(Color::Rgb(130, 190, 255))
                    .bg(Color::Black)
                    .add_modifier(Modifier::BOLD),
            )
            .label(truncate(&progress.summary(), 40))
            .ratio(progress.ratio());
        frame.render_widget(gauge, side_chunks[1]);
    }

    let controls = Paragraph::new(controls_line(state))
        .alignment(Alignment::Center)
        .block(panel_block("Controls"));
    frame.render_widget(controls, chunks[2]);

    let status = state.controller.status();
    let status_widget = Paragraph::new(status_text(status))
        .style(status_style(status))
        .block(panel_block("Status"));
    frame.render_widget(status_widget, chunks[3]);
}

fn header<B: TrackerBackend>(state: &TrainerState<B>) -> Paragraph<'static> {
    let planner = state.controller.planner();
    let mode = if planner.is_active() {
        "SESSION"
    } else {
        "PLANNING"
    };
    let sep = || Span::styled("   ", Style::default());
    Paragraph::new(Line::from(vec![
        Span::styled(
            "OSUTRACK",
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        ),
        sep(),
        Span::styled(
            format!("player {}", state.controller.player().unwrap_or("-")),
            Style::default().fg(MUTED),
        ),
        sep(),
        Span::styled(
            format!("★ {:.1}", planner.target_star_rating()),
            Style::default().fg(MUTED),
        ),
        sep(),
        Span::styled(
            format!("≤{} BPM", planner.target_max_bpm().round() as i64),
            Style::default().fg(MUTED),
        ),
        sep(),
        Span::styled(
            format!("focus {}", state.controller.focus().as_str()),
            Style::default().fg(MUTED),
        ),
        sep(),
        Span::styled(mode, Style::default().fg(Color::Yellow)),
    ]))
    .alignment(Alignment::Center)
    .block(panel_block("Trainer"))
}

fn draw_queue<B: TrackerBackend>(frame: &mut Frame, state: &TrainerState<B>, area: Rect) {
    let planner = state.controller.planner();
    let progress = planner.progress();
    let rows: Vec<Row> = planner
        .queue()
        .iter()
        .enumerate()
        .map(|(idx, step)| {
            let done = match progress {
                Some(p) if p.index == idx => format!("{}/{}", p.completed, step.count()),
                Some(p) if p.index > idx => "done".to_string(),
                _ => "-".to_string(),
            };
            Row::new(vec![
                Cell::from((idx + 1).to_string()),
                Cell::from(step.count().to_string()),
                Cell::from(step.mods().to_string()),
                Cell::from(step.goal().summary()),
                Cell::from(done),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(3),
            Constraint::Length(5),
            Constraint::Length(8),
            Constraint::Min(20),
            Constraint::Length(6),
        ],
    )
    .header(
        Row::new(vec!["#", "Maps", "Mods", "Goals", "Done"])
            .style(Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)),
    )
    .block(panel_block("Session Plan"))
    .row_highlight_style(
        Style::default()
            .bg(ACCENT)
            .fg(Color::Black)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("▸ ");

    let mut table_state = TableState::default();
    table_state.select(progress.map(|p| p.index).or(state.selected_step));
    frame.render_stateful_widget(table, area, &mut table_state);
}

fn form_lines<B: TrackerBackend>(state: &TrainerState<B>) -> Vec<Line<'static>> {
    let form = &state.form;
    let mut lines = Vec::new();
    for field in [
        FormField::Count,
        FormField::Accuracy,
        FormField::Misses,
        FormField::Score,
    ] {
        let focused = field == form.field;
        let marker = if focused { "▸ " } else { "  " };
        let value = form.value(field);
        let shown = if value.is_empty() { "-" } else { value };
        let disabled = field == FormField::Score && !form.use_score_v2;
        let style = if disabled {
            Style::default().fg(Color::Rgb(100, 105, 115))
        } else if focused {
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Rgb(230, 230, 230))
        };
        lines.push(Line::from(Span::styled(
            format!("{marker}{:<11} {shown}", field.label()),
            style,
        )));
    }
    lines.push(Line::from(Span::styled(
        format!(
            "  {:<11} {}",
            "ScoreV2",
            if form.use_score_v2 { "on" } else { "off" }
        ),
        Style::default().fg(Color::Rgb(230, 230, 230)),
    )));
    lines.push(Line::from(""));

    let mut mod_spans = vec![Span::styled("  Mods        ", Style::default().fg(MUTED))];
    for m in TRAINING_MODS {
        let style = if form.mods.contains(m) {
            pill_active()
        } else {
            pill_inactive()
        };
        mod_spans.push(Span::styled(format!(" {} ", m.acronym()), style));
        mod_spans.push(Span::raw(" "));
    }
    lines.push(Line::from(mod_spans));
    lines.push(Line::from(Span::styled(
        "  e EZ  h HD  r HR  d DT  t HT  l FL",
        Style::default().fg(MUTED),
    )));
    lines
}

fn current_map_text<B: TrackerBackend>(state: &TrainerState<B>) -> String {
    let controller = &state.controller;
    let step_text = match (controller.planner().current_step(), controller.planner().progress()) {
        (Some(step), Some(progress)) => format!(
            "Step {} of {}: {} ({}/{})\nGoals: {}",
            progress.index + 1,
            controller.planner().queue().len(),
            step.mods(),
            progress.completed,
            step.count(),
            step.goal().summary()
        ),
        _ => "No active step.".to_string(),
    };

    let map_text = match controller.candidate() {
        Some(beatmap) => format!(
            "{}\n{}\n{}   {}\n{}",
            truncate(&beatmap_title(beatmap), 44),
            truncate(&beatmap_difficulty(beatmap), 44),
            stars_text(beatmap.stars),
            bpm_text(beatmap),
            controller.find_button_label()
        ),
        None => "No map yet. Press f to find one.".to_string(),
    };

    let mut text = format!("{step_text}\n\n{map_text}");
    if let Some(detected) = controller.last_detection() {
        text.push_str(&format!(
            "\n\nLast play: {:.2}%  {}\n{}",
            detected.replay.accuracy(),
            judgements_text(&detected.replay),
            detected.verdict.message()
        ));
    }
    text
}

fn controls_line<B: TrackerBackend>(state: &TrainerState<B>) -> Line<'static> {
    let hint = if state.controller.planner().is_active() {
        let controller = &state.controller;
        if !controller.controls_enabled() {
            "checking for your play...  e end"
        } else if controller.recommendation().is_some() && controller.finder().is_exhausted() {
            "no rerolls left  c check play  y pass  n fail  k skip  g suggest SR  e end"
        } else {
            "f find/reroll  c check play  y pass  n fail  k skip  g suggest SR  e end"
        }
    } else {
        "Tab field  0-9 edit  v ScoreV2  a add  x remove  ↑/↓ select  s start"
    };
    Line::from(vec![
        Span::styled(hint, Style::default().fg(MUTED)),
        Span::styled(
            "   +/- SR  [/] BPM  o focus  u player  q quit",
            Style::default().fg(Color::Rgb(140, 150, 165)),
        ),
    ])
}

fn panel_block(title: &'static str) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(Color::Rgb(125, 135, 150)))
        .title(title)
}

fn pill_active() -> Style {
    Style::default()
        .bg(ACCENT)
        .fg(Color::Black)
        .add_modifier(Modifier::BOLD)
}

fn pill_inactive() -> Style {
    Style::default()
        .bg(Color::Rgb(72, 82, 96))
        .fg(Color::Rgb(230, 235, 242))
}

fn status_text(status: &StatusLine) -> String {
    let level = if status.is_error() { "ERROR" } else { "INFO" };
    format!("{level}: {}", status.text())
}

fn status_style(status: &StatusLine) -> Style {
    if status.is_error() {
        Style::default()
            .fg(Color::Rgb(255, 145, 120))
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Rgb(205, 165, 255))
    }
}
