//! Rendering of the topic input, live debate and stopped views

use super::app::{TuiState, MAX_TOPIC_CHARS};
use crate::runtime::DebateSnapshot;
use crate::state_machine::{DebatePhase, Seat, Turn};
use chrono::Local;
use ratatui::{
    layout::{Constraint, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

const SPINNER: [&str; 4] = ["   ", ".  ", ".. ", "..."];

pub fn seat_color(seat: Seat) -> Color {
    match seat {
        Seat::First => Color::Cyan,
        Seat::Second => Color::Magenta,
    }
}

/// Draw the current view. Returns how far the transcript can scroll.
pub fn render(frame: &mut Frame, state: &TuiState) -> usize {
    match state.snapshot.phase {
        DebatePhase::AwaitingTopic => {
            render_input(frame, state);
            0
        }
        DebatePhase::Running | DebatePhase::Stopped => render_debate(frame, state),
    }
}

fn render_input(frame: &mut Frame, state: &TuiState) {
    let snapshot = &state.snapshot;
    let [title, participants, input, error, help] = Layout::vertical([
        Constraint::Length(2),
        Constraint::Length(2),
        Constraint::Length(3),
        Constraint::Length(2),
        Constraint::Min(1),
    ])
    .areas(frame.area());

    frame.render_widget(
        Paragraph::new(Line::from(Span::styled(
            "AI Debate",
            Style::default().add_modifier(Modifier::BOLD),
        ))),
        title,
    );

    frame.render_widget(Paragraph::new(matchup(snapshot)), participants);

    let count = state.input.chars().count();
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Debate topic ")
        .title_bottom(format!(" {count}/{MAX_TOPIC_CHARS} "));
    frame.render_widget(
        Paragraph::new(format!("{}▌", state.input)).block(block),
        input,
    );

    if let Some(message) = &state.input_error {
        frame.render_widget(
            Paragraph::new(Span::styled(
                message.as_str(),
                Style::default().fg(Color::Red),
            )),
            error,
        );
    }

    frame.render_widget(
        Paragraph::new(Span::styled(
            "Enter to start the debate, Esc to quit",
            Style::default().fg(Color::DarkGray),
        )),
        help,
    );
}

fn render_debate(frame: &mut Frame, state: &TuiState) -> usize {
    let snapshot = &state.snapshot;
    let [header, body, status] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Min(3),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    let topic = snapshot.topic.as_deref().unwrap_or_default();
    let header_block = Block::default().borders(Borders::ALL).title(" Topic ");
    frame.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled(topic, Style::default().add_modifier(Modifier::BOLD)),
            Span::raw("  "),
            phase_label(snapshot.phase),
        ]))
        .block(header_block),
        header,
    );

    let paragraph =
        Paragraph::new(Text::from(transcript_lines(snapshot, state.tick))).wrap(Wrap { trim: false });
    let visible = usize::from(body.height.saturating_sub(2));
    let total = paragraph.line_count(body.width.saturating_sub(2));
    let max_scroll = total.saturating_sub(visible);
    let offset = state.scroll_offset.min(max_scroll);
    let top = u16::try_from(max_scroll - offset).unwrap_or(u16::MAX);

    let turns = snapshot.closed_turns().count();
    let title = if offset > 0 {
        format!(" {} - {turns} turns (scrolled, End to follow) ", matchup_text(snapshot))
    } else {
        format!(" {} - {turns} turns ", matchup_text(snapshot))
    };
    frame.render_widget(
        paragraph
            .block(Block::default().borders(Borders::ALL).title(title))
            .scroll((top, 0)),
        body,
    );

    frame.render_widget(Paragraph::new(status_line(snapshot)), status);
    max_scroll
}

fn matchup_text(snapshot: &DebateSnapshot) -> String {
    format!(
        "{} vs {}",
        snapshot.participant(Seat::First),
        snapshot.participant(Seat::Second)
    )
}

fn matchup(snapshot: &DebateSnapshot) -> Line<'static> {
    Line::from(vec![
        Span::styled(
            snapshot.participant(Seat::First).to_string(),
            Style::default().fg(seat_color(Seat::First)),
        ),
        Span::raw(" vs "),
        Span::styled(
            snapshot.participant(Seat::Second).to_string(),
            Style::default().fg(seat_color(Seat::Second)),
        ),
    ])
}

fn phase_label(phase: DebatePhase) -> Span<'static> {
    match phase {
        DebatePhase::AwaitingTopic => Span::raw(""),
        DebatePhase::Running => Span::styled("[live]", Style::default().fg(Color::Green)),
        DebatePhase::Stopped => Span::styled("[stopped]", Style::default().fg(Color::Yellow)),
    }
}

/// Transcript as display lines: a labeled header per turn, then its content.
pub fn transcript_lines(snapshot: &DebateSnapshot, tick: usize) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    for turn in &snapshot.turns {
        lines.push(turn_header(turn));
        for content_line in turn.content.lines() {
            lines.push(Line::from(format!("  {content_line}")));
        }
        if turn.is_open() && snapshot.phase == DebatePhase::Running {
            lines.push(Line::from(Span::styled(
                "  ▌",
                Style::default().fg(seat_color(turn.seat)),
            )));
        }
        lines.push(Line::from(""));
    }

    if snapshot.generating && snapshot.open_turn().is_none() {
        lines.push(Line::from(Span::styled(
            format!(
                "{} is thinking{}",
                snapshot.active_participant,
                SPINNER[tick % SPINNER.len()]
            ),
            Style::default()
                .fg(seat_color(snapshot.active_seat))
                .add_modifier(Modifier::ITALIC),
        )));
    }

    lines
}

fn turn_header(turn: &Turn) -> Line<'static> {
    let mut spans = vec![Span::styled(
        turn.participant.clone(),
        Style::default()
            .fg(seat_color(turn.seat))
            .add_modifier(Modifier::BOLD),
    )];
    if let Some(at) = turn.completed_at {
        spans.push(Span::styled(
            format!("  {}", at.with_timezone(&Local).format("%H:%M:%S")),
            Style::default().fg(Color::DarkGray),
        ));
    }
    Line::from(spans)
}

/// Bottom line: last error if any, otherwise key hints
pub fn status_line(snapshot: &DebateSnapshot) -> Line<'static> {
    if let Some(error) = &snapshot.last_error {
        let text = if snapshot.phase == DebatePhase::Stopped {
            format!("Stopped after error: {error}. Press any key to exit.")
        } else {
            format!("Error: {error}")
        };
        return Line::from(Span::styled(text, Style::default().fg(Color::Red)));
    }
    let hint = match snapshot.phase {
        DebatePhase::Stopped => "Debate stopped. Press any key to exit.",
        _ => "q/Esc stop  Up/Down/PgUp/PgDn scroll  End follow",
    };
    Line::from(Span::styled(hint, Style::default().fg(Color::DarkGray)))
}
