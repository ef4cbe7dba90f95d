use crate::{App, Screen};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use signik::{
    camera::{CameraEvaluator, EvaluatorPhase},
    content::{Question, QuestionKind},
    dragdrop::icon_bank,
    progress::AdvanceResult,
    quiz::{Mode, QuizSession},
};
use unicode_width::UnicodeWidthStr;

pub fn ui(app: &App, f: &mut Frame) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Body
            Constraint::Length(3), // Keys + status
        ])
        .split(f.area());

    match &app.screen {
        Screen::Session(session) => {
            render_header(app, session_header(session), chunks[0], f);
            match session.mode {
                Mode::Learning => render_learning(session, chunks[1], f),
                Mode::Quiz => render_quiz(app, session, chunks[1], f),
                Mode::Results => render_results(app, session, chunks[1], f),
            }
            render_footer(app, session_keys(session), chunks[2], f);
        }
        Screen::Camera(evaluator) => {
            render_header(app, "camera evaluation", chunks[0], f);
            render_camera(app, evaluator, chunks[1], f);
            render_footer(app, camera_keys(evaluator), chunks[2], f);
        }
    }
}

fn session_header(session: &QuizSession) -> &'static str {
    match session.mode {
        Mode::Learning => "lesson",
        Mode::Quiz => "quiz",
        Mode::Results => "results",
    }
}

fn session_keys(session: &QuizSession) -> &'static str {
    match session.mode {
        Mode::Learning => "(enter/space) continue  (esc) quit",
        Mode::Quiz => {
            "(←/→) question  (tab) pick icon  (↑/↓) slot  (enter) drop/submit  (esc) quit"
        }
        Mode::Results => "(r) retry level  (c) continue  (esc) quit",
    }
}

fn camera_keys(evaluator: &CameraEvaluator) -> &'static str {
    match evaluator.phase() {
        EvaluatorPhase::Ready => "(enter/s) start camera  (esc) quit",
        EvaluatorPhase::CameraActive | EvaluatorPhase::Checking => {
            "(enter/space) check sign  (k) skip  (esc) quit"
        }
        EvaluatorPhase::Complete => "(r) retry level  (c) continue  (esc) quit",
        _ => "(esc) quit",
    }
}

fn render_header(app: &App, what: &str, area: Rect, f: &mut Frame) {
    let title = Paragraph::new(format!("{} — {}", app.level, what))
        .block(Block::default().borders(Borders::ALL))
        .style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .alignment(Alignment::Center);
    f.render_widget(title, area);
}

fn render_footer(app: &App, keys: &str, area: Rect, f: &mut Frame) {
    let line = match &app.status {
        Some(status) => Line::from(Span::styled(
            status.clone(),
            Style::default().fg(Color::Yellow),
        )),
        None => Line::from(Span::styled(
            keys.to_string(),
            Style::default().fg(Color::Gray).add_modifier(Modifier::ITALIC),
        )),
    };

    let footer = Paragraph::new(line)
        .block(Block::default().borders(Borders::ALL))
        .alignment(Alignment::Center);
    f.render_widget(footer, area);
}

fn render_learning(session: &QuizSession, area: Rect, f: &mut Frame) {
    let Some(letter) = session.current_lesson_letter() else {
        return;
    };

    let position = session.current_index + 1;
    let total = session.content.lesson_letters.len();

    let lines = vec![
        Line::from(Span::styled(
            format!("{}  {}", letter.letter, letter.emoji),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::default(),
        Line::from(letter.instruction.clone()),
        Line::default(),
        Line::from(Span::styled(
            format!("letter {position} of {total}"),
            Style::default().fg(Color::DarkGray),
        )),
    ];

    let card = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Study"))
        .alignment(Alignment::Center);
    f.render_widget(card, area);
}

fn render_quiz(app: &App, session: &QuizSession, area: Rect, f: &mut Frame) {
    let Some(question) = session.current_question() else {
        let empty = Paragraph::new("No questions for this level; press enter to submit.")
            .block(Block::default().borders(Borders::ALL))
            .alignment(Alignment::Center);
        f.render_widget(empty, area);
        return;
    };

    let position = session.current_index + 1;
    let total = session.content.questions.len();
    let title = format!("Question {position}/{total}");

    let mut lines = vec![
        Line::from(Span::styled(
            question.text.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::default(),
    ];

    match &question.kind {
        QuestionKind::Typing { sign } => {
            lines.push(Line::from(Span::styled(
                sign.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            )));
            lines.push(Line::default());
            let answer = session
                .answers()
                .get(&question.id)
                .cloned()
                .unwrap_or_else(|| "_".into());
            lines.push(Line::from(format!("Your answer: {answer}")));
        }
        QuestionKind::TrueFalse { statement } => {
            lines.push(Line::from(statement.clone()));
            lines.push(Line::default());
            let answer = match session.answers().get(&question.id).map(String::as_str) {
                Some("1") => "true",
                Some("0") => "false",
                _ => "_",
            };
            lines.push(Line::from(format!("Your answer: {answer} (t/f)")));
        }
        QuestionKind::Matching { pairs } => {
            for (i, pair) in pairs.iter().enumerate() {
                lines.push(slot_line(
                    app,
                    session,
                    question,
                    i,
                    &pair.letter.to_string(),
                    &format!("{} ←", pair.letter),
                ));
            }
            lines.push(Line::default());
            lines.push(bank_line(app, session));
        }
        QuestionKind::WordSpelling { word } => {
            for (i, c) in word.chars().enumerate() {
                lines.push(slot_line(
                    app,
                    session,
                    question,
                    i,
                    &i.to_string(),
                    &format!("slot {} ({c}) ←", i + 1),
                ));
            }
            lines.push(Line::default());
            lines.push(bank_line(app, session));
        }
    }

    if session.is_last_question() && session.is_current_complete() {
        lines.push(Line::default());
        lines.push(Line::from(Span::styled(
            "Press enter to submit",
            Style::default().fg(Color::Green),
        )));
    }

    let body = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(title))
        .alignment(Alignment::Center);
    f.render_widget(body, area);
}

/// One drop slot: focus marker, label, assigned sign, correctness hint.
fn slot_line<'a>(
    app: &App,
    session: &QuizSession,
    question: &Question,
    index: usize,
    slot_key: &str,
    label: &str,
) -> Line<'a> {
    let focused = app.cursor.slot == index;
    let marker = if focused { "> " } else { "  " };
    let assigned = session
        .board
        .assignment(question.id, slot_key)
        .unwrap_or("·");
    let hint = match session.board.slot_hint(question, slot_key, session.alphabet()) {
        Some(true) => Span::styled(" ✓", Style::default().fg(Color::Green)),
        Some(false) => Span::styled(" ✗", Style::default().fg(Color::Red)),
        None => Span::raw(""),
    };

    let label_style = if focused {
        Style::default().add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };

    Line::from(vec![
        Span::raw(marker.to_string()),
        Span::styled(label.to_string(), label_style),
        Span::raw(format!(" {assigned}")),
        hint,
    ])
}

/// The draggable icons, cumulative letters with distractors. The
/// picked-up icon renders reversed.
fn bank_line<'a>(app: &App, session: &QuizSession) -> Line<'a> {
    let mut spans = vec![Span::styled(
        "Signs: ".to_string(),
        Style::default().fg(Color::DarkGray),
    )];

    for (i, letter) in icon_bank(session.alphabet(), app.level).iter().enumerate() {
        let pad = 3usize.saturating_sub(letter.emoji.width());
        let cell = format!("{}{} ", letter.emoji, " ".repeat(pad));
        let style = if app.cursor.selected_icon == Some(i) {
            Style::default().add_modifier(Modifier::REVERSED)
        } else {
            Style::default()
        };
        spans.push(Span::styled(cell, style));
    }

    Line::from(spans)
}

fn render_results(app: &App, session: &QuizSession, area: Rect, f: &mut Frame) {
    let mut lines = Vec::new();

    if let Some(summary) = session.summary() {
        lines.push(Line::from(Span::styled(
            format!(
                "Score: {}/{} ({}%)",
                summary.correct, summary.total, summary.percent
            ),
            Style::default().add_modifier(Modifier::BOLD),
        )));
    }

    lines.push(Line::from(format!(
        "Best for this level: {}%",
        session.highest_percent()
    )));
    if let Some(avg) = app.recent_average {
        lines.push(Line::from(format!("Recent average: {avg:.0}%")));
    }
    if let Some(leader) = leader_line(app) {
        lines.push(leader);
    }
    lines.push(Line::default());
    lines.push(advancement_line(app));

    let body = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Results"))
        .alignment(Alignment::Center);
    f.render_widget(body, area);
}

fn leader_line<'a>(app: &App) -> Option<Line<'a>> {
    app.tier_leader.as_ref().map(|name| {
        Line::from(format!("{} tier leader: {name}", app.level.tier))
    })
}

fn advancement_line<'a>(app: &App) -> Line<'a> {
    if app.submit_pending {
        return Line::from(Span::styled(
            "Saving score...",
            Style::default().fg(Color::DarkGray),
        ));
    }

    match &app.advance {
        Some(AdvanceResult::Confirmed(next)) => Line::from(Span::styled(
            format!("Advanced to {next}! Press c to continue."),
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
        )),
        Some(AdvanceResult::Failed(msg)) => Line::from(Span::styled(
            format!("Advancement not confirmed: {msg}"),
            Style::default().fg(Color::Red),
        )),
        _ => Line::from(Span::styled(
            "Score 100% to advance to the next level.",
            Style::default().fg(Color::DarkGray),
        )),
    }
}

fn render_camera(app: &App, evaluator: &CameraEvaluator, area: Rect, f: &mut Frame) {
    let mut lines = Vec::new();

    match evaluator.phase() {
        EvaluatorPhase::LoadingDetector => {
            lines.push(Line::from("Loading hand detector..."));
        }
        EvaluatorPhase::Failed(guidance) => {
            lines.push(Line::from(Span::styled(
                guidance.clone(),
                Style::default().fg(Color::Red),
            )));
        }
        EvaluatorPhase::Ready => {
            lines.push(Line::from("Detector ready. Start the camera to begin."));
        }
        EvaluatorPhase::CameraActive | EvaluatorPhase::Checking => {
            if let Some(target) = evaluator.current_target() {
                lines.push(Line::from(Span::styled(
                    format!("Show the sign for: {target}"),
                    Style::default().add_modifier(Modifier::BOLD),
                )));
            }
            lines.push(Line::default());

            let hand = if evaluator.has_frame() {
                Span::styled("hand in view", Style::default().fg(Color::Green))
            } else {
                Span::styled(
                    "no hand detected",
                    Style::default().fg(Color::DarkGray),
                )
            };
            lines.push(Line::from(hand));

            if *evaluator.phase() == EvaluatorPhase::Checking {
                lines.push(Line::default());
                lines.push(Line::from(Span::styled(
                    "Checking...",
                    Style::default().fg(Color::Yellow),
                )));
            }

            if let Some(check) = evaluator.last_check() {
                lines.push(Line::default());
                let verdict = if check.passed {
                    Span::styled("PASS", Style::default().fg(Color::Green))
                } else {
                    Span::styled("not yet", Style::default().fg(Color::Red))
                };
                lines.push(Line::from(vec![
                    verdict,
                    Span::raw(format!(
                        "  confidence {:.2} (needs {:.2})",
                        check.confidence, check.threshold
                    )),
                ]));
                if let Some(prediction) = &check.prediction {
                    lines.push(Line::from(format!("classifier saw: {prediction}")));
                }
            }
        }
        EvaluatorPhase::Complete => {
            let summary = evaluator.summary();
            lines.push(Line::from(Span::styled(
                format!(
                    "Score: {}/{} ({}%)",
                    summary.correct, summary.total, summary.percent
                ),
                Style::default().add_modifier(Modifier::BOLD),
            )));
            lines.push(Line::default());
            for outcome in evaluator.results() {
                let mark = if outcome.correct {
                    Span::styled("✓", Style::default().fg(Color::Green))
                } else {
                    Span::styled("✗", Style::default().fg(Color::Red))
                };
                lines.push(Line::from(vec![
                    Span::raw(format!("{}  ", outcome.letter)),
                    mark,
                ]));
            }
            if let Some(leader) = leader_line(app) {
                lines.push(leader);
            }
            lines.push(Line::default());
            lines.push(advancement_line(app));
        }
    }

    let done = evaluator.results().len();
    let total = done + evaluator.current_target().map_or(0, |_| 1);
    let title = if evaluator.is_complete() {
        "Camera results".to_string()
    } else {
        format!("Camera quiz — sign {} of {}", done + 1, total.max(done + 1))
    };

    let body = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(title))
        .alignment(Alignment::Center);
    f.render_widget(body, area);
}
