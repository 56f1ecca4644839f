pub mod overlay;

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget, Wrap},
};
use unicode_width::UnicodeWidthStr;

use crate::backend::Backend;
use crate::summary::SessionSummary;
use crate::workflow::{AppState, AuthField, Controller};

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 1;

/// Lines a text box needs to show `text` wrapped at `width` columns, plus borders
fn box_height(text: &str, width: u16) -> u16 {
    let inner = width.saturating_sub(2).max(1) as f64;
    let lines = (text.width() as f64 / inner).ceil().max(1.0) as u16;
    lines + 2
}

pub fn format_confidence(confidence: f64) -> String {
    format!("({:.0}% Confident)", confidence * 100.0)
}

pub fn format_summary(summary: &SessionSummary) -> String {
    let ms = |v: Option<f64>| v.map_or("-".to_string(), |v| format!("{:.0}", v));
    format!(
        "last sample: {} presses   hold {}±{} ms   latency {} ms   {} wpm",
        summary.press_count,
        ms(summary.mean_hold_ms),
        ms(summary.hold_std_dev_ms),
        ms(summary.mean_latency_ms),
        ms(summary.wpm),
    )
}

fn legend<B: Backend>(c: &Controller<B>) -> &'static str {
    match c.state() {
        AppState::Auth => {
            "(tab) field / (enter) submit / (F2) log in·sign up / (F3) users / (F4) leaderboard / (esc) quit"
        }
        AppState::TrainFree if c.can_train() => {
            "(F6) train model / (F3) users / (F4) leaderboard / (F5) profile / (F10) log out / (esc) quit"
        }
        _ => "(F3) users / (F4) leaderboard / (F5) profile / (F10) log out / (esc) quit",
    }
}

impl<B: Backend> Widget for &Controller<B> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let bold_style = Style::default().add_modifier(Modifier::BOLD);
        let dim_style = Style::default().add_modifier(Modifier::DIM);
        let italic_style = Style::default().add_modifier(Modifier::ITALIC);
        let message_style = Style::default().fg(Color::Cyan);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .vertical_margin(VERTICAL_MARGIN)
            .constraints([
                Constraint::Length(1), // title
                Constraint::Length(1), // padding
                Constraint::Length(2), // message
                Constraint::Min(1),    // body
                Constraint::Length(1), // summary
                Constraint::Length(1), // legend
            ])
            .split(area);

        let title = match self.user() {
            Some(user) => format!("keyprint · {} ({})", self.state(), user),
            None => format!("keyprint · {}", self.auth().mode),
        };
        Paragraph::new(Span::styled(title, bold_style.fg(Color::Magenta)))
            .alignment(Alignment::Center)
            .render(chunks[0], buf);

        Paragraph::new(Span::styled(self.message().to_string(), message_style))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .render(chunks[2], buf);

        match self.state() {
            AppState::Auth => render_auth(self, chunks[3], buf),
            AppState::TrainDiverse | AppState::TrainFree => render_training(self, chunks[3], buf),
            AppState::Predicting => render_prediction(self, chunks[3], buf),
        }

        if let Some(summary) = self.last_summary() {
            if self.state() != AppState::Auth {
                Paragraph::new(Span::styled(format_summary(summary), dim_style))
                    .alignment(Alignment::Center)
                    .render(chunks[4], buf);
            }
        }

        Paragraph::new(Span::styled(legend(self), italic_style)).render(chunks[5], buf);

        if let Some(ov) = self.overlay() {
            overlay::render_overlay(ov, self.user(), area, buf);
        }
    }
}

fn render_auth<B: Backend>(c: &Controller<B>, area: Rect, buf: &mut Buffer) {
    let form = c.auth();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(0),
        ])
        .split(area);

    let field = |label: &str, value: String, focused: bool| {
        let border_style = if focused {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default().add_modifier(Modifier::DIM)
        };
        Paragraph::new(value).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border_style)
                .title(label.to_string()),
        )
    };

    field(
        "Username",
        form.username.clone(),
        form.focus == AuthField::Username,
    )
    .render(chunks[0], buf);
    field(
        "Password",
        "*".repeat(form.password.chars().count()),
        form.focus == AuthField::Password,
    )
    .render(chunks[1], buf);
}

fn render_training<B: Backend>(c: &Controller<B>, area: Rect, buf: &mut Buffer) {
    let diverse = c.state() == AppState::TrainDiverse;
    let typed = c.typed_text();
    let text_height = box_height(typed, area.width).max(3);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(if diverse { 2 } else { 0 }),
            Constraint::Length(text_height),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .split(area);

    if diverse {
        Paragraph::new(Span::styled(
            c.current_sentence().to_string(),
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
        ))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .render(chunks[0], buf);
    }

    let placeholder = if !c.input_enabled() {
        "All samples collected."
    } else if diverse {
        "Type the sentence... (auto-submits on perfect match)"
    } else {
        "Type any sentence of your own and press Enter..."
    };
    typing_area(typed, placeholder).render(chunks[1], buf);

    if diverse {
        Paragraph::new(Span::styled(
            "Or press Enter to submit a misspelled try",
            Style::default().add_modifier(Modifier::ITALIC | Modifier::DIM),
        ))
        .alignment(Alignment::Center)
        .render(chunks[2], buf);
    }

    let (done, required) = if diverse {
        (c.diverse_count(), c.plan().diverse_samples_required())
    } else {
        (c.free_count(), c.plan().free_samples_required)
    };
    Paragraph::new(Span::styled(
        format!("Progress: {} / {}", done, required),
        Style::default().add_modifier(Modifier::BOLD),
    ))
    .alignment(Alignment::Center)
    .render(chunks[3], buf);
}

fn render_prediction<B: Backend>(c: &Controller<B>, area: Rect, buf: &mut Buffer) {
    let text = c.free_text();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(box_height(text, area.width).max(3)),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .split(area);

    typing_area(text, "Type anything here and press Enter to predict...").render(chunks[0], buf);

    let mut spans = vec![
        Span::raw("Prediction: "),
        Span::styled(
            c.prediction().unwrap_or("Waiting...").to_string(),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
    ];
    if let Some(confidence) = c.confidence() {
        spans.push(Span::raw(" "));
        spans.push(Span::styled(
            format_confidence(confidence),
            Style::default().add_modifier(Modifier::DIM),
        ));
    }
    Paragraph::new(Line::from(spans))
        .alignment(Alignment::Center)
        .render(chunks[1], buf);
}

fn typing_area<'a>(text: &'a str, placeholder: &'a str) -> Paragraph<'a> {
    let content = if text.is_empty() {
        Span::styled(
            placeholder,
            Style::default().add_modifier(Modifier::DIM | Modifier::ITALIC),
        )
    } else {
        Span::raw(text)
    };
    Paragraph::new(Line::from(vec![
        content,
        Span::styled("▏", Style::default().add_modifier(Modifier::SLOW_BLINK)),
    ]))
    .wrap(Wrap { trim: false })
    .block(Block::default().borders(Borders::ALL))
}
