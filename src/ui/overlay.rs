use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Widget},
};

use crate::payload::{LeaderboardEntry, UserStats, UserSummary};
use crate::workflow::Overlay;

pub fn format_percent(ratio: f64) -> String {
    format!("{:.2}%", ratio * 100.0)
}

/// Rows of label/value pairs for a user's detail view
pub fn detail_rows(stats: &UserStats) -> Vec<(&'static str, String)> {
    vec![
        ("Total Samples", stats.total_samples.to_string()),
        ("Average WPM", format!("{:.1}", stats.avg_wpm)),
        (
            "Avg. Accuracy",
            stats
                .avg_accuracy
                .map_or("N/A".to_string(), format_percent),
        ),
        ("Avg. Hold Time", format!("{:.0} ms", stats.avg_hold_time_ms)),
        (
            "Avg. Hold Deviation",
            format!("{:.0} ms", stats.avg_hold_std_ms),
        ),
        ("Avg. Latency", format!("{:.0} ms", stats.avg_latency_ms)),
    ]
}

fn leaderboard_row(rank: usize, entry: &LeaderboardEntry) -> Row<'static> {
    let color = match rank {
        1 => Color::Yellow,
        2 | 3 => Color::Cyan,
        _ => Color::Reset,
    };
    Row::new(vec![
        Cell::from(rank.to_string()),
        Cell::from(entry.username.clone()),
        Cell::from(format_percent(entry.avg_accuracy)),
    ])
    .style(Style::default().fg(color))
}

fn user_row(user: &UserSummary, highlighted: bool) -> Row<'static> {
    let row = Row::new(vec![
        Cell::from(user.username.clone()),
        Cell::from(user.samples.to_string()),
    ]);
    if highlighted {
        row.style(Style::default().bg(Color::DarkGray))
    } else {
        row
    }
}

/// Centered rect using up to `percent_x`% width and `percent_y`% height of `r`
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

pub fn render_overlay(overlay: &Overlay, current_user: Option<&str>, area: Rect, buf: &mut Buffer) {
    let popup = centered_rect(70, 70, area);
    Clear.render(popup, buf);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(3)])
        .split(popup);

    let header_style = Style::default()
        .fg(Color::Yellow)
        .add_modifier(Modifier::BOLD);

    let instructions = match overlay {
        Overlay::Users { users, selected } => {
            let table = if users.is_empty() {
                Table::new(
                    vec![Row::new(vec![Cell::from("No users have been trained yet.")])],
                    [Constraint::Min(10)],
                )
            } else {
                Table::new(
                    users
                        .iter()
                        .enumerate()
                        .map(|(i, u)| user_row(u, i == *selected))
                        .collect::<Vec<_>>(),
                    [Constraint::Min(16), Constraint::Length(18)],
                )
                .header(Row::new(vec!["Username", "Samples Submitted"]).style(header_style))
            };
            table
                .block(Block::default().borders(Borders::ALL).title("User List"))
                .render(chunks[0], buf);
            "↑/↓ select / (enter) details / (esc) close"
        }
        Overlay::Leaderboard(entries) => {
            let table = if entries.is_empty() {
                Table::new(
                    vec![Row::new(vec![Cell::from("No accuracy data available.")])],
                    [Constraint::Min(10)],
                )
            } else {
                Table::new(
                    entries
                        .iter()
                        .enumerate()
                        .map(|(i, e)| leaderboard_row(i + 1, e))
                        .collect::<Vec<_>>(),
                    [
                        Constraint::Length(6),
                        Constraint::Min(16),
                        Constraint::Length(14),
                    ],
                )
                .header(Row::new(vec!["Rank", "Username", "Avg. Accuracy"]).style(header_style))
            };
            table
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .title("Accuracy Leaderboard (diverse sentence training)"),
                )
                .render(chunks[0], buf);
            "(esc) close"
        }
        Overlay::UserDetail(stats) => {
            let rows = detail_rows(stats)
                .into_iter()
                .map(|(label, value)| {
                    Row::new(vec![
                        Cell::from(label),
                        Cell::from(value).style(Style::default().add_modifier(Modifier::BOLD)),
                    ])
                })
                .collect::<Vec<_>>();
            Table::new(rows, [Constraint::Length(22), Constraint::Min(10)])
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .title(format!("Stats for: {}", stats.username)),
                )
                .render(chunks[0], buf);
            if current_user == Some(stats.username.as_str()) {
                "(a) add more samples / (b)ack to list / (esc) close"
            } else {
                "(b)ack to list / (esc) close"
            }
        }
    };

    Paragraph::new(instructions)
        .block(Block::default().borders(Borders::ALL))
        .style(
            Style::default()
                .fg(Color::Gray)
                .add_modifier(Modifier::ITALIC),
        )
        .alignment(Alignment::Center)
        .render(chunks[1], buf);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(avg_accuracy: Option<f64>) -> UserStats {
        UserStats {
            username: "ada".into(),
            total_samples: 12,
            avg_wpm: 61.26,
            avg_accuracy,
            avg_hold_time_ms: 98.4,
            avg_hold_std_ms: 21.6,
            avg_latency_ms: 140.0,
        }
    }

    fn rendered(overlay: &Overlay, user: Option<&str>) -> String {
        let area = Rect::new(0, 0, 100, 30);
        let mut buf = Buffer::empty(area);
        render_overlay(overlay, user, area, &mut buf);
        buf.content().iter().map(|c| c.symbol()).collect()
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(0.97), "97.00%");
        assert_eq!(format_percent(0.12345), "12.35%");
    }

    #[test]
    fn test_detail_rows() {
        let rows = detail_rows(&stats(Some(0.9)));
        assert_eq!(rows[0], ("Total Samples", "12".to_string()));
        assert_eq!(rows[1].1, "61.3");
        assert_eq!(rows[2].1, "90.00%");
        assert_eq!(rows[3].1, "98 ms");
        assert_eq!(rows[4].1, "22 ms");

        let rows = detail_rows(&stats(None));
        assert_eq!(rows[2].1, "N/A");
    }

    #[test]
    fn test_centered_rect_fits_inside() {
        let area = Rect::new(0, 0, 100, 40);
        let r = centered_rect(70, 70, area);
        assert!(r.width <= 70 && r.height <= 28);
        assert!(r.x >= 15 && r.y >= 6);
    }

    #[test]
    fn test_user_detail_offers_add_samples_only_for_self() {
        let ov = Overlay::UserDetail(stats(None));
        assert!(rendered(&ov, Some("ada")).contains("add more samples"));
        assert!(!rendered(&ov, Some("bob")).contains("add more samples"));
    }

    #[test]
    fn test_empty_lists_render_placeholders() {
        let out = rendered(
            &Overlay::Users {
                users: vec![],
                selected: 0,
            },
            None,
        );
        assert!(out.contains("No users have been trained yet."));

        let out = rendered(&Overlay::Leaderboard(vec![]), None);
        assert!(out.contains("No accuracy data available."));
    }
}
