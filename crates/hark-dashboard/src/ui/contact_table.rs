//! The contact table pane.

use chrono::{DateTime, Utc};
use hark_core::contact::ContactStatus;
use ratatui::{
  Frame,
  layout::{Constraint, Rect},
  style::{Color, Modifier, Style},
  widgets::{Block, Borders, Cell, Row, Table},
};

use crate::app::App;

pub fn draw(f: &mut Frame, area: Rect, app: &App) {
  let header = Row::new(vec!["Name", "Email", "Subject", "Status", "Received"])
    .style(
      Style::default()
        .fg(Color::DarkGray)
        .add_modifier(Modifier::BOLD),
    );

  let rows = app.reconciler.contacts.iter().enumerate().map(|(i, c)| {
    let style = if i == app.cursor {
      Style::default()
        .bg(Color::DarkGray)
        .add_modifier(Modifier::BOLD)
    } else if !c.is_read {
      Style::default().add_modifier(Modifier::BOLD)
    } else {
      Style::default()
    };

    Row::new(vec![
      Cell::from(c.name.clone()),
      Cell::from(c.email.clone()),
      Cell::from(c.topic.as_str()),
      Cell::from(c.status.as_str()).style(status_style(c.status)),
      Cell::from(time_ago(c.created_at)),
    ])
    .style(style)
  });

  let count = app.reconciler.contacts.len();
  let table = Table::new(
    rows,
    [
      Constraint::Percentage(22),
      Constraint::Percentage(26),
      Constraint::Percentage(14),
      Constraint::Percentage(12),
      Constraint::Percentage(26),
    ],
  )
  .header(header)
  .block(
    Block::default()
      .title(format!(" Inbox ({count}) "))
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::DarkGray)),
  );

  f.render_widget(table, area);
}

fn status_style(status: ContactStatus) -> Style {
  let color = match status {
    ContactStatus::New => Color::Cyan,
    ContactStatus::Read => Color::Blue,
    ContactStatus::Replied => Color::Green,
    ContactStatus::Archived => Color::DarkGray,
  };
  Style::default().fg(color)
}

/// Coarse relative timestamp, matching what the inbox shows on the web.
fn time_ago(at: DateTime<Utc>) -> String {
  let elapsed = Utc::now().signed_duration_since(at);
  let hours = elapsed.num_hours();
  let days = elapsed.num_days();

  if days > 0 {
    format!("{days} day{} ago", if days > 1 { "s" } else { "" })
  } else if hours > 0 {
    format!("{hours} hour{} ago", if hours > 1 { "s" } else { "" })
  } else {
    "Just now".to_owned()
  }
}

#[cfg(test)]
mod tests {
  use chrono::Duration;

  use super::*;

  #[test]
  fn time_ago_buckets() {
    let now = Utc::now();
    assert_eq!(time_ago(now), "Just now");
    assert_eq!(time_ago(now - Duration::hours(1)), "1 hour ago");
    assert_eq!(time_ago(now - Duration::hours(5)), "5 hours ago");
    assert_eq!(time_ago(now - Duration::days(1)), "1 day ago");
    assert_eq!(time_ago(now - Duration::days(3)), "3 days ago");
  }
}
