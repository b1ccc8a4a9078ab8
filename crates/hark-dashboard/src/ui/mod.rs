//! TUI rendering — header, stats row, contact table, status bar.

pub mod contact_table;

use ratatui::{
  Frame,
  layout::{Constraint, Direction, Layout, Rect},
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::Paragraph,
};

use crate::app::App;

// ─── Root draw ───────────────────────────────────────────────────────────────

/// Main draw function called each frame.
pub fn draw(f: &mut Frame, app: &App) {
  let area = f.area();

  let rows = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1), // header
      Constraint::Length(1), // stats row
      Constraint::Min(0),    // contact table
      Constraint::Length(1), // status bar
    ])
    .split(area);

  draw_header(f, rows[0], app);
  draw_stats(f, rows[1], app);
  contact_table::draw(f, rows[2], app);
  draw_status(f, rows[3], app);
}

// ─── Header ──────────────────────────────────────────────────────────────────

fn draw_header(f: &mut Frame, area: Rect, app: &App) {
  let left = Span::styled(
    " hark  [r] refresh  [e] export  [q] quit",
    Style::default()
      .fg(Color::White)
      .add_modifier(Modifier::BOLD),
  );

  // Connection indicator — the only user-visible signal of channel state.
  let right = if app.reconciler.is_live() {
    Span::styled("● Live ", Style::default().fg(Color::Green))
  } else {
    Span::styled("○ Offline ", Style::default().fg(Color::DarkGray))
  };

  let left_width = left.content.len() as u16;
  let right_width = right.content.chars().count() as u16;
  let pad = area
    .width
    .saturating_sub(left_width)
    .saturating_sub(right_width);

  let line = Line::from(vec![left, Span::raw(" ".repeat(pad as usize)), right]);
  f.render_widget(
    Paragraph::new(line).style(Style::default().bg(Color::DarkGray)),
    area,
  );
}

// ─── Stats row ───────────────────────────────────────────────────────────────

fn draw_stats(f: &mut Frame, area: Rect, app: &App) {
  let s = &app.reconciler.stats;

  let cell = |label: &str, value: u64, color: Color| {
    vec![
      Span::styled(format!(" {label} "), Style::default().fg(Color::DarkGray)),
      Span::styled(
        value.to_string(),
        Style::default().fg(color).add_modifier(Modifier::BOLD),
      ),
      Span::raw(" "),
    ]
  };

  let mut spans = Vec::new();
  spans.extend(cell("Total", s.total, Color::White));
  spans.extend(cell("New", s.new, Color::Cyan));
  spans.extend(cell("Read", s.read, Color::Blue));
  spans.extend(cell("Replied", s.replied, Color::Green));
  spans.extend(cell("Archived", s.archived, Color::DarkGray));
  spans.extend(cell("Unread", s.unread, Color::Yellow));
  spans.extend(cell("30d", s.last_30_days, Color::Magenta));

  f.render_widget(Paragraph::new(Line::from(spans)), area);
}

// ─── Status bar ──────────────────────────────────────────────────────────────

fn draw_status(f: &mut Frame, area: Rect, app: &App) {
  let hints = "↑↓/jk navigate  1-4 status  d delete  r refresh  e export  q quit";
  let status = if app.status_msg.is_empty() {
    hints.to_string()
  } else {
    app.status_msg.clone()
  };

  let mode = if app.reconciler.is_live() { " LIVE " } else { " POLL " };
  let mode_span = Span::styled(
    mode,
    Style::default()
      .fg(Color::Black)
      .bg(if app.reconciler.is_live() { Color::Green } else { Color::Cyan })
      .add_modifier(Modifier::BOLD),
  );
  let hint_span =
    Span::styled(format!("  {status}"), Style::default().fg(Color::DarkGray));

  f.render_widget(
    Paragraph::new(Line::from(vec![mode_span, hint_span]))
      .style(Style::default().bg(Color::Black)),
    area,
  );
}
