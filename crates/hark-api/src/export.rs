//! CSV export — a read-only projection of the contact inbox.

use axum::{
  extract::State,
  http::{StatusCode, header},
  response::IntoResponse,
};
use hark_core::{contact::Contact, store::ContactAdminStore as _};
use tracing::info;

use crate::{ApiError, ApiState, StoreBundle, auth::AdminOnly, store_err};

/// `GET /contacts/export` — all contacts, newest first, as `text/csv`.
pub async fn handler<S>(
  State(state): State<ApiState<S>>,
  AdminOnly(_): AdminOnly,
) -> Result<impl IntoResponse, ApiError>
where
  S: StoreBundle,
{
  let contacts = state.store.export_all().await.map_err(store_err)?;
  let csv = contacts_to_csv(&contacts);

  info!(rows = contacts.len(), "contacts exported to CSV");
  Ok((
    StatusCode::OK,
    [
      (header::CONTENT_TYPE, "text/csv"),
      (
        header::CONTENT_DISPOSITION,
        "attachment; filename=contacts.csv",
      ),
    ],
    csv,
  ))
}

/// Render contacts as CSV with the fixed header row. Fields containing a
/// comma, double quote, or newline are wrapped in double quotes with inner
/// quotes doubled.
pub fn contacts_to_csv(contacts: &[Contact]) -> String {
  let mut out = String::from("Name,Email,Subject,Message,Status,Created At\n");
  for contact in contacts {
    let row = [
      escape(&contact.name),
      escape(&contact.email),
      escape(contact.topic.as_str()),
      escape(&contact.message),
      escape(contact.status.as_str()),
      escape(&contact.created_at.to_rfc3339()),
    ];
    out.push_str(&row.join(","));
    out.push('\n');
  }
  out
}

fn escape(field: &str) -> String {
  if field.contains(['"', ',', '\n', '\r']) {
    format!("\"{}\"", field.replace('"', "\"\""))
  } else {
    field.to_owned()
  }
}

#[cfg(test)]
mod tests {
  use chrono::Utc;
  use hark_core::contact::{ContactStatus, Topic};
  use uuid::Uuid;

  use super::*;

  fn contact(name: &str, message: &str) -> Contact {
    Contact {
      contact_id: Uuid::new_v4(),
      name:       name.into(),
      email:      "jane@example.com".into(),
      topic:      Topic::Demo,
      message:    message.into(),
      owner_id:   None,
      status:     ContactStatus::New,
      is_read:    false,
      ip_address: None,
      user_agent: None,
      created_at: Utc::now(),
      updated_at: Utc::now(),
    }
  }

  /// Minimal RFC-4180 reader, enough to verify our own output.
  fn parse_csv(text: &str) -> Vec<Vec<String>> {
    let mut rows = vec![];
    let mut row = vec![];
    let mut field = String::new();
    let mut quoted = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
      match c {
        '"' if quoted => {
          if chars.peek() == Some(&'"') {
            chars.next();
            field.push('"');
          } else {
            quoted = false;
          }
        }
        '"' if field.is_empty() => quoted = true,
        ',' if !quoted => {
          row.push(std::mem::take(&mut field));
        }
        '\n' if !quoted => {
          row.push(std::mem::take(&mut field));
          rows.push(std::mem::take(&mut row));
        }
        c => field.push(c),
      }
    }
    if !field.is_empty() || !row.is_empty() {
      row.push(field);
      rows.push(row);
    }
    rows
  }

  #[test]
  fn header_row_is_fixed() {
    let csv = contacts_to_csv(&[]);
    assert_eq!(csv, "Name,Email,Subject,Message,Status,Created At\n");
  }

  #[test]
  fn plain_fields_are_unquoted() {
    let csv = contacts_to_csv(&[contact("Jane Doe", "A plain message")]);
    let line = csv.lines().nth(1).unwrap();
    assert!(line.starts_with("Jane Doe,jane@example.com,demo,A plain message,new,"));
  }

  #[test]
  fn round_trip_preserves_embedded_commas_quotes_and_newlines() {
    let tricky = [
      contact("Doe, Jane", "She said \"hello, world\""),
      contact("Multi", "line one\nline two"),
      contact("Plain", "nothing special here"),
    ];
    let csv = contacts_to_csv(&tricky);
    let rows = parse_csv(&csv);

    assert_eq!(rows.len(), 4, "header plus three records");
    assert_eq!(rows[0], vec!["Name", "Email", "Subject", "Message", "Status", "Created At"]);

    for (row, original) in rows[1..].iter().zip(&tricky) {
      assert_eq!(row[0], original.name);
      assert_eq!(row[1], original.email);
      assert_eq!(row[2], original.topic.as_str());
      assert_eq!(row[3], original.message);
      assert_eq!(row[4], original.status.as_str());
      assert_eq!(row[5], original.created_at.to_rfc3339());
    }
  }
}
