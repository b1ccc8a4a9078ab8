//! Axum WebSocket transport for the dashboard push channel.
//!
//! A connecting client is registered into the shared broadcast group
//! immediately. It then announces itself with JSON messages:
//!
//! ```json
//! {"type": "join_dashboard"}
//! {"type": "join_account", "account_id": "<uuid>"}
//! ```
//!
//! `join_dashboard` is an acknowledgement only — registration already put
//! the session in the broadcast group. `join_account` puts the session in
//! that account's room; absent or malformed ids are silently ignored.
//! Server frames are `{"event": "contact:created", "data": {…envelope…}}`.

use std::sync::Arc;

use axum::{
  Router,
  extract::{
    State, WebSocketUpgrade,
    ws::{Message, WebSocket},
  },
  response::IntoResponse,
  routing::get,
};
use futures_util::{SinkExt as _, StreamExt as _};
use hark_core::event::ContactEvent;
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use crate::registry::RoomRegistry;

/// Build a router exposing the push channel at `/ws`.
pub fn router(registry: Arc<RoomRegistry>) -> Router<()> {
  Router::new()
    .route("/ws", get(upgrade_handler))
    .with_state(registry)
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientMessage {
  JoinDashboard,
  JoinAccount { account_id: Option<String> },
}

/// One outbound frame: the wire event name plus the envelope.
#[derive(serde::Serialize)]
struct Frame<'a> {
  event: &'static str,
  data:  &'a ContactEvent,
}

async fn upgrade_handler(
  State(registry): State<Arc<RoomRegistry>>,
  ws: WebSocketUpgrade,
) -> impl IntoResponse {
  ws.on_upgrade(move |socket| handle_socket(socket, registry))
}

async fn handle_socket(socket: WebSocket, registry: Arc<RoomRegistry>) {
  let (session, mut events) = registry.register_session();
  debug!(%session, "push channel connected");

  let (mut sink, mut stream) = socket.split();

  // Pump: per-session channel → socket, preserving emission order. A failed
  // send means the peer is gone; the read loop below will see the close.
  let mut pump = tokio::spawn(async move {
    while let Some(event) = events.recv().await {
      let frame = Frame { event: event.event_name(), data: &event };
      let Ok(text) = serde_json::to_string(&frame) else { continue };
      if sink.send(Message::Text(text.into())).await.is_err() {
        break;
      }
    }
  });

  // Read loop: room-membership announcements. Unknown or malformed messages
  // are ignored rather than terminating the channel.
  while let Some(Ok(msg)) = stream.next().await {
    let Message::Text(text) = msg else { continue };
    let Ok(parsed) = serde_json::from_str::<ClientMessage>(text.as_str()) else {
      continue;
    };
    match parsed {
      ClientMessage::JoinDashboard => {}
      ClientMessage::JoinAccount { account_id } => {
        let account_id =
          account_id.as_deref().and_then(|s| Uuid::parse_str(s).ok());
        registry.join_account_room(session, account_id);
      }
    }
  }

  pump.abort();
  registry.remove_session(session);
  debug!(%session, "push channel disconnected");
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn client_messages_parse() {
    let m: ClientMessage =
      serde_json::from_str(r#"{"type":"join_dashboard"}"#).unwrap();
    assert!(matches!(m, ClientMessage::JoinDashboard));

    let m: ClientMessage = serde_json::from_str(
      r#"{"type":"join_account","account_id":"6c1c9f0e-9f6a-4a3e-8f69-0d0c6a1f4b2a"}"#,
    )
    .unwrap();
    assert!(matches!(
      m,
      ClientMessage::JoinAccount { account_id: Some(_) }
    ));

    // Absent id still parses; the join then no-ops.
    let m: ClientMessage =
      serde_json::from_str(r#"{"type":"join_account"}"#).unwrap();
    assert!(matches!(m, ClientMessage::JoinAccount { account_id: None }));
  }

  #[test]
  fn frames_carry_the_wire_event_name() {
    let event = ContactEvent::deleted(Uuid::new_v4());
    let frame = Frame { event: event.event_name(), data: &event };
    let json: serde_json::Value =
      serde_json::from_str(&serde_json::to_string(&frame).unwrap()).unwrap();
    assert_eq!(json["event"], "contact:deleted");
    assert_eq!(json["data"]["type"], "deleted");
  }
}
