//! Application state and event dispatcher: drives the reconciler's effects
//! against the HTTP client and the (optional) push channel.

use std::{
  sync::Arc,
  time::Instant,
};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use hark_core::contact::{Contact, ContactStatus};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::{
  client::ApiClient,
  reconciler::{Effect, POLL_INTERVAL, Reconciler},
};

/// Signals arriving from a push-channel transport. The reconciler itself is
/// transport-agnostic; anything able to produce these can drive it.
#[derive(Debug)]
pub enum PushSignal {
  Connected,
  Disconnected,
  Event(hark_core::event::ContactEvent),
}

/// Outbound half of a push channel: room announcements.
pub struct PushHandle {
  pub join: mpsc::UnboundedSender<Option<Uuid>>,
}

/// How many rows one full re-fetch requests.
const FETCH_LIMIT: u32 = 100;

pub struct App {
  pub client:     Arc<ApiClient>,
  pub reconciler: Reconciler,

  /// Cursor position within the contact list.
  pub cursor: usize,

  /// One-line status message shown in the status bar.
  pub status_msg: String,

  /// Next scheduled poll, when the fallback timer is running.
  poll_deadline: Option<Instant>,

  /// Inbound push signals, when a transport is attached. Without one the
  /// dashboard simply stays in polling mode.
  push_rx:   Option<mpsc::UnboundedReceiver<PushSignal>>,
  push_join: Option<PushHandle>,
}

impl App {
  /// Create the app and perform the reconciler's initial effects (first full
  /// fetch plus the poll timer).
  pub async fn new(client: ApiClient, account_id: Option<Uuid>) -> Self {
    let (reconciler, initial_effects) = Reconciler::new(account_id);
    let mut app = Self {
      client: Arc::new(client),
      reconciler,
      cursor: 0,
      status_msg: String::new(),
      poll_deadline: None,
      push_rx: None,
      push_join: None,
    };
    app.perform_effects(initial_effects).await;
    app
  }

  /// Attach a push-channel transport.
  pub fn attach_push_channel(
    &mut self,
    rx: mpsc::UnboundedReceiver<PushSignal>,
    join: PushHandle,
  ) {
    self.push_rx = Some(rx);
    self.push_join = Some(join);
  }

  pub fn selected(&self) -> Option<&Contact> {
    self.reconciler.contacts.get(self.cursor)
  }

  // ── Effect execution ──────────────────────────────────────────────────────

  async fn perform_effects(&mut self, effects: Vec<Effect>) {
    for effect in effects {
      match effect {
        Effect::Refetch => self.refetch().await,
        Effect::RefetchStats => {
          if let Ok(stats) = self.client.get_stats().await {
            self.reconciler.apply_stats(stats);
          }
        }
        Effect::JoinAccount(account_id) => {
          if let Some(push) = &self.push_join {
            let _ = push.join.send(account_id);
          }
        }
        Effect::StartPolling => {
          self.poll_deadline = Some(Instant::now() + POLL_INTERVAL);
        }
        Effect::StopPolling => {
          self.poll_deadline = None;
        }
      }
    }
  }

  async fn refetch(&mut self) {
    let client = self.client.clone();
    let result = tokio::try_join!(
      client.list_contacts(1, FETCH_LIMIT),
      client.get_stats(),
    );
    match result {
      Ok(((contacts, _pagination), stats)) => {
        self.reconciler.apply_refetch(contacts, stats);
        self.clamp_cursor();
        self.status_msg.clear();
      }
      Err(e) => {
        // The next poll cycle retries; surface the failure quietly.
        self.status_msg = format!("Error: {e}");
      }
    }
  }

  fn clamp_cursor(&mut self) {
    let len = self.reconciler.contacts.len();
    if self.cursor >= len {
      self.cursor = len.saturating_sub(1);
    }
  }

  // ── Timers & push signals ─────────────────────────────────────────────────

  /// Called every loop iteration: fire the poll timer when due.
  pub async fn tick(&mut self) {
    let due = self
      .poll_deadline
      .is_some_and(|deadline| Instant::now() >= deadline);
    if due {
      let effects = self.reconciler.on_poll_tick();
      self.perform_effects(effects).await;
      // Re-arm unless a connect cancelled polling during the fetch.
      if self.poll_deadline.is_some() {
        self.poll_deadline = Some(Instant::now() + POLL_INTERVAL);
      }
    }
  }

  /// Drain any pending push signals into the reconciler.
  pub async fn drain_push(&mut self) {
    let mut signals = Vec::new();
    if let Some(rx) = self.push_rx.as_mut() {
      while let Ok(signal) = rx.try_recv() {
        signals.push(signal);
      }
    }
    if signals.is_empty() {
      return;
    }

    let mut effects = Vec::new();
    for signal in signals {
      match signal {
        PushSignal::Connected => effects.extend(self.reconciler.on_connected()),
        PushSignal::Disconnected => {
          effects.extend(self.reconciler.on_disconnected())
        }
        PushSignal::Event(event) => {
          effects.extend(self.reconciler.apply_event(&event))
        }
      }
    }

    self.perform_effects(effects).await;
    self.clamp_cursor();
  }

  // ── Key handling ──────────────────────────────────────────────────────────

  /// Process a key event. Returns `true` to continue, `false` to quit.
  pub async fn handle_key(&mut self, key: KeyEvent) -> anyhow::Result<bool> {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c')
    {
      return Ok(false);
    }

    match key.code {
      KeyCode::Char('q') => return Ok(false),

      // Navigation
      KeyCode::Down | KeyCode::Char('j') => {
        let len = self.reconciler.contacts.len();
        if len > 0 && self.cursor + 1 < len {
          self.cursor += 1;
        }
      }
      KeyCode::Up | KeyCode::Char('k') => {
        self.cursor = self.cursor.saturating_sub(1);
      }

      // Manual refresh: the same request pair the poll timer issues.
      KeyCode::Char('r') => {
        self.refetch().await;
      }

      // Status transitions for the selected contact.
      KeyCode::Char('1') => self.set_status(ContactStatus::New).await,
      KeyCode::Char('2') => self.set_status(ContactStatus::Read).await,
      KeyCode::Char('3') => self.set_status(ContactStatus::Replied).await,
      KeyCode::Char('4') => self.set_status(ContactStatus::Archived).await,

      // Delete
      KeyCode::Char('d') => self.delete_selected().await,

      // Export
      KeyCode::Char('e') => self.export().await,

      _ => {}
    }
    Ok(true)
  }

  async fn set_status(&mut self, status: ContactStatus) {
    let Some(id) = self.selected().map(|c| c.contact_id) else { return };
    let result = self.client.update_status(id, status).await;
    match result {
      Ok(updated) => {
        // Optimistic local replace; the pushed event (if connected) dedupes
        // against this, and stats come back from the server.
        if let Some(existing) = self
          .reconciler
          .contacts
          .iter_mut()
          .find(|c| c.contact_id == id)
        {
          *existing = updated;
        }
        if let Ok(stats) = self.client.get_stats().await {
          self.reconciler.apply_stats(stats);
        }
        self.status_msg = format!("Status set to {}", status.as_str());
      }
      Err(e) => self.status_msg = format!("Error: {e}"),
    }
  }

  async fn delete_selected(&mut self) {
    let Some(id) = self.selected().map(|c| c.contact_id) else { return };
    let result = self.client.delete_contact(id).await;
    match result {
      Ok(()) => {
        self.reconciler.contacts.retain(|c| c.contact_id != id);
        self.clamp_cursor();
        if let Ok(stats) = self.client.get_stats().await {
          self.reconciler.apply_stats(stats);
        }
        self.status_msg = "Contact deleted".into();
      }
      Err(e) => self.status_msg = format!("Error: {e}"),
    }
  }

  async fn export(&mut self) {
    let result = self.client.export_csv().await;
    match result {
      Ok(csv) => {
        let filename =
          format!("contacts-{}.csv", chrono::Local::now().format("%Y-%m-%d"));
        match std::fs::write(&filename, csv) {
          Ok(()) => self.status_msg = format!("Exported to {filename}"),
          Err(e) => self.status_msg = format!("Error writing {filename}: {e}"),
        }
      }
      Err(e) => self.status_msg = format!("Error: {e}"),
    }
  }
}
