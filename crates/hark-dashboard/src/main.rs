//! `hark-dash` — terminal dashboard for the Hark contact inbox.
//!
//! # Usage
//!
//! ```text
//! hark-dash --url http://localhost:5000 --email admin@example.com --password secret
//! hark-dash --config ~/.config/hark/dashboard.toml
//! ```
//!
//! Runs in polling mode: a full list+stats re-fetch on startup and every 15
//! seconds, the same pair a push-connected dashboard uses to heal gaps.

use std::{io, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use hark_dashboard::{
  app::App,
  client::{ApiClient, ApiConfig},
  ui,
};
use crossterm::{
  event::{self, Event},
  execute,
  terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode,
    enable_raw_mode,
  },
};
use ratatui::{Terminal, backend::CrosstermBackend};
use serde::Deserialize;

// ─── CLI args ────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "hark-dash", about = "Terminal dashboard for the Hark contact inbox")]
struct Args {
  /// Path to a TOML config file (url, email, password, token).
  #[arg(short, long, value_name = "FILE")]
  config: Option<std::path::PathBuf>,

  /// Base URL of the hark server (default: http://localhost:5000).
  #[arg(long, env = "HARK_URL")]
  url: Option<String>,

  /// Account email, for password login.
  #[arg(long, env = "HARK_EMAIL")]
  email: Option<String>,

  /// Account password.
  #[arg(long, env = "HARK_PASSWORD")]
  password: Option<String>,

  /// Pre-issued bearer token (skips login).
  #[arg(long, env = "HARK_TOKEN")]
  token: Option<String>,
}

// ─── Config file ─────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default)]
struct ConfigFile {
  #[serde(default)]
  url:      String,
  #[serde(default)]
  email:    String,
  #[serde(default)]
  password: String,
  #[serde(default)]
  token:    String,
}

// ─── Entry point ─────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();

  let file_cfg: ConfigFile = if let Some(path) = &args.config {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")?
  } else {
    ConfigFile::default()
  };

  // CLI flags override config file, which overrides defaults.
  let pick = |flag: Option<String>, file: &str| {
    flag.or_else(|| (!file.is_empty()).then(|| file.to_owned()))
  };
  let base_url = pick(args.url, &file_cfg.url)
    .unwrap_or_else(|| "http://localhost:5000".to_owned());
  let email = pick(args.email, &file_cfg.email);
  let password = pick(args.password, &file_cfg.password);
  let token = pick(args.token, &file_cfg.token);

  let mut client = ApiClient::new(ApiConfig { base_url, token })?;
  if let (Some(email), Some(password)) = (&email, &password) {
    client.login(email, password).await.context("login failed")?;
  }

  // The account id scopes the push-channel room; polling works without it.
  let account_id = client.me().await.ok().map(|a| a.account_id);
  let mut app = App::new(client, account_id).await;

  // Set up the terminal.
  enable_raw_mode().context("enabling raw mode")?;
  let mut stdout = io::stdout();
  execute!(stdout, EnterAlternateScreen).context("entering alternate screen")?;
  let backend = CrosstermBackend::new(stdout);
  let mut terminal = Terminal::new(backend).context("creating terminal")?;

  let run_result = run_event_loop(&mut terminal, &mut app).await;

  // Restore terminal regardless of result.
  disable_raw_mode().ok();
  execute!(terminal.backend_mut(), LeaveAlternateScreen).ok();
  terminal.show_cursor().ok();

  run_result
}

// ─── Event loop ──────────────────────────────────────────────────────────────

async fn run_event_loop(
  terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
  app: &mut App,
) -> Result<()> {
  loop {
    app.drain_push().await;
    app.tick().await;

    terminal.draw(|f| ui::draw(f, app)).context("drawing frame")?;

    // Poll for an event, yielding control to tokio while waiting.
    let maybe_event = tokio::task::block_in_place(|| {
      if event::poll(Duration::from_millis(250))? {
        Ok::<_, io::Error>(Some(event::read()?))
      } else {
        Ok(None)
      }
    })?;

    if let Some(evt) = maybe_event {
      match evt {
        Event::Key(key) => {
          let cont = app.handle_key(key).await?;
          if !cont {
            break;
          }
        }
        Event::Resize(_, _) => {
          // Terminal will redraw on next iteration.
        }
        _ => {}
      }
    }
  }

  Ok(())
}
