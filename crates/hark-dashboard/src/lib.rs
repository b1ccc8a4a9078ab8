//! Dashboard client for the Hark contact inbox.
//!
//! Three layers: [`client::ApiClient`] wraps the JSON REST API, the
//! [`reconciler`] keeps local list/stats state consistent with the server
//! (push events when a transport is attached, interval polling otherwise),
//! and [`ui`] renders the whole thing with ratatui.

pub mod app;
pub mod client;
pub mod reconciler;
pub mod ui;
