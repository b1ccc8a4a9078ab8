//! Realtime fan-out for the Hark dashboard.
//!
//! Three pieces: the [`RoomRegistry`] (which push-channel sessions exist and
//! which account room each belongs to), the [`ChangeNotifier`] (turns a
//! successful contact mutation into one event envelope and routes it), and
//! the axum WebSocket transport.
//!
//! Delivery is best-effort and at-most-once: no acknowledgements, no durable
//! queue, no replay. A session that is disconnected at emission time simply
//! misses the event and reconciles through the dashboard's polling fallback.
//! Exactly one emission strategy is active per deployment — either the API
//! handlers notify synchronously after each mutation, or a feed observer
//! consumes the store's change feed; never both.

pub mod feed;
pub mod notifier;
pub mod registry;
pub mod ws;

pub use notifier::ChangeNotifier;
pub use registry::{RoomRegistry, SessionId};
