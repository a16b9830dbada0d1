//! WebSocket layer: connection handling, message routing, subscriptions.
//!
//! The WebSocket endpoint at `/ws` streams audit events to clients,
//! filtered per connection by collection or the `"*"` wildcard.

pub mod connection;
pub mod handler;
pub mod messages;
pub mod subscription;
