//! Notification bus for the lending workflow
//!
//! Carries fire-and-forget events from the lending core to whoever fronts
//! it (a websocket fan-out, a push gateway, a test harness):
//! - One envelope type with a stable subject per recipient
//! - Dispatch is best-effort: a failed delivery is logged, never propagated
//! - Observability via Prometheus counters

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod dispatcher;
pub mod error;
pub mod message;
pub mod metrics;
pub mod types;

pub use dispatcher::{ChannelDispatcher, LogDispatcher, NotificationDispatcher};
pub use error::{Error, Result};
pub use message::Notification;
pub use types::NotificationKind;
