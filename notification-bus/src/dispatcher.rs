//! Notification dispatchers
//!
//! The lending core emits events through the [`NotificationDispatcher`]
//! trait and never waits on delivery: dispatch happens on a spawned task
//! and a failure is logged, not surfaced. Two implementations ship with
//! the bus: [`LogDispatcher`] for deployments where the real fan-out
//! lives outside the process, and [`ChannelDispatcher`] for in-process
//! consumers and tests.

use crate::{
    message::Notification,
    metrics::{NOTIFICATION_DISPATCH_DURATION, NOTIFICATION_DISPATCH_TOTAL},
    Error, Result,
};
use async_trait::async_trait;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::info;

/// Outbound notification seam
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    /// Deliver one notification to its recipient, best-effort
    async fn dispatch(&self, notification: Notification) -> Result<()>;
}

/// Dispatcher that only records deliveries in the log
///
/// Stands in for an external fan-out (websocket broker, push gateway)
/// in deployments where delivery lives outside the process.
#[derive(Debug, Default)]
pub struct LogDispatcher;

impl LogDispatcher {
    /// Create a new log dispatcher
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotificationDispatcher for LogDispatcher {
    async fn dispatch(&self, notification: Notification) -> Result<()> {
        info!(
            notification_id = %notification.id,
            recipient_id = %notification.recipient_id,
            subject = %notification.subject(),
            "Notification dispatched"
        );

        NOTIFICATION_DISPATCH_TOTAL
            .with_label_values(&[notification.kind.label(), "success"])
            .inc();

        Ok(())
    }
}

/// Dispatcher that hands notifications to an in-process consumer
///
/// The channel is unbounded so dispatch never blocks the workflow; a
/// consumer that has gone away turns the send into a logged failure.
pub struct ChannelDispatcher {
    sender: mpsc::UnboundedSender<Notification>,
}

impl ChannelDispatcher {
    /// Create a dispatcher and the receiving end for the consumer
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl NotificationDispatcher for ChannelDispatcher {
    async fn dispatch(&self, notification: Notification) -> Result<()> {
        let start = Instant::now();
        let kind = notification.kind;

        let result = self
            .sender
            .send(notification)
            .map_err(|_| Error::Dispatch("notification consumer is gone".to_string()));

        NOTIFICATION_DISPATCH_DURATION
            .with_label_values(&[kind.label()])
            .observe(start.elapsed().as_secs_f64());

        let status = if result.is_ok() { "success" } else { "error" };
        NOTIFICATION_DISPATCH_TOTAL
            .with_label_values(&[kind.label(), status])
            .inc();

        result
    }
}
