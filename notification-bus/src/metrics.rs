//! Prometheus metrics for the notification bus

use lazy_static::lazy_static;
use prometheus::{register_counter_vec, register_histogram_vec, CounterVec, HistogramVec};

lazy_static! {
    /// Total notifications dispatched
    pub static ref NOTIFICATION_DISPATCH_TOTAL: CounterVec = register_counter_vec!(
        "notification_bus_dispatch_total",
        "Total notifications dispatched",
        &["kind", "status"]
    )
    .unwrap();

    /// Notification dispatch duration
    pub static ref NOTIFICATION_DISPATCH_DURATION: HistogramVec = register_histogram_vec!(
        "notification_bus_dispatch_duration_seconds",
        "Notification dispatch duration in seconds",
        &["kind"]
    )
    .unwrap();
}
