//! Metrics collection for observability
//!
//! # Metrics
//!
//! - `lending_loans_opened_total` - Loans opened by the workflow
//! - `lending_loans_returned_total` - Loans marked returned
//! - `lending_returns_approved_total` - Returns approved by owners
//! - `lending_borrow_conflicts_total` - Borrow attempts lost to an open loan
//! - `lending_borrow_duration_seconds` - Histogram of borrow latencies

use prometheus::{Histogram, HistogramOpts, IntCounter, Registry};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Loans opened
    pub loans_opened: IntCounter,

    /// Loans marked returned
    pub loans_returned: IntCounter,

    /// Returns approved
    pub returns_approved: IntCounter,

    /// Borrow attempts rejected with a conflict
    pub borrow_conflicts: IntCounter,

    /// Borrow duration histogram
    pub borrow_duration: Histogram,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector with its own registry
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let loans_opened =
            IntCounter::new("lending_loans_opened_total", "Loans opened by the workflow")?;
        registry.register(Box::new(loans_opened.clone()))?;

        let loans_returned =
            IntCounter::new("lending_loans_returned_total", "Loans marked returned")?;
        registry.register(Box::new(loans_returned.clone()))?;

        let returns_approved = IntCounter::new(
            "lending_returns_approved_total",
            "Returns approved by owners",
        )?;
        registry.register(Box::new(returns_approved.clone()))?;

        let borrow_conflicts = IntCounter::new(
            "lending_borrow_conflicts_total",
            "Borrow attempts lost to an open loan",
        )?;
        registry.register(Box::new(borrow_conflicts.clone()))?;

        let borrow_duration = Histogram::with_opts(
            HistogramOpts::new(
                "lending_borrow_duration_seconds",
                "Histogram of borrow latencies",
            )
            .buckets(vec![0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500]),
        )?;
        registry.register(Box::new(borrow_duration.clone()))?;

        Ok(Self {
            loans_opened,
            loans_returned,
            returns_approved,
            borrow_conflicts,
            borrow_duration,
            registry,
        })
    }

    /// Record a loan being opened
    pub fn record_loan_opened(&self) {
        self.loans_opened.inc();
    }

    /// Record a loan being returned
    pub fn record_loan_returned(&self) {
        self.loans_returned.inc();
    }

    /// Record a return approval
    pub fn record_return_approved(&self) {
        self.returns_approved.inc();
    }

    /// Record a borrow attempt lost to an open loan
    pub fn record_borrow_conflict(&self) {
        self.borrow_conflicts.inc();
    }

    /// Record borrow duration
    pub fn record_borrow_duration(&self, duration_seconds: f64) {
        self.borrow_duration.observe(duration_seconds);
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new().expect("Failed to create metrics")
    }
}
