//! Shelfshare Lending Core
//!
//! Peer-to-peer book lending over an append-only transaction ledger.
//!
//! # Architecture
//!
//! - **Book Registry**: Book records with owner-controlled visibility flags
//! - **Transaction Ledger**: Append-only borrow history, one open loan per book
//! - **Borrow Workflow**: The `NONE -> OPEN -> RETURN_PENDING -> APPROVED`
//!   state machine over registry and ledger
//! - **Notifications**: Fire-and-forget events on every committed transition
//!
//! # Invariants
//!
//! - At most one open transaction per book, at any instant, under concurrency
//! - Transactions are appended and flag-flipped forward, never deleted
//! - Notification failures never roll back or delay a committed transition

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

pub mod types;
pub mod storage;
pub mod registry;
pub mod ledger;
pub mod workflow;
pub mod error;
pub mod config;
pub mod metrics;

// Re-exports
pub use error::{Error, Result};
pub use types::{Book, BookDraft, LoanStatus, Transaction};
pub use registry::BookRegistry;
pub use ledger::TransactionLedger;
pub use workflow::BorrowWorkflow;
pub use config::Config;
