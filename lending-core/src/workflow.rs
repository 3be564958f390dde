//! Borrow workflow orchestration layer
//!
//! Ties the book registry and the transaction ledger together into the
//! lending state machine, `NONE -> OPEN -> RETURN_PENDING -> APPROVED`
//! per (book, borrower), and emits one notification per committed
//! transition.
//!
//! # Example
//!
//! ```no_run
//! use lending_core::{BorrowWorkflow, Config};
//! use notification_bus::LogDispatcher;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> lending_core::Result<()> {
//!     let workflow = BorrowWorkflow::open(Config::default(), Arc::new(LogDispatcher::new()))?;
//!
//!     // let transaction_id = workflow.borrow(book_id, user_id).await?;
//!
//!     Ok(())
//! }
//! ```

use crate::{
    error::{Error, Result},
    ledger::TransactionLedger,
    metrics::Metrics,
    registry::BookRegistry,
    storage::Storage,
    types::Book,
    Config,
};
use notification_bus::{Notification, NotificationDispatcher, NotificationKind};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Lending workflow over registry and ledger
pub struct BorrowWorkflow {
    /// Book records and visibility flags
    registry: Arc<BookRegistry>,

    /// Borrow transaction history
    ledger: Arc<TransactionLedger>,

    /// Outbound notification seam; delivery is best-effort
    dispatcher: Arc<dyn NotificationDispatcher>,

    /// Metrics
    metrics: Metrics,
}

impl BorrowWorkflow {
    /// Open storage and wire up the workflow
    pub fn open(config: Config, dispatcher: Arc<dyn NotificationDispatcher>) -> Result<Self> {
        let storage = Arc::new(Storage::open(&config)?);
        let registry = Arc::new(BookRegistry::new(storage.clone()));
        let ledger = Arc::new(TransactionLedger::new(storage));

        Ok(Self::new(registry, ledger, dispatcher))
    }

    /// Wire up the workflow over existing components
    pub fn new(
        registry: Arc<BookRegistry>,
        ledger: Arc<TransactionLedger>,
        dispatcher: Arc<dyn NotificationDispatcher>,
    ) -> Self {
        Self {
            registry,
            ledger,
            dispatcher,
            metrics: Metrics::default(),
        }
    }

    /// Book registry backing this workflow
    pub fn registry(&self) -> &BookRegistry {
        &self.registry
    }

    /// Transaction ledger backing this workflow
    pub fn ledger(&self) -> &TransactionLedger {
        &self.ledger
    }

    /// Metrics collector
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Borrow a book
    ///
    /// The book must be lendable, not owned by the caller, and carry no
    /// open transaction by anyone. Losers of a concurrent race on the
    /// same book get `Conflict`; there is no borrow queue.
    pub async fn borrow(&self, book_id: Uuid, user_id: Uuid) -> Result<Uuid> {
        let start = Instant::now();

        let book = self.registry.get(book_id)?;
        if !book.is_lendable() {
            return Err(Error::Forbidden(
                "the requested book is not shareable or is archived".to_string(),
            ));
        }
        if book.owner_id == user_id {
            return Err(Error::Forbidden(
                "you cannot borrow your own book".to_string(),
            ));
        }
        if self.ledger.has_open_transaction_for_user(book_id, user_id)? {
            return Err(Error::Conflict(
                "you already borrowed this book and it is not yet returned".to_string(),
            ));
        }

        let transaction = match self.ledger.create(book_id, user_id) {
            Ok(transaction) => transaction,
            Err(e) => {
                if matches!(e, Error::Conflict(_)) {
                    self.metrics.record_borrow_conflict();
                }
                return Err(e);
            }
        };

        self.metrics.record_loan_opened();
        self.metrics
            .record_borrow_duration(start.elapsed().as_secs_f64());

        self.notify(
            book.owner_id,
            NotificationKind::Borrowed,
            &book,
            format!("Your book '{}' has been borrowed", book.title),
        );

        Ok(transaction.transaction_id)
    }

    /// Hand a borrowed book back
    ///
    /// The shareable/archived flags are re-checked here: a book archived
    /// mid-loan rejects the return until the owner unarchives it.
    pub async fn return_book(&self, book_id: Uuid, user_id: Uuid) -> Result<Uuid> {
        let book = self.registry.get(book_id)?;
        if !book.is_lendable() {
            return Err(Error::Forbidden(
                "the requested book is not shareable or is archived".to_string(),
            ));
        }

        let transaction = self
            .ledger
            .find_open_by_book_and_borrower(book_id, user_id)?;
        let transaction = self.ledger.mark_returned(transaction.transaction_id)?;

        self.metrics.record_loan_returned();

        self.notify(
            book.owner_id,
            NotificationKind::Returned,
            &book,
            format!("Your book '{}' has been returned", book.title),
        );

        Ok(transaction.transaction_id)
    }

    /// Approve a pending return on a book the caller owns
    ///
    /// Flags are not re-checked here: an archived book's pending return
    /// can still be approved, closing the loan cycle.
    pub async fn approve_return(&self, book_id: Uuid, owner_id: Uuid) -> Result<Uuid> {
        let book = self.registry.get(book_id)?;
        if book.owner_id != owner_id {
            return Err(Error::TransactionNotFound(
                "no returned loan is awaiting approval for this book".to_string(),
            ));
        }

        let transaction = self.ledger.find_returned_unapproved_by_book(book_id)?;
        let transaction = self.ledger.mark_approved(transaction.transaction_id)?;

        self.metrics.record_return_approved();

        self.notify(
            transaction.borrower_id,
            NotificationKind::ReturnApproved,
            &book,
            format!("The return of '{}' has been approved", book.title),
        );

        Ok(transaction.transaction_id)
    }

    /// Fire-and-forget notification dispatch
    ///
    /// The transition is already committed to the ledger; a delivery
    /// failure is logged and never rolls it back or delays the caller.
    fn notify(&self, recipient_id: Uuid, kind: NotificationKind, book: &Book, message: String) {
        let notification = Notification::new(recipient_id, kind, book.title.clone(), message);
        let dispatcher = Arc::clone(&self.dispatcher);

        tokio::spawn(async move {
            if let Err(e) = dispatcher.dispatch(notification).await {
                tracing::warn!("Notification delivery failed: {}", e);
            }
        });
    }
}
