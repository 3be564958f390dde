//! Transaction ledger
//!
//! Append-only history of borrow transactions. The ledger upholds the
//! core invariant: at most one open transaction per book, at any instant,
//! under concurrent callers.
//!
//! Writers serialize per book through a lock table, one mutex per book
//! id, created on first use. `create` holds the book's lock across its
//! check-and-insert; `mark_returned`/`mark_approved` hold it across their
//! read-modify-write, since RocksDB offers no single-key compare-and-set.
//! No lock is held while another book's lock is wanted, so the table
//! cannot deadlock.

use crate::{
    error::{Error, Result},
    storage::Storage,
    types::Transaction,
};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use uuid::Uuid;

/// Ledger of borrow transactions
pub struct TransactionLedger {
    storage: Arc<Storage>,

    /// Per-book write locks
    book_locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl TransactionLedger {
    /// Create a ledger over the shared storage
    pub fn new(storage: Arc<Storage>) -> Self {
        Self {
            storage,
            book_locks: DashMap::new(),
        }
    }

    fn lock_for(&self, book_id: Uuid) -> Arc<Mutex<()>> {
        self.book_locks
            .entry(book_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Is there an open transaction on this book, by any borrower
    pub fn has_open_transaction(&self, book_id: Uuid) -> Result<bool> {
        Ok(self.storage.open_transaction_id(book_id)?.is_some())
    }

    /// Does this user hold the open transaction on this book
    pub fn has_open_transaction_for_user(&self, book_id: Uuid, user_id: Uuid) -> Result<bool> {
        match self.storage.open_transaction_id(book_id)? {
            Some(transaction_id) => {
                let transaction = self.storage.get_transaction(transaction_id)?;
                Ok(transaction.borrower_id == user_id)
            }
            None => Ok(false),
        }
    }

    /// Open a new transaction on a book
    ///
    /// Check-and-insert is one atomic unit under the book's lock; the
    /// loser of a concurrent race gets `Conflict`.
    pub fn create(&self, book_id: Uuid, borrower_id: Uuid) -> Result<Transaction> {
        let lock = self.lock_for(book_id);
        let _guard = lock.lock();

        if self.storage.open_transaction_id(book_id)?.is_some() {
            return Err(Error::Conflict(
                "the requested book is already borrowed".to_string(),
            ));
        }

        let transaction = Transaction::new(book_id, borrower_id);
        self.storage.insert_transaction(&transaction)?;

        tracing::info!(
            transaction_id = %transaction.transaction_id,
            book_id = %book_id,
            borrower_id = %borrower_id,
            "Loan opened"
        );

        Ok(transaction)
    }

    /// Find the open transaction a borrower holds on a book
    pub fn find_open_by_book_and_borrower(
        &self,
        book_id: Uuid,
        borrower_id: Uuid,
    ) -> Result<Transaction> {
        let transaction_id = self
            .storage
            .open_transaction_id(book_id)?
            .ok_or_else(|| Error::TransactionNotFound("you have not borrowed this book".to_string()))?;

        let transaction = self.storage.get_transaction(transaction_id)?;
        if transaction.borrower_id != borrower_id {
            return Err(Error::TransactionNotFound(
                "you have not borrowed this book".to_string(),
            ));
        }

        Ok(transaction)
    }

    /// Mark an open transaction returned
    pub fn mark_returned(&self, transaction_id: Uuid) -> Result<Transaction> {
        let book_id = self.storage.get_transaction(transaction_id)?.book_id;
        let lock = self.lock_for(book_id);
        let _guard = lock.lock();

        // Re-read under the lock
        let mut transaction = self.storage.get_transaction(transaction_id)?;
        if transaction.returned {
            return Err(Error::Conflict("the loan is already returned".to_string()));
        }

        transaction.returned = true;
        self.storage.put_transaction_closing(&transaction)?;

        tracing::info!(
            transaction_id = %transaction_id,
            book_id = %book_id,
            "Loan returned, awaiting approval"
        );

        Ok(transaction)
    }

    /// Oldest transaction on a book that is returned but not yet approved
    ///
    /// The caller is responsible for having checked that it is asking on
    /// behalf of the book's owner; the ledger stores no owners.
    pub fn find_returned_unapproved_by_book(&self, book_id: Uuid) -> Result<Transaction> {
        self.storage
            .transactions_by_book(book_id)?
            .into_iter()
            .find(|t| t.returned && !t.return_approved)
            .ok_or_else(|| {
                Error::TransactionNotFound(
                    "no returned loan is awaiting approval for this book".to_string(),
                )
            })
    }

    /// Mark a returned transaction approved
    pub fn mark_approved(&self, transaction_id: Uuid) -> Result<Transaction> {
        let book_id = self.storage.get_transaction(transaction_id)?.book_id;
        let lock = self.lock_for(book_id);
        let _guard = lock.lock();

        let mut transaction = self.storage.get_transaction(transaction_id)?;
        if !transaction.returned {
            return Err(Error::Conflict(
                "the loan has not been returned yet".to_string(),
            ));
        }
        if transaction.return_approved {
            return Err(Error::Conflict(
                "the return is already approved".to_string(),
            ));
        }

        transaction.return_approved = true;
        self.storage.put_transaction(&transaction)?;

        tracing::info!(
            transaction_id = %transaction_id,
            book_id = %book_id,
            "Return approved"
        );

        Ok(transaction)
    }

    /// Full loan history of a book, oldest first
    pub fn history_by_book(&self, book_id: Uuid) -> Result<Vec<Transaction>> {
        self.storage.transactions_by_book(book_id)
    }

    /// Loans a user currently holds
    pub fn borrowed_by_user(&self, user_id: Uuid) -> Result<Vec<Transaction>> {
        Ok(self
            .storage
            .transactions_by_borrower(user_id)?
            .into_iter()
            .filter(|t| t.is_open())
            .collect())
    }

    /// Loans a user has handed back (approved or still pending)
    pub fn returned_by_user(&self, user_id: Uuid) -> Result<Vec<Transaction>> {
        Ok(self
            .storage
            .transactions_by_borrower(user_id)?
            .into_iter()
            .filter(|t| t.returned)
            .collect())
    }
}
