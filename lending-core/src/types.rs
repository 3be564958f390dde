//! Core types for the lending domain
//!
//! All records are designed for deterministic serialization (bincode)
//! and append-only history: a `Transaction` is mutated only through its
//! two one-way flags and is never deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A book listed for lending
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Book {
    /// Unique book ID
    pub book_id: Uuid,

    /// Owner (immutable after creation)
    pub owner_id: Uuid,

    /// Title
    pub title: String,

    /// Author
    pub author: String,

    /// ISBN
    pub isbn: String,

    /// Synopsis
    pub synopsis: String,

    /// Opaque reference to a cover image, if one was uploaded
    pub cover: Option<String>,

    /// Owner-controlled: may other members borrow this book
    pub shareable: bool,

    /// Owner-controlled: hidden from lending
    pub archived: bool,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Book {
    /// Create a new book from an owner's draft
    pub fn new(owner_id: Uuid, draft: BookDraft) -> Self {
        Self {
            book_id: Uuid::now_v7(),
            owner_id,
            title: draft.title,
            author: draft.author,
            isbn: draft.isbn,
            synopsis: draft.synopsis,
            cover: None,
            shareable: draft.shareable,
            archived: false,
            created_at: Utc::now(),
        }
    }

    /// A book may be lent iff it is shareable and not archived
    pub fn is_lendable(&self) -> bool {
        self.shareable && !self.archived
    }
}

/// Descriptive fields an owner submits when listing a book
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookDraft {
    /// Title
    pub title: String,
    /// Author
    pub author: String,
    /// ISBN
    pub isbn: String,
    /// Synopsis
    pub synopsis: String,
    /// List the book as borrowable right away
    pub shareable: bool,
}

/// A borrow transaction in the ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique transaction ID (UUIDv7 for time-ordering)
    pub transaction_id: Uuid,

    /// Book this loan concerns
    pub book_id: Uuid,

    /// Member holding the loan
    pub borrower_id: Uuid,

    /// The borrower handed the book back
    pub returned: bool,

    /// The owner confirmed the book physically came back
    pub return_approved: bool,

    /// Creation timestamp (ordering key)
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Create a new open transaction
    pub fn new(book_id: Uuid, borrower_id: Uuid) -> Self {
        Self {
            transaction_id: Uuid::now_v7(),
            book_id,
            borrower_id,
            returned: false,
            return_approved: false,
            created_at: Utc::now(),
        }
    }

    /// A transaction is open from creation until it is marked returned.
    /// Approval does not reopen it.
    pub fn is_open(&self) -> bool {
        !self.returned
    }

    /// Derive the loan status from the two flags
    pub fn status(&self) -> LoanStatus {
        if self.return_approved {
            LoanStatus::Approved
        } else if self.returned {
            LoanStatus::ReturnPending
        } else {
            LoanStatus::Open
        }
    }
}

/// Loan status (derived, never stored)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoanStatus {
    /// Borrowed and not yet returned
    Open,
    /// Returned, awaiting the owner's approval
    ReturnPending,
    /// Returned and approved (terminal)
    Approved,
}
