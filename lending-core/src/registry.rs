//! Book registry
//!
//! Owns book records and their visibility flags. Flag changes are
//! explicit commands that verify ownership and return the new state;
//! single-record reads and writes need no cross-record coordination.

use crate::{
    error::{Error, Result},
    storage::Storage,
    types::{Book, BookDraft},
};
use std::sync::Arc;
use uuid::Uuid;

/// Registry of books available for lending
pub struct BookRegistry {
    storage: Arc<Storage>,
}

impl BookRegistry {
    /// Create a registry over the shared storage
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    /// List a new book for its owner
    pub fn add_book(&self, owner_id: Uuid, draft: BookDraft) -> Result<Uuid> {
        let book = Book::new(owner_id, draft);
        self.storage.put_book(&book)?;

        tracing::info!(book_id = %book.book_id, owner_id = %owner_id, "Book listed");

        Ok(book.book_id)
    }

    /// Get a book by ID
    pub fn get(&self, book_id: Uuid) -> Result<Book> {
        self.storage.get_book(book_id)
    }

    /// Set the shareable flag; only the owner may do this
    pub fn set_shareable(&self, book_id: Uuid, owner_id: Uuid, shareable: bool) -> Result<Book> {
        let mut book = self.owned_book(book_id, owner_id)?;
        book.shareable = shareable;
        self.storage.put_book(&book)?;
        Ok(book)
    }

    /// Set the archived flag; only the owner may do this
    pub fn set_archived(&self, book_id: Uuid, owner_id: Uuid, archived: bool) -> Result<Book> {
        let mut book = self.owned_book(book_id, owner_id)?;
        book.archived = archived;
        self.storage.put_book(&book)?;
        Ok(book)
    }

    /// Attach an opaque cover reference; only the owner may do this
    pub fn set_cover(&self, book_id: Uuid, owner_id: Uuid, cover: String) -> Result<Book> {
        let mut book = self.owned_book(book_id, owner_id)?;
        book.cover = Some(cover);
        self.storage.put_book(&book)?;
        Ok(book)
    }

    /// All books listed by an owner
    pub fn books_by_owner(&self, owner_id: Uuid) -> Result<Vec<Book>> {
        self.storage.books_by_owner(owner_id)
    }

    /// Books a user can browse and borrow: lendable and not their own
    pub fn displayable_books(&self, user_id: Uuid) -> Result<Vec<Book>> {
        Ok(self
            .storage
            .all_books()?
            .into_iter()
            .filter(|b| b.is_lendable() && b.owner_id != user_id)
            .collect())
    }

    fn owned_book(&self, book_id: Uuid, owner_id: Uuid) -> Result<Book> {
        let book = self.get(book_id)?;
        if book.owner_id != owner_id {
            return Err(Error::Forbidden(
                "you are not the owner of this book".to_string(),
            ));
        }
        Ok(book)
    }
}
