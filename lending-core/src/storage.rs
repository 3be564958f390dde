//! Storage layer using RocksDB
//!
//! # Column Families
//!
//! - `books` - Book records (key: book_id)
//! - `transactions` - Append-only loan ledger (key: transaction_id)
//! - `open_loans` - Open-loan marker (key: book_id, value: transaction_id);
//!   at most one entry per book, the stored form of the core invariant
//! - `indices` - Tagged secondary indices for history lookups
//!
//! Index keys are `tag || uuid || uuid`: `b'b'` book -> transaction,
//! `b'u'` borrower -> transaction, `b'o'` owner -> book. Transaction ids
//! are UUIDv7, so a prefix scan yields history in creation order.

use crate::{
    error::{Error, Result},
    types::{Book, Transaction},
    Config,
};
use rocksdb::{
    ColumnFamily, ColumnFamilyDescriptor, DBCompactionStyle, Direction, IteratorMode, Options,
    WriteBatch, DB,
};
use std::sync::Arc;
use uuid::Uuid;

/// Column family names
const CF_BOOKS: &str = "books";
const CF_TRANSACTIONS: &str = "transactions";
const CF_OPEN_LOANS: &str = "open_loans";
const CF_INDICES: &str = "indices";

/// Index tags
const IDX_BOOK_TXN: u8 = b'b';
const IDX_USER_TXN: u8 = b'u';
const IDX_OWNER_BOOK: u8 = b'o';

/// Storage wrapper for RocksDB
pub struct Storage {
    db: Arc<DB>,
}

impl Storage {
    /// Open or create database
    pub fn open(config: &Config) -> Result<Self> {
        let path = &config.data_dir;

        // Create directory if not exists
        std::fs::create_dir_all(path)?;

        // Database options
        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        // Tuning from config
        db_opts.set_write_buffer_size(config.rocksdb.write_buffer_size_mb * 1024 * 1024);
        db_opts.set_max_write_buffer_number(config.rocksdb.max_write_buffer_number);
        db_opts.set_max_background_jobs(config.rocksdb.max_background_jobs);

        // Universal compaction for the append-heavy ledger
        db_opts.set_compaction_style(DBCompactionStyle::Universal);

        if config.rocksdb.enable_statistics {
            db_opts.enable_statistics();
        }

        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(CF_BOOKS, Self::cf_options_records()),
            ColumnFamilyDescriptor::new(CF_TRANSACTIONS, Self::cf_options_records()),
            ColumnFamilyDescriptor::new(CF_OPEN_LOANS, Self::cf_options_markers()),
            ColumnFamilyDescriptor::new(CF_INDICES, Self::cf_options_indices()),
        ];

        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        tracing::info!("Opened RocksDB at {:?}", path);

        Ok(Self { db: Arc::new(db) })
    }

    // Column family options

    fn cf_options_records() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Zstd);
        opts
    }

    fn cf_options_markers() -> Options {
        let mut opts = Options::default();
        // Open-loan markers are hot and tiny, favor speed over ratio
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts
    }

    fn cf_options_indices() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        // Indices benefit from bloom filters
        let mut block_opts = rocksdb::BlockBasedOptions::default();
        block_opts.set_bloom_filter(10.0, false);
        opts.set_block_based_table_factory(&block_opts);
        opts
    }

    fn cf_handle(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| Error::Storage(format!("Column family {} not found", name)))
    }

    // Book operations

    /// Put book record with its owner index (atomic)
    pub fn put_book(&self, book: &Book) -> Result<()> {
        let mut batch = WriteBatch::default();

        let cf_books = self.cf_handle(CF_BOOKS)?;
        let value = bincode::serialize(book)?;
        batch.put_cf(cf_books, book.book_id.as_bytes(), &value);

        let cf_indices = self.cf_handle(CF_INDICES)?;
        let idx = index_key(IDX_OWNER_BOOK, &book.owner_id, &book.book_id);
        batch.put_cf(cf_indices, &idx, []);

        self.db.write(batch)?;

        tracing::debug!(book_id = %book.book_id, "Book stored");

        Ok(())
    }

    /// Get book by ID
    pub fn get_book(&self, book_id: Uuid) -> Result<Book> {
        let cf = self.cf_handle(CF_BOOKS)?;

        let value = self
            .db
            .get_cf(cf, book_id.as_bytes())?
            .ok_or_else(|| Error::BookNotFound(book_id.to_string()))?;

        let book: Book = bincode::deserialize(&value)?;
        Ok(book)
    }

    /// Get all books listed by an owner
    pub fn books_by_owner(&self, owner_id: Uuid) -> Result<Vec<Book>> {
        let ids = self.scan_index(IDX_OWNER_BOOK, owner_id)?;
        ids.into_iter().map(|id| self.get_book(id)).collect()
    }

    /// Scan every book record, oldest first
    pub fn all_books(&self) -> Result<Vec<Book>> {
        let cf = self.cf_handle(CF_BOOKS)?;

        let mut books = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_, value) = item?;
            books.push(bincode::deserialize(&value)?);
        }

        Ok(books)
    }

    // Transaction operations

    /// Get transaction by ID
    pub fn get_transaction(&self, transaction_id: Uuid) -> Result<Transaction> {
        let cf = self.cf_handle(CF_TRANSACTIONS)?;

        let value = self
            .db
            .get_cf(cf, transaction_id.as_bytes())?
            .ok_or_else(|| Error::TransactionNotFound(transaction_id.to_string()))?;

        let transaction: Transaction = bincode::deserialize(&value)?;
        Ok(transaction)
    }

    /// Transaction id of the open loan on a book, if any
    pub fn open_transaction_id(&self, book_id: Uuid) -> Result<Option<Uuid>> {
        let cf = self.cf_handle(CF_OPEN_LOANS)?;

        match self.db.get_cf(cf, book_id.as_bytes())? {
            Some(value) => {
                let id = Uuid::from_slice(&value)
                    .map_err(|e| Error::Storage(format!("Corrupt open-loan marker: {}", e)))?;
                Ok(Some(id))
            }
            None => Ok(None),
        }
    }

    /// Insert a new open transaction with marker and indices (atomic)
    ///
    /// The caller must have established, under the book's lock, that no
    /// open transaction exists for `transaction.book_id`.
    pub fn insert_transaction(&self, transaction: &Transaction) -> Result<()> {
        let mut batch = WriteBatch::default();

        let cf_transactions = self.cf_handle(CF_TRANSACTIONS)?;
        let value = bincode::serialize(transaction)?;
        batch.put_cf(cf_transactions, transaction.transaction_id.as_bytes(), &value);

        let cf_open = self.cf_handle(CF_OPEN_LOANS)?;
        batch.put_cf(
            cf_open,
            transaction.book_id.as_bytes(),
            transaction.transaction_id.as_bytes(),
        );

        let cf_indices = self.cf_handle(CF_INDICES)?;
        let idx_book = index_key(
            IDX_BOOK_TXN,
            &transaction.book_id,
            &transaction.transaction_id,
        );
        batch.put_cf(cf_indices, &idx_book, []);
        let idx_user = index_key(
            IDX_USER_TXN,
            &transaction.borrower_id,
            &transaction.transaction_id,
        );
        batch.put_cf(cf_indices, &idx_user, []);

        self.db.write(batch)?;

        tracing::debug!(
            transaction_id = %transaction.transaction_id,
            book_id = %transaction.book_id,
            "Open transaction inserted"
        );

        Ok(())
    }

    /// Update a transaction record in place
    pub fn put_transaction(&self, transaction: &Transaction) -> Result<()> {
        let cf = self.cf_handle(CF_TRANSACTIONS)?;
        let value = bincode::serialize(transaction)?;

        self.db
            .put_cf(cf, transaction.transaction_id.as_bytes(), &value)?;

        Ok(())
    }

    /// Update a transaction record and clear the book's open-loan marker (atomic)
    ///
    /// Used when a loan is marked returned: the record update and the
    /// marker removal must commit together or the invariant witness lies.
    pub fn put_transaction_closing(&self, transaction: &Transaction) -> Result<()> {
        let mut batch = WriteBatch::default();

        let cf_transactions = self.cf_handle(CF_TRANSACTIONS)?;
        let value = bincode::serialize(transaction)?;
        batch.put_cf(cf_transactions, transaction.transaction_id.as_bytes(), &value);

        let cf_open = self.cf_handle(CF_OPEN_LOANS)?;
        batch.delete_cf(cf_open, transaction.book_id.as_bytes());

        self.db.write(batch)?;

        tracing::debug!(
            transaction_id = %transaction.transaction_id,
            book_id = %transaction.book_id,
            "Loan closed"
        );

        Ok(())
    }

    /// Full loan history of a book, oldest first
    pub fn transactions_by_book(&self, book_id: Uuid) -> Result<Vec<Transaction>> {
        let ids = self.scan_index(IDX_BOOK_TXN, book_id)?;
        ids.into_iter().map(|id| self.get_transaction(id)).collect()
    }

    /// Full loan history of a borrower, oldest first
    pub fn transactions_by_borrower(&self, borrower_id: Uuid) -> Result<Vec<Transaction>> {
        let ids = self.scan_index(IDX_USER_TXN, borrower_id)?;
        ids.into_iter().map(|id| self.get_transaction(id)).collect()
    }

    // Index scans

    fn scan_index(&self, tag: u8, prefix_id: Uuid) -> Result<Vec<Uuid>> {
        let cf = self.cf_handle(CF_INDICES)?;
        let prefix = index_prefix(tag, &prefix_id);

        let iter = self
            .db
            .iterator_cf(cf, IteratorMode::From(&prefix, Direction::Forward));

        let mut ids = Vec::new();
        for item in iter {
            let (key, _) = item?;
            if !key.starts_with(&prefix) {
                break;
            }
            if key.len() >= 33 {
                let id_bytes: [u8; 16] = key[17..33].try_into().unwrap();
                ids.push(Uuid::from_bytes(id_bytes));
            }
        }

        Ok(ids)
    }

    // Statistics

    /// Get storage statistics
    pub fn stats(&self) -> Result<StorageStats> {
        let cf_books = self.cf_handle(CF_BOOKS)?;
        let cf_transactions = self.cf_handle(CF_TRANSACTIONS)?;
        let cf_open = self.cf_handle(CF_OPEN_LOANS)?;

        let total_books = self.approximate_count(cf_books)?;
        let total_transactions = self.approximate_count(cf_transactions)?;

        // Open loans are few; count exactly
        let mut open_loans = 0u64;
        let iter = self.db.iterator_cf(cf_open, IteratorMode::Start);
        for item in iter {
            item?;
            open_loans += 1;
        }

        Ok(StorageStats {
            total_books,
            total_transactions,
            open_loans,
        })
    }

    fn approximate_count(&self, cf: &ColumnFamily) -> Result<u64> {
        let prop = self
            .db
            .property_int_value_cf(cf, "rocksdb.estimate-num-keys")?
            .unwrap_or(0);

        Ok(prop)
    }

    /// Close database (graceful shutdown)
    pub fn close(self) -> Result<()> {
        drop(self.db);
        tracing::info!("RocksDB closed gracefully");
        Ok(())
    }
}

// Index key helpers

fn index_key(tag: u8, prefix_id: &Uuid, entry_id: &Uuid) -> Vec<u8> {
    let mut key = index_prefix(tag, prefix_id);
    key.extend_from_slice(entry_id.as_bytes());
    key
}

fn index_prefix(tag: u8, prefix_id: &Uuid) -> Vec<u8> {
    let mut key = Vec::with_capacity(33);
    key.push(tag);
    key.extend_from_slice(prefix_id.as_bytes());
    key
}

/// Storage statistics
#[derive(Debug, Clone)]
pub struct StorageStats {
    /// Books listed
    pub total_books: u64,
    /// Transactions ever recorded
    pub total_transactions: u64,
    /// Currently open loans
    pub open_loans: u64,
}
