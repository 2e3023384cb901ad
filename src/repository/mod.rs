//! Storage layer: the backend contract and its implementations

pub mod index;
pub mod ledger;
pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::{
    error::AppResult,
    models::{Book, Lend},
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Durable (or in-process) storage for books and loans.
///
/// Lookup misses are reported as `AppError::NotFound`; every other failure
/// is a backend error that callers pass through unchanged.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StorageBackend: Send + Sync {
    async fn get_book(&self, isbn: &str) -> AppResult<Book>;

    /// Insert a book, indexing its title and authors. Returns `false`
    /// without touching storage when the ISBN is already present.
    async fn put_book(&self, book: &Book) -> AppResult<bool>;

    /// Add `delta` copies to a stored book and return the updated record
    async fn increment_copies(&self, isbn: &str, delta: i32) -> AppResult<Book>;

    /// Books matching all `words`, sorted by title, sliced to
    /// `[index, index + count)`
    async fn find_by_words(&self, words: &[String], index: usize, count: usize) -> AppResult<Vec<Book>>;

    /// Record a loan; `NotFound` when the book is not stored
    async fn add_loan(&self, lend: &Lend) -> AppResult<()>;

    async fn remove_loan(&self, lend: &Lend) -> AppResult<()>;

    /// Active loans of a book, ordered by patron
    async fn loans_by_isbn(&self, isbn: &str) -> AppResult<Vec<Lend>>;

    /// Active loans of a patron, ordered by ISBN
    async fn loans_by_patron(&self, patron_id: &str) -> AppResult<Vec<Lend>>;

    async fn active_count(&self, isbn: &str) -> AppResult<usize> {
        Ok(self.loans_by_isbn(isbn).await?.len())
    }

    async fn has_loan(&self, lend: &Lend) -> AppResult<bool> {
        Ok(self
            .loans_by_patron(&lend.patron_id)
            .await?
            .iter()
            .any(|l| l.isbn == lend.isbn))
    }

    /// Remove all books and loans
    async fn clear_all(&self) -> AppResult<()>;
}
