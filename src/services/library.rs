//! Lending library facade: the only mutator of books, index and loans

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;

use crate::{
    config::LibraryConfig,
    error::{AppError, AppResult},
    models::{Book, Lend},
    repository::{index::search_words, MemoryStore, StorageBackend},
    services::{
        locks::KeyedLocks,
        validation::{self, LendingsQuery, ValidationPolicy},
    },
};

/// Book inventory with search and checkout rules.
///
/// All operations validate their request and check every business rule
/// before touching storage, so a failed call leaves no partial update.
/// Add, checkout and return hold a per-ISBN lock across their
/// read-check-write span, and `clear` waits for all of them to finish.
#[derive(Clone)]
pub struct LendingLibrary {
    store: Arc<dyn StorageBackend>,
    locks: KeyedLocks,
    /// Shared by mutating operations, exclusive for `clear`
    gate: Arc<RwLock<()>>,
    policy: ValidationPolicy,
}

impl LendingLibrary {
    pub fn new(store: Arc<dyn StorageBackend>, config: &LibraryConfig) -> Self {
        Self {
            store,
            locks: KeyedLocks::new(),
            gate: Arc::new(RwLock::new(())),
            policy: ValidationPolicy::from(config),
        }
    }

    /// Library backed by a fresh in-memory store
    pub fn in_memory(config: &LibraryConfig) -> Self {
        Self::new(Arc::new(MemoryStore::new()), config)
    }

    /// Remove all books and loans
    pub async fn clear(&self) -> AppResult<()> {
        let _exclusive = self.gate.write().await;
        self.store.clear_all().await
    }

    /// Add one or more copies of a book.
    ///
    /// A new ISBN creates the record. A known ISBN must agree on every field
    /// but `nCopies`; the incoming copies are then added to the stored count.
    ///
    /// Errors: MISSING / BAD_TYPE / BAD_REQ on invalid fields; BAD_REQ with
    /// the first inconsistent field as widget.
    pub async fn add_book(&self, req: &Value) -> AppResult<Book> {
        let book: Book = validation::add_book(req, &self.policy)
            .map_err(AppError::Validation)?
            .into();
        let _active = self.gate.read().await;
        let _guard = self.locks.lock(&book.isbn).await;

        match self.store.get_book(&book.isbn).await {
            Ok(existing) => self.merge_copies(&existing, &book).await,
            Err(AppError::NotFound(_)) => {
                if self.store.put_book(&book).await? {
                    tracing::info!("Created book {} \"{}\"", book.isbn, book.title);
                    return Ok(book);
                }
                // Another server stored the ISBN since the lookup
                let existing = self.store.get_book(&book.isbn).await?;
                self.merge_copies(&existing, &book).await
            }
            Err(e) => Err(e),
        }
    }

    async fn merge_copies(&self, existing: &Book, book: &Book) -> AppResult<Book> {
        if let Some(field) = existing.inconsistent_field(book) {
            tracing::warn!("Rejected inconsistent {} for book {}", field, book.isbn);
            return Err(AppError::bad_req(
                field,
                format!("inconsistent {} data for book {}", field, book.isbn),
            ));
        }
        if existing.n_copies.checked_add(book.n_copies).is_none() {
            return Err(AppError::bad_req(
                "nCopies",
                format!("too many copies of book {}", book.isbn),
            ));
        }
        let updated = self.store.increment_copies(&book.isbn, book.n_copies).await?;
        tracing::info!(
            "Added {} copies of book {} (now {})",
            book.n_copies,
            book.isbn,
            updated.n_copies
        );
        Ok(updated)
    }

    /// Books whose title and authors contain every word of `search`,
    /// sorted by title and sliced to `[index, index + count)`.
    ///
    /// Errors: MISSING / BAD_TYPE on the fields; BAD_REQ when `search` has
    /// no words or index/count are negative.
    pub async fn find_books(&self, req: &Value) -> AppResult<Vec<Book>> {
        let find = validation::find_books(req, &self.policy).map_err(AppError::Validation)?;
        let words = search_words(&find.search);
        if words.is_empty() {
            return Err(AppError::bad_req("search", "no words in search"));
        }
        let books = self.store.find_by_words(&words, find.index, find.count).await?;
        tracing::debug!(
            "Search {:?} [{}, +{}) returned {} books",
            words,
            find.index,
            find.count,
            books.len()
        );
        Ok(books)
    }

    /// Record a book with the given ISBN, failing with BAD_REQ when unknown
    pub async fn get_book(&self, isbn: &str) -> AppResult<Book> {
        self.store.get_book(isbn).await.map_err(|e| unknown_book(e, isbn))
    }

    /// Check out `isbn` to `patronId`.
    ///
    /// Rules, in order: the book exists, a copy is available, the patron
    /// does not already hold a copy.
    pub async fn checkout_book(&self, req: &Value) -> AppResult<()> {
        let req = validation::lend(req).map_err(AppError::Validation)?;
        let lend = Lend::new(req.isbn, req.patron_id);
        let _active = self.gate.read().await;
        let _guard = self.locks.lock(&lend.isbn).await;

        let book = self
            .store
            .get_book(&lend.isbn)
            .await
            .map_err(|e| unknown_book(e, &lend.isbn))?;

        let active = self.store.active_count(&lend.isbn).await?;
        if active >= usize::try_from(book.n_copies).unwrap_or(0) {
            return Err(AppError::bad_req(
                "isbn",
                format!("no copies of book {} are available for checkout", lend.isbn),
            ));
        }

        if self.store.has_loan(&lend).await? {
            return Err(AppError::bad_req(
                "isbn",
                format!(
                    "patron {} already has book {} checked out",
                    lend.patron_id, lend.isbn
                ),
            ));
        }

        self.store
            .add_loan(&lend)
            .await
            .map_err(|e| unknown_book(e, &lend.isbn))?;
        tracing::info!("Book {} checked out by {}", lend.isbn, lend.patron_id);
        Ok(())
    }

    /// Return `isbn` from `patronId`; BAD_REQ when no such loan exists
    pub async fn return_book(&self, req: &Value) -> AppResult<()> {
        let req = validation::lend(req).map_err(AppError::Validation)?;
        let lend = Lend::new(req.isbn, req.patron_id);
        let _active = self.gate.read().await;
        let _guard = self.locks.lock(&lend.isbn).await;

        if !self.store.has_loan(&lend).await? {
            return Err(no_checkout(&lend));
        }
        self.store.remove_loan(&lend).await.map_err(|e| match e {
            AppError::NotFound(_) => no_checkout(&lend),
            e => e,
        })?;
        tracing::info!("Book {} returned by {}", lend.isbn, lend.patron_id);
        Ok(())
    }

    /// Active loans of one book or one patron
    pub async fn find_lendings(&self, req: &Value) -> AppResult<Vec<Lend>> {
        match validation::lendings(req).map_err(AppError::Validation)? {
            LendingsQuery::ByIsbn(isbn) => self.store.loans_by_isbn(&isbn).await,
            LendingsQuery::ByPatron(patron_id) => self.store.loans_by_patron(&patron_id).await,
        }
    }
}

fn unknown_book(e: AppError, isbn: &str) -> AppError {
    match e {
        AppError::NotFound(_) => AppError::bad_req("isbn", format!("unknown book {}", isbn)),
        e => e,
    }
}

fn no_checkout(lend: &Lend) -> AppError {
    AppError::bad_req(
        "isbn",
        format!("no checkout of book {} by patron {}", lend.isbn, lend.patron_id),
    )
}
