//! In-process storage: inventory map, inverted index and lending ledger

use std::{cmp::Ordering, collections::HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

use super::{index::InvertedIndex, ledger::LendingLedger, StorageBackend};
use crate::{
    error::{AppError, AppResult},
    models::{Book, Lend},
};

#[derive(Debug, Default)]
struct MemoryState {
    books: HashMap<String, Book>,
    index: InvertedIndex,
    ledger: LendingLedger,
}

/// Storage kept entirely in memory. The three structures live behind one
/// lock so that a single call never observes them out of step.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Key approximating locale-aware ordering: compatibility decomposition with
/// accents removed, then case-folded.
fn collation_key(title: &str) -> String {
    title
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
}

fn compare_titles(a: &Book, b: &Book) -> Ordering {
    collation_key(&a.title)
        .cmp(&collation_key(&b.title))
        .then_with(|| a.title.cmp(&b.title))
        .then_with(|| a.isbn.cmp(&b.isbn))
}

#[async_trait]
impl StorageBackend for MemoryStore {
    async fn get_book(&self, isbn: &str) -> AppResult<Book> {
        self.state
            .read()
            .await
            .books
            .get(isbn)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("no book for isbn '{}'", isbn)))
    }

    async fn put_book(&self, book: &Book) -> AppResult<bool> {
        let mut state = self.state.write().await;
        if state.books.contains_key(&book.isbn) {
            return Ok(false);
        }
        state.index.index(&book.isbn, &book.search_text());
        state.books.insert(book.isbn.clone(), book.clone());
        Ok(true)
    }

    async fn increment_copies(&self, isbn: &str, delta: i32) -> AppResult<Book> {
        let mut state = self.state.write().await;
        let book = state
            .books
            .get_mut(isbn)
            .ok_or_else(|| AppError::NotFound(format!("no book for isbn '{}'", isbn)))?;
        book.n_copies = book
            .n_copies
            .checked_add(delta)
            .ok_or_else(|| AppError::bad_req("nCopies", format!("too many copies of book {}", isbn)))?;
        Ok(book.clone())
    }

    async fn find_by_words(&self, words: &[String], index: usize, count: usize) -> AppResult<Vec<Book>> {
        let state = self.state.read().await;
        let mut books: Vec<&Book> = state
            .index
            .query(words)
            .iter()
            .filter_map(|isbn| {
                let book = state.books.get(isbn);
                debug_assert!(book.is_some(), "indexed isbn {} has no book", isbn);
                book
            })
            .collect();
        books.sort_by(|a, b| compare_titles(a, b));
        Ok(books.into_iter().skip(index).take(count).cloned().collect())
    }

    async fn add_loan(&self, lend: &Lend) -> AppResult<()> {
        let mut state = self.state.write().await;
        if !state.books.contains_key(&lend.isbn) {
            return Err(AppError::NotFound(format!("no book for isbn '{}'", lend.isbn)));
        }
        state.ledger.checkout(&lend.isbn, &lend.patron_id);
        Ok(())
    }

    async fn remove_loan(&self, lend: &Lend) -> AppResult<()> {
        if self
            .state
            .write()
            .await
            .ledger
            .return_loan(&lend.isbn, &lend.patron_id)
        {
            Ok(())
        } else {
            Err(AppError::NotFound(format!(
                "no lend for {{{}, {}}}",
                lend.isbn, lend.patron_id
            )))
        }
    }

    async fn loans_by_isbn(&self, isbn: &str) -> AppResult<Vec<Lend>> {
        let state = self.state.read().await;
        Ok(state
            .ledger
            .patrons_of(isbn)
            .into_iter()
            .map(|patron_id| Lend::new(isbn, patron_id))
            .collect())
    }

    async fn loans_by_patron(&self, patron_id: &str) -> AppResult<Vec<Lend>> {
        let state = self.state.read().await;
        Ok(state
            .ledger
            .books_of(patron_id)
            .into_iter()
            .map(|isbn| Lend::new(isbn, patron_id))
            .collect())
    }

    async fn active_count(&self, isbn: &str) -> AppResult<usize> {
        Ok(self.state.read().await.ledger.active_count(isbn))
    }

    async fn has_loan(&self, lend: &Lend) -> AppResult<bool> {
        Ok(self
            .state
            .read()
            .await
            .ledger
            .has_loan(&lend.isbn, &lend.patron_id))
    }

    async fn clear_all(&self) -> AppResult<()> {
        let mut state = self.state.write().await;
        state.books.clear();
        state.index.clear();
        state.ledger.clear();
        Ok(())
    }
}
