//! PostgreSQL storage backend

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use super::{index::search_words, StorageBackend};
use crate::{
    error::{AppError, AppResult},
    models::{Book, Lend},
};

const BOOK_COLUMNS: &str = "isbn, title, authors, pages, year, publisher, n_copies";

#[derive(Clone)]
pub struct PgStore {
    pool: Pool<Postgres>,
}

impl PgStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Apply pending schema migrations
    pub async fn migrate(&self) -> AppResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::Backend(format!("migration failed: {}", e)))
    }
}

fn clamp(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

#[async_trait]
impl StorageBackend for PgStore {
    async fn get_book(&self, isbn: &str) -> AppResult<Book> {
        sqlx::query_as::<_, Book>(&format!("SELECT {} FROM books WHERE isbn = $1", BOOK_COLUMNS))
            .bind(isbn)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("no book for isbn '{}'", isbn)))
    }

    async fn put_book(&self, book: &Book) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO books (isbn, title, authors, pages, year, publisher, n_copies, words)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (isbn) DO NOTHING
            "#,
        )
        .bind(&book.isbn)
        .bind(&book.title)
        .bind(&book.authors)
        .bind(book.pages)
        .bind(book.year)
        .bind(&book.publisher)
        .bind(book.n_copies)
        .bind(search_words(&book.search_text()))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn increment_copies(&self, isbn: &str, delta: i32) -> AppResult<Book> {
        sqlx::query_as::<_, Book>(&format!(
            "UPDATE books SET n_copies = n_copies + $2 WHERE isbn = $1 RETURNING {}",
            BOOK_COLUMNS
        ))
        .bind(isbn)
        .bind(delta)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("no book for isbn '{}'", isbn)))
    }

    async fn find_by_words(&self, words: &[String], index: usize, count: usize) -> AppResult<Vec<Book>> {
        if words.is_empty() {
            return Ok(Vec::new());
        }
        let books = sqlx::query_as::<_, Book>(&format!(
            r#"
            SELECT {} FROM books
            WHERE words @> $1
            ORDER BY title, isbn
            OFFSET $2 LIMIT $3
            "#,
            BOOK_COLUMNS
        ))
        .bind(words)
        .bind(clamp(index))
        .bind(clamp(count))
        .fetch_all(&self.pool)
        .await?;
        Ok(books)
    }

    /// Capacity and uniqueness are re-checked against the database inside a
    /// transaction holding the book row lock, so concurrent servers sharing
    /// the database cannot over-allocate copies.
    async fn add_loan(&self, lend: &Lend) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let n_copies: i32 = sqlx::query_scalar("SELECT n_copies FROM books WHERE isbn = $1 FOR UPDATE")
            .bind(&lend.isbn)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("no book for isbn '{}'", lend.isbn)))?;

        let active: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM loans WHERE isbn = $1")
            .bind(&lend.isbn)
            .fetch_one(&mut *tx)
            .await?;

        if active >= i64::from(n_copies) {
            return Err(AppError::bad_req(
                "isbn",
                format!("no copies of book {} are available for checkout", lend.isbn),
            ));
        }

        let inserted = sqlx::query(
            "INSERT INTO loans (isbn, patron_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(&lend.isbn)
        .bind(&lend.patron_id)
        .execute(&mut *tx)
        .await?;

        if inserted.rows_affected() == 0 {
            return Err(AppError::bad_req(
                "isbn",
                format!("patron {} already has book {} checked out", lend.patron_id, lend.isbn),
            ));
        }

        tx.commit().await?;
        Ok(())
    }

    async fn remove_loan(&self, lend: &Lend) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM loans WHERE isbn = $1 AND patron_id = $2")
            .bind(&lend.isbn)
            .bind(&lend.patron_id)
            .execute(&self.pool)
            .await?;

        match result.rows_affected() {
            0 => Err(AppError::NotFound(format!(
                "no lend for {{{}, {}}}",
                lend.isbn, lend.patron_id
            ))),
            1 => Ok(()),
            n => Err(AppError::Backend(format!("expected 1 deletion; got {}", n))),
        }
    }

    async fn loans_by_isbn(&self, isbn: &str) -> AppResult<Vec<Lend>> {
        let loans = sqlx::query_as::<_, Lend>(
            "SELECT isbn, patron_id FROM loans WHERE isbn = $1 ORDER BY patron_id",
        )
        .bind(isbn)
        .fetch_all(&self.pool)
        .await?;
        Ok(loans)
    }

    async fn loans_by_patron(&self, patron_id: &str) -> AppResult<Vec<Lend>> {
        let loans = sqlx::query_as::<_, Lend>(
            "SELECT isbn, patron_id FROM loans WHERE patron_id = $1 ORDER BY isbn",
        )
        .bind(patron_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(loans)
    }

    async fn active_count(&self, isbn: &str) -> AppResult<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM loans WHERE isbn = $1")
            .bind(isbn)
            .fetch_one(&self.pool)
            .await?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    async fn has_loan(&self, lend: &Lend) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM loans WHERE isbn = $1 AND patron_id = $2)",
        )
        .bind(&lend.isbn)
        .bind(&lend.patron_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn clear_all(&self) -> AppResult<()> {
        sqlx::query("TRUNCATE loans, books")
            .execute(&self.pool)
            .await?;
        tracing::info!("Cleared all books and loans");
        Ok(())
    }
}
