use crate::error::{Result, StoreError};
use crate::models::CanonicalBook;
use async_trait::async_trait;
use platform_traits::{ItemSummary, ProgressSnapshot};
use sqlx::SqlitePool;

/// Repository for canonical book storage operations
#[async_trait]
pub trait BookRepository: Send + Sync {
    /// Insert or refresh a book from the canonical platform's view of it.
    ///
    /// Books are keyed by `source_id`; a repeated pull updates metadata and
    /// listening state in place instead of creating a duplicate row.
    ///
    /// # Returns
    /// The stored book, with `started_at`/`finished_at` stamped as needed
    ///
    /// # Errors
    /// Returns an error if the book data is invalid or the query fails
    async fn upsert_from_source(
        &self,
        item: &ItemSummary,
        progress: &ProgressSnapshot,
    ) -> Result<CanonicalBook>;

    /// Find a book by its canonical-platform item id
    async fn find_by_source_id(&self, source_id: &str) -> Result<Option<CanonicalBook>>;

    /// Find a book by its own id
    async fn find_by_id(&self, id: &str) -> Result<Option<CanonicalBook>>;

    /// List all books in a stable order
    async fn list_all(&self) -> Result<Vec<CanonicalBook>>;

    /// Record that a sync attempt just covered this book.
    ///
    /// # Errors
    /// Returns `StoreError::NotFound` if no book has the given id
    async fn touch_last_synced(&self, id: &str) -> Result<()>;

    /// Count all books
    async fn count(&self) -> Result<i64>;

    /// Count books that have been covered by at least one sync attempt
    async fn count_synced(&self) -> Result<i64>;
}

/// SQLite implementation of BookRepository
pub struct SqliteBookRepository {
    pool: SqlitePool,
}

impl SqliteBookRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn insert(&self, book: &CanonicalBook) -> Result<()> {
        book.validate().map_err(|e| StoreError::InvalidInput {
            field: "Book".to_string(),
            message: e,
        })?;

        sqlx::query(
            "INSERT INTO books (id, source_id, title, author, isbn, progress, total_duration,
                                is_finished, started_at, finished_at, last_synced_at,
                                created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&book.id)
        .bind(&book.source_id)
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.isbn)
        .bind(book.progress)
        .bind(book.total_duration)
        .bind(book.is_finished)
        .bind(book.started_at)
        .bind(book.finished_at)
        .bind(book.last_synced_at)
        .bind(book.created_at)
        .bind(book.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update(&self, book: &CanonicalBook) -> Result<()> {
        book.validate().map_err(|e| StoreError::InvalidInput {
            field: "Book".to_string(),
            message: e,
        })?;

        let result = sqlx::query(
            "UPDATE books
             SET title = ?, author = ?, isbn = ?, progress = ?, total_duration = ?,
                 is_finished = ?, started_at = ?, finished_at = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.isbn)
        .bind(book.progress)
        .bind(book.total_duration)
        .bind(book.is_finished)
        .bind(book.started_at)
        .bind(book.finished_at)
        .bind(book.updated_at)
        .bind(&book.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity_type: "Book".to_string(),
                id: book.id.clone(),
            });
        }

        Ok(())
    }
}

#[async_trait]
impl BookRepository for SqliteBookRepository {
    async fn upsert_from_source(
        &self,
        item: &ItemSummary,
        progress: &ProgressSnapshot,
    ) -> Result<CanonicalBook> {
        match self.find_by_source_id(&item.id).await? {
            Some(mut book) => {
                // Metadata can change on the canonical platform between pulls
                book.title = item.title.clone();
                book.author = item.author.clone();
                book.isbn = item.isbn.clone();
                book.apply_progress(
                    progress.progress,
                    progress.total_duration,
                    progress.is_finished,
                );
                self.update(&book).await?;
                Ok(book)
            }
            None => {
                let mut book = CanonicalBook::new(
                    item.id.clone(),
                    item.title.clone(),
                    item.author.clone(),
                    item.isbn.clone(),
                );
                book.apply_progress(
                    progress.progress,
                    progress.total_duration,
                    progress.is_finished,
                );
                self.insert(&book).await?;
                Ok(book)
            }
        }
    }

    async fn find_by_source_id(&self, source_id: &str) -> Result<Option<CanonicalBook>> {
        let book = sqlx::query_as::<_, CanonicalBook>("SELECT * FROM books WHERE source_id = ?")
            .bind(source_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(book)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<CanonicalBook>> {
        let book = sqlx::query_as::<_, CanonicalBook>("SELECT * FROM books WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(book)
    }

    async fn list_all(&self) -> Result<Vec<CanonicalBook>> {
        let books =
            sqlx::query_as::<_, CanonicalBook>("SELECT * FROM books ORDER BY created_at ASC, id ASC")
                .fetch_all(&self.pool)
                .await?;

        Ok(books)
    }

    async fn touch_last_synced(&self, id: &str) -> Result<()> {
        let now = chrono::Utc::now().timestamp();

        let result = sqlx::query("UPDATE books SET last_synced_at = ?, updated_at = ? WHERE id = ?")
            .bind(now)
            .bind(now)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity_type: "Book".to_string(),
                id: id.to_string(),
            });
        }

        Ok(())
    }

    async fn count(&self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM books")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    async fn count_synced(&self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM books WHERE last_synced_at IS NOT NULL",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}
