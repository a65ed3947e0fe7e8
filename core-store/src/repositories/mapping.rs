use crate::error::{Result, StoreError};
use crate::models::PlatformMapping;
use async_trait::async_trait;
use platform_traits::PlatformKind;
use sqlx::SqlitePool;

/// Repository for platform mapping storage operations
#[async_trait]
pub trait MappingRepository: Send + Sync {
    /// Find the mapping of a book on one platform
    async fn find(&self, book_id: &str, platform: PlatformKind) -> Result<Option<PlatformMapping>>;

    /// Insert a new mapping.
    ///
    /// At most one mapping may exist per (book, platform) pair; inserting a
    /// second one fails on the unique constraint.
    ///
    /// # Errors
    /// Returns an error if the mapping data is invalid or the query fails
    async fn insert(&self, mapping: &PlatformMapping) -> Result<()>;

    /// List all mappings of a book
    async fn find_all_for_book(&self, book_id: &str) -> Result<Vec<PlatformMapping>>;

    /// Pin a host-supplied mapping, replacing whatever automated match exists.
    ///
    /// # Returns
    /// The stored mapping, with confidence 1.0 and the manual flag set
    async fn save_manual(
        &self,
        book_id: &str,
        platform: PlatformKind,
        platform_book_id: &str,
    ) -> Result<PlatformMapping>;

    /// Count mappings that target one platform
    async fn count_for_platform(&self, platform: PlatformKind) -> Result<i64>;
}

/// Raw mapping row as stored in SQLite, with the platform as text
#[derive(Debug, sqlx::FromRow)]
struct MappingRow {
    id: String,
    book_id: String,
    platform: String,
    platform_book_id: String,
    confidence: f64,
    is_manual: i64,
    created_at: i64,
    updated_at: i64,
}

impl TryFrom<MappingRow> for PlatformMapping {
    type Error = StoreError;

    fn try_from(row: MappingRow) -> Result<Self> {
        let platform =
            PlatformKind::parse(&row.platform).ok_or_else(|| StoreError::InvalidInput {
                field: "platform".to_string(),
                message: format!("Unknown platform: {}", row.platform),
            })?;

        Ok(PlatformMapping {
            id: row.id,
            book_id: row.book_id,
            platform,
            platform_book_id: row.platform_book_id,
            confidence: row.confidence,
            is_manual: row.is_manual,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// SQLite implementation of MappingRepository
pub struct SqliteMappingRepository {
    pool: SqlitePool,
}

impl SqliteMappingRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MappingRepository for SqliteMappingRepository {
    async fn find(&self, book_id: &str, platform: PlatformKind) -> Result<Option<PlatformMapping>> {
        let row = sqlx::query_as::<_, MappingRow>(
            "SELECT * FROM book_mappings WHERE book_id = ? AND platform = ?",
        )
        .bind(book_id)
        .bind(platform.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(PlatformMapping::try_from).transpose()
    }

    async fn insert(&self, mapping: &PlatformMapping) -> Result<()> {
        mapping.validate().map_err(|e| StoreError::InvalidInput {
            field: "Mapping".to_string(),
            message: e,
        })?;

        sqlx::query(
            "INSERT INTO book_mappings (id, book_id, platform, platform_book_id, confidence,
                                        is_manual, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&mapping.id)
        .bind(&mapping.book_id)
        .bind(mapping.platform.as_str())
        .bind(&mapping.platform_book_id)
        .bind(mapping.confidence)
        .bind(mapping.is_manual)
        .bind(mapping.created_at)
        .bind(mapping.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_all_for_book(&self, book_id: &str) -> Result<Vec<PlatformMapping>> {
        let rows = sqlx::query_as::<_, MappingRow>(
            "SELECT * FROM book_mappings WHERE book_id = ? ORDER BY platform ASC",
        )
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(PlatformMapping::try_from).collect()
    }

    async fn save_manual(
        &self,
        book_id: &str,
        platform: PlatformKind,
        platform_book_id: &str,
    ) -> Result<PlatformMapping> {
        match self.find(book_id, platform).await? {
            Some(mut mapping) => {
                let now = chrono::Utc::now().timestamp();
                mapping.platform_book_id = platform_book_id.to_string();
                mapping.confidence = 1.0;
                mapping.is_manual = 1;
                mapping.updated_at = now;

                sqlx::query(
                    "UPDATE book_mappings
                     SET platform_book_id = ?, confidence = ?, is_manual = ?, updated_at = ?
                     WHERE id = ?",
                )
                .bind(&mapping.platform_book_id)
                .bind(mapping.confidence)
                .bind(mapping.is_manual)
                .bind(mapping.updated_at)
                .bind(&mapping.id)
                .execute(&self.pool)
                .await?;

                Ok(mapping)
            }
            None => {
                let mapping = PlatformMapping::manual(
                    book_id.to_string(),
                    platform,
                    platform_book_id.to_string(),
                );
                self.insert(&mapping).await?;
                Ok(mapping)
            }
        }
    }

    async fn count_for_platform(&self, platform: PlatformKind) -> Result<i64> {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM book_mappings WHERE platform = ?")
                .bind(platform.as_str())
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;
    use crate::models::CanonicalBook;
    use crate::repositories::book::{BookRepository, SqliteBookRepository};
    use platform_traits::{ItemSummary, ProgressSnapshot};

    async fn setup() -> (SqliteMappingRepository, CanonicalBook) {
        let pool = create_test_pool().await.unwrap();

        let books = SqliteBookRepository::new(pool.clone());
        let item = ItemSummary {
            id: "item-1".to_string(),
            title: "Dune".to_string(),
            author: "Frank Herbert".to_string(),
            isbn: None,
        };
        let progress = ProgressSnapshot {
            progress: 0.0,
            total_duration: 100.0,
            is_finished: false,
        };
        let book = books.upsert_from_source(&item, &progress).await.unwrap();

        (SqliteMappingRepository::new(pool), book)
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let (repo, book) = setup().await;

        let mapping = PlatformMapping::heuristic(
            book.id.clone(),
            PlatformKind::Hardcover,
            "hc-42".to_string(),
            0.92,
        );
        repo.insert(&mapping).await.unwrap();

        let found = repo
            .find(&book.id, PlatformKind::Hardcover)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found, mapping);
    }

    #[tokio::test]
    async fn test_find_missing_platform() {
        let (repo, book) = setup().await;

        let mapping = PlatformMapping::exact(
            book.id.clone(),
            PlatformKind::Hardcover,
            "hc-42".to_string(),
        );
        repo.insert(&mapping).await.unwrap();

        let found = repo.find(&book.id, PlatformKind::Storygraph).await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_insert_duplicate_platform_fails() {
        let (repo, book) = setup().await;

        let first = PlatformMapping::exact(
            book.id.clone(),
            PlatformKind::Hardcover,
            "hc-42".to_string(),
        );
        repo.insert(&first).await.unwrap();

        let second = PlatformMapping::exact(
            book.id.clone(),
            PlatformKind::Hardcover,
            "hc-99".to_string(),
        );
        let result = repo.insert(&second).await;
        assert!(matches!(result, Err(StoreError::Database(_))));
    }

    #[tokio::test]
    async fn test_insert_rejects_invalid_confidence() {
        let (repo, book) = setup().await;

        let mapping = PlatformMapping::heuristic(
            book.id.clone(),
            PlatformKind::Hardcover,
            "hc-42".to_string(),
            1.5,
        );
        let result = repo.insert(&mapping).await;
        assert!(matches!(result, Err(StoreError::InvalidInput { .. })));
    }

    #[tokio::test]
    async fn test_find_all_for_book() {
        let (repo, book) = setup().await;

        repo.insert(&PlatformMapping::exact(
            book.id.clone(),
            PlatformKind::Hardcover,
            "hc-42".to_string(),
        ))
        .await
        .unwrap();
        repo.insert(&PlatformMapping::heuristic(
            book.id.clone(),
            PlatformKind::Storygraph,
            "sg-7".to_string(),
            0.85,
        ))
        .await
        .unwrap();

        let mappings = repo.find_all_for_book(&book.id).await.unwrap();
        assert_eq!(mappings.len(), 2);
        assert_eq!(mappings[0].platform, PlatformKind::Hardcover);
        assert_eq!(mappings[1].platform, PlatformKind::Storygraph);
    }

    #[tokio::test]
    async fn test_save_manual_creates_mapping() {
        let (repo, book) = setup().await;

        let mapping = repo
            .save_manual(&book.id, PlatformKind::Hardcover, "hc-42")
            .await
            .unwrap();

        assert_eq!(mapping.confidence, 1.0);
        assert!(mapping.is_manual_override());

        let found = repo
            .find(&book.id, PlatformKind::Hardcover)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found, mapping);
    }

    #[tokio::test]
    async fn test_save_manual_replaces_automated_mapping() {
        let (repo, book) = setup().await;

        let automated = PlatformMapping::heuristic(
            book.id.clone(),
            PlatformKind::Hardcover,
            "hc-wrong".to_string(),
            0.81,
        );
        repo.insert(&automated).await.unwrap();

        let manual = repo
            .save_manual(&book.id, PlatformKind::Hardcover, "hc-right")
            .await
            .unwrap();

        assert_eq!(manual.id, automated.id);
        assert_eq!(manual.platform_book_id, "hc-right");
        assert_eq!(manual.confidence, 1.0);
        assert!(manual.is_manual_override());

        let mappings = repo.find_all_for_book(&book.id).await.unwrap();
        assert_eq!(mappings.len(), 1);
    }

    #[tokio::test]
    async fn test_count_for_platform() {
        let (repo, book) = setup().await;

        repo.insert(&PlatformMapping::exact(
            book.id.clone(),
            PlatformKind::Hardcover,
            "hc-42".to_string(),
        ))
        .await
        .unwrap();

        assert_eq!(repo.count_for_platform(PlatformKind::Hardcover).await.unwrap(), 1);
        assert_eq!(repo.count_for_platform(PlatformKind::Storygraph).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unknown_platform_row_rejected() {
        let (repo, book) = setup().await;

        // Bypass the typed API to simulate a row written by a newer version
        sqlx::query(
            "INSERT INTO book_mappings (id, book_id, platform, platform_book_id, confidence,
                                        is_manual, created_at, updated_at)
             VALUES (?, ?, 'goodreads', 'gr-1', 1.0, 0, 0, 0)",
        )
        .bind("mapping-x")
        .bind(&book.id)
        .execute(&repo.pool)
        .await
        .unwrap();

        let result = repo.find_all_for_book(&book.id).await;
        assert!(matches!(result, Err(StoreError::InvalidInput { .. })));
    }
}
