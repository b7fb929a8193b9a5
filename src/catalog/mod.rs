//! Document catalog: one row per ingested document, stored in SQLite.

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;

use crate::models::{Document, DocumentList, NewDocument};

#[derive(Debug, Clone)]
pub struct Catalog {
    pool: SqlitePool,
}

impl Catalog {
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create catalog directory: {}", parent.display())
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .context("Failed to create catalog connection pool")?;

        sqlx::migrate!("src/catalog/migrations")
            .run(&pool)
            .await
            .context("Failed to run catalog migrations")?;

        tracing::debug!("Catalog ready at {}", path.display());
        Ok(Self { pool })
    }

    pub async fn insert(&self, new: &NewDocument) -> Result<Document> {
        let create_date = new.create_date.unwrap_or_else(Utc::now);
        let id = sqlx::query(
            "INSERT INTO documents (file_path, embedding_file, index_file, unique_id, create_date)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&new.file_path)
        .bind(&new.embedding_file)
        .bind(&new.index_file)
        .bind(&new.unique_id)
        .bind(create_date)
        .execute(&self.pool)
        .await
        .context("Failed to insert document")?
        .last_insert_rowid();

        self.get(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Failed to retrieve inserted document"))
    }

    pub async fn get(&self, id: i64) -> Result<Option<Document>> {
        sqlx::query_as::<_, Document>(
            "SELECT id, file_path, embedding_file, index_file, unique_id, create_date
             FROM documents WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to get document by id")
    }

    /// All documents, newest first.
    pub async fn list(&self) -> Result<DocumentList> {
        let document_list = sqlx::query_as::<_, Document>(
            "SELECT id, file_path, embedding_file, index_file, unique_id, create_date
             FROM documents ORDER BY create_date DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list documents")?;

        Ok(DocumentList {
            total: document_list.len(),
            document_list,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    async fn create_test_catalog() -> Result<(tempfile::TempDir, Catalog)> {
        let dir = tempfile::tempdir()?;
        let catalog = Catalog::open(&dir.path().join("catalog.db")).await?;
        Ok((dir, catalog))
    }

    fn new_document(id: &str) -> NewDocument {
        NewDocument {
            file_path: format!("docs/{id}.pdf"),
            embedding_file: format!("vector_db/embeddings_{id}.bin"),
            index_file: format!("vector_db/index_{id}.idx"),
            unique_id: id.to_string(),
            create_date: None,
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() -> Result<()> {
        let (_dir, catalog) = create_test_catalog().await?;
        let doc = catalog.insert(&new_document("abc")).await?;
        assert_eq!(doc.unique_id, "abc");

        let fetched = catalog.get(doc.id).await?.expect("document should exist");
        assert_eq!(fetched.file_path, "docs/abc.pdf");
        assert!(catalog.get(doc.id + 100).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_list_newest_first() -> Result<()> {
        let (_dir, catalog) = create_test_catalog().await?;
        let now = Utc::now();
        let mut older = new_document("older");
        older.create_date = Some(now - Duration::hours(1));
        let mut newer = new_document("newer");
        newer.create_date = Some(now);

        catalog.insert(&older).await?;
        catalog.insert(&newer).await?;

        let list = catalog.list().await?;
        assert_eq!(list.total, 2);
        assert_eq!(list.document_list[0].unique_id, "newer");
        assert_eq!(list.document_list[1].unique_id, "older");
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_unique_id_rejected() -> Result<()> {
        let (_dir, catalog) = create_test_catalog().await?;
        catalog.insert(&new_document("dup")).await?;
        assert!(catalog.insert(&new_document("dup")).await.is_err());
        Ok(())
    }
}
