use async_trait::async_trait;
use sqlx::mysql::MySqlPoolOptions;
use sqlx::{MySql, MySqlPool, Transaction};

use super::store::{DeleteTransaction, ImageIndex};
use super::types::{ImageRecord, IndexError};

const POOL_CONNECTIONS: u32 = 10;

/// MySQL-backed index over split read/write pools.
///
/// The deployment this mirrors routed reads to a replica and writes to the
/// primary; pointing both URIs at the same server collapses the split without
/// code changes. Pools are lazy so the coordinator starts (and stays
/// serviceable for capacity probing) even while the database is down.
///
/// Expected schema: see `sql/schema.sql`.
pub struct MySqlImageIndex {
    read_pool: MySqlPool,
    write_pool: MySqlPool,
}

impl MySqlImageIndex {
    pub fn connect_lazy(read_uri: &str, write_uri: &str) -> Result<Self, IndexError> {
        let read_pool = MySqlPoolOptions::new()
            .max_connections(POOL_CONNECTIONS)
            .connect_lazy(read_uri)?;
        let write_pool = MySqlPoolOptions::new()
            .max_connections(POOL_CONNECTIONS)
            .connect_lazy(write_uri)?;
        Ok(Self {
            read_pool,
            write_pool,
        })
    }

    pub fn new(read_pool: MySqlPool, write_pool: MySqlPool) -> Self {
        Self {
            read_pool,
            write_pool,
        }
    }
}

#[async_trait]
impl ImageIndex for MySqlImageIndex {
    async fn insert_image(&self, record: &ImageRecord) -> Result<(), IndexError> {
        sqlx::query(
            "INSERT INTO images (image_id, user_id, image_name, path, created_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&record.image_id)
        .bind(&record.user_id)
        .bind(&record.image_name)
        .bind(&record.path)
        .bind(record.created_at)
        .execute(&self.write_pool)
        .await
        .map_err(|err| {
            if let sqlx::Error::Database(db) = &err {
                if db.is_unique_violation() {
                    return IndexError::DuplicateId(record.image_id.clone());
                }
            }
            IndexError::Database(err)
        })?;
        Ok(())
    }

    async fn find_image(&self, image_id: &str) -> Result<Option<ImageRecord>, IndexError> {
        let record = sqlx::query_as::<_, ImageRecord>(
            "SELECT image_id, user_id, image_name, path, created_at \
             FROM images WHERE image_id = ?",
        )
        .bind(image_id)
        .fetch_optional(&self.read_pool)
        .await?;
        Ok(record)
    }

    async fn list_images(&self) -> Result<Vec<ImageRecord>, IndexError> {
        let records = sqlx::query_as::<_, ImageRecord>(
            "SELECT image_id, user_id, image_name, path, created_at \
             FROM images ORDER BY created_at DESC",
        )
        .fetch_all(&self.read_pool)
        .await?;
        Ok(records)
    }

    async fn begin_delete(&self, image_id: &str) -> Result<Box<dyn DeleteTransaction>, IndexError> {
        let mut tx = self.write_pool.begin().await?;
        sqlx::query("DELETE FROM images WHERE image_id = ?")
            .bind(image_id)
            .execute(&mut *tx)
            .await?;
        Ok(Box::new(MySqlDeleteTransaction { tx }))
    }
}

struct MySqlDeleteTransaction {
    tx: Transaction<'static, MySql>,
}

#[async_trait]
impl DeleteTransaction for MySqlDeleteTransaction {
    async fn commit(self: Box<Self>) -> Result<(), IndexError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), IndexError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
