use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::domain::repositories::{
    merge_fields, Document, DocumentStore, Fields, Query, RepositoryError, SnapshotListener,
    Subscription, TxWrite, Versioned, MAX_TRANSACTION_ATTEMPTS,
};
use crate::domain::services::timing::Clock;
use crate::infrastructure::database::change_feed::{spawn_query_listener, ChangeNotifier};

const SCHEMA: [&str; 3] = [
    r#"
    CREATE TABLE IF NOT EXISTS documents (
        collection TEXT NOT NULL,
        id TEXT NOT NULL,
        data TEXT NOT NULL,
        version INTEGER NOT NULL,
        updated_at INTEGER NOT NULL,
        PRIMARY KEY (collection, id)
    )
    "#,
    // Store-wide version counter: a re-created row never reuses a version
    r#"
    CREATE TABLE IF NOT EXISTS version_sequence (
        id INTEGER PRIMARY KEY CHECK (id = 1),
        value INTEGER NOT NULL
    )
    "#,
    r#"
    INSERT OR IGNORE INTO version_sequence (id, value)
    VALUES (1, COALESCE((SELECT MAX(version) FROM documents), 0))
    "#,
];

fn db_error(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Database(e.to_string())
}

/// SQLite implementation of DocumentStore.
///
/// Each document is one JSON row guarded by a version column; conditional
/// commits are `UPDATE ... WHERE version = ?`.
#[derive(Clone)]
pub struct SqliteDocumentStore {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
    notifier: ChangeNotifier,
}

impl SqliteDocumentStore {
    pub fn new(pool: SqlitePool, clock: Arc<dyn Clock>) -> Self {
        Self {
            pool,
            clock,
            notifier: ChangeNotifier::default(),
        }
    }

    /// Open (creating if needed) the database at `url` and ensure the schema
    pub async fn connect(url: &str, clock: Arc<dyn Clock>) -> Result<Self, RepositoryError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(db_error)?
            .create_if_missing(true);

        let pool_options = if url.contains(":memory:") {
            // Every connection to ":memory:" is a separate database, and it
            // vanishes when the connection closes
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(db_error)?;

        let store = Self::new(pool, clock);
        store.ensure_schema().await?;
        Ok(store)
    }

    pub async fn ensure_schema(&self) -> Result<(), RepositoryError> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(db_error)?;
        }
        Ok(())
    }

    /// Take the next store-wide version
    async fn next_version(&self) -> Result<i64, RepositoryError> {
        let row = sqlx::query(
            "UPDATE version_sequence SET value = value + 1 WHERE id = 1 RETURNING value",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(row.get("value"))
    }

    fn encode(fields: &Fields) -> Result<String, RepositoryError> {
        Ok(serde_json::to_string(fields)?)
    }

    fn decode(id: String, data: &str) -> Result<Document, RepositoryError> {
        let fields: Fields = serde_json::from_str(data)?;
        Ok(Document::new(id, fields))
    }

    fn row_to_versioned(row: &sqlx::sqlite::SqliteRow) -> Result<Versioned, RepositoryError> {
        let id: String = row.get("id");
        let data: String = row.get("data");
        let version: i64 = row.get("version");
        Ok(Versioned {
            document: Self::decode(id, &data)?,
            version: version as u64,
        })
    }

    /// Guarded write; returns false when the row moved past `expected_version`
    async fn try_commit(
        &self,
        collection: &str,
        id: &str,
        expected_version: u64,
        write: TxWrite,
    ) -> Result<bool, RepositoryError> {
        let result = match write {
            TxWrite::None => return Ok(true),
            TxWrite::Update(patch) => {
                let current = sqlx::query(
                    "SELECT id, data, version FROM documents WHERE collection = ? AND id = ? AND version = ?",
                )
                .bind(collection)
                .bind(id)
                .bind(expected_version as i64)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error)?;

                let Some(row) = current else {
                    return Ok(false);
                };
                let mut document = Self::row_to_versioned(&row)?.document;
                merge_fields(&mut document.fields, patch);

                let version = self.next_version().await?;

                sqlx::query(
                    "UPDATE documents SET data = ?, version = ?, updated_at = ? \
                     WHERE collection = ? AND id = ? AND version = ?",
                )
                .bind(Self::encode(&document.fields)?)
                .bind(version)
                .bind(self.now())
                .bind(collection)
                .bind(id)
                .bind(expected_version as i64)
                .execute(&self.pool)
                .await
                .map_err(db_error)?
            }
            TxWrite::Delete => sqlx::query(
                "DELETE FROM documents WHERE collection = ? AND id = ? AND version = ?",
            )
            .bind(collection)
            .bind(id)
            .bind(expected_version as i64)
            .execute(&self.pool)
            .await
            .map_err(db_error)?,
        };

        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    fn now(&self) -> i64 {
        self.clock.now_millis()
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, RepositoryError> {
        Ok(self
            .get_versioned(collection, id)
            .await?
            .map(|versioned| versioned.document))
    }

    async fn add(&self, collection: &str, fields: Fields) -> Result<String, RepositoryError> {
        let id = Uuid::new_v4().to_string();
        let version = self.next_version().await?;

        sqlx::query(
            "INSERT INTO documents (collection, id, data, version, updated_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(collection)
        .bind(&id)
        .bind(Self::encode(&fields)?)
        .bind(version)
        .bind(self.now())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        self.notifier.notify(collection, &id);
        Ok(id)
    }

    async fn put(&self, collection: &str, id: &str, fields: Fields) -> Result<(), RepositoryError> {
        let version = self.next_version().await?;

        sqlx::query(
            r#"
            INSERT INTO documents (collection, id, data, version, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(collection, id) DO UPDATE SET
                data = excluded.data,
                version = excluded.version,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(Self::encode(&fields)?)
        .bind(version)
        .bind(self.now())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        self.notifier.notify(collection, id);
        Ok(())
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        patch: Fields,
    ) -> Result<(), RepositoryError> {
        for _ in 0..MAX_TRANSACTION_ATTEMPTS {
            let current = self
                .get_versioned(collection, id)
                .await?
                .ok_or_else(|| RepositoryError::NotFound(format!("{}/{}", collection, id)))?;

            if self
                .try_commit(collection, id, current.version, TxWrite::Update(patch.clone()))
                .await?
            {
                self.notifier.notify(collection, id);
                return Ok(());
            }
        }

        Err(RepositoryError::Conflict(format!(
            "{}/{} kept changing during update",
            collection, id
        )))
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = ? AND id = ?")
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        if result.rows_affected() > 0 {
            self.notifier.notify(collection, id);
        }
        Ok(())
    }

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>, RepositoryError> {
        let rows = sqlx::query("SELECT id, data, version FROM documents WHERE collection = ?")
            .bind(collection)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;

        let documents = rows
            .iter()
            .map(|row| Self::row_to_versioned(row).map(|v| v.document))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(query.apply(documents))
    }

    async fn subscribe(
        &self,
        collection: &str,
        query: Query,
        listener: SnapshotListener,
    ) -> Result<Subscription, RepositoryError> {
        let notices = self.notifier.receiver();
        Ok(spawn_query_listener(
            self.clone(),
            collection.to_string(),
            query,
            listener,
            notices,
        ))
    }

    async fn get_versioned(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<Versioned>, RepositoryError> {
        let row = sqlx::query("SELECT id, data, version FROM documents WHERE collection = ? AND id = ?")
            .bind(collection)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;

        row.as_ref().map(Self::row_to_versioned).transpose()
    }

    async fn commit_if_unchanged(
        &self,
        collection: &str,
        id: &str,
        expected_version: u64,
        write: TxWrite,
    ) -> Result<(), RepositoryError> {
        if self.try_commit(collection, id, expected_version, write).await? {
            self.notifier.notify(collection, id);
            Ok(())
        } else {
            Err(RepositoryError::Conflict(format!(
                "{}/{} is no longer at version {}",
                collection, id, expected_version
            )))
        }
    }
}
