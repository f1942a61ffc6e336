use super::{apply_failed, connection_failed, Engine, JournalEntry, MigrationTarget, JOURNAL_TABLE};
use crate::error::MigrateError;
use crate::migration::MigrationDefinition;
use crate::secret::ConnectionDescriptor;
use crate::tls::TlsSettings;
use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgConnection, PgSslMode};
use sqlx::{Connection, Executor};
use tracing::debug;

/// Postgres-family engine handle.
///
/// DDL is transactional here: a migration's statements and its journal row
/// commit together or not at all.
pub struct PostgresTarget {
    conn: PgConnection,
}

impl PostgresTarget {
    pub async fn connect(
        descriptor: &ConnectionDescriptor,
        tls: &TlsSettings,
    ) -> Result<Self, MigrateError> {
        let options = PgConnectOptions::new()
            .host(&descriptor.host)
            .port(descriptor.port)
            .username(&descriptor.username)
            .password(&descriptor.password)
            .database(&descriptor.database_name)
            .ssl_mode(PgSslMode::VerifyFull)
            .ssl_root_cert(tls.trust_anchor());

        let conn = PgConnection::connect_with(&options)
            .await
            .map_err(|e| connection_failed(descriptor, e))?;

        debug!(host = %descriptor.host, database = %descriptor.database_name, "connected to postgres");
        Ok(Self { conn })
    }
}

#[async_trait]
impl MigrationTarget for PostgresTarget {
    fn engine(&self) -> Engine {
        Engine::Postgres
    }

    async fn ensure_journal(&mut self) -> Result<(), MigrateError> {
        // `conn.execute(raw_sql(..))` instead of `raw_sql(..).execute(&mut conn)`:
        // the latter hits a higher-ranked lifetime inference failure
        // ("implementation of `Executor` is not general enough") inside
        // `#[async_trait]`-boxed futures.
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {JOURNAL_TABLE} (
                sequence_key TEXT PRIMARY KEY,
                checksum TEXT NOT NULL,
                applied_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )"
        );
        self.conn.execute(sqlx::raw_sql(&sql)).await?;
        Ok(())
    }

    async fn applied_entries(&mut self) -> Result<Vec<JournalEntry>, MigrateError> {
        let entries = sqlx::query_as::<_, JournalEntry>(&format!(
            "SELECT sequence_key, checksum, applied_at FROM {JOURNAL_TABLE} ORDER BY sequence_key"
        ))
        .fetch_all(&mut self.conn)
        .await?;
        Ok(entries)
    }

    async fn apply(&mut self, migration: &MigrationDefinition) -> Result<(), MigrateError> {
        let key = migration.sequence_key.as_str();

        let mut tx = self
            .conn
            .begin()
            .await
            .map_err(|e| apply_failed(key, e))?;

        (&mut *tx)
            .execute(sqlx::raw_sql(&migration.statement_body))
            .await
            .map_err(|e| apply_failed(key, e))?;

        let recorded = sqlx::query(&format!(
            "INSERT INTO {JOURNAL_TABLE} (sequence_key, checksum) VALUES ($1, $2)"
        ))
        .bind(key)
        .bind(&migration.checksum)
        .execute(&mut *tx)
        .await;

        match recorded {
            Ok(_) => {
                tx.commit().await.map_err(|e| apply_failed(key, e))?;
                Ok(())
            }
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                // A concurrent runner won the race for this key; our schema
                // changes roll back with the transaction.
                let _ = tx.rollback().await;
                Err(MigrateError::JournalWriteConflict(key.to_string()))
            }
            Err(e) => {
                let _ = tx.rollback().await;
                Err(apply_failed(key, e))
            }
        }
    }

    async fn close(self: Box<Self>) -> Result<(), MigrateError> {
        self.conn.close().await?;
        Ok(())
    }
}
