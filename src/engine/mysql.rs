use super::{apply_failed, connection_failed, Engine, JournalEntry, MigrationTarget, JOURNAL_TABLE};
use crate::error::MigrateError;
use crate::migration::MigrationDefinition;
use crate::secret::ConnectionDescriptor;
use crate::tls::TlsSettings;
use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlSslMode};
use sqlx::{Connection, Executor};
use tracing::debug;

/// MySQL-family engine handle.
///
/// MySQL commits DDL statements implicitly, so a migration cannot run inside
/// a transaction: statements execute first and the journal row follows as a
/// separate write. If the process dies between the two, the schema change is
/// in place but unrecorded, and the next run will fail on re-apply — that
/// case needs manual remediation (record the row or revert the change).
pub struct MySqlTarget {
    conn: MySqlConnection,
}

impl MySqlTarget {
    pub async fn connect(
        descriptor: &ConnectionDescriptor,
        tls: &TlsSettings,
    ) -> Result<Self, MigrateError> {
        let options = MySqlConnectOptions::new()
            .host(&descriptor.host)
            .port(descriptor.port)
            .username(&descriptor.username)
            .password(&descriptor.password)
            .database(&descriptor.database_name)
            .ssl_mode(MySqlSslMode::VerifyIdentity)
            .ssl_ca(tls.trust_anchor());

        let conn = MySqlConnection::connect_with(&options)
            .await
            .map_err(|e| connection_failed(descriptor, e))?;

        debug!(host = %descriptor.host, database = %descriptor.database_name, "connected to mysql");
        Ok(Self { conn })
    }
}

#[async_trait]
impl MigrationTarget for MySqlTarget {
    fn engine(&self) -> Engine {
        Engine::MySql
    }

    async fn ensure_journal(&mut self) -> Result<(), MigrateError> {
        // `conn.execute(raw_sql(..))` instead of `raw_sql(..).execute(&mut conn)`:
        // the latter hits a higher-ranked lifetime inference failure
        // ("implementation of `Executor` is not general enough") inside
        // `#[async_trait]`-boxed futures.
        //
        // 191 keeps the primary key under the utf8mb4 index length limit
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {JOURNAL_TABLE} (
                sequence_key VARCHAR(191) PRIMARY KEY,
                checksum CHAR(64) NOT NULL,
                applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
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

        self.conn
            .execute(sqlx::raw_sql(&migration.statement_body))
            .await
            .map_err(|e| apply_failed(key, e))?;

        let recorded = sqlx::query(&format!(
            "INSERT INTO {JOURNAL_TABLE} (sequence_key, checksum) VALUES (?, ?)"
        ))
        .bind(key)
        .bind(&migration.checksum)
        .execute(&mut self.conn)
        .await;

        match recorded {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(MigrateError::JournalWriteConflict(key.to_string()))
            }
            Err(e) => Err(apply_failed(key, e)),
        }
    }

    async fn close(self: Box<Self>) -> Result<(), MigrateError> {
        self.conn.close().await?;
        Ok(())
    }
}
