pub mod mysql;
pub mod postgres;

use crate::error::MigrateError;
use crate::migration::MigrationDefinition;
use crate::secret::ConnectionDescriptor;
use crate::tls::TlsSettings;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// The closed set of supported database engine families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Engine {
    Postgres,
    MySql,
}

impl Engine {
    /// Map an engine tag from a secret payload to a variant.
    ///
    /// Unrecognized tags are rejected here, before any connection attempt.
    pub fn parse(raw: &str) -> Result<Self, MigrateError> {
        match raw.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "aurora-postgresql" => Ok(Engine::Postgres),
            "mysql" | "mariadb" | "aurora-mysql" => Ok(Engine::MySql),
            other => Err(MigrateError::UnsupportedEngine(other.to_string())),
        }
    }

    /// Whether DDL participates in transactions on this engine.
    ///
    /// Postgres rolls back a failed migration completely. MySQL commits each
    /// DDL statement implicitly, so a failed migration can leave the schema
    /// partially changed and may need manual remediation.
    pub fn transactional_ddl(self) -> bool {
        matches!(self, Engine::Postgres)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Engine::Postgres => "postgres",
            Engine::MySql => "mysql",
        }
    }
}

impl std::fmt::Display for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Name of the journal table created inside the target database.
pub const JOURNAL_TABLE: &str = "_sqlmigrate_journal";

/// One row of the migration journal.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct JournalEntry {
    pub sequence_key: String,
    pub checksum: String,
    pub applied_at: DateTime<Utc>,
}

/// Capability interface every engine variant provides: journal bootstrap,
/// journal read, and transactional-where-possible migration apply.
#[async_trait]
pub trait MigrationTarget: Send {
    fn engine(&self) -> Engine;

    /// Idempotently create the journal table if absent.
    async fn ensure_journal(&mut self) -> Result<(), MigrateError>;

    /// Read journal entries in ascending sequence key order.
    async fn applied_entries(&mut self) -> Result<Vec<JournalEntry>, MigrateError>;

    /// Execute one migration's statements and record its journal row.
    ///
    /// Returns `JournalWriteConflict` when a concurrent runner recorded the
    /// same sequence key first; the caller treats that as already applied.
    async fn apply(&mut self, migration: &MigrationDefinition) -> Result<(), MigrateError>;

    async fn close(self: Box<Self>) -> Result<(), MigrateError>;
}

/// Establish an engine handle for the descriptor's variant.
pub async fn connect(
    descriptor: &ConnectionDescriptor,
    tls: &TlsSettings,
) -> Result<Box<dyn MigrationTarget>, MigrateError> {
    match descriptor.engine {
        Engine::Postgres => Ok(Box::new(
            postgres::PostgresTarget::connect(descriptor, tls).await?,
        )),
        Engine::MySql => Ok(Box::new(mysql::MySqlTarget::connect(descriptor, tls).await?)),
    }
}

pub(crate) fn connection_failed(descriptor: &ConnectionDescriptor, source: sqlx::Error) -> MigrateError {
    MigrateError::ConnectionFailed {
        host: descriptor.host.clone(),
        port: descriptor.port,
        database: descriptor.database_name.clone(),
        source,
    }
}

pub(crate) fn apply_failed(sequence_key: &str, source: sqlx::Error) -> MigrateError {
    MigrateError::MigrationApplyFailed {
        sequence_key: sequence_key.to_string(),
        source,
    }
}
