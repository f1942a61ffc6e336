use std::path::PathBuf;
use thiserror::Error;

/// Failure taxonomy for a migration invocation.
///
/// Every variant except `JournalWriteConflict` aborts the invocation and is
/// surfaced verbatim to the lifecycle caller. `JournalWriteConflict` is
/// internal: it means another runner recorded the same sequence key first,
/// and the runner skips past it.
#[derive(Error, Debug)]
pub enum MigrateError {
    #[error("secret {reference} is unavailable: {reason}")]
    SecretUnavailable { reference: String, reason: String },

    #[error("secret payload is malformed: {0}")]
    SecretMalformed(String),

    #[error("unsupported database engine: {0}")]
    UnsupportedEngine(String),

    #[error("trust anchor bundle {} is unavailable: {source}", path.display())]
    TrustAnchorUnavailable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to connect to {host}:{port}/{database}: {source}")]
    ConnectionFailed {
        host: String,
        port: u16,
        database: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("invalid migration set: {0}")]
    MigrationSetInvalid(String),

    #[error("migration {sequence_key} failed: {source}")]
    MigrationApplyFailed {
        sequence_key: String,
        #[source]
        source: sqlx::Error,
    },

    /// A concurrent runner already recorded this sequence key.
    #[error("journal write conflict on {0}")]
    JournalWriteConflict(String),

    /// Journal bookkeeping failed outside any specific migration.
    #[error("migration journal operation failed: {0}")]
    Journal(#[from] sqlx::Error),
}
