pub mod runner;

use crate::error::MigrateError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// One versioned unit of schema change, read from a `.sql` file.
#[derive(Debug, Clone)]
pub struct MigrationDefinition {
    /// File stem, e.g. `0003_add_orders_index`. Unique within a set.
    pub sequence_key: String,
    /// Numeric prefix of the sequence key; the sole ordering authority.
    pub sequence_index: u64,
    /// One or more statements in the target engine's dialect.
    pub statement_body: String,
    /// SHA-256 of the statement body, hex encoded.
    pub checksum: String,
}

impl MigrationDefinition {
    pub fn new(sequence_key: impl Into<String>, statement_body: impl Into<String>) -> Result<Self, MigrateError> {
        let sequence_key = sequence_key.into();
        let statement_body = statement_body.into();
        let sequence_index = sequence_index(&sequence_key).ok_or_else(|| {
            MigrateError::MigrationSetInvalid(format!(
                "migration {sequence_key} has no numeric sequence prefix"
            ))
        })?;
        let checksum = checksum(&statement_body);
        Ok(Self {
            sequence_key,
            sequence_index,
            statement_body,
            checksum,
        })
    }
}

/// Leading digit run of a sequence key, if any.
pub fn sequence_index(sequence_key: &str) -> Option<u64> {
    let digits: String = sequence_key
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

pub fn checksum(statement_body: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(statement_body.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Load the full migration set from a directory, sorted ascending by
/// sequence index.
///
/// Files must follow the `NNNN_name.sql` convention; anything else in the
/// directory (subdirectories, journal metadata, non-SQL files) is ignored.
/// Fails with `MigrationSetInvalid` before any statement executes if the
/// directory is unreadable, a file has no numeric prefix, or two files share
/// a prefix.
pub fn load_migrations(path: &Path) -> Result<Vec<MigrationDefinition>, MigrateError> {
    let entries = std::fs::read_dir(path).map_err(|e| {
        MigrateError::MigrationSetInvalid(format!(
            "cannot read migrations directory {}: {e}",
            path.display()
        ))
    })?;

    let mut migrations = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| {
            MigrateError::MigrationSetInvalid(format!(
                "cannot read migrations directory {}: {e}",
                path.display()
            ))
        })?;
        let file_path = entry.path();
        if !file_path.is_file() || file_path.extension().and_then(|e| e.to_str()) != Some("sql") {
            continue;
        }

        let sequence_key = file_path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| {
                MigrateError::MigrationSetInvalid(format!(
                    "migration filename {} is not valid UTF-8",
                    file_path.display()
                ))
            })?
            .to_string();

        let statement_body = std::fs::read_to_string(&file_path).map_err(|e| {
            MigrateError::MigrationSetInvalid(format!(
                "cannot read migration {}: {e}",
                file_path.display()
            ))
        })?;

        migrations.push(MigrationDefinition::new(sequence_key, statement_body)?);
    }

    migrations.sort_by(|a, b| {
        a.sequence_index
            .cmp(&b.sequence_index)
            .then_with(|| a.sequence_key.cmp(&b.sequence_key))
    });

    for pair in migrations.windows(2) {
        if pair[0].sequence_index == pair[1].sequence_index {
            return Err(MigrateError::MigrationSetInvalid(format!(
                "duplicate sequence index {}: {} and {}",
                pair[0].sequence_index, pair[0].sequence_key, pair[1].sequence_key
            )));
        }
    }

    Ok(migrations)
}

pub use runner::run;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn write_migration(dir: &TempDir, name: &str, body: &str) {
        std::fs::write(dir.path().join(name), body).unwrap();
    }

    #[test]
    fn loads_sorted_by_numeric_prefix() {
        let dir = TempDir::new().unwrap();
        write_migration(&dir, "0010_second.sql", "CREATE TABLE b (id INT);");
        write_migration(&dir, "0002_first.sql", "CREATE TABLE a (id INT);");
        write_migration(&dir, "notes.txt", "not a migration");
        std::fs::create_dir(dir.path().join("meta")).unwrap();

        let set = load_migrations(dir.path()).unwrap();
        let keys: Vec<&str> = set.iter().map(|m| m.sequence_key.as_str()).collect();
        assert_eq!(keys, vec!["0002_first", "0010_second"]);
        assert_eq!(set[0].sequence_index, 2);
        assert_eq!(set[1].sequence_index, 10);
    }

    #[test]
    fn duplicate_sequence_index_is_invalid() {
        let dir = TempDir::new().unwrap();
        write_migration(&dir, "0001_a.sql", "CREATE TABLE a (id INT);");
        write_migration(&dir, "0001_b.sql", "CREATE TABLE b (id INT);");

        let err = load_migrations(dir.path()).unwrap_err();
        match err {
            MigrateError::MigrationSetInvalid(detail) => {
                assert!(detail.contains("duplicate"));
                assert!(detail.contains("0001_a"));
                assert!(detail.contains("0001_b"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_numeric_prefix_is_invalid() {
        let dir = TempDir::new().unwrap();
        write_migration(&dir, "init.sql", "CREATE TABLE a (id INT);");

        let err = load_migrations(dir.path()).unwrap_err();
        assert!(matches!(err, MigrateError::MigrationSetInvalid(_)));
    }

    #[test]
    fn missing_directory_is_invalid() {
        let err = load_migrations(Path::new("/nonexistent/migrations")).unwrap_err();
        assert!(matches!(err, MigrateError::MigrationSetInvalid(_)));
    }

    #[test]
    fn empty_directory_is_an_empty_set() {
        let dir = TempDir::new().unwrap();
        assert!(load_migrations(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn checksum_depends_only_on_body() {
        let a = MigrationDefinition::new("0001_a", "CREATE TABLE t (id INT);").unwrap();
        let b = MigrationDefinition::new("0002_b", "CREATE TABLE t (id INT);").unwrap();
        let c = MigrationDefinition::new("0001_a", "CREATE TABLE u (id INT);").unwrap();
        assert_eq!(a.checksum, b.checksum);
        assert_ne!(a.checksum, c.checksum);
        assert_eq!(a.checksum.len(), 64);
    }
}
