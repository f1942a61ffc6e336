use super::{load_migrations, sequence_index};
use crate::engine::MigrationTarget;
use crate::error::MigrateError;
use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

/// Apply all pending migrations from `migrations_path` to the target, in
/// sequence order, and return how many were applied in this invocation.
///
/// The journal is always left as a clean prefix of the ordered set: the
/// runner never applies out of order, never re-applies a recorded key, and
/// stops at the first failure. Re-invocation after a transient failure
/// resumes exactly at the failed migration. A journal write conflict means a
/// concurrent runner applied that migration; it is skipped, not fatal.
pub async fn run(
    target: &mut dyn MigrationTarget,
    migrations_path: &Path,
) -> Result<u32, MigrateError> {
    let definitions = load_migrations(migrations_path)?;

    target.ensure_journal().await?;
    let applied = target.applied_entries().await?;

    let by_key: HashMap<&str, &super::MigrationDefinition> = definitions
        .iter()
        .map(|def| (def.sequence_key.as_str(), def))
        .collect();

    // Rewritten history is a user error this runner cannot safely correct;
    // it is reported, never re-applied.
    let mut high_water: Option<u64> = None;
    for entry in &applied {
        if let Some(def) = by_key.get(entry.sequence_key.as_str()) {
            if def.checksum != entry.checksum {
                warn!(
                    sequence_key = %entry.sequence_key,
                    "checksum drift: applied migration no longer matches its file; not re-applying"
                );
            }
        }
        match sequence_index(&entry.sequence_key) {
            Some(index) => high_water = high_water.max(Some(index)),
            None => warn!(
                sequence_key = %entry.sequence_key,
                "journal entry has no numeric sequence prefix; ignoring for ordering"
            ),
        }
    }

    let mut applied_now = 0u32;
    for def in &definitions {
        if let Some(high) = high_water {
            if def.sequence_index <= high {
                continue;
            }
        }

        info!(sequence_key = %def.sequence_key, "applying migration");
        let start = Instant::now();
        match target.apply(def).await {
            Ok(()) => {
                applied_now += 1;
                info!(
                    sequence_key = %def.sequence_key,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "migration applied"
                );
            }
            Err(MigrateError::JournalWriteConflict(key)) => {
                info!(sequence_key = %key, "migration recorded by a concurrent runner; skipping");
            }
            Err(e) => {
                if !target.engine().transactional_ddl() {
                    warn!(
                        sequence_key = %def.sequence_key,
                        engine = %target.engine(),
                        "engine has no transactional DDL; a partial schema change may need manual remediation"
                    );
                }
                return Err(e);
            }
        }
    }

    if applied_now == 0 {
        info!("schema is up to date; nothing pending");
    } else {
        info!(applied = applied_now, "applied pending migrations");
    }

    Ok(applied_now)
}
