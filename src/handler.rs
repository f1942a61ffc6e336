use crate::config::Config;
use crate::engine;
use crate::error::MigrateError;
use crate::event::{ExecutionResult, LifecycleEvent, RequestType, ResultData};
use crate::migration;
use crate::secret::{self, ConnectionDescriptor, SecretStore};
use crate::tls::TlsSettings;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Routes an inbound lifecycle event to the migration runner or a no-op,
/// one invocation at a time.
pub struct MigrationService {
    config: Config,
    secrets: Arc<dyn SecretStore>,
}

impl MigrationService {
    pub fn new(config: Config, secrets: Arc<dyn SecretStore>) -> Self {
        Self { config, secrets }
    }

    /// Handle one lifecycle event to completion.
    ///
    /// Create and Update run migrations; Delete is an unconditional
    /// pass-through — migrations are never rolled back automatically.
    /// Failures propagate to the caller without retry; re-delivering the
    /// event is safe because the runner resumes from the journal.
    pub async fn handle(&self, event: LifecycleEvent) -> Result<ExecutionResult, MigrateError> {
        info!(request_type = ?event.request_type, "handling lifecycle event");

        match event.request_type {
            RequestType::Create | RequestType::Update => self.migrate(&event).await,
            RequestType::Delete => Ok(Self::pass_through(event)),
        }
    }

    async fn migrate(&self, event: &LifecycleEvent) -> Result<ExecutionResult, MigrateError> {
        let properties = &event.resource_properties;

        let descriptor = secret::resolve(self.secrets.as_ref(), &properties.secret_reference).await?;
        let tls = TlsSettings::from_bundle(&self.config.trust_anchor)?;

        let migrations_path = self.config.invocation_root.join(&properties.migrations_path);
        info!(
            engine = %descriptor.engine,
            host = %descriptor.host,
            database = %descriptor.database_name,
            migrations_path = %migrations_path.display(),
            "running migrations"
        );

        let mut target = engine::connect(&descriptor, &tls).await?;
        let outcome = migration::run(target.as_mut(), &migrations_path).await;

        if let Err(e) = target.close().await {
            warn!("failed to close database connection cleanly: {e}");
        }

        let applied = outcome?;
        Ok(ExecutionResult {
            physical_resource_id: physical_resource_id(&descriptor),
            data: Some(ResultData {
                applied_migrations: applied,
            }),
        })
    }

    fn pass_through(event: LifecycleEvent) -> ExecutionResult {
        let physical_resource_id = event
            .physical_resource_id
            .unwrap_or_else(|| format!("sqlmigrate-{}", Uuid::new_v4()));
        info!(%physical_resource_id, "delete is a no-op; migrations are never rolled back");

        ExecutionResult {
            physical_resource_id,
            data: None,
        }
    }
}

/// Stable identifier for the result of migrating one logical database.
/// Derived from the target's identity, not wall-clock time, so repeated
/// invocations against the same target stay idempotent at the identity
/// level.
fn physical_resource_id(descriptor: &ConnectionDescriptor) -> String {
    format!("sqlmigrate-{}", descriptor.database_name)
}
