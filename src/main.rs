use anyhow::Result;
use std::io::Read;
use std::sync::Arc;
use tracing::{error, info};

use sqlmigrate::config::Config;
use sqlmigrate::event::LifecycleEvent;
use sqlmigrate::handler::MigrationService;
use sqlmigrate::secret::AwsSecretStore;

/// Local invocation shim: reads one lifecycle event as JSON on stdin, runs
/// it under the configured ceiling, and prints the result as JSON.
#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(config.log_level.clone())
        .init();

    info!("sqlmigrate v{}", env!("CARGO_PKG_VERSION"));

    let mut raw = String::new();
    std::io::stdin().read_to_string(&mut raw)?;
    let event: LifecycleEvent = serde_json::from_str(&raw)
        .map_err(|e| anyhow::anyhow!("invalid lifecycle event: {e}"))?;

    let secrets = Arc::new(AwsSecretStore::from_env().await);
    let service = MigrationService::new(config.clone(), secrets);

    match tokio::time::timeout(config.timeout(), service.handle(event)).await {
        Ok(Ok(result)) => {
            println!("{}", serde_json::to_string(&result)?);
            Ok(())
        }
        Ok(Err(e)) => {
            let e = anyhow::Error::from(e);
            error!("migration invocation failed: {e:#}");
            std::process::exit(1);
        }
        Err(_) => {
            error!(
                "invocation exceeded the {}s ceiling; an open transaction rolls back on \
                 engines with transactional DDL, otherwise the schema may need manual remediation",
                config.timeout_seconds
            );
            std::process::exit(1);
        }
    }
}
