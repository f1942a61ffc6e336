use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Invocation-level settings. Resolved once at startup and passed explicitly
/// to the components that need them; nothing reads configuration mid-run.
#[derive(Parser, Debug, Clone)]
#[command(name = "sqlmigrate")]
#[command(about = "Applies ordered SQL schema migrations in response to an infrastructure lifecycle event", long_about = None)]
pub struct Config {
    #[arg(
        long,
        default_value = "certs/global-bundle.pem",
        env = "SQLMIGRATE_TRUST_ANCHOR",
        help = "PEM certificate bundle used to verify the database server certificate"
    )]
    pub trust_anchor: PathBuf,

    #[arg(
        long,
        default_value = ".",
        env = "SQLMIGRATE_INVOCATION_ROOT",
        help = "Directory that migration paths named in events are resolved against"
    )]
    pub invocation_root: PathBuf,

    #[arg(long, default_value = "info", env = "SQLMIGRATE_LOG_LEVEL")]
    pub log_level: String,

    #[arg(
        long,
        default_value = "300",
        env = "SQLMIGRATE_TIMEOUT_SECONDS",
        help = "Overall ceiling for one invocation in seconds"
    )]
    pub timeout_seconds: u64,
}

impl Config {
    /// Resolve configuration from CLI arguments and environment variables.
    pub fn load() -> Self {
        Config::parse()
    }

    /// Get the invocation ceiling as Duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}
