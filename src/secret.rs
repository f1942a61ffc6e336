use crate::engine::Engine;
use crate::error::MigrateError;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use serde::{Deserialize, Deserializer};
use std::fmt;

/// Normalized, engine-tagged connection parameters derived from a secret
/// payload. Invocation-scoped.
#[derive(Clone)]
pub struct ConnectionDescriptor {
    pub engine: Engine,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database_name: String,
}

impl fmt::Debug for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionDescriptor")
            .field("engine", &self.engine)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("database_name", &self.database_name)
            .finish()
    }
}

/// External credential store, fetched once per invocation.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Fetch the raw secret string for a reference. `Ok(None)` means the
    /// store held no payload for it.
    async fn fetch(&self, reference: &str) -> Result<Option<String>, MigrateError>;
}

/// AWS Secrets Manager backed store.
pub struct AwsSecretStore {
    client: aws_sdk_secretsmanager::Client,
}

impl AwsSecretStore {
    pub async fn from_env() -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest()).load().await;
        Self {
            client: aws_sdk_secretsmanager::Client::new(&config),
        }
    }
}

#[async_trait]
impl SecretStore for AwsSecretStore {
    async fn fetch(&self, reference: &str) -> Result<Option<String>, MigrateError> {
        let response = self
            .client
            .get_secret_value()
            .secret_id(reference)
            .send()
            .await
            .map_err(|e| MigrateError::SecretUnavailable {
                reference: reference.to_string(),
                reason: aws_sdk_secretsmanager::error::DisplayErrorContext(&e).to_string(),
            })?;

        Ok(response.secret_string().map(|s| s.to_string()))
    }
}

/// Raw secret payload as stored. RDS-managed secrets use `dbname` and may
/// carry the port as a string, so both spellings are accepted.
#[derive(Debug, Deserialize)]
struct SecretPayload {
    username: Option<String>,
    password: Option<String>,
    host: Option<String>,
    #[serde(default, deserialize_with = "port_from_number_or_string")]
    port: Option<u16>,
    engine: Option<String>,
    #[serde(default, alias = "databaseName", alias = "dbname")]
    database_name: Option<String>,
}

fn port_from_number_or_string<'de, D>(deserializer: D) -> Result<Option<u16>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u16),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Number(port)) => Ok(Some(port)),
        Some(Raw::Text(text)) => text
            .trim()
            .parse::<u16>()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid port value: {text:?}"))),
    }
}

/// Fetch and validate the credential payload behind `reference`.
///
/// Fails before any network connection is attempted: `SecretUnavailable` for
/// a missing payload, `SecretMalformed` for a payload that is not JSON or is
/// missing required fields, `UnsupportedEngine` for an unrecognized engine
/// tag.
pub async fn resolve(
    store: &dyn SecretStore,
    reference: &str,
) -> Result<ConnectionDescriptor, MigrateError> {
    let raw = store
        .fetch(reference)
        .await?
        .ok_or_else(|| MigrateError::SecretUnavailable {
            reference: reference.to_string(),
            reason: "store returned an empty payload".to_string(),
        })?;

    let payload: SecretPayload = serde_json::from_str(&raw)
        .map_err(|e| MigrateError::SecretMalformed(format!("payload is not valid JSON: {e}")))?;

    let mut missing = Vec::new();
    if payload.username.is_none() {
        missing.push("username");
    }
    if payload.password.is_none() {
        missing.push("password");
    }
    if payload.host.is_none() {
        missing.push("host");
    }
    if payload.port.is_none() {
        missing.push("port");
    }
    if payload.engine.is_none() {
        missing.push("engine");
    }
    if payload.database_name.is_none() {
        missing.push("databaseName");
    }
    if !missing.is_empty() {
        return Err(MigrateError::SecretMalformed(format!(
            "missing required fields: {}",
            missing.join(", ")
        )));
    }

    let engine = Engine::parse(payload.engine.as_deref().unwrap_or_default())?;

    Ok(ConnectionDescriptor {
        engine,
        host: payload.host.unwrap_or_default(),
        port: payload.port.unwrap_or_default(),
        username: payload.username.unwrap_or_default(),
        password: payload.password.unwrap_or_default(),
        database_name: payload.database_name.unwrap_or_default(),
    })
}
