use serde::{Deserialize, Serialize};

/// What the triggering framework is asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum RequestType {
    Create,
    Update,
    Delete,
}

/// Inbound lifecycle notification, one per invocation.
///
/// The envelope follows the CloudFormation custom-resource shape
/// (`RequestType`, `ResourceProperties`, `PhysicalResourceId`); camelCase
/// spellings are accepted as aliases. Unknown envelope fields such as
/// `ServiceToken` are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct LifecycleEvent {
    #[serde(rename = "RequestType", alias = "requestType")]
    pub request_type: RequestType,

    #[serde(rename = "ResourceProperties", alias = "resourceProperties")]
    pub resource_properties: ResourceProperties,

    #[serde(
        rename = "PhysicalResourceId",
        alias = "physicalResourceId",
        default
    )]
    pub physical_resource_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResourceProperties {
    /// Opaque locator for the credential payload in the secret store.
    #[serde(rename = "secretArn", alias = "secretReference")]
    pub secret_reference: String,

    /// Directory of ordered migration files, relative to the invocation root.
    #[serde(rename = "migrationsPath")]
    pub migrations_path: String,
}

/// Outbound result returned to the lifecycle caller on success.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    #[serde(rename = "PhysicalResourceId")]
    pub physical_resource_id: String,

    #[serde(rename = "Data", skip_serializing_if = "Option::is_none")]
    pub data: Option<ResultData>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResultData {
    #[serde(rename = "AppliedMigrations")]
    pub applied_migrations: u32,
}
