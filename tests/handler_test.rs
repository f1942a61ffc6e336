use async_trait::async_trait;
use pretty_assertions::assert_eq;
use sqlmigrate::config::Config;
use sqlmigrate::error::MigrateError;
use sqlmigrate::event::{LifecycleEvent, RequestType, ResourceProperties};
use sqlmigrate::handler::MigrationService;
use sqlmigrate::secret::SecretStore;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

struct FakeSecretStore {
    payload: Option<String>,
    fetches: AtomicUsize,
}

impl FakeSecretStore {
    fn with_payload(payload: &str) -> Self {
        Self {
            payload: Some(payload.to_string()),
            fetches: AtomicUsize::new(0),
        }
    }

    fn empty() -> Self {
        Self {
            payload: None,
            fetches: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl SecretStore for FakeSecretStore {
    async fn fetch(&self, _reference: &str) -> Result<Option<String>, MigrateError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.payload.clone())
    }
}

fn test_config() -> Config {
    Config {
        trust_anchor: "/nonexistent/global-bundle.pem".into(),
        invocation_root: ".".into(),
        log_level: "info".to_string(),
        timeout_seconds: 300,
    }
}

fn event(request_type: RequestType, physical_resource_id: Option<&str>) -> LifecycleEvent {
    LifecycleEvent {
        request_type,
        resource_properties: ResourceProperties {
            secret_reference: "arn:aws:secretsmanager:us-east-1:123:secret:db".to_string(),
            migrations_path: "migrations".to_string(),
        },
        physical_resource_id: physical_resource_id.map(str::to_string),
    }
}

#[tokio::test]
async fn delete_passes_physical_resource_id_through_untouched() {
    let store = Arc::new(FakeSecretStore::empty());
    let service = MigrationService::new(test_config(), store.clone());

    let result = service
        .handle(event(RequestType::Delete, Some("sqlmigrate-orders")))
        .await
        .unwrap();

    assert_eq!(result.physical_resource_id, "sqlmigrate-orders");
    assert!(result.data.is_none());
    // No secret fetch, no database interaction
    assert_eq!(store.fetches.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn delete_without_prior_id_mints_a_fresh_one() {
    let store = Arc::new(FakeSecretStore::empty());
    let service = MigrationService::new(test_config(), store);

    let result = service.handle(event(RequestType::Delete, None)).await.unwrap();

    assert!(result.physical_resource_id.starts_with("sqlmigrate-"));
}

#[tokio::test]
async fn unsupported_engine_fails_before_any_connection() {
    let store = Arc::new(FakeSecretStore::with_payload(
        r#"{
            "username": "app",
            "password": "pw",
            "host": "db.internal",
            "port": 1521,
            "engine": "oracle",
            "databaseName": "legacy"
        }"#,
    ));
    let service = MigrationService::new(test_config(), store);

    let err = service.handle(event(RequestType::Create, None)).await.unwrap_err();

    assert!(matches!(err, MigrateError::UnsupportedEngine(tag) if tag == "oracle"));
}

#[tokio::test]
async fn missing_secret_fails_as_unavailable() {
    let store = Arc::new(FakeSecretStore::empty());
    let service = MigrationService::new(test_config(), store);

    let err = service.handle(event(RequestType::Update, Some("prior-id"))).await.unwrap_err();

    assert!(matches!(err, MigrateError::SecretUnavailable { .. }));
}

#[tokio::test]
async fn unreadable_trust_anchor_fails_before_connecting() {
    let store = Arc::new(FakeSecretStore::with_payload(
        r#"{
            "username": "app",
            "password": "pw",
            "host": "db.internal",
            "port": 5432,
            "engine": "postgres",
            "dbname": "orders"
        }"#,
    ));
    let service = MigrationService::new(test_config(), store);

    let err = service.handle(event(RequestType::Create, None)).await.unwrap_err();

    assert!(matches!(err, MigrateError::TrustAnchorUnavailable { .. }));
}

#[test]
fn parses_cloudformation_shaped_events() {
    let raw = r#"{
        "RequestType": "Update",
        "ServiceToken": "arn:aws:lambda:us-east-1:123:function:provider",
        "ResourceProperties": {
            "ServiceToken": "arn:aws:lambda:us-east-1:123:function:provider",
            "secretArn": "arn:aws:secretsmanager:us-east-1:123:secret:db",
            "migrationsPath": "migrations",
            "timestamp": "1735689600000"
        },
        "PhysicalResourceId": "sqlmigrate-orders"
    }"#;

    let event: LifecycleEvent = serde_json::from_str(raw).unwrap();
    assert_eq!(event.request_type, RequestType::Update);
    assert_eq!(
        event.resource_properties.secret_reference,
        "arn:aws:secretsmanager:us-east-1:123:secret:db"
    );
    assert_eq!(event.resource_properties.migrations_path, "migrations");
    assert_eq!(event.physical_resource_id.as_deref(), Some("sqlmigrate-orders"));
}

#[test]
fn parses_camel_case_alias_events() {
    let raw = r#"{
        "requestType": "Create",
        "resourceProperties": {
            "secretReference": "db-credentials",
            "migrationsPath": "db/migrations"
        }
    }"#;

    let event: LifecycleEvent = serde_json::from_str(raw).unwrap();
    assert_eq!(event.request_type, RequestType::Create);
    assert_eq!(event.resource_properties.secret_reference, "db-credentials");
    assert!(event.physical_resource_id.is_none());
}
