//! Integration tests for loading binds files and running them end to end.

use bindery_binds::config::BindsFile;
use bindery_binds::tenant::{CurrentTenant, TenantId};
use bindery_binds::{BindError, Binds, ConfigError, Engine};
use serde_json::json;

fn write_file(dir: &std::path::Path, value: serde_json::Value) -> std::path::PathBuf {
    let path = dir.join("binds.json");
    std::fs::write(&path, serde_json::to_string_pretty(&value).unwrap()).unwrap();
    path
}

#[test]
fn test_file_with_tenant_template() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().display().to_string();
    let path = write_file(
        dir.path(),
        json!({
            "binds": {
                "audit": "sqlite://",
                "orders": { "template": format!("sqlite:///{}/orders_{{tenant}}.db", root) }
            },
            "engine": { "busy_timeout": "250ms", "max_connections": 4 },
            "models": [
                { "name": "Tracked", "abstract": true, "bind_key": "orders",
                  "columns": [{ "name": "created_at", "type": "text" }] },
                { "name": "Order", "extends": "Tracked",
                  "columns": [{ "name": "id", "type": "integer", "primary_key": true }] },
                { "name": "AuditEntry", "bind_key": "audit",
                  "columns": [{ "name": "id", "type": "integer", "primary_key": true }] }
            ]
        }),
    );

    let file = BindsFile::from_path(&path).unwrap();
    let current = CurrentTenant::new();
    let binds = Binds::new(file.to_config(&current).unwrap()).unwrap();
    binds.declare_models(file.models.clone()).unwrap();
    assert_eq!(binds.config().engine.max_connections, 4);

    for tenant in ["acme", "globex"] {
        let _guard = current.enter(TenantId::new(tenant));
        binds.create_all().unwrap();
        assert_eq!(binds.reflect(Some("orders")).unwrap(), vec!["order"]);
        assert!(dir.path().join(format!("orders_{}.db", tenant)).exists());
    }

    assert_eq!(binds.reflect(Some("audit")).unwrap(), vec!["audit_entry"]);
    // primary, audit, and one orders engine per tenant
    assert_eq!(binds.connector_count(), 4);

    let order_engine = current.with_tenant(TenantId::new("acme"), || binds.engine_for_model("Order"));
    let again = current.with_tenant(TenantId::new("acme"), || binds.get_engine(Some("orders")));
    assert!(Engine::same(&order_engine.unwrap(), &again.unwrap()));
}

#[test]
fn test_file_with_per_tenant_map() {
    let file = BindsFile::from_json_str(
        &json!({
            "database_url": "sqlite://",
            "binds": {
                "foo": { "tenants": { "tenant1": "sqlite:///:memory:", "tenant2": "sqlite://?t2" } }
            }
        })
        .to_string(),
    )
    .unwrap();

    let current = CurrentTenant::with(TenantId::new("tenant2"));
    let binds = Binds::new(file.to_config(&current).unwrap()).unwrap();
    assert_eq!(binds.resolve_url(Some("foo")).unwrap(), "sqlite://?t2");

    current.set(TenantId::new("tenant3"));
    assert!(matches!(
        binds.get_engine(Some("foo")),
        Err(BindError::Tenant(_))
    ));
}

#[test]
fn test_file_with_bad_url_is_rejected() {
    let file = BindsFile::from_json_str(r#"{ "binds": { "foo": "redis://localhost" } }"#).unwrap();
    let config = file.to_config(&CurrentTenant::new()).unwrap();
    assert!(matches!(
        Binds::new(config),
        Err(BindError::Config(ConfigError::UnsupportedDriver { .. }))
    ));
}
