mod common;

use castor::connection::{SqliteConnection, SyncOptions};
use castor::error::BoxError;
use castor::orchestrator::{ConnectionOrchestrator, DatabaseConfig};
use castor::registry::InstanceRegistry;
use castor::schema::DatabaseOptions;
use castor::{CastorError, DatabaseHandle};
use castor::model::AssociationKind;
use common::MockConnection;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Barrier;

fn isolated() -> ConnectionOrchestrator {
    ConnectionOrchestrator::with_registry(Arc::new(InstanceRegistry::new()))
}

async fn remove_sqlite(path: &std::path::Path) {
    let _ = tokio::fs::remove_file(path).await;
    for suffix in ["-wal", "-shm"] {
        let mut side = path.as_os_str().to_owned();
        side.push(suffix);
        let _ = tokio::fs::remove_file(side).await;
    }
}

#[tokio::test]
async fn shop_models_are_synced_to_sqlite() {
    let path = common::temp_sqlite("shop");
    let connection = SqliteConnection::connect_lazy(&common::sqlite_url(&path))
        .expect("valid sqlite url");

    let orchestrator = isolated();
    let handles = orchestrator
        .register([DatabaseConfig::new("shop", Arc::new(connection))
            .models([common::SHOP_MODELS])
            .sync(true)
            .force_sync(true)])
        .await
        .expect("shop should come up");
    assert_eq!(handles.len(), 1);

    let db = orchestrator.registry().resolve(Some("shop")).unwrap();
    assert!(Arc::ptr_eq(&db, &handles[0]));
    assert_eq!(
        db.get_models().keys().collect::<Vec<_>>(),
        vec!["Category", "Product"]
    );

    let pool = db
        .connection_as::<SqliteConnection>()
        .expect("sqlite connection")
        .pool();
    let tables: Vec<String> = sqlx::query_scalar(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name IN ('Category', 'Product') ORDER BY name",
    )
    .fetch_all(pool)
    .await
    .unwrap();
    assert_eq!(tables, vec!["Category", "Product"]);

    let columns: Vec<String> =
        sqlx::query_scalar("SELECT name FROM pragma_table_info('Product') ORDER BY cid")
            .fetch_all(pool)
            .await
            .unwrap();
    assert_eq!(
        columns,
        vec!["id", "name", "inventory", "createdAt", "updatedAt", "CategoryId"]
    );

    let report = orchestrator.shutdown().await;
    assert!(report.is_clean());
    assert_eq!(report.closed, vec!["shop".to_string()]);
    remove_sqlite(&path).await;
}

#[tokio::test]
async fn sync_runs_only_when_requested() {
    let synced = MockConnection::new();
    let skipped = MockConnection::new();

    let orchestrator = isolated();
    orchestrator
        .register([
            DatabaseConfig::new("synced", synced.clone())
                .models([common::SHOP_MODELS])
                .sync(true),
            DatabaseConfig::new("skipped", skipped.clone()).models([common::SHOP_MODELS]),
        ])
        .await
        .unwrap();

    assert_eq!(synced.synced(), 1);
    assert_eq!(skipped.synced(), 0);

    let calls = synced.synced.lock().unwrap();
    assert_eq!(calls[0].0, vec!["Category".to_string(), "Product".to_string()]);
    assert_eq!(calls[0].1, SyncOptions { force: false });
}

#[tokio::test]
async fn entry_without_patterns_has_no_models() {
    let conn = MockConnection::new();
    let orchestrator = isolated();
    let handles = orchestrator
        .register([DatabaseConfig::new("bare", conn.clone()).sync(true)])
        .await
        .unwrap();

    assert!(handles[0].get_models().is_empty());
    assert_eq!(conn.authenticated(), 1);
    assert_eq!(conn.synced(), 1);
}

#[tokio::test]
async fn on_connect_sees_the_registered_handle() {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);

    let orchestrator = isolated();
    orchestrator
        .register([DatabaseConfig::new("shop", MockConnection::new())
            .models([common::SHOP_MODELS])
            .on_connect(move |db: &DatabaseHandle| {
                assert!(db.get_model("Category").is_some());
                seen.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })])
        .await
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn async_on_connect_is_awaited_before_ready() {
    let done = Arc::new(AtomicUsize::new(0));
    let flag = Arc::clone(&done);
    let registry = Arc::new(InstanceRegistry::new());
    let probe = Arc::clone(&registry);

    let orchestrator = ConnectionOrchestrator::with_registry(registry);
    orchestrator
        .register([DatabaseConfig::new("slow", MockConnection::new()).on_connect_async(
            move |db: Arc<DatabaseHandle>| {
                let flag = Arc::clone(&flag);
                let probe = Arc::clone(&probe);
                async move {
                    // Registration precedes the hook.
                    let registered = probe.resolve(Some("slow"))?;
                    assert!(Arc::ptr_eq(&registered, &db));
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    flag.store(1, Ordering::SeqCst);
                    Ok::<(), BoxError>(())
                }
            },
        )])
        .await
        .unwrap();

    assert_eq!(done.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failing_hook_leaves_database_registered() {
    let orchestrator = isolated();
    let err = orchestrator
        .register([DatabaseConfig::new("hooked", MockConnection::new())
            .on_connect(|_db: &DatabaseHandle| Err("seed data missing".into()))])
        .await
        .unwrap_err();

    assert!(matches!(err, CastorError::Hook { ref database, .. } if database == "hooked"));
    assert!(err.to_string().contains("seed data missing"));
    assert!(orchestrator.registry().resolve(Some("hooked")).is_ok());
}

#[tokio::test]
async fn authentication_failure_skips_every_later_step() {
    let conn = MockConnection::failing_authenticate();
    let hook_calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&hook_calls);

    let orchestrator = isolated();
    let err = orchestrator
        .register([DatabaseConfig::new("down", conn.clone())
            .models([common::SHOP_MODELS])
            .sync(true)
            .on_connect(move |_db: &DatabaseHandle| {
                seen.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })])
        .await
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "An error occurred while attempting to connect to DB[down], please check the configuration. Details: connection refused"
    );
    assert_eq!(conn.synced(), 0);
    assert_eq!(hook_calls.load(Ordering::SeqCst), 0);
    assert!(orchestrator.registry().is_empty());
}

#[tokio::test]
async fn sibling_failure_does_not_roll_back_others() {
    let orchestrator = isolated();
    let report = orchestrator
        .register_report([
            DatabaseConfig::new("first", MockConnection::new()),
            DatabaseConfig::new("broken", MockConnection::failing_authenticate()),
            DatabaseConfig::new("third", MockConnection::new()),
        ])
        .await
        .unwrap();

    assert!(!report.is_complete());
    let ready: Vec<_> = report.ready.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(ready, vec!["first", "third"]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, "broken");

    let registry = orchestrator.registry();
    assert_eq!(registry.len(), 2);
    assert!(registry.resolve(Some("broken")).is_err());

    let err = report.into_result().unwrap_err();
    assert!(matches!(err, CastorError::Connection { .. }));
}

#[tokio::test]
async fn first_failure_in_configuration_order_wins() {
    let orchestrator = isolated();
    let err = orchestrator
        .register([
            DatabaseConfig::new("ok", MockConnection::new()),
            DatabaseConfig::new("auth", MockConnection::failing_authenticate()),
            DatabaseConfig::new("hook", MockConnection::new())
                .on_connect(|_db: &DatabaseHandle| Err("boom".into())),
        ])
        .await
        .unwrap_err();

    assert!(matches!(err, CastorError::Connection { ref database, .. } if database == "auth"));
}

#[tokio::test]
async fn malformed_pattern_rejects_whole_batch() {
    let healthy = MockConnection::new();
    let broken = MockConnection::new();

    let orchestrator = isolated();
    let err = orchestrator
        .register([
            DatabaseConfig::new("healthy", healthy.clone()).models([common::SHOP_MODELS]),
            DatabaseConfig::new("broken", broken.clone()).models(["tests/fixtures/{a,b"]),
        ])
        .await
        .unwrap_err();

    assert!(err.is_configuration());
    assert_eq!(healthy.authenticated(), 0);
    assert_eq!(broken.authenticated(), 0);
    assert!(orchestrator.registry().is_empty());
    assert!(orchestrator.configured_names().is_empty());
}

#[tokio::test]
async fn batch_validation_rules() {
    let orchestrator = isolated();

    let err = orchestrator
        .register(Vec::<DatabaseConfig>::new())
        .await
        .unwrap_err();
    assert!(err.is_configuration());

    let err = orchestrator
        .register([
            DatabaseConfig::new("twin", MockConnection::new()),
            DatabaseConfig::new("twin", MockConnection::new()),
        ])
        .await
        .unwrap_err();
    assert!(err.is_configuration());

    let err = orchestrator
        .register([DatabaseConfig::new("bad name", MockConnection::new())])
        .await
        .unwrap_err();
    assert!(err.is_configuration());
    assert!(orchestrator.registry().is_empty());
}

#[tokio::test]
async fn shutdown_closes_everything_despite_failures() {
    let good = MockConnection::new();
    let flaky = MockConnection::failing_close();
    let other = MockConnection::new();

    let orchestrator = isolated();
    orchestrator
        .register([
            DatabaseConfig::new("good", good.clone()),
            DatabaseConfig::new("flaky", flaky.clone()),
            DatabaseConfig::new("other", other.clone()),
        ])
        .await
        .unwrap();

    let report = orchestrator.shutdown().await;
    assert!(!report.is_clean());
    assert_eq!(report.closed, vec!["good".to_string(), "other".to_string()]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, "flaky");

    assert_eq!(good.closed(), 1);
    assert_eq!(flaky.closed(), 1);
    assert_eq!(other.closed(), 1);
}

#[tokio::test]
async fn shutdown_reports_names_that_never_registered() {
    let orchestrator = isolated();
    let _ = orchestrator
        .register([
            DatabaseConfig::new("up", MockConnection::new()),
            DatabaseConfig::new("down", MockConnection::failing_authenticate()),
        ])
        .await;

    let report = orchestrator.shutdown().await;
    assert_eq!(report.closed, vec!["up".to_string()]);
    assert!(matches!(
        report.failed.as_slice(),
        [(name, CastorError::DatabaseNotFound { .. })] if name == "down"
    ));
}

#[tokio::test]
async fn options_build_a_working_sqlite_entry() {
    let path = common::temp_sqlite("options");
    let options = DatabaseOptions {
        name: "opts".to_string(),
        url: common::sqlite_url(&path),
        models: common::MODELS.into(),
        ignore: Default::default(),
        sync: true,
        force_sync: false,
        debug: true,
    };

    let orchestrator = isolated();
    let config = DatabaseConfig::from_options(options).unwrap();
    orchestrator.register([config]).await.unwrap();

    let user = orchestrator.registry().resolve_model("User").unwrap();
    assert_eq!(user.table(), "User");

    orchestrator.shutdown().await;
    remove_sqlite(&path).await;
}

#[tokio::test]
async fn options_without_url_are_rejected() {
    let options = DatabaseOptions {
        name: "nourl".to_string(),
        url: String::new(),
        models: Default::default(),
        ignore: Default::default(),
        sync: false,
        force_sync: false,
        debug: false,
    };
    let err = DatabaseConfig::from_options(options).unwrap_err();
    assert!(err.is_configuration());
}

#[tokio::test]
async fn default_orchestrator_uses_the_global_registry() {
    let orchestrator = ConnectionOrchestrator::new();
    assert!(Arc::ptr_eq(orchestrator.registry(), InstanceRegistry::global()));

    orchestrator
        .register([DatabaseConfig::new("global_probe", MockConnection::new())])
        .await
        .unwrap();
    assert!(InstanceRegistry::global().resolve(Some("global_probe")).is_ok());
}

#[tokio::test]
async fn mock_connection_is_reachable_by_downcast() {
    let conn = MockConnection::new();
    let orchestrator = isolated();
    let handles = orchestrator
        .register([DatabaseConfig::new("mock", conn.clone())])
        .await
        .unwrap();

    assert!(handles[0].connection_as::<MockConnection>().is_some());
    assert!(handles[0].connection_as::<SqliteConnection>().is_none());
}

#[tokio::test]
async fn all_models_registered_and_associated() {
    let conn = MockConnection::new();
    let orchestrator = isolated();
    orchestrator
        .register(
            DatabaseConfig::new("shop", conn.clone())
                .models([common::MODELS])
                .sync(true),
        )
        .await
        .unwrap();

    let registry = orchestrator.registry();
    let db = registry.resolve(Some("shop")).unwrap();
    let mut names: Vec<_> = db.get_models().keys().cloned().collect();
    names.sort();
    assert_eq!(names, vec!["Category", "Product", "User"]);

    let category = registry.resolve_model(("shop", "Category")).unwrap();
    assert_eq!(
        category.association("Product").map(|a| a.kind),
        Some(AssociationKind::HasMany)
    );
    assert_eq!(conn.synced(), 1);
}

#[tokio::test]
async fn sync_failure_is_a_connection_error_and_skips_registration() {
    let conn = MockConnection::failing_sync();
    let hook_calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&hook_calls);

    let orchestrator = isolated();
    let err = orchestrator
        .register(
            DatabaseConfig::new("s", conn.clone())
                .models([common::SHOP_MODELS])
                .sync(true)
                .on_connect(move |_db: &DatabaseHandle| {
                    seen.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }),
        )
        .await
        .unwrap_err();

    assert!(
        matches!(err, CastorError::Connection { ref database, ref message } if database == "s" && message == "sync rejected")
    );
    assert_eq!(conn.synced(), 1);
    assert_eq!(hook_calls.load(Ordering::SeqCst), 0);
    assert!(orchestrator.registry().is_empty());
}

#[tokio::test]
async fn force_sync_reaches_the_connection() {
    let conn = MockConnection::new();
    isolated()
        .register(
            DatabaseConfig::new("forced", conn.clone())
                .models([common::SHOP_MODELS])
                .sync(true)
                .force_sync(true),
        )
        .await
        .unwrap();

    let calls = conn.synced.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].1, SyncOptions { force: true });
}

#[tokio::test]
async fn model_loading_failure_keeps_siblings_registered() {
    let dangling = MockConnection::new();

    let orchestrator = isolated();
    let report = orchestrator
        .register_report([
            DatabaseConfig::new("shop", MockConnection::new()).models([common::SHOP_MODELS]),
            DatabaseConfig::new("orders", dangling.clone())
                .models(["tests/fixtures/dangling/*.toml"])
                .sync(true),
        ])
        .await
        .unwrap();

    assert_eq!(report.ready.len(), 1);
    assert_eq!(report.ready[0].0, "shop");
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, "orders");
    assert!(report.failed[0].1.is_configuration());

    assert_eq!(dangling.authenticated(), 1);
    assert_eq!(dangling.synced(), 0);
    assert!(orchestrator.registry().resolve(Some("shop")).is_ok());
    assert!(orchestrator.registry().resolve(Some("orders")).is_err());
}

#[tokio::test]
async fn entries_come_up_concurrently() {
    let barrier = Arc::new(Barrier::new(2));
    let entry = |name: &str| {
        let barrier = Arc::clone(&barrier);
        DatabaseConfig::new(name, MockConnection::new()).on_connect_async(
            move |_db: Arc<DatabaseHandle>| {
                let barrier = Arc::clone(&barrier);
                async move {
                    barrier.wait().await;
                    Ok::<(), BoxError>(())
                }
            },
        )
    };

    let orchestrator = isolated();
    let handles = tokio::time::timeout(
        Duration::from_secs(5),
        orchestrator.register([entry("left"), entry("right")]),
    )
    .await
    .expect("each hook waits for the other, so bring-up must overlap")
    .unwrap();
    assert_eq!(handles.len(), 2);
}

#[tokio::test]
async fn connections_close_concurrently() {
    let barrier = Arc::new(Barrier::new(2));
    let left = MockConnection::closing_together(Arc::clone(&barrier));
    let right = MockConnection::closing_together(Arc::clone(&barrier));

    let orchestrator = isolated();
    orchestrator
        .register([
            DatabaseConfig::new("left", left.clone()),
            DatabaseConfig::new("right", right.clone()),
        ])
        .await
        .unwrap();

    let report = tokio::time::timeout(Duration::from_secs(5), orchestrator.shutdown())
        .await
        .expect("each close waits for the other, so shutdown must overlap");
    assert!(report.is_clean());
    assert_eq!(left.closed(), 1);
    assert_eq!(right.closed(), 1);
}

#[tokio::test]
async fn single_entry_registers_without_a_collection() {
    let orchestrator = isolated();
    let handles = orchestrator
        .register(DatabaseConfig::new("solo", MockConnection::new()))
        .await
        .unwrap();

    assert_eq!(handles.len(), 1);
    assert!(Arc::ptr_eq(
        &handles[0],
        &orchestrator.registry().resolve(None).unwrap()
    ));
}
