#![allow(dead_code)]

use async_trait::async_trait;
use castor::connection::{Connection, SyncOptions};
use castor::error::BoxError;
use castor::model::ModelMap;
use std::any::Any;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::Barrier;

/// In-process connection that records every call it receives.
#[derive(Debug, Default)]
pub struct MockConnection {
    pub authenticate_calls: AtomicUsize,
    pub sync_calls: AtomicUsize,
    pub close_calls: AtomicUsize,
    pub fail_authenticate: AtomicBool,
    pub fail_sync: AtomicBool,
    pub fail_close: AtomicBool,
    pub synced: Mutex<Vec<(Vec<String>, SyncOptions)>>,
    pub close_barrier: Option<Arc<Barrier>>,
}

impl MockConnection {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_authenticate() -> Arc<Self> {
        let conn = Self::default();
        conn.fail_authenticate.store(true, Ordering::SeqCst);
        Arc::new(conn)
    }

    pub fn failing_sync() -> Arc<Self> {
        let conn = Self::default();
        conn.fail_sync.store(true, Ordering::SeqCst);
        Arc::new(conn)
    }

    /// `close` waits on `barrier`, so it only returns once every party is closing.
    pub fn closing_together(barrier: Arc<Barrier>) -> Arc<Self> {
        Arc::new(Self {
            close_barrier: Some(barrier),
            ..Self::default()
        })
    }

    pub fn failing_close() -> Arc<Self> {
        let conn = Self::default();
        conn.fail_close.store(true, Ordering::SeqCst);
        Arc::new(conn)
    }

    pub fn authenticated(&self) -> usize {
        self.authenticate_calls.load(Ordering::SeqCst)
    }

    pub fn synced(&self) -> usize {
        self.sync_calls.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connection for MockConnection {
    async fn authenticate(&self) -> Result<(), BoxError> {
        self.authenticate_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_authenticate.load(Ordering::SeqCst) {
            return Err("connection refused".into());
        }
        Ok(())
    }

    async fn sync(&self, models: &ModelMap, options: SyncOptions) -> Result<(), BoxError> {
        self.sync_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_sync.load(Ordering::SeqCst) {
            return Err("sync rejected".into());
        }
        self.synced
            .lock()
            .unwrap()
            .push((models.keys().cloned().collect(), options));
        Ok(())
    }

    async fn close(&self) -> Result<(), BoxError> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(barrier) = &self.close_barrier {
            barrier.wait().await;
        }
        if self.fail_close.load(Ordering::SeqCst) {
            return Err("close failed".into());
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Unique SQLite file path under the system temp dir.
pub fn temp_sqlite(tag: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before UNIX_EPOCH")
        .as_nanos();

    let mut path = std::env::temp_dir();
    path.push(format!(
        "castor-{tag}-{}-{}.sqlite",
        std::process::id(),
        nanos
    ));
    path
}

pub fn sqlite_url(path: &std::path::Path) -> String {
    format!("sqlite:{}", path.display())
}

pub const MODELS: &str = "tests/fixtures/models/**/*.toml";
pub const SHOP_MODELS: &str = "tests/fixtures/models/shop/**/*.toml";
