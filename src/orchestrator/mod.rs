//! Bring-up and teardown of every configured database.
//!
//! Entries of a batch are brought up concurrently; each entry's own steps run
//! strictly in order (authenticate, load models, associate, sync, register,
//! `on_connect`). A failing entry does not roll back its siblings: whatever
//! reached the registry stays there.

mod config;
mod pipeline;

pub use config::{DatabaseConfig, HookOutcome, OnConnect};
pub use pipeline::Stage;

use futures::future::join_all;
use indexmap::IndexSet;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{info, warn};

use crate::error::CastorError;
use crate::handle::DatabaseHandle;
use crate::registry::InstanceRegistry;

/// Outcome of one registration batch once every entry has settled.
#[derive(Debug, Default)]
pub struct RegistrationReport {
    /// Entries that reached `Ready`, in configuration order.
    pub ready: Vec<(String, Arc<DatabaseHandle>)>,
    /// Entries that failed, in configuration order.
    pub failed: Vec<(String, CastorError)>,
}

impl RegistrationReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// All handles, or the first failure in configuration order.
    pub fn into_result(self) -> Result<Vec<Arc<DatabaseHandle>>, CastorError> {
        match self.failed.into_iter().next() {
            Some((_, err)) => Err(err),
            None => Ok(self.ready.into_iter().map(|(_, handle)| handle).collect()),
        }
    }
}

#[derive(Debug, Default)]
pub struct ShutdownReport {
    pub closed: Vec<String>,
    pub failed: Vec<(String, CastorError)>,
}

impl ShutdownReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct ConnectionOrchestrator {
    registry: Arc<InstanceRegistry>,
    configured: Mutex<IndexSet<String>>,
}

impl Default for ConnectionOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionOrchestrator {
    /// Orchestrator over the process-wide registry.
    pub fn new() -> Self {
        Self::with_registry(Arc::clone(InstanceRegistry::global()))
    }

    pub fn with_registry(registry: Arc<InstanceRegistry>) -> Self {
        Self {
            registry,
            configured: Mutex::new(IndexSet::new()),
        }
    }

    pub fn registry(&self) -> &Arc<InstanceRegistry> {
        &self.registry
    }

    /// Every name handed to `register` so far, failed entries included.
    pub fn configured_names(&self) -> Vec<String> {
        self.configured
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    /// Brings up a batch and returns its handles in configuration order.
    ///
    /// Accepts a single `DatabaseConfig` or any sequence of them.
    ///
    /// Fails with the first failing entry (in configuration order) after all
    /// entries have settled; successful siblings remain registered.
    pub async fn register<I>(&self, configs: I) -> Result<Vec<Arc<DatabaseHandle>>, CastorError>
    where
        I: IntoIterator<Item = DatabaseConfig>,
    {
        self.register_report(configs).await?.into_result()
    }

    /// Like `register`, but reports every entry's outcome instead of the first failure.
    ///
    /// Only batch validation fails the call itself; nothing is started in that case.
    pub async fn register_report<I>(&self, configs: I) -> Result<RegistrationReport, CastorError>
    where
        I: IntoIterator<Item = DatabaseConfig>,
    {
        let configs: Vec<DatabaseConfig> = configs.into_iter().collect();
        config::validate_batch(&configs)?;

        let names: Vec<String> = configs.iter().map(|c| c.name.clone()).collect();
        self.configured
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(names.iter().cloned());

        let outcomes = join_all(
            configs
                .into_iter()
                .map(|config| pipeline::bring_up(config, &self.registry)),
        )
        .await;

        let mut report = RegistrationReport::default();
        for (name, outcome) in names.into_iter().zip(outcomes) {
            match outcome {
                Ok(handle) => report.ready.push((name, handle)),
                Err(err) => report.failed.push((name, err)),
            }
        }

        info!(
            ready = report.ready.len(),
            failed = report.failed.len(),
            "database registration settled"
        );
        Ok(report)
    }

    /// Closes every configured database concurrently.
    ///
    /// One failed close never prevents the others; the report lists both sides.
    pub async fn shutdown(&self) -> ShutdownReport {
        let names = self.configured_names();
        let registry = &self.registry;

        let outcomes = join_all(names.into_iter().map(|name| async move {
            let outcome = match registry.resolve(Some(&name)) {
                Ok(handle) => handle
                    .connection()
                    .close()
                    .await
                    .map_err(|err| CastorError::connection(&name, err)),
                Err(err) => Err(err),
            };
            (name, outcome)
        }))
        .await;

        let mut report = ShutdownReport::default();
        for (name, outcome) in outcomes {
            match outcome {
                Ok(()) => report.closed.push(name),
                Err(err) => {
                    warn!(database = %name, error = %err, "failed to close database");
                    report.failed.push((name, err));
                }
            }
        }

        info!(
            closed = report.closed.len(),
            failed = report.failed.len(),
            "database connections closed"
        );
        report
    }
}
