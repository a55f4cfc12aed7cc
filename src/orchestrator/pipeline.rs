use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info};

use super::config::DatabaseConfig;
use crate::connection::SyncOptions;
use crate::error::CastorError;
use crate::handle::DatabaseHandle;
use crate::loader::{
    ModelFactory, apply_associations, default_factory, discover_files, load_models,
};
use crate::model::ModelMap;
use crate::registry::InstanceRegistry;

/// Steps a single database walks through on its way to `Ready`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Pending,
    Authenticating,
    ModelsLoading,
    AssociationsApplying,
    Syncing,
    Registering,
    OnConnectHook,
    Ready,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Pending => "pending",
            Stage::Authenticating => "authenticating",
            Stage::ModelsLoading => "models_loading",
            Stage::AssociationsApplying => "associations_applying",
            Stage::Syncing => "syncing",
            Stage::Registering => "registering",
            Stage::OnConnectHook => "on_connect",
            Stage::Ready => "ready",
        };
        f.write_str(s)
    }
}

struct Progress<'a> {
    database: &'a str,
    verbose: bool,
    stage: Stage,
}

impl Progress<'_> {
    fn enter(&mut self, stage: Stage) {
        self.stage = stage;
        if self.verbose {
            info!(database = self.database, stage = %stage, "bring-up stage");
        } else {
            debug!(database = self.database, stage = %stage, "bring-up stage");
        }
    }
}

/// Runs one entry to completion. Steps never reorder.
pub(crate) async fn bring_up(
    config: DatabaseConfig,
    registry: &InstanceRegistry,
) -> Result<Arc<DatabaseHandle>, CastorError> {
    let name = config.name.clone();
    let mut progress = Progress {
        database: &name,
        verbose: config.debug,
        stage: Stage::Pending,
    };

    let result = run(config, registry, &mut progress).await;
    if let Err(err) = &result {
        error!(
            database = %name,
            stage = %progress.stage,
            error = %err,
            "database bring-up failed"
        );
    }
    result
}

async fn run(
    config: DatabaseConfig,
    registry: &InstanceRegistry,
    progress: &mut Progress<'_>,
) -> Result<Arc<DatabaseHandle>, CastorError> {
    let DatabaseConfig {
        name,
        connection,
        models,
        ignore,
        sync,
        force_sync,
        debug: _,
        factory,
        on_connect,
    } = config;

    progress.enter(Stage::Authenticating);
    connection
        .authenticate()
        .await
        .map_err(|err| CastorError::connection(&name, err))?;

    let models = if models.is_empty() {
        ModelMap::new()
    } else {
        progress.enter(Stage::ModelsLoading);
        let factory = factory.unwrap_or_else(default_factory);
        let loaded = load_model_files(models, ignore, factory).await?;

        progress.enter(Stage::AssociationsApplying);
        apply_associations(loaded)?
    };

    if sync {
        progress.enter(Stage::Syncing);
        connection
            .sync(&models, SyncOptions { force: force_sync })
            .await
            .map_err(|err| CastorError::connection(&name, err))?;
    }

    progress.enter(Stage::Registering);
    let handle = Arc::new(DatabaseHandle::new(connection, models));
    registry.register(name.clone(), Arc::clone(&handle));

    if let Some(hook) = on_connect {
        progress.enter(Stage::OnConnectHook);
        hook(Arc::clone(&handle))
            .settle()
            .await
            .map_err(|err| CastorError::hook(&name, err))?;
    }

    progress.enter(Stage::Ready);
    Ok(handle)
}

/// Discovery and manifest parsing touch the filesystem; keep them off the async workers.
async fn load_model_files(
    patterns: Vec<String>,
    ignore: Vec<String>,
    factory: ModelFactory,
) -> Result<ModelMap, CastorError> {
    tokio::task::spawn_blocking(move || {
        let files = discover_files(patterns.as_slice(), ignore.as_slice())?;
        load_models(&files, &factory)
    })
    .await
    .map_err(|err| CastorError::configuration(format!("model loading task failed: {err}")))?
}
