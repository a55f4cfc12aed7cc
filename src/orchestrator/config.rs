use castor_schema::{DatabaseOptions, SchemaError, ensure_unique_names, validate_name};
use futures::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::connection::{Connection, SqliteConnection};
use crate::error::{BoxError, CastorError};
use crate::handle::DatabaseHandle;
use crate::loader::{ModelFactory, check_patterns};

/// Hook invoked once a database is registered.
pub type OnConnect = Arc<dyn Fn(Arc<DatabaseHandle>) -> HookOutcome + Send + Sync>;

/// What an `on_connect` hook hands back: either a finished result or a
/// completion the pipeline must await before the database counts as ready.
pub enum HookOutcome {
    Ready(Result<(), BoxError>),
    Deferred(BoxFuture<'static, Result<(), BoxError>>),
}

impl HookOutcome {
    pub(crate) async fn settle(self) -> Result<(), BoxError> {
        match self {
            HookOutcome::Ready(result) => result,
            HookOutcome::Deferred(pending) => pending.await,
        }
    }
}

/// Everything needed to bring one database up.
#[derive(Clone)]
pub struct DatabaseConfig {
    pub(crate) name: String,
    pub(crate) connection: Arc<dyn Connection>,
    pub(crate) models: Vec<String>,
    pub(crate) ignore: Vec<String>,
    pub(crate) sync: bool,
    pub(crate) force_sync: bool,
    pub(crate) debug: bool,
    pub(crate) factory: Option<ModelFactory>,
    pub(crate) on_connect: Option<OnConnect>,
}

impl DatabaseConfig {
    pub fn new(name: impl Into<String>, connection: Arc<dyn Connection>) -> Self {
        Self {
            name: name.into(),
            connection,
            models: Vec::new(),
            ignore: Vec::new(),
            sync: false,
            force_sync: false,
            debug: false,
            factory: None,
            on_connect: None,
        }
    }

    /// Builds an entry backed by the bundled SQLite connection.
    pub fn from_options(options: DatabaseOptions) -> Result<Self, CastorError> {
        options.validate()?;
        let connection = SqliteConnection::connect_lazy(&options.url).map_err(|err| {
            CastorError::configuration(format!(
                "invalid url for database `{}`: {err}",
                options.name
            ))
        })?;

        Ok(Self::new(options.name, Arc::new(connection))
            .models(options.models.into_vec())
            .ignore(options.ignore.into_vec())
            .sync(options.sync)
            .force_sync(options.force_sync)
            .debug(options.debug))
    }

    #[must_use]
    pub fn models<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.models = patterns.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn ignore<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignore = patterns.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn sync(mut self, sync: bool) -> Self {
        self.sync = sync;
        self
    }

    #[must_use]
    pub fn force_sync(mut self, force_sync: bool) -> Self {
        self.force_sync = force_sync;
        self
    }

    #[must_use]
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Replaces the manifest reader used to turn model files into definitions.
    #[must_use]
    pub fn factory(mut self, factory: ModelFactory) -> Self {
        self.factory = Some(factory);
        self
    }

    #[must_use]
    pub fn on_connect<F>(mut self, hook: F) -> Self
    where
        F: Fn(&DatabaseHandle) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.on_connect = Some(Arc::new(move |db: Arc<DatabaseHandle>| {
            HookOutcome::Ready(hook(&db))
        }));
        self
    }

    #[must_use]
    pub fn on_connect_async<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(Arc<DatabaseHandle>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.on_connect = Some(Arc::new(move |db: Arc<DatabaseHandle>| {
            HookOutcome::Deferred(Box::pin(hook(db)))
        }));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A lone entry is a batch of one.
impl IntoIterator for DatabaseConfig {
    type Item = DatabaseConfig;
    type IntoIter = std::iter::Once<DatabaseConfig>;

    fn into_iter(self) -> Self::IntoIter {
        std::iter::once(self)
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("name", &self.name)
            .field("models", &self.models)
            .field("ignore", &self.ignore)
            .field("sync", &self.sync)
            .field("force_sync", &self.force_sync)
            .field("debug", &self.debug)
            .field("factory", &self.factory.is_some())
            .field("on_connect", &self.on_connect.is_some())
            .finish_non_exhaustive()
    }
}

/// Checks a whole batch before any connection is touched.
pub(crate) fn validate_batch(configs: &[DatabaseConfig]) -> Result<(), CastorError> {
    if configs.is_empty() {
        return Err(SchemaError::EmptyBatch.into());
    }
    for config in configs {
        validate_name(&config.name)?;
        check_patterns(config.models.as_slice())?;
        check_patterns(config.ignore.as_slice())?;
    }
    ensure_unique_names(configs.iter().map(DatabaseConfig::name))?;
    Ok(())
}
