use std::fmt;
use std::sync::Arc;

use crate::connection::Connection;
use crate::model::{ModelDefinition, ModelMap};

/// One connection paired with the models loaded for it. Immutable once built.
pub struct DatabaseHandle {
    connection: Arc<dyn Connection>,
    models: Arc<ModelMap>,
}

impl DatabaseHandle {
    pub fn new(connection: Arc<dyn Connection>, models: ModelMap) -> Self {
        Self {
            connection,
            models: Arc::new(models),
        }
    }

    /// Lenient lookup: a missing model is `None`, not an error.
    pub fn get_model(&self, name: &str) -> Option<Arc<ModelDefinition>> {
        self.models.get(name).cloned()
    }

    pub fn get_models(&self) -> &ModelMap {
        &self.models
    }

    pub fn shared_models(&self) -> Arc<ModelMap> {
        Arc::clone(&self.models)
    }

    pub fn connection(&self) -> &Arc<dyn Connection> {
        &self.connection
    }

    /// Typed access to the concrete connection, e.g. `connection_as::<SqliteConnection>()`.
    pub fn connection_as<T: Connection>(&self) -> Option<&T> {
        self.connection.as_any().downcast_ref::<T>()
    }
}

impl fmt::Debug for DatabaseHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseHandle")
            .field("models", &self.models.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
