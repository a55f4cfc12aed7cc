//! Process-wide table of named database handles.
//!
//! Insertion order matters: with no name given, resolution falls back to the
//! first-registered database. Re-registering a name swaps its handle in place,
//! so the default never moves.

use indexmap::IndexMap;
use std::sync::{Arc, LazyLock, PoisonError, RwLock};

use crate::error::CastorError;
use crate::handle::DatabaseHandle;
use crate::model::{ModelDefinition, ModelMap};

static GLOBAL: LazyLock<Arc<InstanceRegistry>> =
    LazyLock::new(|| Arc::new(InstanceRegistry::new()));

/// Which model `InstanceRegistry::resolve_model` should return.
///
/// A bare `&str` is always a model name on the default database; pass a
/// `(database, model)` tuple to pick the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelLookup<'a> {
    Default { model: &'a str },
    Named { database: &'a str, model: &'a str },
}

impl<'a> ModelLookup<'a> {
    pub fn model(&self) -> &'a str {
        match *self {
            ModelLookup::Default { model } | ModelLookup::Named { model, .. } => model,
        }
    }

    pub fn database(&self) -> Option<&'a str> {
        match *self {
            ModelLookup::Default { .. } => None,
            ModelLookup::Named { database, .. } => Some(database),
        }
    }
}

impl<'a> From<&'a str> for ModelLookup<'a> {
    fn from(model: &'a str) -> Self {
        ModelLookup::Default { model }
    }
}

impl<'a> From<(&'a str, &'a str)> for ModelLookup<'a> {
    fn from((database, model): (&'a str, &'a str)) -> Self {
        ModelLookup::Named { database, model }
    }
}

#[derive(Debug, Default)]
pub struct InstanceRegistry {
    instances: RwLock<IndexMap<String, Arc<DatabaseHandle>>>,
}

impl InstanceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry shared by everything in this process that isn't handed one explicitly.
    pub fn global() -> &'static Arc<InstanceRegistry> {
        &GLOBAL
    }

    /// Adds `name`, or replaces its handle while keeping its position.
    pub fn register(&self, name: impl Into<String>, handle: Arc<DatabaseHandle>) {
        self.instances
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), handle);
    }

    /// Named lookup, or the first-registered database when `name` is `None`.
    pub fn resolve(&self, name: Option<&str>) -> Result<Arc<DatabaseHandle>, CastorError> {
        let instances = self.instances.read().unwrap_or_else(PoisonError::into_inner);
        let found = match name {
            Some(name) => instances.get(name),
            None => instances.first().map(|(_, handle)| handle),
        };
        found.cloned().ok_or_else(|| CastorError::DatabaseNotFound {
            name: name.map(str::to_string),
        })
    }

    /// Strict lookup: a missing model is `ModelNotFound`.
    pub fn resolve_model<'a>(
        &self,
        lookup: impl Into<ModelLookup<'a>>,
    ) -> Result<Arc<ModelDefinition>, CastorError> {
        let lookup = lookup.into();
        let handle = self.resolve(lookup.database())?;
        handle
            .get_model(lookup.model())
            .ok_or_else(|| CastorError::ModelNotFound {
                model: lookup.model().to_string(),
            })
    }

    pub fn resolve_models(&self, name: Option<&str>) -> Result<Arc<ModelMap>, CastorError> {
        self.resolve(name).map(|handle| handle.shared_models())
    }

    /// Snapshot of every registered handle, in registration order.
    pub fn all_handles(&self) -> IndexMap<String, Arc<DatabaseHandle>> {
        self.instances
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn names(&self) -> Vec<String> {
        self.instances
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.instances
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
