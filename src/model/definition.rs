use castor_schema::DataType;
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::CastorError;

/// Models of one database, keyed by model name.
pub type ModelMap = IndexMap<String, Arc<ModelDefinition>>;

/// Optional hook wiring a model's relations once every model of its database is loaded.
pub type AssociateHook =
    Arc<dyn for<'a> Fn(&Associations<'a>) -> Result<(), CastorError> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AssociationKind {
    HasMany,
    HasOne,
    BelongsTo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Association {
    pub kind: AssociationKind,
    pub target: String,
    /// Column holding the reference; lives on the target for `hasMany`/`hasOne`
    /// and on the source for `belongsTo`.
    pub foreign_key: String,
}

/// A named entity type plus its attributes and (once associated) its relations.
pub struct ModelDefinition {
    name: String,
    table: String,
    attributes: IndexMap<String, DataType>,
    associate: Option<AssociateHook>,
    associations: RwLock<Vec<Association>>,
}

impl ModelDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            table: name.clone(),
            name,
            attributes: IndexMap::new(),
            associate: None,
            associations: RwLock::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, data_type: DataType) -> Self {
        self.attributes.insert(name.into(), data_type);
        self
    }

    #[must_use]
    pub fn with_attributes(mut self, attributes: IndexMap<String, DataType>) -> Self {
        self.attributes.extend(attributes);
        self
    }

    #[must_use]
    pub fn with_associate<F>(mut self, hook: F) -> Self
    where
        F: for<'a> Fn(&Associations<'a>) -> Result<(), CastorError> + Send + Sync + 'static,
    {
        self.associate = Some(Arc::new(hook));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn attributes(&self) -> &IndexMap<String, DataType> {
        &self.attributes
    }

    pub fn associate_hook(&self) -> Option<&AssociateHook> {
        self.associate.as_ref()
    }

    pub(crate) fn has_many(&self, target: &ModelDefinition) {
        self.push(Association {
            kind: AssociationKind::HasMany,
            target: target.name.clone(),
            foreign_key: format!("{}Id", self.name),
        });
    }

    pub(crate) fn has_one(&self, target: &ModelDefinition) {
        self.push(Association {
            kind: AssociationKind::HasOne,
            target: target.name.clone(),
            foreign_key: format!("{}Id", self.name),
        });
    }

    pub(crate) fn belongs_to(&self, target: &ModelDefinition) {
        self.push(Association {
            kind: AssociationKind::BelongsTo,
            target: target.name.clone(),
            foreign_key: format!("{}Id", target.name),
        });
    }

    pub fn associations(&self) -> Vec<Association> {
        self.associations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// First association pointing at `target`, if any.
    pub fn association(&self, target: &str) -> Option<Association> {
        self.associations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|assoc| assoc.target == target)
            .cloned()
    }

    /// Foreign-key columns this model's table carries, mapped to the referenced table.
    pub fn foreign_keys(&self, models: &ModelMap) -> IndexMap<String, String> {
        let mut keys = IndexMap::new();

        for assoc in self.associations() {
            if assoc.kind == AssociationKind::BelongsTo {
                let table = models
                    .get(&assoc.target)
                    .map_or_else(|| assoc.target.clone(), |m| m.table.clone());
                keys.insert(assoc.foreign_key, table);
            }
        }

        for source in models.values() {
            for assoc in source.associations() {
                if assoc.target == self.name && assoc.kind != AssociationKind::BelongsTo {
                    keys.entry(assoc.foreign_key)
                        .or_insert_with(|| source.table.clone());
                }
            }
        }

        keys
    }

    fn push(&self, association: Association) {
        let mut associations = self
            .associations
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if !associations.contains(&association) {
            associations.push(association);
        }
    }
}

/// The complete model set of one database, handed to associate hooks.
///
/// Relations can only be recorded through this view, so a model's associations
/// are fixed once the association pass is over.
pub struct Associations<'a> {
    models: &'a ModelMap,
}

impl<'a> Associations<'a> {
    pub(crate) fn new(models: &'a ModelMap) -> Self {
        Self { models }
    }

    pub fn models(&self) -> &'a ModelMap {
        self.models
    }

    pub fn has_many(&self, source: &str, target: &str) -> Result<(), CastorError> {
        let (source, target) = self.pair(source, target)?;
        source.has_many(target);
        Ok(())
    }

    pub fn has_one(&self, source: &str, target: &str) -> Result<(), CastorError> {
        let (source, target) = self.pair(source, target)?;
        source.has_one(target);
        Ok(())
    }

    pub fn belongs_to(&self, source: &str, target: &str) -> Result<(), CastorError> {
        let (source, target) = self.pair(source, target)?;
        source.belongs_to(target);
        Ok(())
    }

    fn pair(
        &self,
        source: &str,
        target: &str,
    ) -> Result<(&'a ModelDefinition, &'a ModelDefinition), CastorError> {
        Ok((self.lookup(source, source)?, self.lookup(source, target)?))
    }

    fn lookup(&self, source: &str, name: &str) -> Result<&'a ModelDefinition, CastorError> {
        self.models.get(name).map(Arc::as_ref).ok_or_else(|| {
            CastorError::configuration(format!(
                "model `{source}` declares an association with unknown model `{name}`"
            ))
        })
    }
}

impl fmt::Debug for ModelDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelDefinition")
            .field("name", &self.name)
            .field("table", &self.table)
            .field("attributes", &self.attributes)
            .field("associate", &self.associate.is_some())
            .field("associations", &self.associations())
            .finish()
    }
}
