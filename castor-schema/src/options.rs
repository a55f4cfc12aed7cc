use serde::{Deserialize, Serialize};

use crate::one_or_many::OneOrMany;
use crate::validate::{SchemaError, ensure_unique_names, validate_name};

/// One `[[databases]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DatabaseOptions {
    /// Logical name the database is registered and resolved under.
    /// TOML: `databases[].name`. Required, `[A-Za-z0-9_]+`.
    pub name: String,

    /// Connection URL handed to the bundled SQLite connection.
    /// TOML: `databases[].url`. Example: `sqlite://shop.db`.
    #[serde(default)]
    pub url: String,

    /// Glob pattern(s) locating model manifests.
    /// TOML: `databases[].models`. A string or a list; empty skips model loading.
    #[serde(default)]
    pub models: OneOrMany<String>,

    /// Glob pattern(s) excluded from model discovery.
    /// TOML: `databases[].ignore`.
    #[serde(default)]
    pub ignore: OneOrMany<String>,

    /// Create tables for the loaded models after associations are applied.
    /// TOML: `databases[].sync`. Default: `false`.
    #[serde(default)]
    pub sync: bool,

    /// Drop existing tables before syncing.
    /// TOML: `databases[].force_sync`. Default: `false`.
    #[serde(default)]
    pub force_sync: bool,

    /// Log bring-up stages at `info` instead of `debug`.
    /// TOML: `databases[].debug`. Default: `false`.
    #[serde(default)]
    pub debug: bool,
}

impl DatabaseOptions {
    pub fn validate(&self) -> Result<(), SchemaError> {
        validate_name(&self.name)?;
        if self.url.trim().is_empty() {
            return Err(SchemaError::MissingField {
                database: self.name.clone(),
                field: "url",
            });
        }
        Ok(())
    }
}

/// Validates a whole batch; any failure rejects every entry.
pub fn validate_batch(options: &[DatabaseOptions]) -> Result<(), SchemaError> {
    if options.is_empty() {
        return Err(SchemaError::EmptyBatch);
    }
    for entry in options {
        entry.validate()?;
    }
    ensure_unique_names(options.iter().map(|entry| entry.name.as_str()))
}
