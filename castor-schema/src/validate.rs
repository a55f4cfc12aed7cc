use std::collections::HashSet;
use thiserror::Error as ThisError;

#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum SchemaError {
    #[error("no database options supplied")]
    EmptyBatch,

    #[error("database name must not be empty")]
    EmptyName,

    #[error("database name `{0}` may only contain alphanumeric and underscore characters")]
    InvalidName(String),

    #[error("database name `{0}` is configured more than once")]
    DuplicateName(String),

    #[error("database `{database}` is missing required option `{field}`")]
    MissingField {
        database: String,
        field: &'static str,
    },
}

/// Database names are tokens: `[A-Za-z0-9_]+`.
pub fn validate_name(name: &str) -> Result<(), SchemaError> {
    if name.is_empty() {
        return Err(SchemaError::EmptyName);
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(SchemaError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Rejects the first name that appears twice.
pub fn ensure_unique_names<'a, I>(names: I) -> Result<(), SchemaError>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(SchemaError::DuplicateName(name.to_string()));
        }
    }
    Ok(())
}
