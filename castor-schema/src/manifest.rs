use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Column type descriptors available to model manifests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DataType {
    String,
    Text,
    Integer,
    BigInt,
    Float,
    Double,
    Boolean,
    Date,
    DateOnly,
    Uuid,
    Json,
}

impl DataType {
    pub fn as_str(self) -> &'static str {
        match self {
            DataType::String => "STRING",
            DataType::Text => "TEXT",
            DataType::Integer => "INTEGER",
            DataType::BigInt => "BIGINT",
            DataType::Float => "FLOAT",
            DataType::Double => "DOUBLE",
            DataType::Boolean => "BOOLEAN",
            DataType::Date => "DATE",
            DataType::DateOnly => "DATEONLY",
            DataType::Uuid => "UUID",
            DataType::Json => "JSON",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// On-disk description of one model.
///
/// ```toml
/// name = "Category"
/// has_many = ["Product"]
///
/// [attributes]
/// name = "STRING"
/// rootCategory = "BOOLEAN"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ModelManifest {
    pub name: String,

    /// Table name; defaults to the model name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,

    #[serde(default)]
    pub attributes: IndexMap<String, DataType>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub has_many: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub has_one: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub belongs_to: Vec<String>,
}

impl ModelManifest {
    pub fn declares_associations(&self) -> bool {
        !(self.has_many.is_empty() && self.has_one.is_empty() && self.belongs_to.is_empty())
    }
}
