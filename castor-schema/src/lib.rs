pub mod manifest;
pub mod options;

mod one_or_many;
mod validate;

pub use manifest::{DataType, ModelManifest};
pub use one_or_many::OneOrMany;
pub use options::{DatabaseOptions, validate_batch};
pub use validate::{SchemaError, ensure_unique_names, validate_name};
