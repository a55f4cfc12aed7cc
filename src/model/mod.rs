//! Model definitions and the manifest format used to declare them.

mod definition;
pub mod manifest;

pub use definition::{
    AssociateHook, Association, AssociationKind, Associations, ModelDefinition, ModelMap,
};
pub use manifest::{from_manifest, import_manifest};
