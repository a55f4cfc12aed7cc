use castor_schema::ModelManifest;
use std::path::Path;

use crate::error::CastorError;
use crate::model::ModelDefinition;

/// Default model factory: reads a TOML manifest and builds its definition.
///
/// Attributes keep their declaration order, which is also the column order on sync.
pub fn import_manifest(path: &Path) -> Result<ModelDefinition, CastorError> {
    let raw = std::fs::read_to_string(path).map_err(|err| {
        CastorError::configuration(format!(
            "failed to read model manifest {}: {err}",
            path.display()
        ))
    })?;
    let manifest: ModelManifest = toml::from_str(&raw).map_err(|err| {
        CastorError::configuration(format!(
            "failed to parse model manifest {}: {err}",
            path.display()
        ))
    })?;
    Ok(from_manifest(manifest))
}

/// Builds a definition whose associate hook wires the manifest's declared relations.
pub fn from_manifest(manifest: ModelManifest) -> ModelDefinition {
    let declares_associations = manifest.declares_associations();
    let ModelManifest {
        name,
        table,
        attributes,
        has_many,
        has_one,
        belongs_to,
    } = manifest;

    let mut model = ModelDefinition::new(name.clone()).with_attributes(attributes);
    if let Some(table) = table {
        model = model.with_table(table);
    }
    if !declares_associations {
        return model;
    }

    model.with_associate(move |models| {
        for target in &has_many {
            models.has_many(&name, target)?;
        }
        for target in &has_one {
            models.has_one(&name, target)?;
        }
        for target in &belongs_to {
            models.belongs_to(&name, target)?;
        }
        Ok(())
    })
}
