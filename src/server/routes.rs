use axum::{Json, extract::Path};
use castor_schema::DataType;
use indexmap::IndexMap;
use serde::Serialize;

use super::extract::Db;
use crate::error::CastorError;
use crate::model::{Association, ModelDefinition};

#[derive(Debug, Serialize)]
pub struct ModelView {
    pub name: String,
    pub table: String,
    pub attributes: IndexMap<String, DataType>,
    pub associations: Vec<Association>,
}

impl From<&ModelDefinition> for ModelView {
    fn from(model: &ModelDefinition) -> Self {
        Self {
            name: model.name().to_string(),
            table: model.table().to_string(),
            attributes: model.attributes().clone(),
            associations: model.associations(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DatabaseView {
    pub name: String,
    pub models: Vec<String>,
}

pub async fn list_databases(db: Db) -> Json<Vec<DatabaseView>> {
    let databases = db
        .registry()
        .all_handles()
        .into_iter()
        .map(|(name, handle)| DatabaseView {
            name,
            models: handle.get_models().keys().cloned().collect(),
        })
        .collect();
    Json(databases)
}

pub async fn list_models(
    db: Db,
    Path(database): Path<String>,
) -> Result<Json<Vec<ModelView>>, CastorError> {
    let models = db.get_models(Some(&database))?;
    Ok(Json(
        models.values().map(|m| ModelView::from(m.as_ref())).collect(),
    ))
}

pub async fn named_model(
    db: Db,
    Path((database, model)): Path<(String, String)>,
) -> Result<Json<ModelView>, CastorError> {
    let model = db.get_model((database.as_str(), model.as_str()))?;
    Ok(Json(ModelView::from(model.as_ref())))
}

pub async fn default_model(
    db: Db,
    Path(model): Path<String>,
) -> Result<Json<ModelView>, CastorError> {
    let model = db.get_model(model.as_str())?;
    Ok(Json(ModelView::from(model.as_ref())))
}
