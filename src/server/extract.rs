use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use std::convert::Infallible;
use std::sync::Arc;

use crate::error::CastorError;
use crate::handle::DatabaseHandle;
use crate::model::{ModelDefinition, ModelMap};
use crate::registry::{InstanceRegistry, ModelLookup};

/// Per-request access to the registered databases.
///
/// Works with any router state that can hand out the registry via `FromRef`.
#[derive(Clone)]
pub struct Db(Arc<InstanceRegistry>);

impl Db {
    pub fn get_db(&self, name: Option<&str>) -> Result<Arc<DatabaseHandle>, CastorError> {
        self.0.resolve(name)
    }

    /// `get_model("User")` uses the default database; `get_model(("shop", "User"))` names one.
    pub fn get_model<'a>(
        &self,
        lookup: impl Into<ModelLookup<'a>>,
    ) -> Result<Arc<ModelDefinition>, CastorError> {
        self.0.resolve_model(lookup)
    }

    pub fn get_models(&self, name: Option<&str>) -> Result<Arc<ModelMap>, CastorError> {
        self.0.resolve_models(name)
    }

    pub fn registry(&self) -> &Arc<InstanceRegistry> {
        &self.0
    }
}

impl<S> FromRequestParts<S> for Db
where
    Arc<InstanceRegistry>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(_parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Ok(Db(Arc::<InstanceRegistry>::from_ref(state)))
    }
}
