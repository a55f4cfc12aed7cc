use axum::{Json, http::StatusCode, response::IntoResponse};
use castor_schema::SchemaError;
use serde::Serialize;
use std::fmt::Display;
use thiserror::Error as ThisError;

/// Failure reported by a connection collaborator or a caller-supplied hook.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, ThisError)]
pub enum CastorError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error(
        "An error occurred while attempting to connect to DB[{database}], please check the configuration. Details: {message}"
    )]
    Connection { database: String, message: String },

    #[error("onConnect hook failed for DB[{database}]: {message}")]
    Hook { database: String, message: String },

    #[error("Can't apply relationships on invalid models object: {0}")]
    InvalidModelSet(String),

    #[error("cannot find the {} database instance", .name.as_deref().unwrap_or("default"))]
    DatabaseNotFound { name: Option<String> },

    #[error("Database model not found: {model}")]
    ModelNotFound { model: String },
}

impl CastorError {
    pub fn configuration(message: impl Into<String>) -> Self {
        CastorError::Configuration(message.into())
    }

    pub fn connection(database: &str, source: impl Display) -> Self {
        CastorError::Connection {
            database: database.to_string(),
            message: source.to_string(),
        }
    }

    pub fn hook(database: &str, source: impl Display) -> Self {
        CastorError::Hook {
            database: database.to_string(),
            message: source.to_string(),
        }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, CastorError::Configuration(_))
    }
}

impl From<SchemaError> for CastorError {
    fn from(err: SchemaError) -> Self {
        CastorError::Configuration(err.to_string())
    }
}

impl IntoResponse for CastorError {
    fn into_response(self) -> axum::response::Response {
        let body = match &self {
            CastorError::DatabaseNotFound { .. } => ApiErrorObject {
                code: "DATABASE_NOT_FOUND".to_string(),
                message: self.to_string(),
            },
            CastorError::ModelNotFound { .. } => ApiErrorObject {
                code: "MODEL_NOT_FOUND".to_string(),
                message: self.to_string(),
            },
            CastorError::Configuration(_)
            | CastorError::Connection { .. }
            | CastorError::Hook { .. }
            | CastorError::InvalidModelSet(_) => ApiErrorObject {
                code: "INTERNAL_ERROR".to_string(),
                message: "An internal server error occurred.".to_string(),
            },
        };
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiErrorBody { inner: body }),
        )
            .into_response()
    }
}

/// Standardized API error response payload.
#[derive(Serialize)]
pub struct ApiErrorObject {
    pub code: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct ApiErrorBody {
    #[serde(rename = "error")]
    pub inner: ApiErrorObject,
}
