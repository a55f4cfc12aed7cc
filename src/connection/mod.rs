//! The connection collaborator: whatever owns the actual database session.

mod sqlite;

pub use sqlite::SqliteConnection;

use async_trait::async_trait;
use std::any::Any;

use crate::error::BoxError;
use crate::model::ModelMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncOptions {
    /// Drop existing tables before recreating them.
    pub force: bool,
}

#[async_trait]
pub trait Connection: Send + Sync + 'static {
    /// Verifies the connection is usable.
    async fn authenticate(&self) -> Result<(), BoxError>;

    /// Brings the schema in line with `models`.
    async fn sync(&self, models: &ModelMap, options: SyncOptions) -> Result<(), BoxError>;

    async fn close(&self) -> Result<(), BoxError>;

    fn as_any(&self) -> &dyn Any;
}
