pub mod config;
pub mod connection;
pub mod error;
pub mod handle;
pub mod loader;
pub mod model;
pub mod orchestrator;
pub mod registry;
pub mod server;

pub use castor_schema as schema;

pub use connection::{Connection, SqliteConnection, SyncOptions};
pub use error::CastorError;
pub use handle::DatabaseHandle;
pub use model::{ModelDefinition, ModelMap};
pub use orchestrator::{ConnectionOrchestrator, DatabaseConfig, RegistrationReport, ShutdownReport};
pub use registry::{InstanceRegistry, ModelLookup};
