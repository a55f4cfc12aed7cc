pub mod extract;
pub mod router;
pub mod routes;

pub use extract::Db;
pub use router::{CastorState, castor_router};
