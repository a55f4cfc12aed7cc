mod castor;

pub use castor::{ApiErrorBody, ApiErrorObject, BoxError, CastorError};
