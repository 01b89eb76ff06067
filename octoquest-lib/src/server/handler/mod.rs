pub mod query;
pub mod rate_limit_validation;
pub mod request;

pub use request::{handle_request, Route};
