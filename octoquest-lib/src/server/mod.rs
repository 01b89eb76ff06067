pub mod connection;
pub mod context;
pub mod handler;
pub mod http_result;
pub mod response;
pub mod run;

pub use context::AppContext;
pub use handler::{handle_request, Route};
pub use http_result::{ApiError, ApiResult};
pub use run::{build_context, run, serve, shutdown_signal};
