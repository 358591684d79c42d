//! HTTP API surface: catalog endpoints, package retrieval, and the
//! WebSocket gateway route.

mod error;
mod handlers;
mod routes;
mod state;

pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::{AppState, ServeSettings};
