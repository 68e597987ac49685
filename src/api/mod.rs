mod handlers;
mod routes;

pub use handlers::{AppState, ErrorResponse, StatsParams, SuccessResponse, INTERNAL_ERROR_MESSAGE};
pub use routes::create_api_router;
