pub mod dto;
pub mod handlers;
pub mod openapi;
mod response;
mod routes;
mod state;

pub use response::ApiResponse;
pub use routes::create_router;
pub use state::AppState;
