pub mod availability;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod routing;
pub mod scans;

pub use error::ApiError;
pub use routes::create_router;
