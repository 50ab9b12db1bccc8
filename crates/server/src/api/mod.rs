pub mod directory;
pub mod downloads;
pub mod handlers;
pub mod middleware;
pub mod requests;
pub mod routes;
pub mod titles;

pub use routes::create_router;
