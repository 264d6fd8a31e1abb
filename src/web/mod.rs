pub mod error;
pub mod extract;
pub mod handlers;
pub mod routes;

pub use routes::configure_app;
