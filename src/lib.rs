pub mod app;
pub mod audit;
pub mod authz;
pub mod config;
pub mod docs;
pub mod errors;
pub mod guard;
pub mod jwt;
pub mod navigation;
pub mod routes;
pub mod session;

// Re-export commonly used items for tests
pub use app::{create_app, router, AppState};
