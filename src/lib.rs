pub mod app;
pub mod authz;
pub mod db;
pub mod docs;
pub mod errors;
pub mod events;
pub mod gate;
pub mod models;
pub mod routes;
pub mod session;
pub mod storage;
pub mod utils;

// Re-export commonly used items for tests
pub use app::{create_app, create_app_with_store};
