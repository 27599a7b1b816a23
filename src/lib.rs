pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod openapi;
pub mod repo;
pub mod revalidate;
pub mod routes;
pub mod service;

// Re-export commonly used items for tests / external users
pub use routes::{config, AppState};
pub use service::{NexioService, UserQuery};
