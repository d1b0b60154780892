//! HTTP chat proxy with per-session memory and auto-summarization

pub mod config;
pub mod error;
pub mod routes;
pub mod server;

pub use config::AppConfig;
pub use error::ApiError;
pub use routes::{AppState, build_router, cors_layer};
pub use server::ChatServer;
