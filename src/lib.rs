pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod memory;
pub mod middleware;
pub mod state;
pub mod tasks;

pub use app::{build_app, serve};
pub use config::AppConfig;
pub use state::AppState;
