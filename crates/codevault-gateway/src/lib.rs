//! Code Vault Gateway - HTTP API over the game runtime

pub mod api;
pub mod auth;
pub mod error;
pub mod server;

pub use auth::AdminAuth;
pub use error::{ApiError, ApiResult};
pub use server::{open_store, router, start_server, AppState};
