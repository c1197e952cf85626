pub mod auth;
pub mod error;
pub mod handlers;
pub mod health;
pub mod server;

pub use auth::{hash_password, AccessGate, Claims};
pub use error::ApiError;
pub use health::HealthResponse;
pub use server::{ApiServer, AppState};
