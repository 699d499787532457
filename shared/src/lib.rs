//! Shared types for the loyalty service
//!
//! Error codes and the API envelope, domain models, reward rules and
//! token/serial helpers used by the server and its clients.

pub mod error;
pub mod loyalty;
pub mod models;
pub mod response;
pub mod util;

// Re-exports
pub use axum::Json;
pub use http;
pub use serde::{Deserialize, Serialize};
