//! Data models
//!
//! Shared between the server and API clients.
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! Timestamps are Unix milliseconds, money is integer cents.

pub mod customer;
pub mod employee;
pub mod gift_card;
pub mod invitation;
pub mod pass;

// Re-exports
pub use customer::*;
pub use employee::*;
pub use gift_card::*;
pub use invitation::*;
pub use pass::*;
