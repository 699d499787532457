//! Database access layer

pub mod analytics;
pub mod audit;
pub mod employees;
pub mod gift_cards;
pub mod invitations;
pub mod passes;
pub mod profiles;
