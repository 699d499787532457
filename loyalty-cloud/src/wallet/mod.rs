//! Wallet pass integrations

pub mod apple;
pub mod google;
pub mod push;
