//! Follow-up work triggered by balance changes

pub mod pass_updates;
