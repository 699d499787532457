//! Authentication: employee and customer sessions, login rate limits

pub mod customer_auth;
pub mod employee_auth;
pub mod rate_limit;
pub mod token;

pub use customer_auth::CustomerIdentity;
pub use employee_auth::EmployeeIdentity;
