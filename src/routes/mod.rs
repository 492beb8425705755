pub mod auth;
pub mod queue;
pub mod reports;
