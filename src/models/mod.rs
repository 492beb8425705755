pub mod query_log;
pub mod report;
pub mod user;

pub use query_log::*;
pub use report::*;
pub use user::*;
