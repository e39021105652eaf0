//! Small shared helpers

pub mod entropy;
pub mod rate_limit;
pub mod time;
