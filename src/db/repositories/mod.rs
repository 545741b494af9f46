pub mod plan;
pub mod search;
pub mod user;
