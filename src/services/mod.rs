pub mod export;
pub mod search;
pub mod usage;
