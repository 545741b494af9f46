pub mod prelude;

pub mod leads;
pub mod plans;
pub mod search_history;
pub mod users;
