pub use super::leads::Entity as Leads;
pub use super::plans::Entity as Plans;
pub use super::search_history::Entity as SearchHistory;
pub use super::users::Entity as Users;
