pub use super::accounts::Entity as Accounts;
pub use super::bodyweight_entries::Entity as BodyweightEntries;
