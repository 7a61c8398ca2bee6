//! `SeaORM` entity re-exports

pub use super::addresses::Entity as Addresses;
pub use super::order_items::Entity as OrderItems;
pub use super::order_notes::Entity as OrderNotes;
pub use super::orders::Entity as Orders;
pub use super::products::Entity as Products;
pub use super::users::Entity as Users;
