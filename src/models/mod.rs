pub mod address;
pub mod common;
pub mod order;
pub mod product;
pub mod user;
