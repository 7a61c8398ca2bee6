use sea_orm::DatabaseConnection;
use services::{
    address_book::AddressBookService, catalog::CatalogService, directory::DirectoryService,
    order_workflow::OrderWorkflowService,
};

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub orders: OrderWorkflowService,
    pub catalog: CatalogService,
    pub addresses: AddressBookService,
    pub directory: DirectoryService,
}

impl AppState {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            orders: OrderWorkflowService::new(db.clone()),
            catalog: CatalogService::new(db.clone()),
            addresses: AddressBookService::new(db.clone()),
            directory: DirectoryService::new(db.clone()),
            db,
        }
    }
}

pub mod entities {
    pub mod prelude;
    pub mod addresses;
    pub mod order_items;
    pub mod order_notes;
    pub mod orders;
    pub mod products;
    pub mod users;
}

pub mod services {
    pub mod error;
    pub mod policy;
    pub mod price_utils;
    pub mod catalog;
    pub mod directory;
    pub mod address_book;
    pub mod order_workflow;
}

pub mod config;
pub mod models;
pub mod handlers;
pub mod routes;
