//! Catalog Store
//!
//! Product listing consulted by the order workflow to snapshot prices.
//! Changing or removing a product never rewrites existing orders: order
//! lines keep their `price_at_time`, and removal only nulls the line's
//! product reference.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use tracing::info;

use crate::entities::{prelude::Products, products};
use crate::services::error::ServiceError;
use crate::services::policy::{authorize, Action, Actor};
use crate::services::price_utils::check_price;

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub category: String,
    pub price: Decimal,
    pub image: Option<String>,
}

/// Partial product update; `None` leaves the field untouched
#[derive(Debug, Clone, Default)]
pub struct ProductChanges {
    pub name: Option<String>,
    pub category: Option<String>,
    pub price: Option<Decimal>,
    pub image: Option<String>,
}

/// Look up a product on any connection, including an open transaction
pub async fn find_product<C: ConnectionTrait>(
    conn: &C,
    product_id: i32,
) -> Result<products::Model, ServiceError> {
    Products::find_by_id(product_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::not_found("Product", product_id))
}

fn required_text(field: &str, value: &str) -> Result<String, ServiceError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::Validation(format!("{} cannot be empty", field)));
    }
    Ok(trimmed.to_string())
}

#[derive(Clone)]
pub struct CatalogService {
    db: DatabaseConnection,
}

impl CatalogService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Public listing, grouped by category then name
    pub async fn list_products(
        &self,
        category: Option<&str>,
    ) -> Result<Vec<products::Model>, ServiceError> {
        let mut select = Products::find();
        if let Some(category) = category.map(str::trim).filter(|c| !c.is_empty()) {
            select = select.filter(products::Column::Category.eq(category));
        }

        Ok(select
            .order_by_asc(products::Column::Category)
            .order_by_asc(products::Column::Name)
            .all(&self.db)
            .await?)
    }

    pub async fn get_product(&self, product_id: i32) -> Result<products::Model, ServiceError> {
        find_product(&self.db, product_id).await
    }

    pub async fn create_product(
        &self,
        actor: &Actor,
        new_product: NewProduct,
    ) -> Result<products::Model, ServiceError> {
        authorize(actor, &Action::ManageCatalog)?;

        let now = Utc::now();
        let product = products::ActiveModel {
            name: Set(required_text("name", &new_product.name)?),
            category: Set(required_text("category", &new_product.category)?),
            price: Set(check_price(new_product.price)?),
            image: Set(new_product.image.filter(|i| !i.trim().is_empty())),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;

        info!(product_id = product.id, name = %product.name, price = %product.price, "Product created");
        Ok(product)
    }

    pub async fn update_product(
        &self,
        actor: &Actor,
        product_id: i32,
        changes: ProductChanges,
    ) -> Result<products::Model, ServiceError> {
        authorize(actor, &Action::ManageCatalog)?;

        let existing = find_product(&self.db, product_id).await?;
        let mut active: products::ActiveModel = existing.into();

        if let Some(name) = changes.name {
            active.name = Set(required_text("name", &name)?);
        }
        if let Some(category) = changes.category {
            active.category = Set(required_text("category", &category)?);
        }
        if let Some(price) = changes.price {
            active.price = Set(check_price(price)?);
        }
        if let Some(image) = changes.image {
            active.image = Set(Some(image).filter(|i| !i.trim().is_empty()));
        }
        active.updated_at = Set(Utc::now());

        let product = active.update(&self.db).await?;
        info!(product_id = product.id, price = %product.price, "Product updated");
        Ok(product)
    }

    /// Remove a product. Order lines referencing it stay, with a null product.
    pub async fn delete_product(&self, actor: &Actor, product_id: i32) -> Result<(), ServiceError> {
        authorize(actor, &Action::ManageCatalog)?;

        let result = Products::delete_by_id(product_id).exec(&self.db).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::not_found("Product", product_id));
        }

        info!(product_id = product_id, "Product removed from catalog");
        Ok(())
    }
}
