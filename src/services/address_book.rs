//! Address Book
//!
//! Order creation only needs existence and ownership checks from here.
//! Geocoding happens client-side; we store whatever pins we are given.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use tracing::info;

use crate::entities::{addresses, orders, prelude::{Addresses, Orders}};
use crate::services::directory::find_user;
use crate::services::error::ServiceError;
use crate::services::policy::{authorize, Action, Actor};

#[derive(Debug, Clone, Default)]
pub struct NewAddress {
    pub street: String,
    pub city: String,
    pub reference: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub refined_latitude: Option<f64>,
    pub refined_longitude: Option<f64>,
}

impl NewAddress {
    fn validate(&self) -> Result<(), String> {
        if self.street.trim().is_empty() {
            return Err("street cannot be empty".to_string());
        }
        if self.city.trim().is_empty() {
            return Err("city cannot be empty".to_string());
        }
        check_pin("latitude/longitude", self.latitude, self.longitude)?;
        check_pin("refinedLatitude/refinedLongitude", self.refined_latitude, self.refined_longitude)
    }
}

/// A pin is either absent or a complete, in-range coordinate pair
fn check_pin(name: &str, lat: Option<f64>, lng: Option<f64>) -> Result<(), String> {
    match (lat, lng) {
        (None, None) => Ok(()),
        (Some(lat), Some(lng)) => {
            if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
                Err(format!("{} out of range: ({}, {})", name, lat, lng))
            } else {
                Ok(())
            }
        }
        _ => Err(format!("{} must be given together", name)),
    }
}

pub async fn find_address<C: ConnectionTrait>(
    conn: &C,
    address_id: i32,
) -> Result<addresses::Model, ServiceError> {
    Addresses::find_by_id(address_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::not_found("Address", address_id))
}

#[derive(Clone)]
pub struct AddressBookService {
    db: DatabaseConnection,
}

impl AddressBookService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn list_by_user(
        &self,
        actor: &Actor,
        user_id: i32,
    ) -> Result<Vec<addresses::Model>, ServiceError> {
        authorize(actor, &Action::ManageAddresses { owner_id: user_id })?;

        Ok(Addresses::find()
            .filter(addresses::Column::UserId.eq(user_id))
            .order_by_desc(addresses::Column::CreatedAt)
            .order_by_desc(addresses::Column::Id)
            .all(&self.db)
            .await?)
    }

    pub async fn create(
        &self,
        actor: &Actor,
        user_id: i32,
        new_address: NewAddress,
    ) -> Result<addresses::Model, ServiceError> {
        authorize(actor, &Action::ManageAddresses { owner_id: user_id })?;
        new_address.validate().map_err(ServiceError::Validation)?;
        find_user(&self.db, user_id).await?;

        let address = addresses::ActiveModel {
            user_id: Set(user_id),
            street: Set(new_address.street.trim().to_string()),
            city: Set(new_address.city.trim().to_string()),
            reference: Set(new_address.reference.filter(|r| !r.trim().is_empty())),
            latitude: Set(new_address.latitude),
            longitude: Set(new_address.longitude),
            refined_latitude: Set(new_address.refined_latitude),
            refined_longitude: Set(new_address.refined_longitude),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;

        info!(address_id = address.id, user_id = user_id, "Address added");
        Ok(address)
    }

    /// Delete an address that no order points at
    pub async fn delete(&self, actor: &Actor, address_id: i32) -> Result<(), ServiceError> {
        let address = find_address(&self.db, address_id).await?;
        authorize(actor, &Action::ManageAddresses { owner_id: address.user_id })?;

        let referenced = Orders::find()
            .filter(orders::Column::AddressId.eq(address_id))
            .count(&self.db)
            .await?;
        if referenced > 0 {
            return Err(ServiceError::Conflict(format!(
                "address {} is used by {} order(s)",
                address_id, referenced
            )));
        }

        Addresses::delete_by_id(address_id).exec(&self.db).await?;
        info!(address_id = address_id, user_id = address.user_id, "Address deleted");
        Ok(())
    }
}
