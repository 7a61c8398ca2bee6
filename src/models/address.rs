//! Address book request/response models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::addresses;
use crate::services::address_book::NewAddress;

/// POST /users/{id}/addresses body
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAddressRequest {
    pub street: String,
    pub city: String,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    /// Manual pin placed by the client on the map
    #[serde(default)]
    pub refined_latitude: Option<f64>,
    #[serde(default)]
    pub refined_longitude: Option<f64>,
}

impl From<CreateAddressRequest> for NewAddress {
    fn from(req: CreateAddressRequest) -> Self {
        Self {
            street: req.street,
            city: req.city,
            reference: req.reference,
            latitude: req.latitude,
            longitude: req.longitude,
            refined_latitude: req.refined_latitude,
            refined_longitude: req.refined_longitude,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressResponse {
    pub id: i32,
    pub user_id: i32,
    pub street: String,
    pub city: String,
    pub reference: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub refined_latitude: Option<f64>,
    pub refined_longitude: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl From<addresses::Model> for AddressResponse {
    fn from(model: addresses::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            street: model.street,
            city: model.city,
            reference: model.reference,
            latitude: model.latitude,
            longitude: model.longitude,
            refined_latitude: model.refined_latitude,
            refined_longitude: model.refined_longitude,
            created_at: model.created_at,
        }
    }
}
