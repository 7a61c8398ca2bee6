//! Access policy
//!
//! Every service operation calls [`authorize`] with the acting user before
//! touching the store, so the same rules hold no matter which transport
//! invoked it.

use crate::entities::users;
use crate::models::order::OrderStatus;
use crate::models::user::Role;
use crate::services::error::ServiceError;

/// The user performing an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: i32,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: i32, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn from_user(user: &users::Model) -> Result<Self, ServiceError> {
        let role = user.role.parse::<Role>().map_err(ServiceError::Validation)?;
        Ok(Self::new(user.id, role))
    }
}

/// Things an actor may attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    CreateOrderFor { owner_id: i32 },
    ViewOrder { owner_id: i32, delivery_user_id: Option<i32> },
    ViewOrdersOf { user_id: i32 },
    ViewDeliveryQueue { delivery_user_id: i32 },
    ListOrders,
    SetStatus { target: OrderStatus, delivery_user_id: Option<i32> },
    AssignDelivery,
    ReviseItems,
    ConfirmReceipt { owner_id: i32 },
    ManageCatalog,
    ManageAddresses { owner_id: i32 },
    ViewDirectory,
    ViewUser { user_id: i32 },
    ManageUsers,
}

/// Decide whether `actor` may perform `action`
pub fn authorize(actor: &Actor, action: &Action) -> Result<(), ServiceError> {
    if is_allowed(actor, action) {
        Ok(())
    } else {
        tracing::debug!(
            user_id = actor.user_id,
            role = %actor.role,
            action = ?action,
            "Action denied"
        );
        Err(ServiceError::Forbidden(format!(
            "role '{}' may not perform {:?}",
            actor.role, action
        )))
    }
}

fn is_allowed(actor: &Actor, action: &Action) -> bool {
    let is_self = |id: i32| actor.user_id == id;

    match (actor.role, *action) {
        (Role::Admin, _) => true,

        (_, Action::CreateOrderFor { owner_id }) => is_self(owner_id),
        (Role::Production, Action::ViewOrder { .. }) => true,
        (Role::Delivery, Action::ViewOrder { delivery_user_id, .. }) => {
            delivery_user_id == Some(actor.user_id)
        }
        (Role::Client, Action::ViewOrder { owner_id, .. }) => is_self(owner_id),

        (Role::Production, Action::ViewOrdersOf { .. }) => true,
        (_, Action::ViewOrdersOf { user_id }) => is_self(user_id),

        (Role::Delivery, Action::ViewDeliveryQueue { delivery_user_id }) => is_self(delivery_user_id),
        (Role::Production, Action::ViewDeliveryQueue { .. }) => true,

        // Delivery users get the list narrowed to their own assignments
        (Role::Production | Role::Delivery, Action::ListOrders) => true,

        (Role::Production, Action::SetStatus { target, .. }) => {
            matches!(target, OrderStatus::EnProduccion | OrderStatus::Finalizado)
        }
        (Role::Delivery, Action::SetStatus { target, delivery_user_id }) => {
            delivery_user_id == Some(actor.user_id)
                && matches!(target, OrderStatus::EnCamino | OrderStatus::EnEntrega)
        }

        (_, Action::ConfirmReceipt { owner_id }) => is_self(owner_id),
        (_, Action::ManageAddresses { owner_id }) => is_self(owner_id),

        (Role::Production, Action::ViewDirectory) => true,
        (Role::Production | Role::Delivery, Action::ViewUser { .. }) => true,
        (_, Action::ViewUser { user_id }) => is_self(user_id),

        _ => false,
    }
}
