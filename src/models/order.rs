//! Order workflow status machine and request/response models
//!
//! Status progresses: Pedido → En Producción → Finalizado → En camino → En Entrega → Entregado
//!                    any non-terminal state ↘ Cancelado

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::address::AddressResponse;
use crate::services::order_workflow::{NewOrder, NewOrderItem, OrderDetails, RevisedItem};
use crate::services::price_utils::{line_total, money};

/// Order status values. Wire labels are the ones the storefront and
/// staff panels display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Initial state, set at checkout
    #[serde(rename = "Pedido")]
    Pedido,
    /// Picked up by the bakers
    #[serde(rename = "En Producción")]
    EnProduccion,
    /// Baked and packed
    #[serde(rename = "Finalizado")]
    Finalizado,
    /// Left the bakery with a delivery user
    #[serde(rename = "En camino")]
    EnCamino,
    /// Delivery user is at the address
    #[serde(rename = "En Entrega")]
    EnEntrega,
    /// Receipt confirmed (terminal)
    #[serde(rename = "Entregado")]
    Entregado,
    /// Cancelled (terminal)
    #[serde(rename = "Cancelado")]
    Cancelado,
}

impl OrderStatus {
    /// Position on the forward path. `Cancelado` is off the path.
    fn rank(self) -> Option<u8> {
        match self {
            OrderStatus::Pedido => Some(0),
            OrderStatus::EnProduccion => Some(1),
            OrderStatus::Finalizado => Some(2),
            OrderStatus::EnCamino => Some(3),
            OrderStatus::EnEntrega => Some(4),
            OrderStatus::Entregado => Some(5),
            OrderStatus::Cancelado => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Entregado | OrderStatus::Cancelado)
    }

    /// Out for delivery: the only states a client may confirm receipt from
    pub fn is_en_route(self) -> bool {
        matches!(self, OrderStatus::EnCamino | OrderStatus::EnEntrega)
    }

    /// Check a move from `self` to `next`.
    ///
    /// Moves go strictly forward (steps may be skipped). `Cancelado` is
    /// reachable from any non-terminal state. Nothing leaves a terminal
    /// state. Staying put is handled by the caller as a no-op.
    pub fn check_transition(self, next: OrderStatus) -> Result<(), String> {
        if self.is_terminal() {
            return Err(format!("order is already '{}'", self));
        }
        if next == OrderStatus::Cancelado {
            return Ok(());
        }
        match (self.rank(), next.rank()) {
            (Some(from), Some(to)) if to > from => Ok(()),
            _ => Err(format!("cannot move from '{}' back to '{}'", self, next)),
        }
    }

    pub fn all() -> [OrderStatus; 7] {
        [
            OrderStatus::Pedido,
            OrderStatus::EnProduccion,
            OrderStatus::Finalizado,
            OrderStatus::EnCamino,
            OrderStatus::EnEntrega,
            OrderStatus::Entregado,
            OrderStatus::Cancelado,
        ]
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatus::Pedido => write!(f, "Pedido"),
            OrderStatus::EnProduccion => write!(f, "En Producción"),
            OrderStatus::Finalizado => write!(f, "Finalizado"),
            OrderStatus::EnCamino => write!(f, "En camino"),
            OrderStatus::EnEntrega => write!(f, "En Entrega"),
            OrderStatus::Entregado => write!(f, "Entregado"),
            OrderStatus::Cancelado => write!(f, "Cancelado"),
        }
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" => Err("status cannot be empty".to_string()),
            "pedido" => Ok(OrderStatus::Pedido),
            "en producción" | "en produccion" => Ok(OrderStatus::EnProduccion),
            "finalizado" => Ok(OrderStatus::Finalizado),
            "en camino" => Ok(OrderStatus::EnCamino),
            "en entrega" => Ok(OrderStatus::EnEntrega),
            "entregado" => Ok(OrderStatus::Entregado),
            "cancelado" => Ok(OrderStatus::Cancelado),
            _ => Err(format!("Unknown order status: {}", s)),
        }
    }
}

/// One line of a checkout request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemRequest {
    pub product_id: i32,
    pub quantity: i32,
}

/// POST /orders body
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub user_id: i32,
    #[serde(default)]
    pub address_id: Option<i32>,
    pub items: Vec<OrderItemRequest>,
    /// Display label computed by the storefront at checkout
    #[serde(default)]
    pub delivery_date: Option<String>,
    #[serde(default)]
    pub payment_due_date: Option<String>,
    /// Total the storefront showed; checked against the server total
    #[serde(default)]
    pub total: Option<Decimal>,
}

impl From<CreateOrderRequest> for NewOrder {
    fn from(req: CreateOrderRequest) -> Self {
        Self {
            user_id: req.user_id,
            address_id: req.address_id,
            items: req
                .items
                .into_iter()
                .map(|item| NewOrderItem {
                    product_id: item.product_id,
                    quantity: item.quantity,
                })
                .collect(),
            delivery_date: req.delivery_date,
            payment_due_date: req.payment_due_date,
            client_total: req.total,
        }
    }
}

/// One line of an item revision. `price` defaults to the line's current
/// snapshot, or the catalog price for new products.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviseItemRequest {
    #[serde(default)]
    pub product_id: Option<i32>,
    pub quantity: i32,
    #[serde(default)]
    pub price: Option<Decimal>,
}

impl From<ReviseItemRequest> for RevisedItem {
    fn from(req: ReviseItemRequest) -> Self {
        Self {
            product_id: req.product_id,
            quantity: req.quantity,
            price: req.price,
        }
    }
}

/// PATCH /orders/{id} body: either a status change or an item revision
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchOrderRequest {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub items: Option<Vec<ReviseItemRequest>>,
    #[serde(default)]
    pub total: Option<Decimal>,
    /// Why the items changed
    #[serde(default, rename = "motivo", alias = "reason")]
    pub reason: Option<String>,
    #[serde(default)]
    pub expected_version: Option<i32>,
}

impl PatchOrderRequest {
    pub fn validate(&self) -> Result<(), String> {
        match (&self.status, &self.items) {
            (Some(_), Some(_)) => Err("send either status or items, not both".to_string()),
            (None, None) => Err("nothing to update: expected status or items".to_string()),
            _ => Ok(()),
        }
    }
}

/// PATCH /orders/{id}/status body
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub status: String,
    #[serde(default)]
    pub expected_version: Option<i32>,
}

/// PATCH /orders/{id}/assign body. `null` clears the assignee.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignDeliveryRequest {
    #[serde(default)]
    pub delivery_user_id: Option<i32>,
    #[serde(default)]
    pub expected_version: Option<i32>,
}

/// GET /orders query
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderListQuery {
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemResponse {
    pub id: i32,
    pub product_id: Option<i32>,
    /// None once the product left the catalog
    pub product_name: Option<String>,
    pub quantity: i32,
    pub price_at_time: Decimal,
    /// None only for a stored line outside the money bounds
    pub line_total: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderNoteResponse {
    pub id: i32,
    pub actor_id: Option<i32>,
    pub reason: String,
    pub created_at: DateTime<Utc>,
    /// Human-readable line for the staff panels
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub id: i32,
    pub user_id: i32,
    pub total: Decimal,
    pub status: String,
    pub address_id: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<AddressResponse>,
    pub delivery_date: Option<String>,
    pub payment_due_date: Option<String>,
    pub delivery_user_id: Option<i32>,
    pub version: i32,
    pub items: Vec<OrderItemResponse>,
    pub notes: Vec<OrderNoteResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<OrderDetails> for OrderResponse {
    fn from(details: OrderDetails) -> Self {
        let OrderDetails {
            order,
            items,
            address,
            notes,
        } = details;

        Self {
            id: order.id,
            user_id: order.user_id,
            total: money(order.total),
            status: order.status,
            address_id: order.address_id,
            address: address.map(AddressResponse::from),
            delivery_date: order.delivery_date,
            payment_due_date: order.payment_due_date,
            delivery_user_id: order.delivery_user_id,
            version: order.version,
            items: items
                .into_iter()
                .map(|line| OrderItemResponse {
                    id: line.item.id,
                    product_id: line.item.product_id,
                    product_name: line.product_name,
                    quantity: line.item.quantity,
                    price_at_time: money(line.item.price_at_time),
                    line_total: line_total(line.item.quantity, line.item.price_at_time).ok(),
                })
                .collect(),
            notes: notes
                .into_iter()
                .map(|note| OrderNoteResponse {
                    text: format!("modified: {} on {}", note.reason, note.created_at.to_rfc3339()),
                    id: note.id,
                    actor_id: note.actor_id,
                    reason: note.reason,
                    created_at: note.created_at,
                })
                .collect(),
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}
