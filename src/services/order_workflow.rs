//! Order Workflow Manager
//!
//! Owns the Order / OrderItem lifecycle: checkout, status progression,
//! delivery assignment, item revision with audit notes, and receipt
//! confirmation.
//!
//! Every mutation runs in one transaction scoped to a single order and is
//! written with `UPDATE ... WHERE id = ? AND version = ?`. If another
//! writer got there first the update touches no rows and the call fails
//! with [`ServiceError::Conflict`] instead of silently overwriting.

use std::collections::{BTreeMap, HashMap};

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::{Expr, SimpleExpr},
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use tracing::{debug, info, warn};

use crate::entities::{
    addresses, order_items, order_notes, orders, products,
    prelude::{Addresses, OrderItems, OrderNotes, Orders, Products},
};
use crate::models::order::OrderStatus;
use crate::models::user::Role;
use crate::services::address_book::find_address;
use crate::services::catalog::find_product;
use crate::services::directory::find_user;
use crate::services::error::ServiceError;
use crate::services::policy::{authorize, Action, Actor};
use crate::services::price_utils::{check_price, money, order_total};

/// Checkout line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewOrderItem {
    pub product_id: i32,
    pub quantity: i32,
}

/// Checkout request
#[derive(Debug, Clone, Default)]
pub struct NewOrder {
    pub user_id: i32,
    pub address_id: Option<i32>,
    pub items: Vec<NewOrderItem>,
    /// Display labels computed by the storefront, stored as-is
    pub delivery_date: Option<String>,
    pub payment_due_date: Option<String>,
    /// Total the client saw, if any; must match the computed one
    pub client_total: Option<Decimal>,
}

/// Replacement line for [`OrderWorkflowService::revise_items`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevisedItem {
    /// `None` keeps a line whose product has left the catalog
    pub product_id: Option<i32>,
    pub quantity: i32,
    /// Explicit price; defaults to the current snapshot for that product,
    /// then to the live catalog price
    pub price: Option<Decimal>,
}

#[derive(Debug, Clone, Default)]
pub struct Revision {
    pub items: Vec<RevisedItem>,
    pub reason: Option<String>,
    pub client_total: Option<Decimal>,
    pub expected_version: Option<i32>,
}

/// A line ready to be written
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct PricedLine {
    product_id: Option<i32>,
    quantity: i32,
    price_at_time: Decimal,
}

#[derive(Debug, Clone)]
pub struct ItemDetails {
    pub item: order_items::Model,
    pub product_name: Option<String>,
}

/// An order with its lines, address and audit history resolved
#[derive(Debug, Clone)]
pub struct OrderDetails {
    pub order: orders::Model,
    pub items: Vec<ItemDetails>,
    pub address: Option<addresses::Model>,
    pub notes: Vec<order_notes::Model>,
}

fn status_of(order: &orders::Model) -> Result<OrderStatus, ServiceError> {
    order.status.parse::<OrderStatus>().map_err(|e| {
        ServiceError::Validation(format!("order {} has unreadable status: {}", order.id, e))
    })
}

fn check_quantity(quantity: i32) -> Result<(), ServiceError> {
    if quantity < 1 {
        return Err(ServiceError::Validation(format!(
            "quantity must be at least 1, got {}",
            quantity
        )));
    }
    Ok(())
}

fn check_version(order: &orders::Model, expected: Option<i32>) -> Result<(), ServiceError> {
    match expected {
        Some(version) if version != order.version => Err(ServiceError::Conflict(format!(
            "order {} is at version {}, request was based on version {}",
            order.id, order.version, version
        ))),
        _ => Ok(()),
    }
}

fn check_client_total(computed: Decimal, client_total: Option<Decimal>) -> Result<(), ServiceError> {
    match client_total {
        Some(claimed) if money(claimed) != computed => Err(ServiceError::Validation(format!(
            "total mismatch: client sent {}, items add up to {}",
            money(claimed),
            computed
        ))),
        _ => Ok(()),
    }
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Validate checkout lines and merge repeated products, keeping first-seen order
fn merge_checkout_lines(items: &[NewOrderItem]) -> Result<Vec<(i32, i32)>, ServiceError> {
    if items.is_empty() {
        return Err(ServiceError::Validation("an order needs at least one item".to_string()));
    }

    let mut merged: Vec<(i32, i32)> = Vec::with_capacity(items.len());
    for item in items {
        check_quantity(item.quantity)?;
        match merged.iter_mut().find(|(product_id, _)| *product_id == item.product_id) {
            Some((_, quantity)) => {
                *quantity = quantity.checked_add(item.quantity).ok_or_else(|| {
                    ServiceError::Validation(format!("quantity overflow for product {}", item.product_id))
                })?
            }
            None => merged.push((item.product_id, item.quantity)),
        }
    }
    Ok(merged)
}

/// Whether two line sets differ, ignoring line order
fn lines_differ(current: &[PricedLine], proposed: &[PricedLine]) -> bool {
    let normalize = |lines: &[PricedLine]| {
        let mut lines: Vec<PricedLine> = lines
            .iter()
            .map(|l| PricedLine {
                price_at_time: money(l.price_at_time),
                ..*l
            })
            .collect();
        lines.sort();
        lines
    };
    normalize(current) != normalize(proposed)
}

fn total_of(lines: &[PricedLine]) -> Result<Decimal, ServiceError> {
    order_total(lines.iter().map(|l| (l.quantity, l.price_at_time)))
}

/// Write order columns guarded by the version read at the start of the
/// transaction. Bumps `version` and `updated_at`.
async fn write_order<C: ConnectionTrait>(
    conn: &C,
    order: &orders::Model,
    changes: Vec<(orders::Column, SimpleExpr)>,
) -> Result<(), ServiceError> {
    let mut update = Orders::update_many()
        .col_expr(orders::Column::Version, Expr::col(orders::Column::Version).add(1))
        .col_expr(orders::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(orders::Column::Id.eq(order.id))
        .filter(orders::Column::Version.eq(order.version));

    for (column, value) in changes {
        update = update.col_expr(column, value);
    }

    let result = update.exec(conn).await?;
    if result.rows_affected == 0 {
        warn!(order_id = order.id, version = order.version, "Lost update detected");
        return Err(ServiceError::Conflict(format!(
            "order {} was modified by someone else, reload and retry",
            order.id
        )));
    }
    Ok(())
}

async fn find_order<C: ConnectionTrait>(conn: &C, order_id: i32) -> Result<orders::Model, ServiceError> {
    Orders::find_by_id(order_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::not_found("Order", order_id))
}

async fn insert_lines<C: ConnectionTrait>(
    conn: &C,
    order_id: i32,
    lines: &[PricedLine],
) -> Result<(), ServiceError> {
    let models = lines.iter().map(|line| order_items::ActiveModel {
        order_id: Set(order_id),
        product_id: Set(line.product_id),
        quantity: Set(line.quantity),
        price_at_time: Set(money(line.price_at_time)),
        ..Default::default()
    });
    OrderItems::insert_many(models).exec(conn).await?;
    Ok(())
}

/// Resolve items, products, addresses and notes for a batch of orders,
/// preserving the order of `orders`
async fn load_details<C: ConnectionTrait>(
    conn: &C,
    orders: Vec<orders::Model>,
) -> Result<Vec<OrderDetails>, ServiceError> {
    if orders.is_empty() {
        return Ok(Vec::new());
    }

    let order_ids: Vec<i32> = orders.iter().map(|o| o.id).collect();

    let items = OrderItems::find()
        .filter(order_items::Column::OrderId.is_in(order_ids.clone()))
        .order_by_asc(order_items::Column::Id)
        .all(conn)
        .await?;

    let mut product_ids: Vec<i32> = items.iter().filter_map(|i| i.product_id).collect();
    product_ids.sort_unstable();
    product_ids.dedup();
    let product_names: HashMap<i32, String> = if product_ids.is_empty() {
        HashMap::new()
    } else {
        Products::find()
            .filter(products::Column::Id.is_in(product_ids))
            .all(conn)
            .await?
            .into_iter()
            .map(|p| (p.id, p.name))
            .collect()
    };

    let address_ids: Vec<i32> = orders.iter().filter_map(|o| o.address_id).collect();
    let addresses: HashMap<i32, addresses::Model> = if address_ids.is_empty() {
        HashMap::new()
    } else {
        Addresses::find()
            .filter(addresses::Column::Id.is_in(address_ids))
            .all(conn)
            .await?
            .into_iter()
            .map(|a| (a.id, a))
            .collect()
    };

    let notes = OrderNotes::find()
        .filter(order_notes::Column::OrderId.is_in(order_ids))
        .order_by_asc(order_notes::Column::CreatedAt)
        .order_by_asc(order_notes::Column::Id)
        .all(conn)
        .await?;

    let mut items_by_order: BTreeMap<i32, Vec<ItemDetails>> = BTreeMap::new();
    for item in items {
        let product_name = item.product_id.and_then(|id| product_names.get(&id).cloned());
        items_by_order
            .entry(item.order_id)
            .or_default()
            .push(ItemDetails { item, product_name });
    }

    let mut notes_by_order: BTreeMap<i32, Vec<order_notes::Model>> = BTreeMap::new();
    for note in notes {
        notes_by_order.entry(note.order_id).or_default().push(note);
    }

    Ok(orders
        .into_iter()
        .map(|order| OrderDetails {
            items: items_by_order.remove(&order.id).unwrap_or_default(),
            notes: notes_by_order.remove(&order.id).unwrap_or_default(),
            address: order.address_id.and_then(|id| addresses.get(&id).cloned()),
            order,
        })
        .collect())
}

async fn load_one<C: ConnectionTrait>(conn: &C, order_id: i32) -> Result<OrderDetails, ServiceError> {
    let order = find_order(conn, order_id).await?;
    load_details(conn, vec![order])
        .await?
        .pop()
        .ok_or_else(|| ServiceError::not_found("Order", order_id))
}

#[derive(Clone)]
pub struct OrderWorkflowService {
    db: DatabaseConnection,
}

impl OrderWorkflowService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Checkout: validate lines, snapshot prices, store order and items
    pub async fn create_order(
        &self,
        actor: &Actor,
        new_order: NewOrder,
    ) -> Result<OrderDetails, ServiceError> {
        authorize(actor, &Action::CreateOrderFor { owner_id: new_order.user_id })?;
        let requested = merge_checkout_lines(&new_order.items)?;

        let txn = self.db.begin().await?;

        find_user(&txn, new_order.user_id).await?;

        if let Some(address_id) = new_order.address_id {
            let address = find_address(&txn, address_id).await?;
            if address.user_id != new_order.user_id {
                return Err(ServiceError::Validation(format!(
                    "address {} does not belong to user {}",
                    address_id, new_order.user_id
                )));
            }
        }

        let mut lines = Vec::with_capacity(requested.len());
        for (product_id, quantity) in requested {
            let product = find_product(&txn, product_id).await?;
            lines.push(PricedLine {
                product_id: Some(product.id),
                quantity,
                price_at_time: money(product.price),
            });
        }

        let total = total_of(&lines)?;
        check_client_total(total, new_order.client_total)?;

        let now = Utc::now();
        let order = orders::ActiveModel {
            user_id: Set(new_order.user_id),
            total: Set(total),
            status: Set(OrderStatus::Pedido.to_string()),
            address_id: Set(new_order.address_id),
            delivery_date: Set(blank_to_none(new_order.delivery_date)),
            payment_due_date: Set(blank_to_none(new_order.payment_due_date)),
            delivery_user_id: Set(None),
            version: Set(1),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        insert_lines(&txn, order.id, &lines).await?;
        txn.commit().await?;

        info!(
            order_id = order.id,
            user_id = order.user_id,
            items = lines.len(),
            total = %total,
            "Order created"
        );

        load_one(&self.db, order.id).await
    }

    /// Move an order along the workflow. Writing the current status again
    /// is a no-op.
    pub async fn update_status(
        &self,
        actor: &Actor,
        order_id: i32,
        status: &str,
        expected_version: Option<i32>,
    ) -> Result<OrderDetails, ServiceError> {
        let target = status.parse::<OrderStatus>().map_err(ServiceError::Validation)?;

        let txn = self.db.begin().await?;
        let order = find_order(&txn, order_id).await?;
        authorize(
            actor,
            &Action::SetStatus {
                target,
                delivery_user_id: order.delivery_user_id,
            },
        )?;
        check_version(&order, expected_version)?;

        let current = status_of(&order)?;
        if current == target {
            debug!(order_id = order_id, status = %current, "Status unchanged");
            let details = load_one(&txn, order_id).await?;
            txn.commit().await?;
            return Ok(details);
        }
        current
            .check_transition(target)
            .map_err(ServiceError::InvalidTransition)?;

        write_order(
            &txn,
            &order,
            vec![(orders::Column::Status, Expr::value(target.to_string()))],
        )
        .await?;
        txn.commit().await?;

        info!(
            order_id = order_id,
            actor_id = actor.user_id,
            from = %current,
            to = %target,
            "Order status updated"
        );

        load_one(&self.db, order_id).await
    }

    /// Set or clear the delivery assignee. Clearing always succeeds.
    pub async fn assign_delivery(
        &self,
        actor: &Actor,
        order_id: i32,
        delivery_user_id: Option<i32>,
        expected_version: Option<i32>,
    ) -> Result<OrderDetails, ServiceError> {
        let txn = self.db.begin().await?;
        let order = find_order(&txn, order_id).await?;
        authorize(actor, &Action::AssignDelivery)?;
        check_version(&order, expected_version)?;

        if let Some(user_id) = delivery_user_id {
            let status = status_of(&order)?;
            if status.is_terminal() {
                return Err(ServiceError::InvalidTransition(format!(
                    "cannot assign delivery on a '{}' order",
                    status
                )));
            }

            let user = find_user(&txn, user_id).await?;
            if user.role.parse::<Role>().ok() != Some(Role::Delivery) {
                return Err(ServiceError::Validation(format!(
                    "user {} has role '{}', expected 'delivery'",
                    user_id, user.role
                )));
            }
        }

        write_order(
            &txn,
            &order,
            vec![(orders::Column::DeliveryUserId, Expr::value(delivery_user_id))],
        )
        .await?;
        txn.commit().await?;

        info!(
            order_id = order_id,
            previous = ?order.delivery_user_id,
            assignee = ?delivery_user_id,
            "Delivery assignment updated"
        );

        load_one(&self.db, order_id).await
    }

    /// Replace the item list wholesale and recompute the total. A changed
    /// item set needs a reason, which is appended to the order's notes.
    pub async fn revise_items(
        &self,
        actor: &Actor,
        order_id: i32,
        revision: Revision,
    ) -> Result<OrderDetails, ServiceError> {
        if revision.items.is_empty() {
            return Err(ServiceError::Validation(
                "an order must keep at least one item".to_string(),
            ));
        }
        for item in &revision.items {
            check_quantity(item.quantity)?;
            if let Some(price) = item.price {
                check_price(price)?;
            }
        }
        let reason = blank_to_none(revision.reason);

        let txn = self.db.begin().await?;
        let order = find_order(&txn, order_id).await?;
        authorize(actor, &Action::ReviseItems)?;
        check_version(&order, revision.expected_version)?;

        let status = status_of(&order)?;
        if status.is_terminal() {
            return Err(ServiceError::InvalidTransition(format!(
                "cannot revise items of a '{}' order",
                status
            )));
        }

        let current: Vec<PricedLine> = OrderItems::find()
            .filter(order_items::Column::OrderId.eq(order_id))
            .order_by_asc(order_items::Column::Id)
            .all(&txn)
            .await?
            .into_iter()
            .map(|item| PricedLine {
                product_id: item.product_id,
                quantity: item.quantity,
                price_at_time: item.price_at_time,
            })
            .collect();

        let mut proposed = Vec::with_capacity(revision.items.len());
        for item in &revision.items {
            let price_at_time = match (item.price, item.product_id) {
                (Some(price), Some(product_id)) => {
                    find_product(&txn, product_id).await?;
                    price
                }
                (Some(price), None) => price,
                (None, None) => {
                    return Err(ServiceError::Validation(
                        "a line without a product needs an explicit price".to_string(),
                    ))
                }
                (None, Some(product_id)) => {
                    let snapshot = current
                        .iter()
                        .find(|line| line.product_id == Some(product_id))
                        .map(|line| line.price_at_time);
                    match snapshot {
                        Some(price) => {
                            find_product(&txn, product_id).await?;
                            price
                        }
                        None => find_product(&txn, product_id).await?.price,
                    }
                }
            };
            proposed.push(PricedLine {
                product_id: item.product_id,
                quantity: item.quantity,
                price_at_time: money(price_at_time),
            });
        }

        let changed = lines_differ(&current, &proposed);
        if changed && reason.is_none() {
            return Err(ServiceError::Validation(
                "a reason is required when the items change".to_string(),
            ));
        }

        let total = total_of(&proposed)?;
        check_client_total(total, revision.client_total)?;

        write_order(&txn, &order, vec![(orders::Column::Total, Expr::value(total))]).await?;

        OrderItems::delete_many()
            .filter(order_items::Column::OrderId.eq(order_id))
            .exec(&txn)
            .await?;
        insert_lines(&txn, order_id, &proposed).await?;

        if let Some(reason) = &reason {
            order_notes::ActiveModel {
                order_id: Set(order_id),
                actor_id: Set(Some(actor.user_id)),
                reason: Set(reason.clone()),
                created_at: Set(Utc::now()),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
        }

        txn.commit().await?;

        info!(
            order_id = order_id,
            actor_id = actor.user_id,
            changed = changed,
            previous_total = %money(order.total),
            total = %total,
            reason = ?reason,
            "Order items revised"
        );

        load_one(&self.db, order_id).await
    }

    /// Client confirms the order arrived
    pub async fn confirm_receipt(&self, actor: &Actor, order_id: i32) -> Result<OrderDetails, ServiceError> {
        let txn = self.db.begin().await?;
        let order = find_order(&txn, order_id).await?;
        authorize(actor, &Action::ConfirmReceipt { owner_id: order.user_id })?;

        let status = status_of(&order)?;
        if !status.is_en_route() {
            return Err(ServiceError::InvalidTransition(format!(
                "receipt can only be confirmed while the order is en route, it is '{}'",
                status
            )));
        }

        write_order(
            &txn,
            &order,
            vec![(orders::Column::Status, Expr::value(OrderStatus::Entregado.to_string()))],
        )
        .await?;
        txn.commit().await?;

        info!(order_id = order_id, user_id = actor.user_id, "Receipt confirmed");
        load_one(&self.db, order_id).await
    }

    pub async fn find_one(&self, actor: &Actor, order_id: i32) -> Result<OrderDetails, ServiceError> {
        let details = load_one(&self.db, order_id).await?;
        authorize(
            actor,
            &Action::ViewOrder {
                owner_id: details.order.user_id,
                delivery_user_id: details.order.delivery_user_id,
            },
        )?;
        Ok(details)
    }

    /// A user's orders, most recent first
    pub async fn find_by_user(&self, actor: &Actor, user_id: i32) -> Result<Vec<OrderDetails>, ServiceError> {
        authorize(actor, &Action::ViewOrdersOf { user_id })?;
        find_user(&self.db, user_id).await?;

        let orders = Orders::find()
            .filter(orders::Column::UserId.eq(user_id))
            .order_by_desc(orders::Column::CreatedAt)
            .order_by_desc(orders::Column::Id)
            .all(&self.db)
            .await?;

        load_details(&self.db, orders).await
    }

    /// Orders assigned to a delivery user, most recent first
    pub async fn find_by_delivery_user(
        &self,
        actor: &Actor,
        delivery_user_id: i32,
    ) -> Result<Vec<OrderDetails>, ServiceError> {
        authorize(actor, &Action::ViewDeliveryQueue { delivery_user_id })?;

        let orders = Orders::find()
            .filter(orders::Column::DeliveryUserId.eq(delivery_user_id))
            .order_by_desc(orders::Column::CreatedAt)
            .order_by_desc(orders::Column::Id)
            .all(&self.db)
            .await?;

        load_details(&self.db, orders).await
    }

    /// Staff panel listing. Delivery users only see their own assignments.
    pub async fn list_orders(
        &self,
        actor: &Actor,
        status: Option<OrderStatus>,
    ) -> Result<Vec<OrderDetails>, ServiceError> {
        authorize(actor, &Action::ListOrders)?;

        let mut select = Orders::find();
        if let Some(status) = status {
            select = select.filter(orders::Column::Status.eq(status.to_string()));
        }
        if actor.role == Role::Delivery {
            select = select.filter(orders::Column::DeliveryUserId.eq(actor.user_id));
        }

        let orders = select
            .order_by_desc(orders::Column::CreatedAt)
            .order_by_desc(orders::Column::Id)
            .all(&self.db)
            .await?;

        load_details(&self.db, orders).await
    }
}
