mod common;

use bakery_backend::entities::prelude::Orders;
use bakery_backend::models::order::OrderStatus;
use bakery_backend::services::error::ServiceError;
use bakery_backend::services::order_workflow::{
    NewOrder, NewOrderItem, OrderDetails, Revision, RevisedItem,
};
use bakery_backend::services::policy::Actor;
use bakery_backend::services::price_utils::money;
use rust_decimal_macros::dec;
use sea_orm::EntityTrait;

use crate::common::{fixture, insert_address, insert_user, Fixture};
use bakery_backend::models::user::Role;

fn checkout(f: &Fixture) -> NewOrder {
    NewOrder {
        user_id: f.client.user_id,
        items: vec![
            NewOrderItem { product_id: f.bread.id, quantity: 2 },
            NewOrderItem { product_id: f.alfajor.id, quantity: 1 },
        ],
        delivery_date: Some("sábado 12 de octubre".to_string()),
        ..Default::default()
    }
}

async fn place_order(f: &Fixture) -> OrderDetails {
    f.state
        .orders
        .create_order(&f.client, checkout(f))
        .await
        .expect("order should be created")
}

fn revised(f: &Fixture, bread_qty: i32) -> Vec<RevisedItem> {
    vec![
        RevisedItem { product_id: Some(f.bread.id), quantity: bread_qty, price: None },
        RevisedItem { product_id: Some(f.alfajor.id), quantity: 1, price: None },
    ]
}

async fn set_status(f: &Fixture, actor: &Actor, order_id: i32, status: OrderStatus) -> OrderDetails {
    f.state
        .orders
        .update_status(actor, order_id, &status.to_string(), None)
        .await
        .unwrap_or_else(|e| panic!("moving to {} failed: {}", status, e))
}

#[tokio::test]
async fn test_create_order_snapshots_prices_and_total() {
    let f = fixture().await;
    let details = place_order(&f).await;

    assert_eq!(money(details.order.total), dec!(25.00));
    assert_eq!(details.order.status, "Pedido");
    assert_eq!(details.order.version, 1);
    assert_eq!(details.order.delivery_user_id, None);
    assert_eq!(details.items.len(), 2);
    assert_eq!(details.items[0].product_name.as_deref(), Some("Pan francés"));
    assert_eq!(money(details.items[0].item.price_at_time), dec!(10.00));
    assert!(details.notes.is_empty());
}

#[tokio::test]
async fn test_create_order_validation() {
    let f = fixture().await;

    let mut empty = checkout(&f);
    empty.items.clear();
    let err = f.state.orders.create_order(&f.client, empty).await.unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));

    let mut zero = checkout(&f);
    zero.items[0].quantity = 0;
    let err = f.state.orders.create_order(&f.client, zero).await.unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));

    let mut unknown = checkout(&f);
    unknown.items.push(NewOrderItem { product_id: 9999, quantity: 1 });
    let err = f.state.orders.create_order(&f.client, unknown).await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));

    let mut wrong_total = checkout(&f);
    wrong_total.client_total = Some(dec!(20.00));
    let err = f.state.orders.create_order(&f.client, wrong_total).await.unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));

    // Nothing was stored by the failed attempts
    let stored = Orders::find().all(&f.state.db).await.unwrap();
    assert!(stored.is_empty());
}

#[tokio::test]
async fn test_create_order_merges_repeated_products() {
    let f = fixture().await;
    let mut order = checkout(&f);
    order.items.push(NewOrderItem { product_id: f.bread.id, quantity: 1 });
    order.client_total = Some(dec!(35));

    let details = f.state.orders.create_order(&f.client, order).await.unwrap();
    assert_eq!(details.items.len(), 2);
    assert_eq!(details.items[0].item.quantity, 3);
    assert_eq!(money(details.order.total), dec!(35.00));
}

#[tokio::test]
async fn test_create_order_for_someone_else_is_forbidden() {
    let f = fixture().await;
    let mut order = checkout(&f);
    order.user_id = f.admin.user_id;

    let err = f.state.orders.create_order(&f.client, order).await.unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(_)));
}

#[tokio::test]
async fn test_create_order_checks_address_owner() {
    let f = fixture().await;
    let own = insert_address(&f.state.db, f.client.user_id).await;
    let foreign = insert_address(&f.state.db, f.admin.user_id).await;

    let mut order = checkout(&f);
    order.address_id = Some(foreign.id);
    let err = f.state.orders.create_order(&f.client, order).await.unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));

    let mut order = checkout(&f);
    order.address_id = Some(own.id);
    let details = f.state.orders.create_order(&f.client, order).await.unwrap();
    assert_eq!(details.address.map(|a| a.id), Some(own.id));
}

#[tokio::test]
async fn test_revise_items_requires_reason_when_changed() {
    let f = fixture().await;
    let order = place_order(&f).await;

    let err = f
        .state
        .orders
        .revise_items(
            &f.admin,
            order.order.id,
            Revision { items: revised(&f, 3), reason: Some("   ".to_string()), ..Default::default() },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));

    let details = f
        .state
        .orders
        .revise_items(
            &f.admin,
            order.order.id,
            Revision {
                items: revised(&f, 3),
                reason: Some("client requested more".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(money(details.order.total), dec!(35.00));
    assert_eq!(details.order.version, 2);
    assert_eq!(details.notes.len(), 1);
    assert!(details.notes[0].reason.contains("client requested more"));
    assert_eq!(details.notes[0].actor_id, Some(f.admin.user_id));
}

#[tokio::test]
async fn test_revise_items_unchanged_set_needs_no_reason() {
    let f = fixture().await;
    let order = place_order(&f).await;

    let mut items = revised(&f, 2);
    items.reverse();
    let details = f
        .state
        .orders
        .revise_items(&f.admin, order.order.id, Revision { items, ..Default::default() })
        .await
        .unwrap();

    assert_eq!(money(details.order.total), dec!(25.00));
    assert!(details.notes.is_empty());
}

#[tokio::test]
async fn test_revise_items_keeps_snapshot_price() {
    let f = fixture().await;
    let order = place_order(&f).await;

    // Catalog price goes up after checkout
    f.state
        .catalog
        .update_product(
            &f.admin,
            f.bread.id,
            bakery_backend::services::catalog::ProductChanges {
                price: Some(dec!(12)),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let details = f
        .state
        .orders
        .revise_items(
            &f.admin,
            order.order.id,
            Revision {
                items: revised(&f, 3),
                reason: Some("one more".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(money(details.order.total), dec!(35.00));
}

#[tokio::test]
async fn test_revise_items_rejects_empty_list() {
    let f = fixture().await;
    let order = place_order(&f).await;

    let err = f
        .state
        .orders
        .revise_items(
            &f.admin,
            order.order.id,
            Revision { reason: Some("cleared".to_string()), ..Default::default() },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));
}

#[tokio::test]
async fn test_revise_items_line_without_product_needs_price() {
    let f = fixture().await;
    let order = place_order(&f).await;

    let items = vec![RevisedItem { product_id: None, quantity: 1, price: None }];
    let err = f
        .state
        .orders
        .revise_items(
            &f.admin,
            order.order.id,
            Revision { items, reason: Some("x".to_string()), ..Default::default() },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));
}

#[tokio::test]
async fn test_revise_items_total_mismatch() {
    let f = fixture().await;
    let order = place_order(&f).await;

    let err = f
        .state
        .orders
        .revise_items(
            &f.admin,
            order.order.id,
            Revision {
                items: revised(&f, 3),
                reason: Some("more bread".to_string()),
                client_total: Some(dec!(30)),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));
}

#[tokio::test]
async fn test_client_cannot_revise_items() {
    let f = fixture().await;
    let order = place_order(&f).await;

    let err = f
        .state
        .orders
        .revise_items(
            &f.client,
            order.order.id,
            Revision { items: revised(&f, 3), reason: Some("more".to_string()), ..Default::default() },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(_)));
}

#[tokio::test]
async fn test_status_moves_forward_only() {
    let f = fixture().await;
    let id = place_order(&f).await.order.id;

    let details = set_status(&f, &f.baker, id, OrderStatus::EnProduccion).await;
    assert_eq!(details.order.status, "En Producción");
    assert_eq!(details.order.version, 2);

    let err = f
        .state
        .orders
        .update_status(&f.admin, id, "Pedido", None)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidTransition(_)));
}

#[tokio::test]
async fn test_same_status_is_a_no_op() {
    let f = fixture().await;
    let id = place_order(&f).await.order.id;

    let details = set_status(&f, &f.admin, id, OrderStatus::Pedido).await;
    assert_eq!(details.order.version, 1);
}

#[tokio::test]
async fn test_unknown_or_empty_status_rejected() {
    let f = fixture().await;
    let id = place_order(&f).await.order.id;

    for status in ["", "Enviado"] {
        let err = f.state.orders.update_status(&f.admin, id, status, None).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }
}

#[tokio::test]
async fn test_terminal_orders_are_frozen() {
    let f = fixture().await;
    let id = place_order(&f).await.order.id;
    set_status(&f, &f.admin, id, OrderStatus::Cancelado).await;

    let err = f
        .state
        .orders
        .update_status(&f.admin, id, "En Producción", None)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidTransition(_)));

    let err = f
        .state
        .orders
        .revise_items(
            &f.admin,
            id,
            Revision { items: revised(&f, 3), reason: Some("late".to_string()), ..Default::default() },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidTransition(_)));

    let err = f
        .state
        .orders
        .assign_delivery(&f.admin, id, Some(f.rider.user_id), None)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidTransition(_)));

    // Clearing is always allowed
    let details = f.state.orders.assign_delivery(&f.admin, id, None, None).await.unwrap();
    assert_eq!(details.order.delivery_user_id, None);
}

#[tokio::test]
async fn test_assign_delivery_requires_delivery_role() {
    let f = fixture().await;
    let id = place_order(&f).await.order.id;

    let err = f
        .state
        .orders
        .assign_delivery(&f.admin, id, Some(f.client.user_id), None)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));

    let err = f
        .state
        .orders
        .assign_delivery(&f.admin, id, Some(9999), None)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));

    let details = f
        .state
        .orders
        .assign_delivery(&f.admin, id, Some(f.rider.user_id), None)
        .await
        .unwrap();
    assert_eq!(details.order.delivery_user_id, Some(f.rider.user_id));

    let details = f.state.orders.assign_delivery(&f.admin, id, None, None).await.unwrap();
    assert_eq!(details.order.delivery_user_id, None);
}

#[tokio::test]
async fn test_delivery_flow_and_receipt() {
    let f = fixture().await;
    let id = place_order(&f).await.order.id;

    // Receipt cannot be confirmed before the order leaves the bakery
    let err = f.state.orders.confirm_receipt(&f.client, id).await.unwrap_err();
    assert!(matches!(err, ServiceError::InvalidTransition(_)));

    set_status(&f, &f.baker, id, OrderStatus::EnProduccion).await;
    set_status(&f, &f.baker, id, OrderStatus::Finalizado).await;

    // Rider cannot touch orders not assigned to them
    let err = f
        .state
        .orders
        .update_status(&f.rider, id, "En camino", None)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(_)));

    f.state
        .orders
        .assign_delivery(&f.admin, id, Some(f.rider.user_id), None)
        .await
        .unwrap();
    set_status(&f, &f.rider, id, OrderStatus::EnCamino).await;

    let queue = f
        .state
        .orders
        .find_by_delivery_user(&f.rider, f.rider.user_id)
        .await
        .unwrap();
    assert_eq!(queue.len(), 1);

    let details = f.state.orders.confirm_receipt(&f.client, id).await.unwrap();
    assert_eq!(details.order.status, "Entregado");
}

#[tokio::test]
async fn test_stale_expected_version_conflicts() {
    let f = fixture().await;
    let id = place_order(&f).await.order.id;

    set_status(&f, &f.baker, id, OrderStatus::EnProduccion).await;

    let err = f
        .state
        .orders
        .update_status(&f.admin, id, "Finalizado", Some(1))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));

    let err = f
        .state
        .orders
        .revise_items(
            &f.admin,
            id,
            Revision {
                items: revised(&f, 3),
                reason: Some("more".to_string()),
                expected_version: Some(1),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));

    let details = f
        .state
        .orders
        .update_status(&f.admin, id, "Finalizado", Some(2))
        .await
        .unwrap();
    assert_eq!(details.order.version, 3);
}

#[tokio::test]
async fn test_find_by_user_newest_first() {
    let f = fixture().await;
    let first = place_order(&f).await.order.id;
    let second = place_order(&f).await.order.id;
    let third = place_order(&f).await.order.id;

    let orders = f.state.orders.find_by_user(&f.client, f.client.user_id).await.unwrap();
    let ids: Vec<i32> = orders.iter().map(|o| o.order.id).collect();
    assert_eq!(ids, vec![third, second, first]);
}

#[tokio::test]
async fn test_find_one_visibility() {
    let f = fixture().await;
    let id = place_order(&f).await.order.id;
    let other_client = insert_user(&f.state.db, "otro@correo.pe", Role::Client).await;

    assert!(f.state.orders.find_one(&f.client, id).await.is_ok());
    assert!(f.state.orders.find_one(&f.baker, id).await.is_ok());

    let err = f.state.orders.find_one(&other_client, id).await.unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(_)));
    let err = f.state.orders.find_one(&f.rider, id).await.unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(_)));

    let err = f.state.orders.find_one(&f.admin, 9999).await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn test_list_orders_filters() {
    let f = fixture().await;
    let a = place_order(&f).await.order.id;
    let b = place_order(&f).await.order.id;
    set_status(&f, &f.baker, b, OrderStatus::EnProduccion).await;
    f.state
        .orders
        .assign_delivery(&f.admin, a, Some(f.rider.user_id), None)
        .await
        .unwrap();

    let baking = f
        .state
        .orders
        .list_orders(&f.baker, Some(OrderStatus::EnProduccion))
        .await
        .unwrap();
    assert_eq!(baking.iter().map(|o| o.order.id).collect::<Vec<_>>(), vec![b]);

    let rider_view = f.state.orders.list_orders(&f.rider, None).await.unwrap();
    assert_eq!(rider_view.iter().map(|o| o.order.id).collect::<Vec<_>>(), vec![a]);

    let err = f.state.orders.list_orders(&f.client, None).await.unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(_)));
}

#[tokio::test]
async fn test_removed_product_keeps_order_lines() {
    let f = fixture().await;
    let id = place_order(&f).await.order.id;

    f.state.catalog.delete_product(&f.admin, f.alfajor.id).await.unwrap();

    let details = f.state.orders.find_one(&f.client, id).await.unwrap();
    assert_eq!(details.items.len(), 2);
    let orphan = details
        .items
        .iter()
        .find(|line| line.item.product_id.is_none())
        .expect("line for the removed product");
    assert_eq!(orphan.product_name, None);
    assert_eq!(money(orphan.item.price_at_time), dec!(5.00));
    assert_eq!(money(details.order.total), dec!(25.00));

    // The orphaned line can be carried through a revision unchanged
    let items = vec![
        RevisedItem { product_id: Some(f.bread.id), quantity: 2, price: None },
        RevisedItem { product_id: None, quantity: 1, price: Some(dec!(5)) },
    ];
    let details = f
        .state
        .orders
        .revise_items(&f.admin, id, Revision { items, ..Default::default() })
        .await
        .unwrap();
    assert!(details.notes.is_empty());
    assert_eq!(money(details.order.total), dec!(25.00));
}

#[tokio::test]
async fn test_address_in_use_cannot_be_deleted() {
    let f = fixture().await;
    let address = insert_address(&f.state.db, f.client.user_id).await;
    let mut order = checkout(&f);
    order.address_id = Some(address.id);
    f.state.orders.create_order(&f.client, order).await.unwrap();

    let err = f.state.addresses.delete(&f.client, address.id).await.unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));

    let spare = insert_address(&f.state.db, f.client.user_id).await;
    f.state.addresses.delete(&f.client, spare.id).await.unwrap();
}

#[tokio::test]
async fn test_checkout_total_beyond_storage_is_rejected() {
    let f = fixture().await;
    let order = NewOrder {
        user_id: f.client.user_id,
        items: vec![NewOrderItem { product_id: f.bread.id, quantity: i32::MAX }],
        ..Default::default()
    };

    let err = f.state.orders.create_order(&f.client, order).await.unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));
    assert!(Orders::find().all(&f.state.db).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_revision_with_overflowing_price_is_rejected() {
    let f = fixture().await;
    let id = place_order(&f).await.order.id;

    let huge = vec![RevisedItem {
        product_id: None,
        quantity: 1000,
        price: Some(dec!(10000000000000000000000000000)),
    }];
    let err = f
        .state
        .orders
        .revise_items(&f.admin, id, Revision { items: huge, reason: Some("x".to_string()), ..Default::default() })
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));

    let above_column = vec![RevisedItem {
        product_id: None,
        quantity: 1,
        price: Some(dec!(123456789012345.67)),
    }];
    let err = f
        .state
        .orders
        .revise_items(&f.admin, id, Revision { items: above_column, reason: Some("x".to_string()), ..Default::default() })
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));

    // A price at the limit is fine on its own, but not times 101
    let too_many = vec![RevisedItem {
        product_id: None,
        quantity: 101,
        price: Some(dec!(99999999.99)),
    }];
    let err = f
        .state
        .orders
        .revise_items(&f.admin, id, Revision { items: too_many, reason: Some("x".to_string()), ..Default::default() })
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));

    let details = f.state.orders.find_one(&f.admin, id).await.unwrap();
    assert_eq!(money(details.order.total), dec!(25.00));
    assert_eq!(details.order.version, 1);
    assert_eq!(details.items.len(), 2);
}

#[tokio::test]
async fn test_catalog_price_beyond_storage_is_rejected() {
    let f = fixture().await;

    let err = f
        .state
        .catalog
        .create_product(
            &f.admin,
            bakery_backend::services::catalog::NewProduct {
                name: "Torta de bodas".to_string(),
                category: "Tortas".to_string(),
                price: dec!(123456789.00),
                image: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));

    let err = f
        .state
        .catalog
        .update_product(
            &f.admin,
            f.bread.id,
            bakery_backend::services::catalog::ProductChanges {
                price: Some(dec!(100000000)),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));

    let bread = f.state.catalog.get_product(f.bread.id).await.unwrap();
    assert_eq!(money(bread.price), dec!(10.00));
}
