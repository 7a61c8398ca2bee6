use axum::{
    http::{HeaderName, HeaderValue, Method},
    routing::{delete, get, patch},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use crate::handlers::{addresses, auth::USER_HEADER, health, orders, products, users};
use crate::AppState;

/// CORS for the storefront and staff panels. An empty list allows any origin.
pub fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            HeaderName::from_static(USER_HEADER),
        ]);

    if allowed_origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    layer.allow_origin(AllowOrigin::list(origins))
}

pub fn router(state: AppState, allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/orders", get(orders::list_orders).post(orders::create_order))
        .route("/orders/user/{user_id}", get(orders::get_user_orders))
        .route("/orders/delivery/{user_id}", get(orders::get_delivery_orders))
        .route("/orders/{id}", get(orders::get_order).patch(orders::patch_order))
        .route("/orders/{id}/assign", patch(orders::assign_delivery))
        .route("/orders/{id}/status", patch(orders::update_status))
        .route("/orders/{id}/confirm", patch(orders::confirm_receipt))
        .route("/products", get(products::list_products).post(products::create_product))
        .route(
            "/products/{id}",
            get(products::get_product)
                .patch(products::update_product)
                .delete(products::delete_product),
        )
        .route("/users", get(users::list_users).post(users::create_user))
        .route("/users/{id}", get(users::get_user))
        .route("/users/{id}/role", patch(users::set_role))
        .route(
            "/users/{id}/addresses",
            get(addresses::list_addresses).post(addresses::create_address),
        )
        .route("/addresses/{id}", delete(addresses::delete_address))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(allowed_origins)),
        )
        .with_state(state)
}
