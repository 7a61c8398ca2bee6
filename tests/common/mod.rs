#![allow(dead_code)]

use bakery_backend::entities::{addresses, products, users};
use bakery_backend::models::user::Role;
use bakery_backend::services::policy::Actor;
use bakery_backend::AppState;
use chrono::Utc;
use migration::{Migrator, MigratorTrait};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, DbErr, Set};

/// Set up a fresh in-memory database with all migrations applied.
/// SQLite keeps one connection so every query sees the same database.
pub async fn setup_test_db() -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1).min_connections(1).sqlx_logging(false);

    let db = Database::connect(options).await?;
    Migrator::up(&db, None).await?;
    Ok(db)
}

pub async fn setup_state() -> AppState {
    let db = setup_test_db().await.expect("Failed to set up test DB");
    AppState::new(db)
}

pub async fn insert_user(db: &DatabaseConnection, email: &str, role: Role) -> Actor {
    let user = users::ActiveModel {
        email: Set(email.to_string()),
        full_name: Set(email.split('@').next().unwrap_or(email).to_string()),
        phone: Set(None),
        role: Set(role.to_string()),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to insert user");

    Actor::new(user.id, role)
}

pub async fn insert_product(db: &DatabaseConnection, name: &str, price: Decimal) -> products::Model {
    let now = Utc::now();
    products::ActiveModel {
        name: Set(name.to_string()),
        category: Set("Panes".to_string()),
        price: Set(price),
        image: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to insert product")
}

pub async fn insert_address(db: &DatabaseConnection, user_id: i32) -> addresses::Model {
    addresses::ActiveModel {
        user_id: Set(user_id),
        street: Set("Jr. Junín 456".to_string()),
        city: Set("Lima".to_string()),
        reference: Set(Some("Frente al parque".to_string())),
        latitude: Set(Some(-12.0464)),
        longitude: Set(Some(-77.0428)),
        refined_latitude: Set(None),
        refined_longitude: Set(None),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to insert address")
}

/// The usual cast: a client, an admin, a baker and a rider, plus two
/// products priced 10 and 5
pub struct Fixture {
    pub state: AppState,
    pub client: Actor,
    pub admin: Actor,
    pub baker: Actor,
    pub rider: Actor,
    pub bread: products::Model,
    pub alfajor: products::Model,
}

pub async fn fixture() -> Fixture {
    let state = setup_state().await;
    let db = &state.db;

    let client = insert_user(db, "ana@correo.pe", Role::Client).await;
    let admin = insert_user(db, "rosa@panaderia.pe", Role::Admin).await;
    let baker = insert_user(db, "jorge@panaderia.pe", Role::Production).await;
    let rider = insert_user(db, "luis@panaderia.pe", Role::Delivery).await;
    let bread = insert_product(db, "Pan francés", Decimal::from(10)).await;
    let alfajor = insert_product(db, "Alfajor", Decimal::from(5)).await;

    Fixture {
        state,
        client,
        admin,
        baker,
        rider,
        bread,
        alfajor,
    }
}
